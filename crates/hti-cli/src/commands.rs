pub mod compute;
pub mod generate;
pub mod refine;
