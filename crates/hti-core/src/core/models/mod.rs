//! Data models shared by the I/O layer and the engine: the atomic configuration
//! read from a LAMMPS data file and the λ grids that parameterise each HTI stage.

pub mod lambda;
pub mod system;
