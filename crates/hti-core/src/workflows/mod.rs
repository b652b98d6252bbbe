//! # Workflows Module
//!
//! The job-level entry points. Each workflow owns its filesystem side effects and
//! reports progress through a [`crate::engine::progress::ProgressReporter`].
//!
//! - **Generation** ([`generate`]) - Lays out a new job: parameters, configuration and one task per λ
//! - **Refinement** ([`refine`]) - Densifies the λ grids where the integrand is curved
//! - **Computation** ([`compute`]) - Combines the Einstein reference with the integrated stages

pub mod compute;
pub mod generate;
pub mod refine;
