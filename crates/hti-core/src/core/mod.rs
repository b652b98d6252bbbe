//! # Core Module
//!
//! Stateless building blocks shared by the engine and the workflows.
//!
//! - **Constants** ([`constants`]) - CODATA values and unit conversions used across the crate
//! - **File I/O** ([`io`]) - LAMMPS data files, LAMMPS log thermo tables and integrand tables
//! - **Models** ([`models`]) - The atomic configuration and λ-grid representations
//! - **Numerics** ([`numerics`]) - Block averaging, quadrature on non-uniform grids and MBAR
//! - **Reference Systems** ([`reference`]) - Analytic free energy of the Einstein crystal

pub mod constants;
pub mod io;
pub mod models;
pub mod numerics;
pub mod reference;
