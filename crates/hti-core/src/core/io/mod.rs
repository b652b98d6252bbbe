//! Provides input/output for the files exchanged with the molecular-dynamics engine.
//!
//! LAMMPS data files carry the equilibrated configuration, LAMMPS logs carry the
//! thermo output of each λ task, and the integrand tables record the per-stage
//! averages that the integration consumed.

pub mod lammps;
pub mod table;
pub mod thermo_log;
pub mod traits;
