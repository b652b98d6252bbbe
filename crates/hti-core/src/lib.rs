//! # HTI-Ice Core Library
//!
//! Free energy of rigid-water ice by Hamiltonian thermodynamic integration (HTI),
//! measured against an analytically solvable Einstein reference crystal. The
//! molecular-dynamics engine (LAMMPS) stays outside this crate: the library writes
//! its input scripts and reads back its data and log files.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer layout so that the numerical pieces can be
//! tested without touching the filesystem.
//!
//! - **[`core`]: The Foundation.** Physical constants, the LAMMPS data/log readers,
//!   the configuration model, block statistics, quadrature, the MBAR estimator and
//!   the Einstein-crystal reference free energy.
//!
//! - **[`engine`]: The Logic Core.** Job parameters, the HTI switching protocol and
//!   its stages, LAMMPS input generation and the per-stage sample collection that
//!   turns raw thermo output into integrands.
//!
//! - **[`workflows`]: The Public API.** The three job-level procedures: generating a
//!   job, refining its λ grids, and computing the final free energy.

pub mod core;
pub mod engine;
pub mod workflows;
