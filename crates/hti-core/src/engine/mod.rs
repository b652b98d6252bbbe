//! # Engine Module
//!
//! Everything between the raw building blocks in [`crate::core`] and the
//! user-facing workflows: the job parameters, the HTI protocol and its stages, the
//! LAMMPS task inputs, and the post-processing that turns task output into
//! free-energy differences.
//!
//! - **Configuration** ([`config`]) - The `in.json` parameter set and its defaults
//! - **Stages** ([`stages`]) - Switch protocols, stage naming and the `dU/dλ` integrand of each stage
//! - **Task Inputs** ([`lammps_input`]) - Rendering of the per-λ `in.lammps` scripts
//! - **Post-processing** ([`post`]) - Block averages, quadrature or MBAR per stage, thermo summaries
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - The engine error type

pub mod config;
pub mod error;
pub mod lammps_input;
pub mod post;
pub mod progress;
pub mod stages;
