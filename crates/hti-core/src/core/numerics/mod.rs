//! Numerical kernels for turning thermo samples into free-energy differences.
//!
//! - **Block statistics** ([`block`]) - Means and standard errors of correlated time series
//! - **Quadrature** ([`quadrature`]) - Simpson/trapezoid rules on non-uniform λ grids
//! - **MBAR** ([`mbar`]) - The multistate Bennett acceptance ratio estimator

pub mod block;
pub mod mbar;
pub mod quadrature;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum NumericsError {
    #[error("{what} needs at least {required} points, got {actual}")]
    InsufficientPoints {
        what: &'static str,
        required: usize,
        actual: usize,
    },
    #[error("Length mismatch: {what} has {actual} entries, expected {expected}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Grid must be strictly increasing at index {index}")]
    NonIncreasingGrid { index: usize },
    #[error("MBAR did not converge after {iterations} iterations (residual {residual:e})")]
    MbarConvergence { iterations: usize, residual: f64 },
    #[error("Refined grid would need more than {limit} points")]
    GridTooLarge { limit: usize },
    #[error("Non-finite value encountered in {0}")]
    NonFinite(&'static str),
}
