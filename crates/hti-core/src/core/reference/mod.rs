//! Analytic reference systems whose free energy anchors the integration path.

pub mod einstein;
