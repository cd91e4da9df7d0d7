//! Errors reported by propagators.
//!
//! The iteration engine wraps these in its own failure type together
//! with the phase and slice in which the propagator failed.

use std::error::Error;
use std::fmt;

use crate::grid::{GridShape, Halo};

/// Errors from a propagator's `setup()` or `advance()`.
#[derive(Clone, Debug, PartialEq)]
pub enum PropagatorError {
    /// The propagated state contains a NaN or infinity.
    NonFinite {
        /// Flat index into the padded buffer of the first bad value.
        index: usize,
    },
    /// The state handed to the propagator does not have the shape it was
    /// set up for.
    ShapeMismatch {
        /// Shape given at setup.
        expected: GridShape,
        /// Shape of the state passed to `advance()`.
        found: GridShape,
    },
    /// The requested time span or step count is unusable
    /// (zero steps, non-finite or reversed bounds).
    InvalidSpan {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// The configured halo is too narrow for the propagator's stencil.
    IncompatibleHalo {
        /// Halo the stencil needs.
        required: Halo,
        /// Halo that was configured.
        configured: Halo,
    },
    /// Any other failure inside the propagator.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for PropagatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFinite { index } => {
                write!(f, "non-finite value at buffer index {index}")
            }
            Self::ShapeMismatch { expected, found } => {
                write!(
                    f,
                    "state shape {:?} does not match setup shape {:?}",
                    found.extents, expected.extents
                )
            }
            Self::InvalidSpan { reason } => write!(f, "invalid time span: {reason}"),
            Self::IncompatibleHalo {
                required,
                configured,
            } => write!(
                f,
                "stencil needs halo ({}, {}) but grid has ({}, {})",
                required.low, required.high, configured.low, configured.high
            ),
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
        }
    }
}

impl Error for PropagatorError {}
