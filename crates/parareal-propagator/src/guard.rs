//! Output checks shared by propagators and the engine.
//!
//! [`check_finite`] is the NaN/infinity sentinel the engine runs after
//! every propagation when sentinel checking is enabled; [`check_shape`]
//! guards `advance()` against states of the wrong layout.

use parareal_core::{FieldState, GridShape, PropagatorError};

/// Fail with [`PropagatorError::NonFinite`] at the first NaN or infinity.
pub fn check_finite(state: &FieldState) -> Result<(), PropagatorError> {
    match state.first_non_finite() {
        Some(index) => Err(PropagatorError::NonFinite { index }),
        None => Ok(()),
    }
}

/// Fail with [`PropagatorError::ShapeMismatch`] unless `state` has `expected`.
pub fn check_shape(expected: GridShape, state: &FieldState) -> Result<(), PropagatorError> {
    if state.shape() == expected {
        Ok(())
    } else {
        Err(PropagatorError::ShapeMismatch {
            expected,
            found: state.shape(),
        })
    }
}
