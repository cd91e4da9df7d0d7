//! Engine error types.
//!
//! [`EngineError`] is the single error surfaced by [`PararealEngine`]
//! construction and runs. Validation errors are raised before any buffer
//! is touched; propagator and worker failures poison the engine.
//!
//! [`PararealEngine`]: crate::PararealEngine

use std::error::Error;
use std::fmt;

use parareal_arena::ArenaError;
use parareal_core::{GridShape, PropagatorError, SliceIndex};

use crate::diagnostics::DiagnosticsError;

/// Where in the engine lifecycle a propagator was invoked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// `Propagator::setup` at engine construction.
    Setup,
    /// Sequential coarse predictor pass (iteration 0).
    Predictor,
    /// Parallel fine half of a correction pass.
    Fine,
    /// Sequential coarse half of a correction pass.
    Correction,
    /// Sequential fine reference integration.
    Reference,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Setup => "setup",
            Self::Predictor => "predictor",
            Self::Fine => "fine",
            Self::Correction => "correction",
            Self::Reference => "reference",
        };
        f.write_str(name)
    }
}

/// Errors from engine construction, runs, and diagnostics output.
#[derive(Debug)]
pub enum EngineError {
    /// A grid extent, worker count, or step count is zero.
    InvalidDimension {
        /// Which quantity was rejected.
        what: &'static str,
        /// The rejected value.
        value: usize,
    },
    /// A real-valued run or engine parameter is out of range.
    InvalidParameter {
        /// Which parameter was rejected.
        what: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// The initial state does not have the configured grid layout.
    StateShapeMismatch {
        /// Layout the engine was built for.
        expected: GridShape,
        /// Layout of the supplied state.
        found: GridShape,
    },
    /// The slice buffer pool could not be sized or allocated.
    AllocationFailure(ArenaError),
    /// A run asked for a different worker count than the engine was built with.
    WorkerCountMismatch {
        /// Worker count fixed at construction.
        configured: usize,
        /// Worker count the run asked for.
        requested: usize,
    },
    /// A propagator reported failure, or the finite-value sentinel fired.
    PropagatorFailure {
        /// Lifecycle phase of the failing call.
        phase: Phase,
        /// Slice being advanced, if any.
        slice: Option<SliceIndex>,
        /// Name of the failing propagator.
        propagator: String,
        /// Underlying error.
        reason: PropagatorError,
    },
    /// Writing diagnostics output failed. Never invalidates a result.
    PersistenceFailure(DiagnosticsError),
    /// A worker thread could not be spawned.
    ThreadSpawnFailed {
        /// Worker index.
        worker: usize,
        /// OS error description.
        reason: String,
    },
    /// A worker thread disappeared mid-run.
    WorkerLost {
        /// Worker index.
        worker: usize,
    },
    /// A previous run failed fatally; build a new engine.
    Poisoned,
}

impl EngineError {
    /// Returns `true` if this error leaves the engine unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::PropagatorFailure { .. } | Self::WorkerLost { .. } | Self::Poisoned
        )
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDimension { what, value } => {
                write!(f, "{what} must be at least 1, got {value}")
            }
            Self::InvalidParameter { what, value } => {
                write!(f, "invalid {what}: {value}")
            }
            Self::StateShapeMismatch { expected, found } => {
                write!(
                    f,
                    "initial state has extents {:?} halo ({}, {}), engine expects {:?} halo ({}, {})",
                    found.extents.as_array(),
                    found.halo.low,
                    found.halo.high,
                    expected.extents.as_array(),
                    expected.halo.low,
                    expected.halo.high,
                )
            }
            Self::AllocationFailure(e) => write!(f, "allocation failed: {e}"),
            Self::WorkerCountMismatch {
                configured,
                requested,
            } => write!(
                f,
                "run requested {requested} workers but engine was built with {configured}"
            ),
            Self::PropagatorFailure {
                phase,
                slice,
                propagator,
                reason,
            } => match slice {
                Some(s) => write!(f, "propagator '{propagator}' failed in {phase} phase on slice {s}: {reason}"),
                None => write!(f, "propagator '{propagator}' failed in {phase} phase: {reason}"),
            },
            Self::PersistenceFailure(e) => write!(f, "diagnostics output failed: {e}"),
            Self::ThreadSpawnFailed { worker, reason } => {
                write!(f, "failed to spawn worker {worker}: {reason}")
            }
            Self::WorkerLost { worker } => write!(f, "worker {worker} exited unexpectedly"),
            Self::Poisoned => write!(f, "engine is poisoned by an earlier failure"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AllocationFailure(e) => Some(e),
            Self::PropagatorFailure { reason, .. } => Some(reason),
            Self::PersistenceFailure(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for EngineError {
    fn from(e: ArenaError) -> Self {
        Self::AllocationFailure(e)
    }
}

impl From<DiagnosticsError> for EngineError {
    fn from(e: DiagnosticsError) -> Self {
        Self::PersistenceFailure(e)
    }
}
