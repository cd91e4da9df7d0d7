//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use parareal_core::{GridExtents, GridShape};

/// Errors that can occur while sizing or assembling a buffer pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The pool was asked for zero slots.
    ZeroWorkers,
    /// An interior grid axis has zero cells.
    EmptyExtent {
        /// The offending extents.
        extents: GridExtents,
    },
    /// The total element count does not fit in `usize`.
    CapacityOverflow {
        /// Requested slot count.
        worker_count: usize,
        /// Requested interior extents.
        extents: GridExtents,
    },
    /// The allocator could not reserve a buffer.
    OutOfMemory {
        /// Number of `f64` values requested.
        requested: usize,
    },
    /// `from_slots` received a different number of slots than configured.
    SlotCountMismatch {
        /// Configured worker count.
        expected: usize,
        /// Slots actually supplied.
        found: usize,
    },
    /// A supplied slot does not have the configured shape.
    ShapeMismatch {
        /// Index of the offending slot.
        slot: usize,
        /// Configured shape.
        expected: GridShape,
        /// Shape of the supplied slot.
        found: GridShape,
    },
    /// A first-touch thread panicked while allocating its slot.
    PlacementFailed {
        /// Index of the slot whose thread failed.
        slot: usize,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroWorkers => write!(f, "worker count must be at least 1"),
            Self::EmptyExtent { extents } => write!(
                f,
                "grid extents must be positive, got {}x{}x{}",
                extents.nx, extents.ny, extents.nz
            ),
            Self::CapacityOverflow {
                worker_count,
                extents,
            } => write!(
                f,
                "pool of {worker_count} slots of {}x{}x{} overflows usize",
                extents.nx, extents.ny, extents.nz
            ),
            Self::OutOfMemory { requested } => {
                write!(f, "could not reserve {requested} values")
            }
            Self::SlotCountMismatch { expected, found } => {
                write!(f, "expected {expected} slots, got {found}")
            }
            Self::ShapeMismatch {
                slot,
                expected,
                found,
            } => write!(
                f,
                "slot {slot} has extents {:?}, expected {:?}",
                found.extents, expected.extents
            ),
            Self::PlacementFailed { slot } => {
                write!(f, "first-touch allocation of slot {slot} panicked")
            }
        }
    }
}

impl Error for ArenaError {}
