//! The three per-slice field buffers.

use parareal_core::{FieldState, GridShape};

use crate::error::ArenaError;

/// Number of field buffers in each slot (`q`, `gq`, `qend`).
pub(crate) const BUFFERS_PER_SLOT: usize = 3;

/// State owned by one time slice.
///
/// During the parallel fine phase a slot is moved to, and mutated only
/// by, its own worker. During the sequential phases the coordinator
/// writes slot `i` completely before reading slot `i + 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct SliceSlot {
    /// Candidate initial condition for the slice; overwritten in place by
    /// the fine propagation.
    pub q: FieldState,
    /// Most recent coarse propagation of `q`.
    pub gq: FieldState,
    /// Best current estimate of the state at the slice end. Temporarily
    /// holds the fine-minus-coarse correction between the two halves of
    /// a correction pass.
    pub qend: FieldState,
}

impl SliceSlot {
    /// Allocate and zero-fill a slot.
    ///
    /// Reservation failures are reported instead of aborting, so the
    /// thread calling this can surface [`ArenaError::OutOfMemory`]. The
    /// calling thread writes every value, which places the pages on its
    /// NUMA node under a first-touch policy.
    pub fn try_zeroed(shape: GridShape) -> Result<Self, ArenaError> {
        Ok(Self {
            q: try_zeroed_field(shape)?,
            gq: try_zeroed_field(shape)?,
            qend: try_zeroed_field(shape)?,
        })
    }

    /// Layout shared by all three buffers.
    pub fn shape(&self) -> GridShape {
        self.q.shape()
    }

    /// Returns `true` if all three buffers have `shape`.
    pub fn has_shape(&self, shape: GridShape) -> bool {
        self.q.shape() == shape && self.gq.shape() == shape && self.qend.shape() == shape
    }

    /// Zero every buffer in place without reallocating.
    pub fn clear(&mut self) {
        self.q.as_mut_slice().fill(0.0);
        self.gq.as_mut_slice().fill(0.0);
        self.qend.as_mut_slice().fill(0.0);
    }

    /// Memory used by the three buffers in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.q.memory_bytes() + self.gq.memory_bytes() + self.qend.memory_bytes()
    }
}

fn try_zeroed_field(shape: GridShape) -> Result<FieldState, ArenaError> {
    let len = shape
        .checked_len()
        .ok_or(ArenaError::OutOfMemory { requested: usize::MAX })?;
    let mut data: Vec<f64> = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| ArenaError::OutOfMemory { requested: len })?;
    data.resize(len, 0.0);
    FieldState::from_vec(shape, data).ok_or(ArenaError::OutOfMemory { requested: len })
}
