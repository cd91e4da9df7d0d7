//! Buffer pool configuration.

use parareal_core::{GridExtents, GridShape};

use crate::error::ArenaError;
use crate::slot::BUFFERS_PER_SLOT;

/// Configuration for a [`SliceBufferPool`](crate::SliceBufferPool).
///
/// Validated at allocation; immutable afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of time slices, one per worker.
    pub worker_count: usize,
    /// Layout of every field buffer in the pool.
    pub shape: GridShape,
}

impl PoolConfig {
    /// Create a config for `worker_count` slots of `shape`.
    pub fn new(worker_count: usize, shape: GridShape) -> Self {
        Self {
            worker_count,
            shape,
        }
    }

    /// Check that the pool can be sized.
    ///
    /// # Errors
    ///
    /// - [`ArenaError::ZeroWorkers`] if `worker_count == 0`.
    /// - [`ArenaError::EmptyExtent`] if any interior axis is zero.
    /// - [`ArenaError::CapacityOverflow`] if the total element count of
    ///   all `3 * worker_count` buffers overflows `usize`.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.worker_count == 0 {
            return Err(ArenaError::ZeroWorkers);
        }
        if self.shape.extents.is_empty() {
            return Err(ArenaError::EmptyExtent {
                extents: self.shape.extents,
            });
        }
        self.total_len().ok_or(ArenaError::CapacityOverflow {
            worker_count: self.worker_count,
            extents: self.shape.extents,
        })?;
        Ok(())
    }

    /// Values per field buffer, or `None` on overflow.
    pub fn buffer_len(&self) -> Option<usize> {
        self.shape.checked_len()
    }

    /// Values across all buffers of all slots, or `None` on overflow.
    pub fn total_len(&self) -> Option<usize> {
        self.buffer_len()?
            .checked_mul(BUFFERS_PER_SLOT)?
            .checked_mul(self.worker_count)
    }

    /// Interior extents shared by every buffer.
    pub fn extents(&self) -> GridExtents {
        self.shape.extents
    }
}
