//! The per-worker slot array.
//!
//! [`SliceBufferPool`] owns exactly one [`SliceSlot`] per worker. Slots
//! are addressed by slice index; the engine lends them out to workers by
//! value during the parallel phase and puts them back before the
//! sequential phase reads them.

use std::thread;

use parareal_core::{FieldState, GridShape};

use crate::config::PoolConfig;
use crate::error::ArenaError;
use crate::slot::SliceSlot;

/// Fixed-size array of per-slice state, one slot per worker.
///
/// Allocated once per engine and reused across runs. Dropping the pool
/// (or calling [`release`](Self::release), which consumes it) frees all
/// storage exactly once.
#[derive(Debug)]
pub struct SliceBufferPool {
    config: PoolConfig,
    slots: Vec<SliceSlot>,
}

impl SliceBufferPool {
    /// Allocate and zero-fill `config.worker_count` slots.
    ///
    /// Each slot is allocated and zero-filled on its own scoped thread so
    /// that no single thread first-touches every page. Use
    /// [`from_slots`](Self::from_slots) when a persistent worker pool
    /// should do the touching instead.
    ///
    /// # Errors
    ///
    /// Returns the [`PoolConfig::validate`] error for unusable sizes,
    /// [`ArenaError::OutOfMemory`] if any reservation fails, or
    /// [`ArenaError::PlacementFailed`] if a placement thread panics.
    pub fn allocate(config: PoolConfig) -> Result<Self, ArenaError> {
        config.validate()?;
        let shape = config.shape;

        let results: Vec<Result<SliceSlot, ArenaError>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..config.worker_count)
                .map(|_| scope.spawn(move || SliceSlot::try_zeroed(shape)))
                .collect();
            handles
                .into_iter()
                .enumerate()
                .map(|(slot, h)| h.join().unwrap_or(Err(ArenaError::PlacementFailed { slot })))
                .collect()
        });

        let slots = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        Ok(Self { config, slots })
    }

    /// Assemble a pool from slots allocated elsewhere.
    ///
    /// `slots[i]` becomes slot `i`.
    ///
    /// # Errors
    ///
    /// Returns the [`PoolConfig::validate`] error, or
    /// [`ArenaError::SlotCountMismatch`] / [`ArenaError::ShapeMismatch`]
    /// if the supplied slots do not match the config.
    pub fn from_slots(config: PoolConfig, slots: Vec<SliceSlot>) -> Result<Self, ArenaError> {
        config.validate()?;
        if slots.len() != config.worker_count {
            return Err(ArenaError::SlotCountMismatch {
                expected: config.worker_count,
                found: slots.len(),
            });
        }
        for (i, slot) in slots.iter().enumerate() {
            if !slot.has_shape(config.shape) {
                return Err(ArenaError::ShapeMismatch {
                    slot: i,
                    expected: config.shape,
                    found: slot.shape(),
                });
            }
        }
        Ok(Self { config, slots })
    }

    /// The configuration this pool was sized with.
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Number of slots (equals the worker count).
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the pool holds no slots (only while slots are
    /// lent out via [`take_slots`](Self::take_slots)).
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Layout of every buffer in the pool.
    pub fn shape(&self) -> GridShape {
        self.config.shape
    }

    /// Borrow slot `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range or the slots are lent out.
    pub fn slot(&self, i: usize) -> &SliceSlot {
        &self.slots[i]
    }

    /// Mutably borrow slot `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is out of range or the slots are lent out.
    pub fn slot_mut(&mut self, i: usize) -> &mut SliceSlot {
        &mut self.slots[i]
    }

    /// Mutably borrow slots `i` and `i + 1` at once, for carrying a
    /// slice's end state into the next slice's initial condition.
    ///
    /// # Panics
    ///
    /// Panics if `i + 1` is out of range.
    pub fn adjacent_mut(&mut self, i: usize) -> (&mut SliceSlot, &mut SliceSlot) {
        let (left, right) = self.slots.split_at_mut(i + 1);
        (&mut left[i], &mut right[0])
    }

    /// All slots in slice order.
    pub fn slots(&self) -> &[SliceSlot] {
        &self.slots
    }

    /// Move every slot out of the pool, leaving it empty.
    ///
    /// Pair with [`restore_slots`](Self::restore_slots).
    pub fn take_slots(&mut self) -> Vec<SliceSlot> {
        std::mem::take(&mut self.slots)
    }

    /// Put slots back after [`take_slots`](Self::take_slots).
    ///
    /// # Errors
    ///
    /// Same checks as [`from_slots`](Self::from_slots). On error the pool
    /// stays empty and must be treated as lost.
    pub fn restore_slots(&mut self, slots: Vec<SliceSlot>) -> Result<(), ArenaError> {
        let restored = Self::from_slots(self.config, slots)?;
        self.slots = restored.slots;
        Ok(())
    }

    /// End-of-slice estimates `qend[0..W]`, in slice order.
    pub fn slice_end_states(&self) -> impl Iterator<Item = &FieldState> {
        self.slots.iter().map(|s| &s.qend)
    }

    /// Zero every slot in place.
    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }

    /// Memory used by all slots in bytes.
    pub fn memory_bytes(&self) -> usize {
        self.slots.iter().map(SliceSlot::memory_bytes).sum()
    }

    /// Free all storage. Consuming `self` makes a second release
    /// impossible.
    pub fn release(self) {
        drop(self);
    }
}
