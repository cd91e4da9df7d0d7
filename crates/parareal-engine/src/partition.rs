//! Division of `[0, t_end]` into one time slice per worker.

use parareal_core::SliceIndex;
use parareal_propagator::StepSpan;

use crate::error::EngineError;

/// One contiguous sub-interval of the run, bound to one worker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeSlice {
    /// Position of the slice, and the worker that owns it.
    pub index: SliceIndex,
    /// Start time.
    pub t_start: f64,
    /// End time. Equal to the next slice's `t_start`.
    pub t_end: f64,
    /// Coarse steps across the slice.
    pub coarse_steps: u32,
    /// Fine steps across the slice.
    pub fine_steps: u32,
}

impl TimeSlice {
    /// Span for the coarse propagator.
    pub fn coarse_span(&self) -> StepSpan {
        StepSpan::new(self.t_start, self.t_end, self.coarse_steps)
    }

    /// Span for the fine propagator.
    pub fn fine_span(&self) -> StepSpan {
        StepSpan::new(self.t_start, self.t_end, self.fine_steps)
    }

    /// Length of the slice.
    pub fn duration(&self) -> f64 {
        self.t_end - self.t_start
    }
}

/// Split `[0, t_end]` into `worker_count` equal, contiguous slices.
///
/// Slice `i` starts at `i * (t_end / worker_count)`. The last slice ends
/// at exactly `t_end`, and every other slice ends exactly where the next
/// one starts.
///
/// # Errors
///
/// [`EngineError::InvalidParameter`] if `t_end` is not finite and
/// positive; [`EngineError::InvalidDimension`] if `worker_count`,
/// `fine_steps`, or `coarse_steps` is zero.
pub fn partition(
    t_end: f64,
    worker_count: usize,
    fine_steps: u32,
    coarse_steps: u32,
) -> Result<Vec<TimeSlice>, EngineError> {
    if !t_end.is_finite() || t_end <= 0.0 {
        return Err(EngineError::InvalidParameter {
            what: "t_end",
            value: t_end,
        });
    }
    for (what, value) in [
        ("worker_count", worker_count),
        ("fine_steps", fine_steps as usize),
        ("coarse_steps", coarse_steps as usize),
    ] {
        if value == 0 {
            return Err(EngineError::InvalidDimension { what, value });
        }
    }

    let dt_slice = t_end / worker_count as f64;
    let boundary = |i: usize| {
        if i == worker_count {
            t_end
        } else {
            i as f64 * dt_slice
        }
    };

    Ok((0..worker_count)
        .map(|i| TimeSlice {
            index: SliceIndex(i),
            t_start: boundary(i),
            t_end: boundary(i + 1),
            coarse_steps,
            fine_steps,
        })
        .collect())
}
