//! Execution context passed to propagators on every `advance()`.
//!
//! [`AdvanceContext`] carries the time span, step count, grid spacing,
//! and the slice being advanced. It holds no buffers, so the state can be
//! borrowed mutably alongside it.

use parareal_core::{GridSpacing, PropagatorError, SliceIndex};

/// A time interval subdivided into equal steps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepSpan {
    /// Start of the interval.
    pub t_start: f64,
    /// End of the interval.
    pub t_end: f64,
    /// Number of equal steps across the interval.
    pub steps: u32,
}

impl StepSpan {
    /// Create a span of `steps` steps over `[t_start, t_end]`.
    pub fn new(t_start: f64, t_end: f64, steps: u32) -> Self {
        Self {
            t_start,
            t_end,
            steps,
        }
    }

    /// Length of the interval.
    pub fn duration(&self) -> f64 {
        self.t_end - self.t_start
    }

    /// Length of a single step.
    pub fn dt(&self) -> f64 {
        self.duration() / f64::from(self.steps)
    }

    /// Check that the span can be integrated.
    ///
    /// # Errors
    ///
    /// [`PropagatorError::InvalidSpan`] if `steps == 0`, a bound is not
    /// finite, or `t_end < t_start`.
    pub fn validate(&self) -> Result<(), PropagatorError> {
        if self.steps == 0 {
            return Err(PropagatorError::InvalidSpan {
                reason: "step count must be at least 1".into(),
            });
        }
        if !self.t_start.is_finite() || !self.t_end.is_finite() {
            return Err(PropagatorError::InvalidSpan {
                reason: format!("bounds must be finite, got [{}, {}]", self.t_start, self.t_end),
            });
        }
        if self.t_end < self.t_start {
            return Err(PropagatorError::InvalidSpan {
                reason: format!("t_end {} precedes t_start {}", self.t_end, self.t_start),
            });
        }
        Ok(())
    }
}

/// Everything a propagator needs besides the state itself.
#[derive(Clone, Copy, Debug)]
pub struct AdvanceContext<'a> {
    span: StepSpan,
    spacing: &'a GridSpacing,
    slice: SliceIndex,
}

impl<'a> AdvanceContext<'a> {
    /// Construct a new advance context.
    ///
    /// Typically called by the engine, not by propagators directly.
    pub fn new(span: StepSpan, spacing: &'a GridSpacing, slice: SliceIndex) -> Self {
        Self {
            span,
            spacing,
            slice,
        }
    }

    /// Time span and step count to integrate over.
    pub fn span(&self) -> StepSpan {
        self.span
    }

    /// Step length, `span.duration() / span.steps`.
    pub fn dt(&self) -> f64 {
        self.span.dt()
    }

    /// Physical grid spacing.
    pub fn spacing(&self) -> &GridSpacing {
        self.spacing
    }

    /// Slice being advanced. Informational only; propagators must not
    /// behave differently per slice.
    pub fn slice(&self) -> SliceIndex {
        self.slice
    }
}
