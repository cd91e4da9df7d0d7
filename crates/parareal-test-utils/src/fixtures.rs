//! Reusable propagator test fixtures.
//!
//! - [`ScalePropagator`]: multiplies every value by a fixed factor per step.
//! - [`FailingPropagator`]: behaves like a scale propagator, then fails
//!   deterministically after N calls.
//! - [`CountingPropagator`]: wraps another propagator and records
//!   lifecycle calls in a shared [`CallLog`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parareal_core::{FieldState, PropagatorError};
use parareal_propagator::{AdvanceContext, DiscretizationConfig, Propagator};

/// Multiplies the whole state by `factor` once per step.
///
/// Linear and exactly reproducible, so Parareal with it converges to the
/// sequential fine result up to rounding.
pub struct ScalePropagator {
    pub name: String,
    pub factor: f64,
}

impl ScalePropagator {
    pub fn new(name: impl Into<String>, factor: f64) -> Self {
        Self {
            name: name.into(),
            factor,
        }
    }

    /// A propagator whose steps are explicit Euler for `dq/dt = -rate q`:
    /// every step multiplies by `1 - rate * dt`.
    pub fn euler_decay(name: impl Into<String>, rate: f64, dt: f64) -> Self {
        Self::new(name, 1.0 - rate * dt)
    }
}

impl Propagator for ScalePropagator {
    fn name(&self) -> &str {
        &self.name
    }

    fn advance(&self, state: &mut FieldState, ctx: &AdvanceContext<'_>) -> Result<(), PropagatorError> {
        ctx.span().validate()?;
        let total = step_power(self.factor, ctx.span().steps);
        state.as_mut_slice().iter_mut().for_each(|v| *v *= total);
        Ok(())
    }
}

/// `factor` raised to `steps`, for every `u32` step count.
fn step_power(factor: f64, steps: u32) -> f64 {
    match i32::try_from(steps) {
        Ok(n) => factor.powi(n),
        Err(_) => factor.powf(f64::from(steps)),
    }
}

/// How a [`FailingPropagator`] misbehaves once its budget runs out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureMode {
    /// Return [`PropagatorError::ExecutionFailed`].
    Error,
    /// Succeed but write NaN into the first value.
    NaN,
    /// Fail in `setup()` instead of `advance()`.
    Setup,
}

/// Succeeds `succeed_count` times, then fails according to its
/// [`FailureMode`].
///
/// While succeeding it scales the state by `factor` per step. Uses
/// `AtomicUsize` for the call counter so concurrent workers can share it.
pub struct FailingPropagator {
    pub name: String,
    pub factor: f64,
    pub succeed_count: usize,
    pub mode: FailureMode,
    call_count: AtomicUsize,
}

impl FailingPropagator {
    /// Create a propagator that succeeds `succeed_count` times then fails.
    pub fn new(name: impl Into<String>, succeed_count: usize, mode: FailureMode) -> Self {
        Self {
            name: name.into(),
            factor: 1.0,
            succeed_count,
            mode,
            call_count: AtomicUsize::new(0),
        }
    }

    /// Scale by `factor` per step while succeeding.
    pub fn with_factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    /// How many times `advance()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Reset the call counter.
    pub fn reset(&self) {
        self.call_count.store(0, Ordering::Relaxed);
    }
}

impl Propagator for FailingPropagator {
    fn name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self, _config: &DiscretizationConfig) -> Result<(), PropagatorError> {
        if self.mode == FailureMode::Setup {
            return Err(PropagatorError::ExecutionFailed {
                reason: "deliberate setup failure".into(),
            });
        }
        Ok(())
    }

    fn advance(&self, state: &mut FieldState, ctx: &AdvanceContext<'_>) -> Result<(), PropagatorError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        let total = step_power(self.factor, ctx.span().steps);
        state.as_mut_slice().iter_mut().for_each(|v| *v *= total);
        if n < self.succeed_count {
            return Ok(());
        }
        match self.mode {
            FailureMode::Error => Err(PropagatorError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            }),
            FailureMode::NaN => {
                if let Some(v) = state.as_mut_slice().first_mut() {
                    *v = f64::NAN;
                }
                Ok(())
            }
            FailureMode::Setup => Ok(()),
        }
    }
}

/// Lifecycle counters shared between a [`CountingPropagator`] and the
/// test that handed it to an engine.
#[derive(Debug, Default)]
pub struct CallLog {
    setups: AtomicUsize,
    teardowns: AtomicUsize,
    advances: AtomicUsize,
}

impl CallLog {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn setups(&self) -> usize {
        self.setups.load(Ordering::SeqCst)
    }

    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }

    pub fn advances(&self) -> usize {
        self.advances.load(Ordering::SeqCst)
    }
}

/// Forwards to an inner propagator and records every call in a [`CallLog`].
pub struct CountingPropagator<P> {
    inner: P,
    log: Arc<CallLog>,
}

impl<P: Propagator> CountingPropagator<P> {
    pub fn new(inner: P, log: Arc<CallLog>) -> Self {
        Self { inner, log }
    }
}

impl<P: Propagator> Propagator for CountingPropagator<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn setup(&mut self, config: &DiscretizationConfig) -> Result<(), PropagatorError> {
        self.log.setups.fetch_add(1, Ordering::SeqCst);
        self.inner.setup(config)
    }

    fn teardown(&mut self) {
        self.log.teardowns.fetch_add(1, Ordering::SeqCst);
        self.inner.teardown();
    }

    fn advance(&self, state: &mut FieldState, ctx: &AdvanceContext<'_>) -> Result<(), PropagatorError> {
        self.log.advances.fetch_add(1, Ordering::SeqCst);
        self.inner.advance(state, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar_state;
    use parareal_core::{GridSpacing, SliceIndex};
    use parareal_propagator::StepSpan;

    fn ctx(spacing: &GridSpacing, steps: u32) -> AdvanceContext<'_> {
        AdvanceContext::new(StepSpan::new(0.0, 1.0, steps), spacing, SliceIndex(0))
    }

    #[test]
    fn scale_applies_factor_per_step() {
        let spacing = GridSpacing::default();
        let mut s = scalar_state(1.0);
        ScalePropagator::new("s", 0.5)
            .advance(&mut s, &ctx(&spacing, 3))
            .unwrap();
        assert_eq!(s.as_slice(), &[0.125]);
    }

    #[test]
    fn scale_is_exact_beyond_i32_step_counts() {
        let spacing = GridSpacing::default();
        for (factor, expected) in [(1.0, 1.0), (-1.0, -1.0), (0.5, 0.0)] {
            let mut s = scalar_state(1.0);
            ScalePropagator::new("s", factor)
                .advance(&mut s, &ctx(&spacing, u32::MAX))
                .unwrap();
            assert_eq!(s.as_slice(), &[expected], "factor {factor}");
        }

        let prop = FailingPropagator::new("f", 1, FailureMode::Error).with_factor(0.5);
        let mut s = scalar_state(1.0);
        prop.advance(&mut s, &ctx(&spacing, u32::MAX)).unwrap();
        assert_eq!(s.as_slice(), &[0.0]);
    }

    #[test]
    fn failing_errors_after_budget() {
        let spacing = GridSpacing::default();
        let prop = FailingPropagator::new("f", 1, FailureMode::Error);
        let mut s = scalar_state(1.0);
        assert!(prop.advance(&mut s, &ctx(&spacing, 1)).is_ok());
        assert!(matches!(
            prop.advance(&mut s, &ctx(&spacing, 1)),
            Err(PropagatorError::ExecutionFailed { .. })
        ));
        assert_eq!(prop.calls(), 2);
        prop.reset();
        assert_eq!(prop.calls(), 0);
    }

    #[test]
    fn failing_nan_mode_poisons_output() {
        let spacing = GridSpacing::default();
        let prop = FailingPropagator::new("f", 0, FailureMode::NaN);
        let mut s = scalar_state(1.0);
        prop.advance(&mut s, &ctx(&spacing, 1)).unwrap();
        assert!(s.as_slice()[0].is_nan());
    }

    #[test]
    fn counting_records_lifecycle() {
        let log = CallLog::new();
        let mut prop = CountingPropagator::new(ScalePropagator::new("s", 1.0), log.clone());
        let config = DiscretizationConfig::new(0.0, crate::scalar_shape(), 1);
        prop.setup(&config).unwrap();
        let spacing = GridSpacing::default();
        let mut s = scalar_state(1.0);
        prop.advance(&mut s, &ctx(&spacing, 1)).unwrap();
        prop.teardown();
        assert_eq!((log.setups(), log.advances(), log.teardowns()), (1, 1, 1));
        assert_eq!(prop.name(), "s");
    }
}
