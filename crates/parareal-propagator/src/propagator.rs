//! The [`Propagator`] trait.
//!
//! Propagators are deterministic, in-place time integrators. The engine
//! calls the coarse propagator sequentially on the coordinator thread and
//! the fine propagator concurrently from every worker, so implementations
//! take `&self` in `advance()` and keep per-call scratch on the stack or
//! in local allocations.

use parareal_core::{FieldState, PropagatorError};

use crate::context::AdvanceContext;
use crate::discretization::DiscretizationConfig;

/// A black-box state transformer advancing a field over a time span.
///
/// # Contract
///
/// - `advance()` MUST be deterministic: the same input state and context
///   produce a bit-identical output state.
/// - `advance()` mutates `state` in place, halo included. The engine never
///   interprets halo contents.
/// - `setup()` is called exactly once before any `advance()`, and
///   `teardown()` exactly once after the last one.
///
/// # Examples
///
/// A propagator that scales the state by `(1 + rate * dt)` each step:
///
/// ```
/// use parareal_core::{FieldState, GridExtents, GridShape, GridSpacing, Halo, PropagatorError, SliceIndex};
/// use parareal_propagator::{AdvanceContext, Propagator, StepSpan};
///
/// struct Growth {
///     rate: f64,
/// }
///
/// impl Propagator for Growth {
///     fn name(&self) -> &str { "growth" }
///
///     fn advance(&self, state: &mut FieldState, ctx: &AdvanceContext<'_>) -> Result<(), PropagatorError> {
///         let factor = 1.0 + self.rate * ctx.dt();
///         for _ in 0..ctx.span().steps {
///             state.as_mut_slice().iter_mut().for_each(|v| *v *= factor);
///         }
///         Ok(())
///     }
/// }
///
/// let shape = GridShape::with_halo(GridExtents::new(1, 1, 1), Halo::NONE);
/// let mut state = FieldState::zeroed(shape);
/// state.fill_interior(1.0);
/// let spacing = GridSpacing::default();
/// let ctx = AdvanceContext::new(StepSpan::new(0.0, 1.0, 2), &spacing, SliceIndex(0));
/// Growth { rate: 1.0 }.advance(&mut state, &ctx).unwrap();
/// assert_eq!(state.as_slice(), &[2.25]);
/// ```
pub trait Propagator: Send + Sync + 'static {
    /// Human-readable name for error reporting and logging.
    fn name(&self) -> &str;

    /// Acquire spatial-discretization resources.
    ///
    /// Called once per engine lifetime, before any run. Implementations
    /// should reject a halo too narrow for their stencil with
    /// [`PropagatorError::IncompatibleHalo`].
    ///
    /// Default: accept any configuration.
    fn setup(&mut self, config: &DiscretizationConfig) -> Result<(), PropagatorError> {
        let _ = config;
        Ok(())
    }

    /// Release resources acquired in [`setup`](Self::setup).
    ///
    /// Default: nothing to release.
    fn teardown(&mut self) {}

    /// Advance `state` from `ctx.span().t_start` to `ctx.span().t_end`
    /// using `ctx.span().steps` equal steps.
    fn advance(&self, state: &mut FieldState, ctx: &AdvanceContext<'_>) -> Result<(), PropagatorError>;
}
