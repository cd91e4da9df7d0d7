//! Pointwise linear decay `dq/dt = -rate * q`.
//!
//! The scalar test problem for Parareal: every value, halo included,
//! evolves independently, so the grid size only scales the work.

use parareal_core::{FieldState, GridSpacing, PropagatorError};
use parareal_propagator::{check_finite, AdvanceContext, Propagator};

use crate::integrator::{RightHandSide, TimeIntegrator};

/// Exponential decay at a fixed rate, integrated with a configurable
/// explicit scheme.
///
/// With [`TimeIntegrator::ExplicitEuler`] each step multiplies the state by
/// exactly `1 - rate * dt`.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearDecay {
    rate: f64,
    integrator: TimeIntegrator,
    check_output: bool,
}

impl LinearDecay {
    /// Decay at `rate` using explicit Euler.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `rate` is not finite.
    pub fn new(rate: f64) -> Result<Self, String> {
        if !rate.is_finite() {
            return Err(format!("rate must be finite, got {rate}"));
        }
        Ok(Self {
            rate,
            integrator: TimeIntegrator::ExplicitEuler,
            check_output: false,
        })
    }

    /// Use `integrator` instead of explicit Euler.
    pub fn with_integrator(mut self, integrator: TimeIntegrator) -> Self {
        self.integrator = integrator;
        self
    }

    /// Fail `advance()` with [`PropagatorError::NonFinite`] if the result
    /// contains NaN or infinity.
    pub fn with_output_check(mut self, enabled: bool) -> Self {
        self.check_output = enabled;
        self
    }

    /// Decay rate.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Time integrator in use.
    pub fn integrator(&self) -> TimeIntegrator {
        self.integrator
    }
}

impl RightHandSide for LinearDecay {
    fn evaluate(&self, state: &mut FieldState, out: &mut FieldState, _spacing: &GridSpacing) {
        for (o, &q) in out.as_mut_slice().iter_mut().zip(state.as_slice()) {
            *o = -self.rate * q;
        }
    }
}

impl Propagator for LinearDecay {
    fn name(&self) -> &str {
        "LinearDecay"
    }

    fn advance(&self, state: &mut FieldState, ctx: &AdvanceContext<'_>) -> Result<(), PropagatorError> {
        let span = ctx.span();
        span.validate()?;
        self.integrator
            .integrate(self, state, span.dt(), span.steps, ctx.spacing());
        if self.check_output {
            check_finite(state)?;
        }
        Ok(())
    }
}
