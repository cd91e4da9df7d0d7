//! Explicit time integrators shared by the reference propagators.
//!
//! An integrator repeatedly evaluates a right-hand side `L(q)` and
//! combines stages. Stage buffers are allocated once per `advance()` call
//! and reused across steps; nothing is shared between concurrent calls.

use parareal_core::{FieldState, GridSpacing};

/// Semi-discrete right-hand side `dq/dt = L(q)`.
pub(crate) trait RightHandSide {
    /// Write `L(state)` into `out`.
    ///
    /// `state` is mutable so stencil operators can refresh the halo first.
    /// Entries of `out` outside the cells the operator updates must be
    /// written as zero.
    fn evaluate(&self, state: &mut FieldState, out: &mut FieldState, spacing: &GridSpacing);
}

/// Explicit single-step scheme used to march a state across a span.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TimeIntegrator {
    /// First-order forward Euler. One RHS evaluation per step.
    #[default]
    ExplicitEuler,
    /// Third-order strong-stability-preserving Runge-Kutta (Shu-Osher).
    /// Three RHS evaluations per step.
    Rk3Ssp,
}

impl TimeIntegrator {
    /// Formal order of accuracy.
    pub fn order(&self) -> u32 {
        match self {
            Self::ExplicitEuler => 1,
            Self::Rk3Ssp => 3,
        }
    }

    /// RHS evaluations per step, a proxy for cost.
    pub fn stages(&self) -> u32 {
        match self {
            Self::ExplicitEuler => 1,
            Self::Rk3Ssp => 3,
        }
    }

    /// Take `steps` steps of size `dt` in place.
    pub(crate) fn integrate(
        &self,
        rhs: &impl RightHandSide,
        state: &mut FieldState,
        dt: f64,
        steps: u32,
        spacing: &GridSpacing,
    ) {
        let mut k = FieldState::zeroed(state.shape());
        match self {
            Self::ExplicitEuler => {
                for _ in 0..steps {
                    rhs.evaluate(state, &mut k, spacing);
                    axpy(state.as_mut_slice(), dt, k.as_slice());
                }
            }
            Self::Rk3Ssp => {
                let mut stage = state.clone();
                for _ in 0..steps {
                    // u1 = u + dt L(u)
                    rhs.evaluate(state, &mut k, spacing);
                    stage.copy_from(state);
                    axpy(stage.as_mut_slice(), dt, k.as_slice());

                    // u2 = 3/4 u + 1/4 (u1 + dt L(u1))
                    rhs.evaluate(&mut stage, &mut k, spacing);
                    for ((s, &u), &kv) in stage
                        .as_mut_slice()
                        .iter_mut()
                        .zip(state.as_slice())
                        .zip(k.as_slice())
                    {
                        *s = 0.75 * u + 0.25 * (*s + dt * kv);
                    }

                    // u = 1/3 u + 2/3 (u2 + dt L(u2))
                    rhs.evaluate(&mut stage, &mut k, spacing);
                    for ((u, &s), &kv) in state
                        .as_mut_slice()
                        .iter_mut()
                        .zip(stage.as_slice())
                        .zip(k.as_slice())
                    {
                        *u = (1.0 / 3.0) * *u + (2.0 / 3.0) * (s + dt * kv);
                    }
                }
            }
        }
    }
}

/// `y += a * x`
fn axpy(y: &mut [f64], a: f64, x: &[f64]) {
    for (yv, &xv) in y.iter_mut().zip(x) {
        *yv += a * xv;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parareal_core::{GridExtents, GridShape, Halo};

    /// dq/dt = -q
    struct Decay;

    impl RightHandSide for Decay {
        fn evaluate(&self, state: &mut FieldState, out: &mut FieldState, _spacing: &GridSpacing) {
            for (o, &q) in out.as_mut_slice().iter_mut().zip(state.as_slice()) {
                *o = -q;
            }
        }
    }

    fn unit_state() -> FieldState {
        let shape = GridShape::with_halo(GridExtents::new(1, 1, 1), Halo::NONE);
        let mut s = FieldState::zeroed(shape);
        s.fill_interior(1.0);
        s
    }

    #[test]
    fn euler_matches_closed_form_product() {
        let mut s = unit_state();
        TimeIntegrator::ExplicitEuler.integrate(&Decay, &mut s, 0.1, 10, &GridSpacing::default());
        let expected = 0.9f64.powi(10);
        assert!((s.as_slice()[0] - expected).abs() < 1e-14);
    }

    #[test]
    fn rk3_single_step_matches_taylor_polynomial() {
        // For a linear problem SSP-RK3 reproduces 1 - h + h^2/2 - h^3/6.
        let h = 0.2;
        let mut s = unit_state();
        TimeIntegrator::Rk3Ssp.integrate(&Decay, &mut s, h, 1, &GridSpacing::default());
        let expected = 1.0 - h + h * h / 2.0 - h * h * h / 6.0;
        assert!((s.as_slice()[0] - expected).abs() < 1e-14);
    }

    #[test]
    fn rk3_is_more_accurate_than_euler() {
        let exact = (-1.0f64).exp();
        let mut e = unit_state();
        let mut r = unit_state();
        TimeIntegrator::ExplicitEuler.integrate(&Decay, &mut e, 0.05, 20, &GridSpacing::default());
        TimeIntegrator::Rk3Ssp.integrate(&Decay, &mut r, 0.05, 20, &GridSpacing::default());
        let err_e = (e.as_slice()[0] - exact).abs();
        let err_r = (r.as_slice()[0] - exact).abs();
        assert!(err_r < err_e / 100.0, "rk3 {err_r} vs euler {err_e}");
    }

    #[test]
    fn order_and_stages() {
        assert_eq!(TimeIntegrator::ExplicitEuler.order(), 1);
        assert_eq!(TimeIntegrator::Rk3Ssp.order(), 3);
        assert_eq!(TimeIntegrator::Rk3Ssp.stages(), 3);
        assert_eq!(TimeIntegrator::default(), TimeIntegrator::ExplicitEuler);
    }
}
