//! Constant-velocity advection-diffusion on a periodic 3-D grid.
//!
//! Solves `dq/dt + u . grad(q) = nu * lap(q)` with upwind-biased
//! first derivatives and second-order centred second derivatives. The
//! halo is refilled periodically before every right-hand-side evaluation.
//!
//! Constructed via the builder pattern: [`AdvectionDiffusion::builder`].

use parareal_core::{FieldState, GridShape, GridSpacing, Halo, PropagatorError};
use parareal_propagator::{check_shape, AdvanceContext, DiscretizationConfig, Propagator};
use smallvec::SmallVec;

use crate::grid_helpers::fill_periodic_halo;
use crate::integrator::{RightHandSide, TimeIntegrator};
use crate::stencil::{self, AdvectionOrder, Taps};

/// Flattened 3-D stencil: `(flat offset, weight)` across all axes.
type FlatTaps = SmallVec<[(isize, f64); 24]>;

/// Periodic advection-diffusion propagator.
///
/// Viscosity is taken from [`DiscretizationConfig::viscosity`] at
/// [`setup`](Propagator::setup) unless overridden on the builder, so a
/// coarse and a fine instance share the physics by default.
///
/// # Construction
///
/// ```
/// use parareal_propagators::{AdvectionDiffusion, AdvectionOrder, TimeIntegrator};
///
/// let fine = AdvectionDiffusion::builder()
///     .velocity([1.0, 0.5, 0.0])
///     .order(AdvectionOrder::Upwind3)
///     .integrator(TimeIntegrator::Rk3Ssp)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone, Debug)]
pub struct AdvectionDiffusion {
    velocity: [f64; 3],
    order: AdvectionOrder,
    integrator: TimeIntegrator,
    viscosity_override: Option<f64>,
    prepared: Option<Prepared>,
}

/// State fixed at setup.
#[derive(Clone, Copy, Debug)]
struct Prepared {
    shape: GridShape,
    viscosity: f64,
}

/// Builder for [`AdvectionDiffusion`].
///
/// Defaults: zero velocity, [`AdvectionOrder::Upwind3`],
/// [`TimeIntegrator::ExplicitEuler`], viscosity from setup.
#[derive(Clone, Debug, Default)]
pub struct AdvectionDiffusionBuilder {
    velocity: [f64; 3],
    order: AdvectionOrder,
    integrator: TimeIntegrator,
    viscosity: Option<f64>,
}

impl AdvectionDiffusion {
    /// Create a new builder.
    pub fn builder() -> AdvectionDiffusionBuilder {
        AdvectionDiffusionBuilder::default()
    }

    /// Advection velocity `[ux, uy, uz]`.
    pub fn velocity(&self) -> [f64; 3] {
        self.velocity
    }

    /// Upwind order used for advection.
    pub fn order(&self) -> AdvectionOrder {
        self.order
    }

    /// Time integrator in use.
    pub fn integrator(&self) -> TimeIntegrator {
        self.integrator
    }

    /// Viscosity in effect, once set up.
    pub fn viscosity(&self) -> Option<f64> {
        self.prepared.map(|p| p.viscosity)
    }

    /// Ghost cells this configuration reads on each side.
    ///
    /// Each axis with non-zero velocity contributes its upwind stencil;
    /// positive viscosity adds one cell on both sides.
    pub fn required_halo(&self, viscosity: f64) -> Halo {
        let mut halo = Halo::NONE;
        for &u in &self.velocity {
            if u != 0.0 {
                halo = stencil::union(halo, self.order.required_halo(u));
            }
        }
        if viscosity > 0.0 {
            halo = stencil::union(halo, stencil::halo_of(&stencil::laplacian_taps()));
        }
        halo
    }

    /// Largest step for which the explicit scheme is expected to be stable.
    ///
    /// A conservative combined advective/diffusive bound
    /// `1 / (sum |u|/h + 2 nu sum 1/h^2)`. `None` if the operator is zero
    /// or the propagator is not set up.
    pub fn max_stable_dt(&self, spacing: &GridSpacing) -> Option<f64> {
        let nu = self.viscosity()?;
        let h = spacing.as_array();
        let adv: f64 = self.velocity.iter().zip(&h).map(|(u, h)| u.abs() / h).sum();
        let diff: f64 = h.iter().map(|h| 2.0 * nu / (h * h)).sum();
        let rate = adv + diff;
        (rate > 0.0).then(|| 1.0 / rate)
    }

    /// Combine every axis into one flat stencil for `spacing`.
    fn flat_taps(&self, prepared: &Prepared, spacing: &GridSpacing) -> FlatTaps {
        let strides = prepared.shape.strides();
        let h = spacing.as_array();
        let laplacian = stencil::laplacian_taps();
        let mut flat = FlatTaps::new();

        for axis in 0..3 {
            let mut axis_taps = Taps::new();
            let u = self.velocity[axis];
            if u != 0.0 {
                // -u dq/dx
                for (o, w) in self.order.taps(u) {
                    axis_taps.push((o, -u * w / h[axis]));
                }
            }
            if prepared.viscosity > 0.0 {
                for &(o, w) in &laplacian {
                    axis_taps.push((o, prepared.viscosity * w / (h[axis] * h[axis])));
                }
            }
            for (o, w) in axis_taps {
                let offset = o * strides[axis] as isize;
                match flat.iter_mut().find(|(fo, _)| *fo == offset) {
                    Some((_, fw)) => *fw += w,
                    None => flat.push((offset, w)),
                }
            }
        }
        flat
    }
}

impl AdvectionDiffusionBuilder {
    /// Set the advection velocity (default zero).
    pub fn velocity(mut self, velocity: [f64; 3]) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set the upwind order (default [`AdvectionOrder::Upwind3`]).
    pub fn order(mut self, order: AdvectionOrder) -> Self {
        self.order = order;
        self
    }

    /// Set the time integrator (default explicit Euler).
    pub fn integrator(mut self, integrator: TimeIntegrator) -> Self {
        self.integrator = integrator;
        self
    }

    /// Use this viscosity instead of the one supplied at setup.
    pub fn viscosity(mut self, viscosity: f64) -> Self {
        self.viscosity = Some(viscosity);
        self
    }

    /// Build the propagator, validating all configuration.
    ///
    /// # Errors
    ///
    /// Returns `Err` if a velocity component is not finite, or an explicit
    /// viscosity is negative or not finite.
    pub fn build(self) -> Result<AdvectionDiffusion, String> {
        if let Some(u) = self.velocity.iter().find(|u| !u.is_finite()) {
            return Err(format!("velocity components must be finite, got {u}"));
        }
        if let Some(nu) = self.viscosity {
            validate_viscosity(nu)?;
        }
        Ok(AdvectionDiffusion {
            velocity: self.velocity,
            order: self.order,
            integrator: self.integrator,
            viscosity_override: self.viscosity,
            prepared: None,
        })
    }
}

fn validate_viscosity(nu: f64) -> Result<(), String> {
    if !(nu >= 0.0) || !nu.is_finite() {
        return Err(format!("viscosity must be finite and >= 0, got {nu}"));
    }
    Ok(())
}

/// The assembled operator for one `advance()` call.
struct StencilOperator<'a> {
    taps: &'a FlatTaps,
    shape: GridShape,
}

impl RightHandSide for StencilOperator<'_> {
    fn evaluate(&self, state: &mut FieldState, out: &mut FieldState, _spacing: &GridSpacing) {
        fill_periodic_halo(state);
        let shape = self.shape;
        let [nx, ny, nz] = shape.extents.as_array();
        let q = state.as_slice();
        let o = out.as_mut_slice();
        o.fill(0.0);
        for k in 0..nz as isize {
            for j in 0..ny as isize {
                let row = shape.index(0, j, k);
                for cell in row..row + nx {
                    o[cell] = self
                        .taps
                        .iter()
                        .map(|&(off, w)| w * q[(cell as isize + off) as usize])
                        .sum();
                }
            }
        }
    }
}

impl Propagator for AdvectionDiffusion {
    fn name(&self) -> &str {
        "AdvectionDiffusion"
    }

    fn setup(&mut self, config: &DiscretizationConfig) -> Result<(), PropagatorError> {
        let viscosity = self.viscosity_override.unwrap_or(config.viscosity);
        validate_viscosity(viscosity).map_err(|reason| PropagatorError::ExecutionFailed { reason })?;

        let required = self.required_halo(viscosity);
        let configured = config.shape.halo;
        if required.low > configured.low || required.high > configured.high {
            return Err(PropagatorError::IncompatibleHalo {
                required,
                configured,
            });
        }
        self.prepared = Some(Prepared {
            shape: config.shape,
            viscosity,
        });
        Ok(())
    }

    fn teardown(&mut self) {
        self.prepared = None;
    }

    fn advance(&self, state: &mut FieldState, ctx: &AdvanceContext<'_>) -> Result<(), PropagatorError> {
        let prepared = self
            .prepared
            .as_ref()
            .ok_or_else(|| PropagatorError::ExecutionFailed {
                reason: "advance called before setup".into(),
            })?;
        check_shape(prepared.shape, state)?;
        let span = ctx.span();
        span.validate()?;

        let taps = self.flat_taps(prepared, ctx.spacing());
        let op = StencilOperator {
            taps: &taps,
            shape: prepared.shape,
        };
        self.integrator
            .integrate(&op, state, span.dt(), span.steps, ctx.spacing());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parareal_core::{GridExtents, SliceIndex};
    use parareal_propagator::StepSpan;
    use std::f64::consts::PI;

    fn shape(n: usize) -> GridShape {
        GridShape::new(GridExtents::new(n, 1, 1))
    }

    fn setup(prop: &mut AdvectionDiffusion, shape: GridShape, nu: f64) {
        prop.setup(&DiscretizationConfig::new(nu, shape, 1)).unwrap();
    }

    fn sine(shape: GridShape) -> FieldState {
        let n = shape.extents.nx as f64;
        FieldState::from_interior_fn(shape, |i, _, _| (2.0 * PI * i as f64 / n).sin())
    }

    fn advance(prop: &AdvectionDiffusion, state: &mut FieldState, spacing: &GridSpacing, span: StepSpan) {
        prop.advance(state, &AdvanceContext::new(span, spacing, SliceIndex(0)))
            .unwrap();
    }

    // ---------------------------------------------------------------
    // Builder and setup
    // ---------------------------------------------------------------

    #[test]
    fn builder_defaults() {
        let prop = AdvectionDiffusion::builder().build().unwrap();
        assert_eq!(prop.name(), "AdvectionDiffusion");
        assert_eq!(prop.velocity(), [0.0; 3]);
        assert_eq!(prop.order(), AdvectionOrder::Upwind3);
        assert_eq!(prop.integrator(), TimeIntegrator::ExplicitEuler);
        assert_eq!(prop.viscosity(), None);
    }

    #[test]
    fn builder_rejects_bad_parameters() {
        assert!(AdvectionDiffusion::builder()
            .velocity([f64::NAN, 0.0, 0.0])
            .build()
            .is_err());
        assert!(AdvectionDiffusion::builder().viscosity(-1.0).build().is_err());
    }

    #[test]
    fn setup_takes_viscosity_from_config_unless_overridden() {
        let mut shared = AdvectionDiffusion::builder().build().unwrap();
        setup(&mut shared, shape(8), 0.25);
        assert_eq!(shared.viscosity(), Some(0.25));

        let mut own = AdvectionDiffusion::builder().viscosity(0.5).build().unwrap();
        setup(&mut own, shape(8), 0.25);
        assert_eq!(own.viscosity(), Some(0.5));

        own.teardown();
        assert_eq!(own.viscosity(), None);
    }

    #[test]
    fn setup_rejects_narrow_halo() {
        let mut prop = AdvectionDiffusion::builder()
            .velocity([1.0, 0.0, 0.0])
            .order(AdvectionOrder::Upwind5)
            .build()
            .unwrap();
        let err = prop
            .setup(&DiscretizationConfig::new(0.0, shape(8), 1))
            .unwrap_err();
        assert_eq!(
            err,
            PropagatorError::IncompatibleHalo {
                required: Halo::new(3, 2),
                configured: Halo::default(),
            }
        );
    }

    #[test]
    fn fifth_order_fits_default_halo_for_negative_velocity() {
        let mut prop = AdvectionDiffusion::builder()
            .velocity([-1.0, 0.0, 0.0])
            .order(AdvectionOrder::Upwind5)
            .build()
            .unwrap();
        setup(&mut prop, shape(8), 0.1);
    }

    #[test]
    fn advance_before_setup_fails() {
        let prop = AdvectionDiffusion::builder().build().unwrap();
        let mut s = FieldState::zeroed(shape(4));
        let spacing = GridSpacing::default();
        let err = prop
            .advance(&mut s, &AdvanceContext::new(StepSpan::new(0.0, 1.0, 1), &spacing, SliceIndex(0)))
            .unwrap_err();
        assert!(matches!(err, PropagatorError::ExecutionFailed { .. }));
    }

    #[test]
    fn advance_rejects_wrong_shape() {
        let mut prop = AdvectionDiffusion::builder().build().unwrap();
        setup(&mut prop, shape(4), 0.0);
        let mut s = FieldState::zeroed(shape(5));
        let spacing = GridSpacing::default();
        let err = prop
            .advance(&mut s, &AdvanceContext::new(StepSpan::new(0.0, 1.0, 1), &spacing, SliceIndex(0)))
            .unwrap_err();
        assert!(matches!(err, PropagatorError::ShapeMismatch { .. }));
    }

    // ---------------------------------------------------------------
    // Physics
    // ---------------------------------------------------------------

    #[test]
    fn constant_field_is_steady() {
        let s3 = GridShape::new(GridExtents::new(4, 3, 5));
        let mut prop = AdvectionDiffusion::builder()
            .velocity([1.0, -0.5, 0.25])
            .integrator(TimeIntegrator::Rk3Ssp)
            .build()
            .unwrap();
        setup(&mut prop, s3, 0.1);
        let mut s = FieldState::zeroed(s3);
        s.fill_interior(2.5);
        advance(&prop, &mut s, &GridSpacing::unit_cube(s3.extents), StepSpan::new(0.0, 0.01, 10));
        assert!(s.interior().iter().all(|&v| (v - 2.5).abs() < 1e-12));
    }

    #[test]
    fn diffusion_damps_sine_at_analytic_rate() {
        let n = 32;
        let sh = shape(n);
        let spacing = GridSpacing::new(1.0 / n as f64, 1.0, 1.0);
        let nu = 0.01;
        let mut prop = AdvectionDiffusion::builder()
            .integrator(TimeIntegrator::Rk3Ssp)
            .build()
            .unwrap();
        setup(&mut prop, sh, nu);

        let mut s = sine(sh);
        let t = 0.5;
        advance(&prop, &mut s, &spacing, StepSpan::new(0.0, t, 200));

        let expected = (-nu * 4.0 * PI * PI * t).exp();
        let peak = s.interior().iter().cloned().fold(0.0, f64::max);
        assert!((peak - expected).abs() < 5e-3, "peak {peak} vs {expected}");
    }

    #[test]
    fn advection_translates_profile_one_period() {
        let n = 32;
        let sh = shape(n);
        let spacing = GridSpacing::new(1.0 / n as f64, 1.0, 1.0);
        let mut prop = AdvectionDiffusion::builder()
            .velocity([1.0, 0.0, 0.0])
            .order(AdvectionOrder::Upwind3)
            .integrator(TimeIntegrator::Rk3Ssp)
            .build()
            .unwrap();
        setup(&mut prop, sh, 0.0);

        let initial = sine(sh);
        let mut s = initial.clone();
        // One full period returns the profile to where it started.
        advance(&prop, &mut s, &spacing, StepSpan::new(0.0, 1.0, 320));
        assert!(s.max_interior_diff(&initial) < 0.05);
    }

    #[test]
    fn higher_order_is_less_dissipative() {
        let n = 16;
        let sh = shape(n);
        let spacing = GridSpacing::new(1.0 / n as f64, 1.0, 1.0);
        let initial = sine(sh);
        let mut errors = Vec::new();
        for order in [AdvectionOrder::Upwind1, AdvectionOrder::Upwind3] {
            let mut prop = AdvectionDiffusion::builder()
                .velocity([1.0, 0.0, 0.0])
                .order(order)
                .integrator(TimeIntegrator::Rk3Ssp)
                .build()
                .unwrap();
            setup(&mut prop, sh, 0.0);
            let mut s = initial.clone();
            advance(&prop, &mut s, &spacing, StepSpan::new(0.0, 1.0, 160));
            errors.push(s.max_interior_diff(&initial));
        }
        assert!(errors[1] < errors[0], "{errors:?}");
    }

    #[test]
    fn max_stable_dt_combines_rates() {
        let mut prop = AdvectionDiffusion::builder()
            .velocity([2.0, 0.0, 0.0])
            .build()
            .unwrap();
        let spacing = GridSpacing::uniform(0.5);
        assert_eq!(prop.max_stable_dt(&spacing), None);
        setup(&mut prop, shape(4), 0.0);
        assert_eq!(prop.max_stable_dt(&spacing), Some(0.25));
    }
}
