//! Benchmark profiles and utilities for the Parareal engine.
//!
//! Provides pre-built [`Profile`]s for benchmarking and examples:
//!
//! - [`decay_profile`]: the scalar test ODE `dy/dt = -y` on `[0, 1]`
//! - [`reference_profile`]: 32x32x32 grid (~33K cells) advection-diffusion
//! - [`stress_profile`]: 64x64x64 grid (~262K cells) for stress testing
//! - [`gaussian_pulse`]: smooth periodic initial condition

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use parareal_core::{FieldState, GridExtents, GridShape, GridSpacing, Halo};
use parareal_engine::{EngineConfig, EngineError, PararealEngine, RunParameters};
use parareal_propagator::Propagator;
use parareal_propagators::{AdvectionDiffusion, AdvectionOrder, LinearDecay, TimeIntegrator};

/// Advection velocity used by the grid profiles.
pub const VELOCITY: [f64; 3] = [1.0, 0.5, -0.25];

/// Diffusion coefficient used by the grid profiles.
pub const VISCOSITY: f64 = 0.005;

/// Fraction of the explicit stability limit the coarse step uses.
const COARSE_CFL: f64 = 0.8;

/// Fine steps per coarse step.
const REFINEMENT: u32 = 10;

/// A ready-to-run problem: engine configuration, run parameters, initial
/// condition, and the coarse/fine propagator pair.
pub struct Profile {
    /// Short name for reports.
    pub name: &'static str,
    /// Engine configuration.
    pub config: EngineConfig,
    /// Run parameters with `iterations == worker_count`.
    pub params: RunParameters,
    /// Initial condition.
    pub initial: FieldState,
    /// Cheap propagator G.
    pub coarse: Box<dyn Propagator>,
    /// Accurate propagator F.
    pub fine: Box<dyn Propagator>,
}

impl Profile {
    /// Build the engine, returning it together with the initial condition
    /// and run parameters.
    pub fn into_engine(self) -> Result<(PararealEngine, FieldState, RunParameters), EngineError> {
        let engine = PararealEngine::new(self.config, self.coarse, self.fine)?;
        Ok((engine, self.initial, self.params))
    }
}

/// Scalar decay: `y(0) = 1`, rate 1, `t_end = 1`, one explicit Euler
/// coarse step and 100 fine steps per slice.
pub fn decay_profile(workers: usize) -> Result<Profile, String> {
    let shape = GridShape::with_halo(GridExtents::new(1, 1, 1), Halo::NONE);
    let mut initial = FieldState::zeroed(shape);
    initial.fill_interior(1.0);
    Ok(Profile {
        name: "decay",
        config: EngineConfig::new(workers, shape.extents).with_halo(Halo::NONE),
        params: RunParameters::new(1.0, 100, 1, workers as u32, workers),
        initial,
        coarse: Box::new(LinearDecay::new(1.0)?),
        fine: Box::new(LinearDecay::new(1.0)?.with_integrator(TimeIntegrator::Rk3Ssp)),
    })
}

/// Build a reference benchmark profile: 32x32x32 grid over the unit cube.
///
/// Coarse: first-order upwind with explicit Euler at 80% of its stability
/// limit. Fine: third-order upwind with SSP-RK3 at ten times the steps.
/// `t_end = 0.25`.
pub fn reference_profile(workers: usize) -> Result<Profile, String> {
    advection_profile("reference", 32, workers, 0.25)
}

/// Build a stress benchmark profile: 64x64x64 grid.
///
/// Same pair as [`reference_profile`] at eight times the cell count.
pub fn stress_profile(workers: usize) -> Result<Profile, String> {
    advection_profile("stress", 64, workers, 0.125)
}

fn advection_profile(name: &'static str, n: usize, workers: usize, t_end: f64) -> Result<Profile, String> {
    let extents = GridExtents::new(n, n, n);
    let shape = GridShape::new(extents);
    let spacing = GridSpacing::unit_cube(extents);
    let coarse_steps = coarse_steps_for(t_end / workers.max(1) as f64, &spacing);

    Ok(Profile {
        name,
        config: EngineConfig::new(workers, extents).with_viscosity(VISCOSITY),
        params: RunParameters::new(t_end, coarse_steps * REFINEMENT, coarse_steps, workers as u32, workers)
            .with_spacing(spacing),
        initial: gaussian_pulse(shape, &spacing, 0.1),
        coarse: Box::new(
            AdvectionDiffusion::builder()
                .velocity(VELOCITY)
                .order(AdvectionOrder::Upwind1)
                .integrator(TimeIntegrator::ExplicitEuler)
                .build()?,
        ),
        fine: Box::new(
            AdvectionDiffusion::builder()
                .velocity(VELOCITY)
                .order(AdvectionOrder::Upwind3)
                .integrator(TimeIntegrator::Rk3Ssp)
                .build()?,
        ),
    })
}

/// Smallest coarse step count keeping explicit Euler with first-order
/// upwinding inside its stability limit over `duration`.
fn coarse_steps_for(duration: f64, spacing: &GridSpacing) -> u32 {
    let h = spacing.as_array();
    let rate: f64 = VELOCITY.iter().zip(&h).map(|(u, h)| u.abs() / h).sum::<f64>()
        + h.iter().map(|h| 2.0 * VISCOSITY / (h * h)).sum::<f64>();
    let dt_max = COARSE_CFL / rate;
    ((duration / dt_max).ceil() as u32).max(1)
}

/// A Gaussian bump of standard deviation `width` centred in the domain.
///
/// Distances wrap around the periodic boundaries, so the field is smooth
/// across them.
pub fn gaussian_pulse(shape: GridShape, spacing: &GridSpacing, width: f64) -> FieldState {
    let n = shape.extents.as_array();
    let h = spacing.as_array();
    let periodic_offset = |idx: usize, axis: usize| {
        let len = n[axis] as f64 * h[axis];
        let x = (idx as f64 + 0.5) * h[axis] - 0.5 * len;
        x - len * (x / len).round()
    };
    FieldState::from_interior_fn(shape, |i, j, k| {
        let r2 = periodic_offset(i, 0).powi(2) + periodic_offset(j, 1).powi(2) + periodic_offset(k, 2).powi(2);
        (-r2 / (2.0 * width * width)).exp()
    })
}
