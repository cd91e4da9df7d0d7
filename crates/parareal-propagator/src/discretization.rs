//! Setup parameters handed to propagators once per engine lifetime.

use parareal_core::GridShape;

/// Spatial-discretization parameters passed to [`Propagator::setup`].
///
/// Stencil widths live in `shape.halo` rather than in the propagators,
/// so the same propagator type can run with different discretization
/// orders.
///
/// [`Propagator::setup`]: crate::Propagator::setup
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DiscretizationConfig {
    /// Diffusion coefficient (kinematic viscosity).
    pub viscosity: f64,
    /// Grid layout, including the halo available to stencils.
    pub shape: GridShape,
    /// Number of workers that will call `advance()` concurrently.
    pub worker_count: usize,
}

impl DiscretizationConfig {
    /// Create a setup config.
    pub fn new(viscosity: f64, shape: GridShape, worker_count: usize) -> Self {
        Self {
            viscosity,
            shape,
            worker_count,
        }
    }
}
