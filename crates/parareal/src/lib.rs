//! Parareal: parallel-in-time integration for 3-D stencil simulations.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Parareal sub-crates. For most users, adding `parareal` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use parareal::prelude::*;
//!
//! // Exact solution operator for dy/dt = -y, used as both G and F.
//! struct Decay;
//! impl Propagator for Decay {
//!     fn name(&self) -> &str { "decay" }
//!     fn advance(&self, state: &mut FieldState, ctx: &AdvanceContext<'_>) -> Result<(), PropagatorError> {
//!         let factor = (-ctx.span().duration()).exp();
//!         state.as_mut_slice().iter_mut().for_each(|v| *v *= factor);
//!         Ok(())
//!     }
//! }
//!
//! let config = EngineConfig::new(4, GridExtents::new(2, 2, 2)).with_halo(Halo::NONE);
//! let mut engine = PararealEngine::new(config, Box::new(Decay), Box::new(Decay)).unwrap();
//!
//! let mut y0 = FieldState::zeroed(config.shape);
//! y0.fill_interior(1.0);
//! let params = RunParameters::new(1.0, 10, 1, 1, 4);
//! let out = engine.run(&y0, &params, &RunOptions::default()).unwrap();
//! assert!((out.solution.interior()[0] - (-1.0f64).exp()).abs() < 1e-12);
//! engine.teardown();
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `parareal-core` | Grid layout, `FieldState`, IDs, `PropagatorError` |
//! | [`arena`] | `parareal-arena` | Per-slice buffer pool |
//! | [`propagator`] | `parareal-propagator` | `Propagator` trait and advance context |
//! | [`propagators`] | `parareal-propagators` | Reference propagators (linear decay, advection-diffusion) |
//! | [`engine`] | `parareal-engine` | The iteration engine, partitioning, timers, diagnostics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`parareal-core`).
///
/// Grid extents, halo and spacing, the halo-padded [`types::FieldState`],
/// and the [`types::PropagatorError`] taxonomy.
pub use parareal_core as types;

/// Per-slice buffer storage (`parareal-arena`).
///
/// The engine owns its pool; use this module directly only to size or
/// inspect buffers with [`arena::PoolConfig`].
pub use parareal_arena as arena;

/// Propagator trait (`parareal-propagator`).
///
/// [`propagator::Propagator`] is the extension point for coarse and fine
/// time integrators.
pub use parareal_propagator as propagator;

/// Reference propagator implementations (`parareal-propagators`).
///
/// Includes [`propagators::LinearDecay`] and
/// [`propagators::AdvectionDiffusion`].
pub use parareal_propagators as propagators;

/// The Parareal iteration engine (`parareal-engine`).
pub use parareal_engine as engine;

/// Common imports for typical Parareal usage.
///
/// ```rust
/// use parareal::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use parareal_core::{FieldState, GridExtents, GridShape, GridSpacing, Halo, PropagatorError, RunId};

    // Propagator
    pub use parareal_propagator::{AdvanceContext, DiscretizationConfig, Propagator, StepSpan};

    // Reference propagators
    pub use parareal_propagators::{AdvectionDiffusion, AdvectionOrder, LinearDecay, TimeIntegrator};

    // Engine
    pub use parareal_engine::{
        DiagnosticsSink, EngineConfig, EngineError, FileSink, MemorySink, PararealEngine, RunOptions, RunOutput,
        RunParameters, TimerRecord,
    };
}
