//! Reference propagators for the Parareal framework.
//!
//! Provides concrete coarse/fine collaborators for testing, benchmarking,
//! and demos:
//!
//! - [`LinearDecay`]: pointwise `dq/dt = -rate * q`, the scalar test ODE.
//! - [`AdvectionDiffusion`]: periodic 3-D advection with upwind stencils of
//!   configurable order plus second-order centred diffusion.
//!
//! Both integrate with any [`TimeIntegrator`]; a typical Parareal pair
//! uses explicit Euler with few steps as G and SSP-RK3 with many steps
//! as F.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod advection_diffusion;
mod grid_helpers;
pub mod integrator;
pub mod linear_decay;
pub mod stencil;

pub use advection_diffusion::{AdvectionDiffusion, AdvectionDiffusionBuilder};
pub use integrator::TimeIntegrator;
pub use linear_decay::LinearDecay;
pub use stencil::AdvectionOrder;
