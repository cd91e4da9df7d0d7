//! Propagator trait and advance context for Parareal.
//!
//! A [`Propagator`] is a black-box, deterministic, in-place time
//! integrator over a halo-padded [`FieldState`](parareal_core::FieldState).
//! The engine holds two of them: a cheap coarse one (G) and an expensive
//! fine one (F). Both are set up once per engine with a
//! [`DiscretizationConfig`] and torn down when the engine is dropped.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod discretization;
pub mod guard;
pub mod propagator;

pub use context::{AdvanceContext, StepSpan};
pub use discretization::DiscretizationConfig;
pub use guard::{check_finite, check_shape};
pub use propagator::Propagator;
