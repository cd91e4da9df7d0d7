//! Core types and errors for the Parareal framework.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the workspace: grid
//! geometry, the halo-padded [`FieldState`] buffer, strongly-typed
//! identifiers, and the propagator error type.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod grid;
pub mod id;

pub use error::PropagatorError;
pub use field::FieldState;
pub use grid::{GridExtents, GridShape, GridSpacing, Halo};
pub use id::{RunId, SliceIndex};
