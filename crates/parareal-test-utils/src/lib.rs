//! Test utilities and fixture propagators for Parareal development.
//!
//! Provides deterministic field generators and the propagator fixtures in
//! [`fixtures`] for engine and propagator tests.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{CallLog, CountingPropagator, FailingPropagator, FailureMode, ScalePropagator};

use parareal_core::{FieldState, GridExtents, GridShape, Halo};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// A single-cell shape with no halo, for scalar ODE tests.
pub fn scalar_shape() -> GridShape {
    GridShape::with_halo(GridExtents::new(1, 1, 1), Halo::NONE)
}

/// A single-cell state holding `value`.
pub fn scalar_state(value: f64) -> FieldState {
    let mut state = FieldState::zeroed(scalar_shape());
    state.fill_interior(value);
    state
}

/// Interior filled with uniform samples in `[-1, 1)` from a seeded
/// ChaCha8 stream; halo left at zero.
///
/// The same `(shape, seed)` always produces the same field.
pub fn random_field(shape: GridShape, seed: u64) -> FieldState {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    FieldState::from_interior_fn(shape, |_, _, _| 2.0 * unit_sample(&mut rng) - 1.0)
}

/// Uniform sample in `[0, 1)` with 53 bits of precision.
fn unit_sample(rng: &mut ChaCha8Rng) -> f64 {
    (rng.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}
