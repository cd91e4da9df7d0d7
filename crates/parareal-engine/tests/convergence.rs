//! Integration tests: numerical behaviour of complete Parareal runs.
//!
//! Covers the algebraic guarantees of the iteration (coarse trajectory at
//! zero passes, exact fine result after `W` passes), the scalar decay
//! scenario, determinism, and a full 3-D advection-diffusion run.

use parareal_core::{FieldState, GridExtents, GridShape, GridSpacing, Halo};
use parareal_engine::{EngineConfig, PararealEngine, RunOptions, RunParameters};
use parareal_propagator::Propagator;
use parareal_propagators::{AdvectionDiffusion, AdvectionOrder, LinearDecay, TimeIntegrator};
use parareal_test_utils::{random_field, scalar_state, ScalePropagator};
use proptest::prelude::*;

fn scalar_config(workers: usize) -> EngineConfig {
    EngineConfig::new(workers, GridExtents::new(1, 1, 1)).with_halo(Halo::NONE)
}

fn scale_engine(workers: usize, coarse: f64, fine: f64) -> PararealEngine {
    PararealEngine::new(
        scalar_config(workers),
        Box::new(ScalePropagator::new("coarse", coarse)),
        Box::new(ScalePropagator::new("fine", fine)),
    )
    .unwrap()
}

fn decay_engine(workers: usize) -> PararealEngine {
    PararealEngine::new(
        scalar_config(workers),
        Box::new(LinearDecay::new(1.0).unwrap()),
        Box::new(LinearDecay::new(1.0).unwrap()),
    )
    .unwrap()
}

fn value(state: &FieldState) -> f64 {
    state.as_slice()[0]
}

fn rel_err(a: f64, b: f64) -> f64 {
    (a - b).abs() / b.abs().max(f64::MIN_POSITIVE)
}

// ── Scalar decay scenario ──────────────────────────────────────────

#[test]
fn decay_over_four_slices_reaches_fine_solution() {
    let mut engine = decay_engine(4);
    let params = RunParameters::new(1.0, 100, 1, 4, 4);
    let out = engine
        .run(&scalar_state(1.0), &params, &RunOptions::default())
        .unwrap();

    let fine_exact = (1.0f64 - 0.0025).powi(400);
    assert!(rel_err(value(&out.solution), fine_exact) < 1e-12);
    assert!((value(&out.solution) - (-1.0f64).exp()).abs() < 1e-3);
    assert_eq!(out.iterations, 4);
    engine.teardown();
}

#[test]
fn euler_factor_fixtures_reproduce_the_decay_scenario() {
    // Same scenario with the Euler step factors written out: coarse
    // dt = 0.25, fine dt = 0.0025.
    let fixture_engine = |iterations: u32| {
        let mut engine = PararealEngine::new(
            scalar_config(4),
            Box::new(ScalePropagator::euler_decay("coarse", 1.0, 0.25)),
            Box::new(ScalePropagator::euler_decay("fine", 1.0, 0.0025)),
        )
        .unwrap();
        let out = engine
            .run(&scalar_state(1.0), &RunParameters::new(1.0, 100, 1, iterations, 4), &RunOptions::default())
            .unwrap();
        value(&out.solution)
    };

    assert!(rel_err(fixture_engine(0), 0.75f64.powi(4)) < 1e-15);

    let converged = fixture_engine(4);
    assert!(rel_err(converged, (1.0f64 - 0.0025).powi(400)) < 1e-12);

    let mut decay = decay_engine(4);
    let reference = decay
        .run(&scalar_state(1.0), &RunParameters::new(1.0, 100, 1, 4, 4), &RunOptions::default())
        .unwrap();
    assert!((converged - value(&reference.solution)).abs() < 1e-12);
}

#[test]
fn four_workers_match_one_worker_with_all_fine_steps() {
    let mut parallel = decay_engine(4);
    let par = parallel
        .run(&scalar_state(1.0), &RunParameters::new(1.0, 100, 1, 4, 4), &RunOptions::default())
        .unwrap();

    let mut single = decay_engine(1);
    let seq = single
        .run(&scalar_state(1.0), &RunParameters::new(1.0, 400, 1, 1, 1), &RunOptions::default())
        .unwrap();

    assert!((value(&par.solution) - value(&seq.solution)).abs() < 1e-12);
}

// ── Algebraic properties ───────────────────────────────────────────

#[test]
fn zero_iterations_return_the_coarse_trajectory() {
    let mut engine = scale_engine(4, 0.5, 0.9);
    let out = engine
        .run(&scalar_state(3.0), &RunParameters::new(2.0, 10, 1, 0, 4), &RunOptions::default())
        .unwrap();

    let ends: Vec<f64> = engine.slice_end_states().map(value).collect();
    assert_eq!(ends, vec![1.5, 0.75, 0.375, 0.1875]);
    assert_eq!(value(&out.solution), 0.1875);
    assert_eq!(out.iterations, 0);
    assert_eq!(out.timers.fine_max(), std::time::Duration::ZERO);
}

#[test]
fn worker_count_iterations_reproduce_sequential_fine() {
    let mut engine = scale_engine(5, 0.8, 0.97);
    let params = RunParameters::new(1.0, 7, 2, 5, 5);
    let y0 = scalar_state(1.25);

    let out = engine.run(&y0, &params, &RunOptions::default()).unwrap();
    let reference = engine.sequential_fine(&y0, &params).unwrap();

    assert!(rel_err(value(&out.solution), value(&reference)) < 1e-13);
    // Every slice, not just the last, has converged.
    let mut expected = 1.25;
    for end in engine.slice_end_states() {
        expected *= 0.97f64.powi(7);
        assert!(rel_err(value(end), expected) < 1e-13);
    }
}

#[test]
fn iteration_k_is_exact_on_the_first_k_slices() {
    let mut engine = scale_engine(6, 0.5, 0.95);
    let params = RunParameters::new(1.0, 4, 1, 2, 6);
    engine
        .run(&scalar_state(1.0), &params, &RunOptions::default())
        .unwrap();

    let ends: Vec<f64> = engine.slice_end_states().map(value).collect();
    let f = 0.95f64.powi(4);
    assert!(rel_err(ends[0], f) < 1e-14);
    assert!(rel_err(ends[1], f * f) < 1e-14);
    // Slice 2 has not converged yet with a coarse factor this far off.
    assert!(rel_err(ends[2], f * f * f) > 1e-3);
}

#[test]
fn single_worker_is_one_fine_pass() {
    let mut engine = scale_engine(1, 0.5, 0.99);
    let out = engine
        .run(&scalar_state(2.0), &RunParameters::new(1.0, 10, 1, 1, 1), &RunOptions::default())
        .unwrap();
    assert!(rel_err(value(&out.solution), 2.0 * 0.99f64.powi(10)) < 1e-15);
}

#[test]
fn repeated_runs_are_bit_identical() {
    let mut engine = scale_engine(4, 0.6, 0.93);
    let params = RunParameters::new(1.0, 9, 3, 2, 4);
    let y0 = scalar_state(1.0);
    let a = engine.run(&y0, &params, &RunOptions::default()).unwrap();
    let b = engine.run(&y0, &params, &RunOptions::default()).unwrap();
    assert_eq!(a.solution.as_slice(), b.solution.as_slice());
    assert_ne!(a.run_id, b.run_id);
}

#[test]
fn runs_do_not_leak_state_between_initial_conditions() {
    let mut engine = scale_engine(3, 0.7, 0.9);
    let params = RunParameters::new(1.0, 5, 1, 1, 3);
    let first = engine.run(&scalar_state(10.0), &params, &RunOptions::default()).unwrap();
    let second = engine.run(&scalar_state(1.0), &params, &RunOptions::default()).unwrap();
    assert!(rel_err(value(&first.solution), 10.0 * value(&second.solution)) < 1e-13);
}

#[test]
fn caller_state_is_not_modified() {
    let mut engine = scale_engine(2, 0.5, 0.9);
    let y0 = scalar_state(4.0);
    engine
        .run(&y0, &RunParameters::new(1.0, 3, 1, 2, 2), &RunOptions::default())
        .unwrap();
    assert_eq!(value(&y0), 4.0);
}

// ── 3-D advection-diffusion ────────────────────────────────────────

fn advection(order: AdvectionOrder, integrator: TimeIntegrator) -> Box<dyn Propagator> {
    Box::new(
        AdvectionDiffusion::builder()
            .velocity([1.0, 0.5, -0.25])
            .order(order)
            .integrator(integrator)
            .build()
            .unwrap(),
    )
}

#[test]
fn advection_diffusion_converges_to_sequential_fine() {
    let extents = GridExtents::new(8, 8, 8);
    let config = EngineConfig::new(4, extents).with_viscosity(0.01);
    let mut engine = PararealEngine::new(
        config,
        advection(AdvectionOrder::Upwind1, TimeIntegrator::ExplicitEuler),
        advection(AdvectionOrder::Upwind3, TimeIntegrator::Rk3Ssp),
    )
    .unwrap();

    let spacing = GridSpacing::unit_cube(extents);
    let params = RunParameters::new(0.2, 20, 2, 4, 4).with_spacing(spacing);
    let y0 = random_field(GridShape::new(extents), 11);

    let coarse_only = engine
        .run(&y0, &RunParameters { iterations: 0, ..params }, &RunOptions::default())
        .unwrap();
    let refined = engine.run(&y0, &params, &RunOptions::default()).unwrap();
    let reference = engine.sequential_fine(&y0, &params).unwrap();

    assert!(refined.solution.max_interior_diff(&reference) < 1e-10);
    assert!(coarse_only.solution.max_interior_diff(&reference) > 1e-6);
    assert!(refined.solution.first_non_finite().is_none());
}

// ── Properties ─────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn full_iteration_matches_fine_for_any_linear_pair(
        workers in 1usize..6,
        coarse in 0.1f64..1.2,
        fine in 0.5f64..1.0,
        fine_steps in 1u32..8,
        y0 in -5.0f64..5.0,
    ) {
        let mut engine = scale_engine(workers, coarse, fine);
        let params = RunParameters::new(1.0, fine_steps, 1, workers as u32, workers);
        let out = engine.run(&scalar_state(y0), &params, &RunOptions::default()).unwrap();
        let expected = y0 * fine.powi(fine_steps as i32 * workers as i32);
        prop_assert!((value(&out.solution) - expected).abs() <= 1e-12 * (1.0 + y0.abs()));
    }
}
