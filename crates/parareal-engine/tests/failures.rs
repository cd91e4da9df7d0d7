//! Integration tests: validation, propagator failures, and poisoning.
//!
//! Validation errors must leave the engine untouched and usable; a failing
//! or non-finite propagation must abort the run, name the phase and slice,
//! and poison the engine for later runs.

use std::sync::atomic::{AtomicUsize, Ordering};

use parareal_core::{FieldState, GridExtents, GridShape, Halo, PropagatorError, SliceIndex};
use parareal_engine::{EngineConfig, EngineError, PararealEngine, Phase, RunOptions, RunParameters};
use parareal_propagator::{AdvanceContext, Propagator};
use parareal_propagators::{AdvectionDiffusion, AdvectionOrder};
use parareal_test_utils::{scalar_state, FailingPropagator, FailureMode, ScalePropagator};

fn scalar_config(workers: usize) -> EngineConfig {
    EngineConfig::new(workers, GridExtents::new(1, 1, 1)).with_halo(Halo::NONE)
}

fn engine_with(workers: usize, coarse: FailingPropagator, fine: FailingPropagator) -> PararealEngine {
    PararealEngine::new(scalar_config(workers), Box::new(coarse), Box::new(fine)).unwrap()
}

fn healthy(name: &str) -> FailingPropagator {
    FailingPropagator::new(name, usize::MAX, FailureMode::Error).with_factor(0.9)
}

fn params(workers: usize, iterations: u32) -> RunParameters {
    RunParameters::new(1.0, 4, 1, iterations, workers)
}

/// Replaces the state with a 2x1x1 buffer from call `from_call` onward,
/// optionally only on one slice. Other calls leave the state unchanged.
struct Reshaping {
    calls: AtomicUsize,
    from_call: usize,
    slice: Option<usize>,
}

impl Reshaping {
    fn new(from_call: usize, slice: Option<usize>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            from_call,
            slice,
        }
    }
}

impl Propagator for Reshaping {
    fn name(&self) -> &str {
        "reshaping"
    }

    fn advance(&self, state: &mut FieldState, ctx: &AdvanceContext<'_>) -> Result<(), PropagatorError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call >= self.from_call && self.slice.map_or(true, |s| ctx.slice().get() == s) {
            *state = FieldState::zeroed(GridShape::with_halo(GridExtents::new(2, 1, 1), Halo::NONE));
        }
        Ok(())
    }
}

fn is_shape_mismatch(err: &EngineError, want_phase: Phase, want_slice: usize) -> bool {
    matches!(
        err,
        EngineError::PropagatorFailure {
            phase,
            slice: Some(slice),
            reason: PropagatorError::ShapeMismatch { .. },
            ..
        } if *phase == want_phase && slice.get() == want_slice
    )
}

// ── Construction ───────────────────────────────────────────────────

#[test]
fn zero_workers_rejected() {
    let result = PararealEngine::new(
        scalar_config(0),
        Box::new(ScalePropagator::new("g", 0.5)),
        Box::new(ScalePropagator::new("f", 0.9)),
    );
    assert!(matches!(
        result,
        Err(EngineError::InvalidDimension { what: "worker_count", value: 0 })
    ));
}

#[test]
fn zero_extent_rejected() {
    let config = EngineConfig::new(2, GridExtents::new(4, 0, 4));
    let result = PararealEngine::new(
        config,
        Box::new(ScalePropagator::new("g", 0.5)),
        Box::new(ScalePropagator::new("f", 0.9)),
    );
    assert!(matches!(result, Err(EngineError::InvalidDimension { what: "ny", .. })));
}

#[test]
fn setup_failure_names_the_propagator() {
    let result = PararealEngine::new(
        scalar_config(2),
        Box::new(healthy("coarse")),
        Box::new(FailingPropagator::new("fine", 0, FailureMode::Setup)),
    );
    match result {
        Err(EngineError::PropagatorFailure {
            phase: Phase::Setup,
            slice: None,
            propagator,
            ..
        }) => assert_eq!(propagator, "fine"),
        other => panic!("expected setup failure, got {:?}", other.err()),
    }
}

#[test]
fn halo_too_narrow_for_stencil_is_a_setup_failure() {
    let config = EngineConfig::new(2, GridExtents::new(4, 4, 4)).with_halo(Halo::new(1, 1));
    let fine = AdvectionDiffusion::builder()
        .velocity([1.0, 0.0, 0.0])
        .order(AdvectionOrder::Upwind5)
        .build()
        .unwrap();
    let result = PararealEngine::new(config, Box::new(ScalePropagator::new("g", 1.0)), Box::new(fine));
    assert!(matches!(
        result,
        Err(EngineError::PropagatorFailure {
            phase: Phase::Setup,
            reason: PropagatorError::IncompatibleHalo { .. },
            ..
        })
    ));
}

// ── Run validation ─────────────────────────────────────────────────

#[test]
fn worker_count_mismatch_rejected_and_engine_stays_usable() {
    let mut engine = engine_with(4, healthy("g"), healthy("f"));
    let err = engine
        .run(&scalar_state(1.0), &params(3, 1), &RunOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::WorkerCountMismatch { configured: 4, requested: 3 }
    ));
    assert!(!engine.is_poisoned());
    assert!(engine.run(&scalar_state(1.0), &params(4, 1), &RunOptions::default()).is_ok());
}

#[test]
fn invalid_parameters_leave_buffers_untouched() {
    let mut engine = engine_with(2, healthy("g"), healthy("f"));
    engine
        .run(&scalar_state(1.0), &params(2, 1), &RunOptions::default())
        .unwrap();
    let before: Vec<f64> = engine.slice_end_states().map(|s| s.as_slice()[0]).collect();

    let bad = [
        RunParameters { t_end: 0.0, ..params(2, 1) },
        RunParameters { t_end: f64::NAN, ..params(2, 1) },
        RunParameters { fine_steps: 0, ..params(2, 1) },
        RunParameters { coarse_steps: 0, ..params(2, 1) },
    ];
    for p in &bad {
        let err = engine.run(&scalar_state(7.0), p, &RunOptions::default()).unwrap_err();
        assert!(!err.is_fatal(), "{err}");
    }
    let wrong_shape = FieldState::zeroed(GridShape::new(GridExtents::new(2, 1, 1)));
    assert!(matches!(
        engine.run(&wrong_shape, &params(2, 1), &RunOptions::default()),
        Err(EngineError::StateShapeMismatch { .. })
    ));

    let after: Vec<f64> = engine.slice_end_states().map(|s| s.as_slice()[0]).collect();
    assert_eq!(before, after);
    assert!(!engine.is_poisoned());
}

// ── Propagation failures ───────────────────────────────────────────

#[test]
fn fine_failure_reports_lowest_slice_and_poisons() {
    let mut engine = engine_with(
        4,
        healthy("coarse"),
        FailingPropagator::new("fine", 0, FailureMode::Error),
    );
    let err = engine
        .run(&scalar_state(1.0), &params(4, 2), &RunOptions::default())
        .unwrap_err();
    match &err {
        EngineError::PropagatorFailure {
            phase: Phase::Fine,
            slice: Some(slice),
            propagator,
            reason: PropagatorError::ExecutionFailed { .. },
        } => {
            assert_eq!(*slice, SliceIndex(0));
            assert_eq!(propagator, "fine");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.is_fatal());
    assert!(engine.is_poisoned());
    assert!(matches!(
        engine.run(&scalar_state(1.0), &params(4, 2), &RunOptions::default()),
        Err(EngineError::Poisoned)
    ));
    assert!(engine.last_timers().is_none());
}

#[test]
fn coarse_failure_in_predictor_names_the_slice() {
    let mut engine = engine_with(
        4,
        FailingPropagator::new("coarse", 2, FailureMode::Error).with_factor(0.5),
        healthy("fine"),
    );
    let err = engine
        .run(&scalar_state(1.0), &params(4, 1), &RunOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::PropagatorFailure {
            phase: Phase::Predictor,
            slice: Some(SliceIndex(2)),
            ..
        }
    ));
}

#[test]
fn coarse_failure_in_correction_is_reported_as_correction() {
    // Predictor uses 3 coarse calls; the fourth is the first correction call.
    let mut engine = engine_with(
        3,
        FailingPropagator::new("coarse", 3, FailureMode::Error).with_factor(0.5),
        healthy("fine"),
    );
    let err = engine
        .run(&scalar_state(1.0), &params(3, 1), &RunOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::PropagatorFailure {
            phase: Phase::Correction,
            slice: Some(SliceIndex(0)),
            ..
        }
    ));
    assert!(engine.is_poisoned());
}

#[test]
fn nan_from_fine_propagator_caught_by_sentinel() {
    let mut engine = engine_with(2, healthy("coarse"), FailingPropagator::new("fine", 0, FailureMode::NaN));
    let err = engine
        .run(&scalar_state(1.0), &params(2, 1), &RunOptions::default())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::PropagatorFailure {
            phase: Phase::Fine,
            reason: PropagatorError::NonFinite { .. },
            ..
        }
    ));
}

#[test]
fn nan_passes_through_when_sentinel_disabled() {
    let config = scalar_config(2).with_nan_sentinel(false);
    let mut engine = PararealEngine::new(
        config,
        Box::new(healthy("coarse")),
        Box::new(FailingPropagator::new("fine", 0, FailureMode::NaN)),
    )
    .unwrap();
    let out = engine
        .run(&scalar_state(1.0), &params(2, 1), &RunOptions::default())
        .unwrap();
    assert!(out.solution.as_slice()[0].is_nan());
    assert!(!engine.is_poisoned());
}

#[test]
fn reference_failure_does_not_poison() {
    let engine = engine_with(2, healthy("coarse"), FailingPropagator::new("fine", 0, FailureMode::Error));
    let err = engine
        .sequential_fine(&scalar_state(1.0), &params(2, 1))
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::PropagatorFailure {
            phase: Phase::Reference,
            ..
        }
    ));
    assert!(!engine.is_poisoned());
}

#[test]
fn fine_propagator_changing_shape_on_one_slice_fails_the_run() {
    let mut engine = PararealEngine::new(
        scalar_config(2),
        Box::new(ScalePropagator::new("coarse", 0.5)),
        Box::new(Reshaping::new(0, Some(1))),
    )
    .unwrap();
    let err = engine
        .run(&scalar_state(1.0), &params(2, 1), &RunOptions::default())
        .unwrap_err();
    assert!(is_shape_mismatch(&err, Phase::Fine, 1), "{err}");
    assert!(engine.is_poisoned());
    // Both workers survived and answer the shutdown.
    assert_eq!(engine.teardown().workers_joined, 2);
}

#[test]
fn coarse_propagator_changing_shape_in_predictor_fails_the_run() {
    let mut engine = PararealEngine::new(
        scalar_config(3),
        Box::new(Reshaping::new(0, Some(1))),
        Box::new(ScalePropagator::new("fine", 0.9)),
    )
    .unwrap();
    let err = engine
        .run(&scalar_state(1.0), &params(3, 1), &RunOptions::default())
        .unwrap_err();
    assert!(is_shape_mismatch(&err, Phase::Predictor, 1), "{err}");
    assert!(engine.is_poisoned());
}

#[test]
fn coarse_propagator_changing_shape_in_correction_fails_the_run() {
    // Predictor uses 3 coarse calls; the fourth is the first correction call.
    let mut engine = PararealEngine::new(
        scalar_config(3),
        Box::new(Reshaping::new(3, None)),
        Box::new(ScalePropagator::new("fine", 0.9)),
    )
    .unwrap();
    let err = engine
        .run(&scalar_state(1.0), &params(3, 1), &RunOptions::default())
        .unwrap_err();
    assert!(is_shape_mismatch(&err, Phase::Correction, 0), "{err}");
    assert!(engine.is_poisoned());
}

#[test]
fn fine_propagator_changing_shape_in_reference_is_reported() {
    let engine = PararealEngine::new(
        scalar_config(2),
        Box::new(ScalePropagator::new("coarse", 0.5)),
        Box::new(Reshaping::new(0, Some(1))),
    )
    .unwrap();
    let err = engine
        .sequential_fine(&scalar_state(1.0), &params(2, 1))
        .unwrap_err();
    assert!(is_shape_mismatch(&err, Phase::Reference, 1), "{err}");
}
