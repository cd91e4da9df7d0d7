//! The Parareal iteration engine.
//!
//! [`PararealEngine`] owns the slice buffer pool, the worker threads, and
//! both propagators. Its lifecycle is `new` → `run`* → `teardown` (or
//! drop). Each run executes a sequential coarse predictor pass followed
//! by a fixed number of correction passes, each a parallel fine phase
//! joined by an explicit barrier and then a sequential coarse correction.

use std::sync::Arc;
use std::time::Instant;

use parareal_arena::SliceBufferPool;
use parareal_core::{FieldState, GridSpacing, RunId, SliceIndex};
use parareal_propagator::{check_finite, check_shape, AdvanceContext, DiscretizationConfig, Propagator, StepSpan};
use tracing::{debug, error, info, warn};

use crate::config::{EngineConfig, RunOptions, RunParameters};
use crate::diagnostics::{DiagnosticsSink, SnapshotKey, WorkerTiming};
use crate::error::{EngineError, Phase};
use crate::metrics::{timed, TimerRecord};
use crate::partition::{partition, TimeSlice};
use crate::worker::WorkerPool;

/// Result of a successful [`PararealEngine::run`].
#[derive(Debug)]
pub struct RunOutput {
    /// Identifier used in logs and diagnostics output.
    pub run_id: RunId,
    /// End state of the last slice: the solution at `t_end`.
    pub solution: FieldState,
    /// Correction passes performed.
    pub iterations: u32,
    /// Wall-clock timers for the run.
    pub timers: TimerRecord,
    /// Diagnostics output failure, if output was requested and failed.
    /// Never affects `solution`.
    pub persistence_error: Option<EngineError>,
}

/// Summary returned by [`PararealEngine::teardown`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TeardownReport {
    /// Workers the engine was built with.
    pub worker_count: usize,
    /// Workers that exited cleanly.
    pub workers_joined: usize,
}

/// Bookkeeping from the most recent successful run, kept for [`emit`].
///
/// [`emit`]: PararealEngine::emit
#[derive(Clone, Debug)]
struct CompletedRun {
    run_id: RunId,
    iterations: u32,
    timers: TimerRecord,
}

/// Parallel-in-time engine over a fixed pool of `W` workers.
///
/// Slice `i` and its three buffers (`q`, `gq`, `qend`) belong to worker
/// `i` for the engine's lifetime. The coarse propagator runs on the
/// calling thread; the fine propagator is shared by all workers.
///
/// # Examples
///
/// ```
/// use parareal_core::{FieldState, GridExtents, Halo};
/// use parareal_engine::{EngineConfig, PararealEngine, RunOptions, RunParameters};
/// use parareal_propagators::LinearDecay;
///
/// let config = EngineConfig::new(4, GridExtents::new(1, 1, 1)).with_halo(Halo::NONE);
/// let coarse = Box::new(LinearDecay::new(1.0).unwrap());
/// let fine = Box::new(LinearDecay::new(1.0).unwrap());
/// let mut engine = PararealEngine::new(config, coarse, fine).unwrap();
///
/// let mut y0 = FieldState::zeroed(config.shape);
/// y0.fill_interior(1.0);
/// let params = RunParameters::new(1.0, 100, 1, 4, 4);
/// let out = engine.run(&y0, &params, &RunOptions::default()).unwrap();
/// assert!((out.solution.as_slice()[0] - (-1.0f64).exp()).abs() < 1e-3);
/// engine.teardown();
/// ```
pub struct PararealEngine {
    config: EngineConfig,
    coarse: Box<dyn Propagator>,
    fine: Arc<dyn Propagator>,
    pool: SliceBufferPool,
    workers: WorkerPool,
    /// Engine-owned copy of the current run's initial condition.
    initial: FieldState,
    sink: Option<Box<dyn DiagnosticsSink>>,
    last_run: Option<CompletedRun>,
    poisoned: bool,
    shut_down: bool,
}

impl PararealEngine {
    /// Validate `config`, set up both propagators, spawn the workers, and
    /// have each worker allocate its own slot.
    ///
    /// # Errors
    ///
    /// Configuration errors, [`EngineError::PropagatorFailure`] with
    /// [`Phase::Setup`] if a propagator rejects the discretization,
    /// [`EngineError::ThreadSpawnFailed`], or
    /// [`EngineError::AllocationFailure`]. Anything already set up is torn
    /// down again before returning.
    pub fn new(
        config: EngineConfig,
        mut coarse: Box<dyn Propagator>,
        mut fine: Box<dyn Propagator>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let discretization = config.discretization();
        setup(&mut *coarse, &discretization)?;
        if let Err(e) = setup(&mut *fine, &discretization) {
            coarse.teardown();
            return Err(e);
        }

        let mut fine: Arc<dyn Propagator> = Arc::from(fine);
        let (workers, pool) = match start_workers(&config, &fine) {
            Ok(started) => started,
            Err(e) => {
                // Workers are joined by now, so the Arc is unique again.
                if let Some(f) = Arc::get_mut(&mut fine) {
                    f.teardown();
                }
                coarse.teardown();
                return Err(e);
            }
        };

        info!(
            workers = config.worker_count,
            extents = ?config.shape.extents.as_array(),
            halo = ?(config.shape.halo.low, config.shape.halo.high),
            coarse = coarse.name(),
            fine = fine.name(),
            memory_bytes = pool.memory_bytes(),
            "parareal engine initialized"
        );

        Ok(Self {
            initial: FieldState::zeroed(config.shape),
            config,
            coarse,
            fine,
            pool,
            workers,
            sink: None,
            last_run: None,
            poisoned: false,
            shut_down: false,
        })
    }

    /// Construction-time configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of workers (and time slices).
    pub fn worker_count(&self) -> usize {
        self.config.worker_count
    }

    /// Returns `true` after a fatal run failure.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Bytes held by the slice buffers.
    pub fn memory_bytes(&self) -> usize {
        self.pool.memory_bytes()
    }

    /// Timers from the most recent successful run.
    pub fn last_timers(&self) -> Option<&TimerRecord> {
        self.last_run.as_ref().map(|r| &r.timers)
    }

    /// Install the destination for [`emit`](Self::emit), returning the
    /// previous one.
    pub fn set_sink(&mut self, sink: impl DiagnosticsSink + 'static) -> Option<Box<dyn DiagnosticsSink>> {
        self.sink.replace(Box::new(sink))
    }

    /// End-of-slice estimates `qend[0..W]` from the most recent run, in
    /// slice order. After a zero-iteration run this is the coarse
    /// trajectory. Contents are unspecified after a failed run.
    pub fn slice_end_states(&self) -> impl Iterator<Item = &FieldState> {
        self.pool.slice_end_states()
    }

    /// Run Parareal from `initial` over `[0, params.t_end]`.
    ///
    /// `initial` is copied into the engine; the caller keeps ownership.
    /// Returns the last slice's end state. When `options.emit_output` is
    /// set, per-worker output goes to the installed sink afterwards; a
    /// sink failure is logged and returned in
    /// [`RunOutput::persistence_error`] without failing the run.
    ///
    /// # Errors
    ///
    /// Validation errors ([`EngineError::InvalidParameter`],
    /// [`EngineError::InvalidDimension`],
    /// [`EngineError::WorkerCountMismatch`],
    /// [`EngineError::StateShapeMismatch`]) are returned before any buffer
    /// is modified. [`EngineError::PropagatorFailure`] and
    /// [`EngineError::WorkerLost`] abort the run and poison the engine;
    /// later runs return [`EngineError::Poisoned`].
    pub fn run(
        &mut self,
        initial: &FieldState,
        params: &RunParameters,
        options: &RunOptions,
    ) -> Result<RunOutput, EngineError> {
        if self.poisoned || self.shut_down {
            return Err(EngineError::Poisoned);
        }
        let slices = self.validate_run(initial, params)?;
        let run_id = options.run_id.unwrap_or_else(RunId::next);
        info!(
            %run_id,
            workers = self.config.worker_count,
            t_end = params.t_end,
            fine_steps = params.fine_steps,
            coarse_steps = params.coarse_steps,
            iterations = params.iterations,
            "run started"
        );

        let timers = match self.iterate(initial, params, &slices, options) {
            Ok(timers) => timers,
            Err(e) => {
                self.poisoned = true;
                self.last_run = None;
                error!(%run_id, error = %e, "run aborted");
                return Err(e);
            }
        };
        info!(%run_id, %timers, "run finished");

        let solution = self.pool.slot(self.config.worker_count - 1).qend.clone();
        self.last_run = Some(CompletedRun {
            run_id,
            iterations: params.iterations,
            timers: timers.clone(),
        });
        let persistence_error = if options.emit_output {
            self.emit().err()
        } else {
            None
        };

        Ok(RunOutput {
            run_id,
            solution,
            iterations: params.iterations,
            timers,
            persistence_error,
        })
    }

    /// Integrate the fine propagator over `[0, params.t_end]` on the
    /// calling thread, slice by slice, with `W * fine_steps` steps in
    /// total. Touches no engine buffers.
    ///
    /// This is the sequential reference a converged Parareal run
    /// reproduces, and the baseline for speedup measurements.
    ///
    /// # Errors
    ///
    /// The same validation errors as [`run`](Self::run), or
    /// [`EngineError::PropagatorFailure`] with [`Phase::Reference`].
    /// Failures here do not poison the engine.
    pub fn sequential_fine(&self, initial: &FieldState, params: &RunParameters) -> Result<FieldState, EngineError> {
        if self.shut_down {
            return Err(EngineError::Poisoned);
        }
        let slices = self.validate_run(initial, params)?;
        let mut state = initial.clone();
        for slice in &slices {
            advance_checked(
                &*self.fine,
                &mut state,
                slice.fine_span(),
                slice.index,
                &params.spacing,
                Phase::Reference,
                self.config.nan_sentinel,
            )?;
        }
        Ok(state)
    }

    /// Write every worker's end-of-slice interior and timings from the
    /// most recent successful run to the installed sink.
    ///
    /// Does nothing if no sink is installed or no run has completed.
    ///
    /// # Errors
    ///
    /// [`EngineError::PersistenceFailure`] on the first sink error, which
    /// is also logged at `warn`.
    pub fn emit(&mut self) -> Result<(), EngineError> {
        let Some(run) = self.last_run.as_ref() else {
            debug!("no completed run to emit");
            return Ok(());
        };
        let Some(sink) = self.sink.as_mut() else {
            debug!(run_id = %run.run_id, "no diagnostics sink installed");
            return Ok(());
        };

        let worker_count = self.config.worker_count;
        for (worker, qend) in self.pool.slice_end_states().enumerate() {
            let key = SnapshotKey {
                iterations: run.iterations,
                worker,
                worker_count,
            };
            let timing = WorkerTiming {
                total: run.timers.total,
                fine: run.timers.fine.get(worker).copied().unwrap_or_default(),
                coarse: run.timers.coarse,
                handoff: run.timers.handoff,
            };
            if let Err(e) = sink.emit(run.run_id, key, &qend.interior(), &timing) {
                warn!(run_id = %run.run_id, worker, error = %e, "diagnostics output failed");
                return Err(EngineError::PersistenceFailure(e));
            }
        }
        debug!(run_id = %run.run_id, workers = worker_count, "diagnostics emitted");
        Ok(())
    }

    /// Join the workers, tear down both propagators, and free the slice
    /// buffers.
    pub fn teardown(mut self) -> TeardownReport {
        self.shutdown()
    }

    fn shutdown(&mut self) -> TeardownReport {
        let worker_count = self.config.worker_count;
        if self.shut_down {
            return TeardownReport {
                worker_count,
                workers_joined: 0,
            };
        }
        self.shut_down = true;

        let workers_joined = self.workers.shutdown();
        match Arc::get_mut(&mut self.fine) {
            Some(fine) => fine.teardown(),
            None => warn!("fine propagator still shared after worker shutdown; teardown skipped"),
        }
        self.coarse.teardown();
        drop(self.pool.take_slots());

        info!(workers_joined, worker_count, "parareal engine torn down");
        TeardownReport {
            worker_count,
            workers_joined,
        }
    }

    /// Checks shared by `run` and `sequential_fine`. Touches no buffers.
    fn validate_run(&self, initial: &FieldState, params: &RunParameters) -> Result<Vec<TimeSlice>, EngineError> {
        params.validate()?;
        if params.worker_count != self.config.worker_count {
            return Err(EngineError::WorkerCountMismatch {
                configured: self.config.worker_count,
                requested: params.worker_count,
            });
        }
        if initial.shape() != self.config.shape {
            return Err(EngineError::StateShapeMismatch {
                expected: self.config.shape,
                found: initial.shape(),
            });
        }
        partition(params.t_end, params.worker_count, params.fine_steps, params.coarse_steps)
    }

    /// Predictor pass plus `params.iterations` correction passes.
    fn iterate(
        &mut self,
        initial: &FieldState,
        params: &RunParameters,
        slices: &[TimeSlice],
        options: &RunOptions,
    ) -> Result<TimerRecord, EngineError> {
        let w = self.config.worker_count;
        let sentinel = self.config.nan_sentinel;
        let spacing = params.spacing;
        let start = Instant::now();
        let mut timers = TimerRecord::new(w);

        timed(&mut timers.handoff, || {
            self.initial.copy_from(initial);
            self.pool.slot_mut(0).q.copy_from(initial);
        });

        // Predictor: GQ[i] = G(Q[i]), Q[i+1] = GQ[i], Qend[i] = GQ[i].
        for slice in slices {
            let i = slice.index.get();
            timed(&mut timers.handoff, || {
                let s = self.pool.slot_mut(i);
                s.gq.copy_from(&s.q);
            });
            timed(&mut timers.coarse, || {
                advance_checked(
                    &*self.coarse,
                    &mut self.pool.slot_mut(i).gq,
                    slice.coarse_span(),
                    slice.index,
                    &spacing,
                    Phase::Predictor,
                    sentinel,
                )
            })?;
            timed(&mut timers.handoff, || {
                let s = self.pool.slot_mut(i);
                s.qend.copy_from(&s.gq);
                if i + 1 < w {
                    let (cur, next) = self.pool.adjacent_mut(i);
                    next.q.copy_from(&cur.gq);
                }
            });
        }
        debug!(workers = w, "predictor pass complete");

        let fine_spans: Vec<StepSpan> = slices.iter().map(TimeSlice::fine_span).collect();
        for k in 1..=params.iterations {
            let pass_start = Instant::now();

            // Parallel fine phase: Q[i] = F(Q[i]), Qend[i] = Q[i] - GQ[i].
            let slots = timed(&mut timers.handoff, || self.pool.take_slots());
            let fine_pass = self.workers.run_fine(slots, &fine_spans, spacing, sentinel)?;
            timed(&mut timers.handoff, || self.pool.restore_slots(fine_pass.slots))?;
            for (acc, dt) in timers.fine.iter_mut().zip(&fine_pass.elapsed) {
                *acc += *dt;
            }
            if let Some((worker, reason)) = fine_pass.failure {
                return Err(EngineError::PropagatorFailure {
                    phase: Phase::Fine,
                    slice: Some(SliceIndex(worker)),
                    propagator: self.fine.name().to_string(),
                    reason,
                });
            }

            // Sequential correction: Qend[i] = G(Q[i]) + Qend[i], Q[i+1] = Qend[i].
            timed(&mut timers.handoff, || self.pool.slot_mut(0).q.copy_from(&self.initial));
            for slice in slices {
                let i = slice.index.get();
                timed(&mut timers.handoff, || {
                    let s = self.pool.slot_mut(i);
                    s.gq.copy_from(&s.q);
                });
                timed(&mut timers.coarse, || {
                    let s = self.pool.slot_mut(i);
                    advance_checked(
                        &*self.coarse,
                        &mut s.gq,
                        slice.coarse_span(),
                        slice.index,
                        &spacing,
                        Phase::Correction,
                        sentinel,
                    )?;
                    s.qend.add_onto(&s.gq);
                    Ok::<(), EngineError>(())
                })?;
                if i + 1 < w {
                    timed(&mut timers.handoff, || {
                        let (cur, next) = self.pool.adjacent_mut(i);
                        next.q.copy_from(&cur.qend);
                    });
                }
            }

            let fine_max = fine_pass.elapsed.iter().max().copied().unwrap_or_default();
            if options.verbose {
                info!(iteration = k, of = params.iterations, ?fine_max, elapsed = ?pass_start.elapsed(), "correction pass complete");
            } else {
                debug!(iteration = k, of = params.iterations, ?fine_max, elapsed = ?pass_start.elapsed(), "correction pass complete");
            }
        }

        timers.total = start.elapsed();
        Ok(timers)
    }
}

impl Drop for PararealEngine {
    fn drop(&mut self) {
        if !self.shut_down {
            self.shutdown();
        }
    }
}

/// Call `Propagator::setup`, tagging failures with [`Phase::Setup`].
fn setup(prop: &mut dyn Propagator, config: &DiscretizationConfig) -> Result<(), EngineError> {
    prop.setup(config).map_err(|reason| EngineError::PropagatorFailure {
        phase: Phase::Setup,
        slice: None,
        propagator: prop.name().to_string(),
        reason,
    })
}

/// Spawn the workers and build the pool from the slots they allocate.
fn start_workers(
    config: &EngineConfig,
    fine: &Arc<dyn Propagator>,
) -> Result<(WorkerPool, SliceBufferPool), EngineError> {
    let workers = WorkerPool::spawn(config.worker_count, fine)?;
    let slots = workers.allocate_slots(config.shape)?;
    let pool = SliceBufferPool::from_slots(config.pool_config(), slots)?;
    Ok((workers, pool))
}

/// Advance `state` over `span`, then check it kept its shape and run the
/// finite-value sentinel.
fn advance_checked(
    prop: &dyn Propagator,
    state: &mut FieldState,
    span: StepSpan,
    slice: SliceIndex,
    spacing: &GridSpacing,
    phase: Phase,
    sentinel: bool,
) -> Result<(), EngineError> {
    let ctx = AdvanceContext::new(span, spacing, slice);
    let expected = state.shape();
    prop.advance(state, &ctx)
        .and_then(|()| check_shape(expected, state))
        .and_then(|()| if sentinel { check_finite(state) } else { Ok(()) })
        .map_err(|reason| EngineError::PropagatorFailure {
            phase,
            slice: Some(slice),
            propagator: prop.name().to_string(),
            reason,
        })
}
