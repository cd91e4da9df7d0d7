//! Persistent worker pool for the parallel fine phase.
//!
//! Worker `i` is permanently bound to slice `i`. Each worker has its own
//! bounded task channel; all workers answer on one shared reply channel.
//! Slots travel by value: the coordinator moves slot `i` to worker `i`,
//! the worker propagates it in place and sends it back. Collecting all
//! `W` replies is the barrier between the parallel and sequential halves
//! of a correction pass.
//!
//! ```text
//!  coordinator                                   workers
//!  ───────────                                   ───────
//!  task_tx[i].send(Fine { slot_i })  ──────────▶ worker i: F(q), qend = q - gq
//!  reply_rx.recv() × W               ◀────────── Reply::Fine { slot_i, elapsed }
//! ```

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use parareal_arena::{ArenaError, SliceSlot};
use parareal_core::{FieldState, GridShape, GridSpacing, PropagatorError, SliceIndex};
use parareal_propagator::{check_finite, check_shape, AdvanceContext, Propagator, StepSpan};
use tracing::trace;

use crate::error::EngineError;

/// A task dispatched to one worker.
pub(crate) enum Task {
    /// Allocate and zero-fill this worker's slot on the worker thread.
    Allocate { shape: GridShape },
    /// Run the fine propagator on `slot.q`, then store `q - gq` in `qend`.
    Fine {
        slot: SliceSlot,
        span: StepSpan,
        spacing: GridSpacing,
        sentinel: bool,
    },
}

/// A worker's answer to a [`Task`].
pub(crate) enum Reply {
    Allocated {
        worker: usize,
        result: Result<SliceSlot, ArenaError>,
    },
    Fine {
        worker: usize,
        slot: SliceSlot,
        elapsed: Duration,
        result: Result<(), PropagatorError>,
    },
}

/// Outcome of one parallel fine phase, in slice order.
pub(crate) struct FinePhase {
    pub slots: Vec<SliceSlot>,
    pub elapsed: Vec<Duration>,
    /// First failure by slice index, if any.
    pub failure: Option<(usize, PropagatorError)>,
}

/// Main loop for a worker thread.
///
/// Runs until the task channel is closed (sender dropped) or the reply
/// channel is gone.
pub(crate) fn worker_loop(
    worker: usize,
    task_rx: Receiver<Task>,
    reply_tx: Sender<Reply>,
    fine: Arc<dyn Propagator>,
) {
    while let Ok(task) = task_rx.recv() {
        let reply = match task {
            Task::Allocate { shape } => {
                trace!(worker, "allocating slot");
                Reply::Allocated {
                    worker,
                    result: SliceSlot::try_zeroed(shape),
                }
            }
            Task::Fine {
                mut slot,
                span,
                spacing,
                sentinel,
            } => {
                trace!(worker, t_start = span.t_start, t_end = span.t_end, "fine propagation");
                let start = Instant::now();
                let result = propagate_fine(&*fine, &mut slot, worker, span, &spacing, sentinel);
                Reply::Fine {
                    worker,
                    slot,
                    elapsed: start.elapsed(),
                    result,
                }
            }
        };
        if reply_tx.send(reply).is_err() {
            break;
        }
    }
    // Channel closed: worker exits cleanly.
}

fn propagate_fine(
    fine: &dyn Propagator,
    slot: &mut SliceSlot,
    worker: usize,
    span: StepSpan,
    spacing: &GridSpacing,
    sentinel: bool,
) -> Result<(), PropagatorError> {
    let ctx = AdvanceContext::new(span, spacing, SliceIndex(worker));
    let expected = slot.gq.shape();
    // Every outcome, panics included, must produce a reply, or the
    // coordinator would wait on the barrier forever.
    let result = panic::catch_unwind(AssertUnwindSafe(|| -> Result<(), PropagatorError> {
        fine.advance(&mut slot.q, &ctx)?;
        check_shape(expected, &slot.q)?;
        if sentinel {
            check_finite(&slot.q)?;
        }
        let SliceSlot { q, gq, qend } = &mut *slot;
        qend.assign_difference(q, gq);
        Ok(())
    }))
    .unwrap_or_else(|_| {
        Err(PropagatorError::ExecutionFailed {
            reason: "propagator panicked".into(),
        })
    });
    // The pool only takes back slots of the configured shape.
    if slot.q.shape() != expected {
        slot.q = FieldState::zeroed(expected);
    }
    result
}

/// Handles to the worker threads and their channels.
pub(crate) struct WorkerPool {
    task_txs: Vec<Sender<Task>>,
    reply_rx: Receiver<Reply>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_count` named workers sharing `fine`.
    pub(crate) fn spawn(worker_count: usize, fine: &Arc<dyn Propagator>) -> Result<Self, EngineError> {
        let (reply_tx, reply_rx) = crossbeam_channel::bounded(worker_count);
        let mut pool = Self {
            task_txs: Vec::with_capacity(worker_count),
            reply_rx,
            handles: Vec::with_capacity(worker_count),
        };
        for i in 0..worker_count {
            let (task_tx, task_rx) = crossbeam_channel::bounded(1);
            let reply_tx = reply_tx.clone();
            let fine = Arc::clone(fine);
            let handle = thread::Builder::new()
                .name(format!("parareal-worker-{i}"))
                .spawn(move || worker_loop(i, task_rx, reply_tx, fine))
                .map_err(|e| EngineError::ThreadSpawnFailed {
                    worker: i,
                    reason: e.to_string(),
                });
            match handle {
                Ok(h) => {
                    pool.task_txs.push(task_tx);
                    pool.handles.push(h);
                }
                Err(e) => {
                    pool.shutdown();
                    return Err(e);
                }
            }
        }
        Ok(pool)
    }

    /// Number of live workers.
    pub(crate) fn len(&self) -> usize {
        self.task_txs.len()
    }

    /// Have every worker allocate its own slot (first-touch placement).
    ///
    /// Returns the slots in worker order.
    pub(crate) fn allocate_slots(&self, shape: GridShape) -> Result<Vec<SliceSlot>, EngineError> {
        for (worker, tx) in self.task_txs.iter().enumerate() {
            tx.send(Task::Allocate { shape })
                .map_err(|_| EngineError::WorkerLost { worker })?;
        }
        let mut slots: Vec<Option<SliceSlot>> = (0..self.len()).map(|_| None).collect();
        let mut first_error = None;
        for _ in 0..self.len() {
            match self.reply_rx.recv() {
                Ok(Reply::Allocated { worker, result }) => match result {
                    Ok(slot) => slots[worker] = Some(slot),
                    Err(e) => {
                        first_error.get_or_insert(EngineError::AllocationFailure(e));
                    }
                },
                _ => return Err(EngineError::WorkerLost { worker: self.first_dead() }),
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        collect_slots(slots)
    }

    /// Move every slot to its worker, wait for all of them, and return the
    /// propagated slots in slice order.
    ///
    /// `slots.len()` must equal the worker count and `spans[i]` is slice
    /// `i`'s fine span.
    pub(crate) fn run_fine(
        &self,
        slots: Vec<SliceSlot>,
        spans: &[StepSpan],
        spacing: GridSpacing,
        sentinel: bool,
    ) -> Result<FinePhase, EngineError> {
        let count = self.len();
        for ((worker, slot), span) in slots.into_iter().enumerate().zip(spans) {
            self.task_txs[worker]
                .send(Task::Fine {
                    slot,
                    span: *span,
                    spacing,
                    sentinel,
                })
                .map_err(|_| EngineError::WorkerLost { worker })?;
        }

        let mut returned: Vec<Option<SliceSlot>> = (0..count).map(|_| None).collect();
        let mut elapsed = vec![Duration::ZERO; count];
        let mut failure: Option<(usize, PropagatorError)> = None;
        for _ in 0..count {
            match self.reply_rx.recv() {
                Ok(Reply::Fine {
                    worker,
                    slot,
                    elapsed: dt,
                    result,
                }) => {
                    returned[worker] = Some(slot);
                    elapsed[worker] = dt;
                    if let Err(e) = result {
                        if failure.as_ref().is_none_or(|(w, _)| worker < *w) {
                            failure = Some((worker, e));
                        }
                    }
                }
                _ => return Err(EngineError::WorkerLost { worker: self.first_dead() }),
            }
        }

        Ok(FinePhase {
            slots: collect_slots(returned)?,
            elapsed,
            failure,
        })
    }

    /// Index of the first worker whose thread has finished, or 0.
    fn first_dead(&self) -> usize {
        self.handles
            .iter()
            .position(|h| h.is_finished())
            .unwrap_or(0)
    }

    /// Close every task channel and join the workers.
    ///
    /// Returns how many workers exited cleanly. Idempotent.
    pub(crate) fn shutdown(&mut self) -> usize {
        self.task_txs.clear();
        self.handles
            .drain(..)
            .map(JoinHandle::join)
            .filter(Result::is_ok)
            .count()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn collect_slots(slots: Vec<Option<SliceSlot>>) -> Result<Vec<SliceSlot>, EngineError> {
    slots
        .into_iter()
        .enumerate()
        .map(|(worker, s)| s.ok_or(EngineError::WorkerLost { worker }))
        .collect()
}
