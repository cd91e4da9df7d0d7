//! Wall-clock timers for one Parareal run.
//!
//! [`TimerRecord`] captures the four categories the diagnostics output
//! reports: total wall time, per-worker fine time, aggregate coarse time,
//! and aggregate hand-off time (buffer copies and slot moves that would be
//! network messages in a distributed variant).

use std::fmt;
use std::time::{Duration, Instant};

use smallvec::SmallVec;

/// Timing data collected during a single run.
///
/// Fine times accumulate across all correction passes; the coarse and
/// hand-off totals cover the predictor and every correction pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TimerRecord {
    /// Wall-clock time for the whole run.
    pub total: Duration,
    /// Fine-propagation time per worker, indexed by slice.
    pub fine: SmallVec<[Duration; 16]>,
    /// Time spent in the coarse propagator on the coordinator thread.
    pub coarse: Duration,
    /// Time spent copying and moving slice buffers.
    pub handoff: Duration,
}

impl TimerRecord {
    /// A zeroed record for `worker_count` workers.
    pub fn new(worker_count: usize) -> Self {
        Self {
            fine: SmallVec::from_elem(Duration::ZERO, worker_count),
            ..Self::default()
        }
    }

    /// Slowest worker's fine time: the critical path of the parallel phases.
    pub fn fine_max(&self) -> Duration {
        self.fine.iter().copied().max().unwrap_or_default()
    }

    /// Fine time summed over workers (CPU time, not wall time).
    pub fn fine_total(&self) -> Duration {
        self.fine.iter().sum()
    }

    /// Ratio of slowest to mean worker fine time; 1.0 is perfectly balanced.
    pub fn fine_imbalance(&self) -> f64 {
        let total = self.fine_total().as_secs_f64();
        if self.fine.is_empty() || total == 0.0 {
            return 1.0;
        }
        let mean = total / self.fine.len() as f64;
        self.fine_max().as_secs_f64() / mean
    }

    /// Theoretical Parareal speedup over sequential fine integration.
    ///
    /// With `K` iterations, `W` workers, and coarse/fine cost ratio `r`
    /// per slice, the run costs `K` fine slices on the critical path plus
    /// `(K + 1) W` coarse slices, giving `1 / ((K + 1) r + K / W)`.
    pub fn speedup_bound(iterations: u32, worker_count: usize, cost_ratio: f64) -> f64 {
        let k = f64::from(iterations);
        let w = worker_count as f64;
        1.0 / ((k + 1.0) * cost_ratio + k / w)
    }

    /// Coarse/fine cost ratio per slice estimated from this run.
    ///
    /// `None` for a zero-iteration run or when nothing was timed.
    pub fn estimated_cost_ratio(&self, iterations: u32) -> Option<f64> {
        let w = self.fine.len() as f64;
        let k = f64::from(iterations);
        let per_fine = self.fine_total().as_secs_f64() / (k * w);
        let per_coarse = self.coarse.as_secs_f64() / ((k + 1.0) * w);
        (iterations > 0 && per_fine > 0.0).then(|| per_coarse / per_fine)
    }
}

impl fmt::Display for TimerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total {:.3?}, fine max {:.3?} (imbalance {:.2}), coarse {:.3?}, handoff {:.3?}",
            self.total,
            self.fine_max(),
            self.fine_imbalance(),
            self.coarse,
            self.handoff
        )
    }
}

/// Run `f` and add its wall-clock time to `acc`.
pub(crate) fn timed<T>(acc: &mut Duration, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = f();
    *acc += start.elapsed();
    out
}
