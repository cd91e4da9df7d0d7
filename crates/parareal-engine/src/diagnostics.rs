//! Result and timing persistence.
//!
//! After a run the engine hands each worker's end-of-slice field interior
//! and the four timing scalars to a [`DiagnosticsSink`]. Two sinks ship
//! with the engine:
//!
//! - [`FileSink`]: one text file per worker for the field and one for the
//!   timings, named by `(iterations, worker, worker_count)`.
//! - [`MemorySink`]: an ordered in-memory map, mainly for tests.
//!
//! Sink failures are reported as [`DiagnosticsError`] and never change the
//! numerical result of a run.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indexmap::IndexMap;
use parareal_core::RunId;

/// Identifies one persisted per-worker snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotKey {
    /// Correction passes the run performed.
    pub iterations: u32,
    /// Worker (and slice) index.
    pub worker: usize,
    /// Workers in the engine.
    pub worker_count: usize,
}

/// The four timing scalars persisted per worker.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerTiming {
    /// Total run wall time.
    pub total: Duration,
    /// This worker's accumulated fine time.
    pub fine: Duration,
    /// Aggregate coarse time.
    pub coarse: Duration,
    /// Aggregate hand-off time.
    pub handoff: Duration,
}

/// Destination for per-worker run output.
pub trait DiagnosticsSink: Send {
    /// Persist one worker's snapshot.
    ///
    /// `interior` holds the worker's end-of-slice field without the halo,
    /// x fastest.
    fn emit(
        &mut self,
        run_id: RunId,
        key: SnapshotKey,
        interior: &[f64],
        timing: &WorkerTiming,
    ) -> Result<(), DiagnosticsError>;
}

// ── DiagnosticsError ───────────────────────────────────────────────

/// Errors from writing diagnostics output.
#[derive(Debug)]
pub enum DiagnosticsError {
    /// An I/O error while writing `path`.
    Io {
        /// File being written.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
    /// The sink cannot accept output (e.g. its lock was poisoned).
    Unavailable {
        /// Human-readable description.
        reason: String,
    },
}

impl fmt::Display for DiagnosticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "I/O error writing {}: {source}", path.display()),
            Self::Unavailable { reason } => write!(f, "sink unavailable: {reason}"),
        }
    }
}

impl std::error::Error for DiagnosticsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Unavailable { .. } => None,
        }
    }
}

// ── FileSink ───────────────────────────────────────────────────────

/// Writes plain-text files into a directory.
///
/// For key `(k, i, w)`:
///
/// - `field_k{k}_w{i}_of{w}.txt`: a `# run <id>` header, then one
///   interior value per line in round-trippable exponent notation.
/// - `timing_k{k}_w{i}_of{w}.txt`: a header line and one line holding
///   `total fine coarse handoff` in seconds.
#[derive(Clone, Debug)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Write into `dir`, which must already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the field file for `key`.
    pub fn field_path(&self, key: SnapshotKey) -> PathBuf {
        self.dir.join(format!(
            "field_k{}_w{}_of{}.txt",
            key.iterations, key.worker, key.worker_count
        ))
    }

    /// Path of the timing file for `key`.
    pub fn timing_path(&self, key: SnapshotKey) -> PathBuf {
        self.dir.join(format!(
            "timing_k{}_w{}_of{}.txt",
            key.iterations, key.worker, key.worker_count
        ))
    }
}

fn write_file(path: &Path, body: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>) -> Result<(), DiagnosticsError> {
    let io_err = |source| DiagnosticsError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(io_err)?;
    let mut out = BufWriter::new(file);
    body(&mut out).map_err(io_err)?;
    out.flush().map_err(io_err)
}

impl DiagnosticsSink for FileSink {
    fn emit(
        &mut self,
        run_id: RunId,
        key: SnapshotKey,
        interior: &[f64],
        timing: &WorkerTiming,
    ) -> Result<(), DiagnosticsError> {
        write_file(&self.field_path(key), |out| {
            writeln!(out, "# run {run_id}")?;
            for v in interior {
                writeln!(out, "{v:e}")?;
            }
            Ok(())
        })?;
        write_file(&self.timing_path(key), |out| {
            writeln!(out, "# run {run_id}: total fine coarse handoff [s]")?;
            writeln!(
                out,
                "{:e} {:e} {:e} {:e}",
                timing.total.as_secs_f64(),
                timing.fine.as_secs_f64(),
                timing.coarse.as_secs_f64(),
                timing.handoff.as_secs_f64()
            )
        })
    }
}

// ── MemorySink ─────────────────────────────────────────────────────

/// One snapshot held by a [`MemorySink`].
#[derive(Clone, Debug, PartialEq)]
pub struct StoredSnapshot {
    /// Run that produced it.
    pub run_id: RunId,
    /// Field interior.
    pub interior: Vec<f64>,
    /// Timing scalars.
    pub timing: WorkerTiming,
}

/// Keeps snapshots in insertion order. Clones share storage, so a test
/// can keep a handle after giving the sink to an engine.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    records: Arc<Mutex<IndexMap<SnapshotKey, StoredSnapshot>>>,
}

impl MemorySink {
    /// An empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored snapshots.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot stored under `key`, if any.
    pub fn get(&self, key: &SnapshotKey) -> Option<StoredSnapshot> {
        self.records.lock().ok()?.get(key).cloned()
    }

    /// All keys in insertion order.
    pub fn keys(&self) -> Vec<SnapshotKey> {
        self.records
            .lock()
            .map(|r| r.keys().copied().collect())
            .unwrap_or_default()
    }
}

impl DiagnosticsSink for MemorySink {
    fn emit(
        &mut self,
        run_id: RunId,
        key: SnapshotKey,
        interior: &[f64],
        timing: &WorkerTiming,
    ) -> Result<(), DiagnosticsError> {
        let mut records = self.records.lock().map_err(|_| DiagnosticsError::Unavailable {
            reason: "memory sink lock poisoned".into(),
        })?;
        records.insert(
            key,
            StoredSnapshot {
                run_id,
                interior: interior.to_vec(),
                timing: *timing,
            },
        );
        Ok(())
    }
}
