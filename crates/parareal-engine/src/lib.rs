//! Parallel-in-time iteration engine.
//!
//! Provides [`PararealEngine`], which splits `[0, t_end]` into one slice
//! per worker, predicts every slice end state with a cheap coarse
//! propagator, and refines the prediction through correction passes that
//! run an expensive fine propagator on all slices concurrently.
//!
//! With `W` workers and `K` correction passes the result after `K = W`
//! passes equals sequential fine integration; for smooth problems a few
//! passes usually suffice.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod metrics;
pub mod partition;
mod worker;

pub use config::{EngineConfig, RunOptions, RunParameters};
pub use diagnostics::{DiagnosticsError, DiagnosticsSink, FileSink, MemorySink, SnapshotKey, StoredSnapshot, WorkerTiming};
pub use engine::{PararealEngine, RunOutput, TeardownReport};
pub use error::{EngineError, Phase};
pub use metrics::TimerRecord;
pub use partition::{partition, TimeSlice};
