//! Per-slice state buffers for the Parareal iteration engine.
//!
//! Each time slice owns one [`SliceSlot`] holding its three field buffers:
//!
//! ```text
//! SliceBufferPool
//! ├── PoolConfig (worker count + grid shape, validated)
//! └── SliceSlot × W
//!     ├── q     candidate initial condition, later the fine result
//!     ├── gq    most recent coarse propagation of q
//!     └── qend  best estimate of the state at the slice end
//! ```
//!
//! # Placement
//!
//! Slots are allocated and zero-filled by the thread that will work on
//! them (first-touch), either through [`SliceBufferPool::allocate`] or by
//! an external worker pool that builds slots with [`SliceSlot::try_zeroed`]
//! and hands them to [`SliceBufferPool::from_slots`].
//!
//! All storage is plain `Vec<f64>`; no `unsafe`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod pool;
pub mod slot;

pub use config::PoolConfig;
pub use error::ArenaError;
pub use pool::SliceBufferPool;
pub use slot::SliceSlot;
