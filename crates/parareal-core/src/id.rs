//! Strongly-typed identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Index of a time slice, and of the worker permanently bound to it.
///
/// Slice `i` covers the `i`-th contiguous sub-interval of `[0, Tend]` and
/// is owned by worker `i` for the lifetime of an engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SliceIndex(pub usize);

impl SliceIndex {
    /// The slice index as a plain `usize` for buffer indexing.
    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for SliceIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for SliceIndex {
    fn from(v: usize) -> Self {
        Self(v)
    }
}

/// Counter for unique [`RunId`] allocation.
static RUN_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identifies one `run()` invocation for diagnostics and persistence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RunId(pub u64);

impl RunId {
    /// Allocate a fresh, process-unique run ID. Thread-safe.
    pub fn next() -> Self {
        Self(RUN_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RunId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_ids_are_unique() {
        let a = RunId::next();
        let b = RunId::next();
        assert_ne!(a, b);
        assert!(b.0 > a.0);
    }

    #[test]
    fn slice_index_display() {
        assert_eq!(SliceIndex(3).to_string(), "3");
        assert_eq!(SliceIndex::from(7).get(), 7);
    }
}
