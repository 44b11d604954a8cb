//! Per-file I/O statistics.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Slot I/O counters kept by every store file.
///
/// Counters are atomic so they can be bumped through a shared reference
/// from read paths. `Ordering::Relaxed` is enough: each counter is
/// independent and only ever read as a snapshot.
///
/// # Example
/// ```
/// use pagetree::StoreStats;
/// use std::sync::atomic::Ordering;
///
/// let stats = StoreStats::new();
/// stats.slots_read.fetch_add(1, Ordering::Relaxed);
/// assert_eq!(stats.snapshot().slots_read, 1);
/// ```
#[derive(Debug)]
pub struct StoreStats {
    /// Number of slots read.
    pub slots_read: AtomicU64,

    /// Number of slots appended to the end of the file.
    pub slots_appended: AtomicU64,

    /// Number of slots overwritten in place.
    pub slots_updated: AtomicU64,

    /// Number of slots zero-filled.
    pub slots_deleted: AtomicU64,
}

impl StoreStats {
    /// Create a new stats tracker with all counters at zero.
    pub fn new() -> Self {
        Self {
            slots_read: AtomicU64::new(0),
            slots_appended: AtomicU64::new(0),
            slots_updated: AtomicU64::new(0),
            slots_deleted: AtomicU64::new(0),
        }
    }

    #[inline]
    pub(crate) fn record_read(&self) {
        self.slots_read.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_append(&self) {
        self.slots_appended.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_update(&self) {
        self.slots_updated.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_delete(&self) {
        self.slots_deleted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of current statistics.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            slots_read: self.slots_read.load(Ordering::Relaxed),
            slots_appended: self.slots_appended.load(Ordering::Relaxed),
            slots_updated: self.slots_updated.load(Ordering::Relaxed),
            slots_deleted: self.slots_deleted.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters to zero.
    pub fn reset(&self) {
        self.slots_read.store(0, Ordering::Relaxed);
        self.slots_appended.store(0, Ordering::Relaxed);
        self.slots_updated.store(0, Ordering::Relaxed);
        self.slots_deleted.store(0, Ordering::Relaxed);
    }
}

impl Default for StoreStats {
    fn default() -> Self {
        Self::new()
    }
}

/// A point-in-time copy of [`StoreStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub slots_read: u64,
    pub slots_appended: u64,
    pub slots_updated: u64,
    pub slots_deleted: u64,
}

impl StatsSnapshot {
    /// Total number of slot writes of any kind.
    pub fn writes(&self) -> u64 {
        self.slots_appended + self.slots_updated + self.slots_deleted
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Stats {{ read: {}, appended: {}, updated: {}, deleted: {} }}",
            self.slots_read, self.slots_appended, self.slots_updated, self.slots_deleted
        )
    }
}
