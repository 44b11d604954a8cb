//! The offset-addressed store contract shared by the index and record files.

use crate::common::Result;
use crate::storage::stats::StatsSnapshot;

/// A zero-indexed array of fixed-size slots backed by a file.
///
/// Offsets are slot indices, never byte addresses. Slots are only ever
/// appended; `delete` zero-fills a slot but keeps it allocated, so offsets
/// stay stable for the lifetime of the file.
pub trait PageStore {
    /// Slot index type handed out by this store.
    type Offset: Copy;

    /// Write `bytes` to a new slot at the end of the store.
    fn append(&mut self, bytes: &[u8]) -> Result<Self::Offset>;

    /// Read exactly one slot.
    fn read(&self, offset: Self::Offset) -> Result<Vec<u8>>;

    /// Overwrite a slot in place.
    fn update(&mut self, offset: Self::Offset, bytes: &[u8]) -> Result<()>;

    /// Zero-fill a slot.
    fn delete(&mut self, offset: Self::Offset) -> Result<()>;

    /// Number of allocated slots, including deleted ones.
    fn slot_count(&self) -> u64;

    /// Size of each slot, or `None` before it is known.
    fn slot_size(&self) -> Option<usize>;

    /// Flush to disk.
    fn sync(&mut self) -> Result<()>;

    /// I/O counters for this store.
    fn stats(&self) -> StatsSnapshot;
}
