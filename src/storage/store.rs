//! The pair of store files owned by one tree.

use std::fmt;

use tracing::info;

use crate::common::config::StorageConfig;
use crate::common::Result;
use crate::storage::index_file::IndexFile;
use crate::storage::record_file::RecordFile;
use crate::storage::stats::StatsSnapshot;

/// Owns the index file and the record file.
///
/// A `Store` is an explicit handle: it is opened once from a
/// [`StorageConfig`] and handed to the tree, which holds it for its
/// whole lifetime.
///
/// # Example
/// ```no_run
/// use pagetree::{Store, StorageConfig};
///
/// let mut store = Store::open(&StorageConfig::in_dir("/tmp/db"))?;
/// store.reset()?;
/// store.delete_all()?;
/// # Ok::<(), pagetree::Error>(())
/// ```
pub struct Store {
    config: StorageConfig,
    index: IndexFile,
    records: RecordFile,
}

impl Store {
    /// Open (or create) both files.
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let index = IndexFile::open(&config.index_path, config.sync_writes)?;
        let records = RecordFile::open(&config.record_path, config.sync_writes)?;
        info!(
            index = %config.index_path.display(),
            records = %config.record_path.display(),
            "opened store"
        );
        Ok(Self {
            config: config.clone(),
            index,
            records,
        })
    }

    #[inline]
    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    #[inline]
    pub fn index(&self) -> &IndexFile {
        &self.index
    }

    #[inline]
    pub fn index_mut(&mut self) -> &mut IndexFile {
        &mut self.index
    }

    #[inline]
    pub fn records(&self) -> &RecordFile {
        &self.records
    }

    #[inline]
    pub fn records_mut(&mut self) -> &mut RecordFile {
        &mut self.records
    }

    /// Whether the index file holds no pages.
    pub fn is_empty(&self) -> bool {
        self.index.page_count() == 0
    }

    /// Empty both files. The record size becomes unfixed again.
    pub fn reset(&mut self) -> Result<()> {
        self.index.truncate()?;
        self.records.truncate()?;
        info!(
            index = %self.config.index_path.display(),
            records = %self.config.record_path.display(),
            "reset store"
        );
        Ok(())
    }

    /// I/O counters of both files.
    pub fn stats(&self) -> StoreSnapshot {
        StoreSnapshot {
            index: self.index.io_stats().snapshot(),
            records: self.records.io_stats().snapshot(),
        }
    }

    /// Reset the I/O counters of both files.
    pub fn reset_stats(&self) {
        self.index.io_stats().reset();
        self.records.io_stats().reset();
    }

    /// Flush and close both files.
    pub fn close(self) -> Result<()> {
        self.index.close()?;
        self.records.close()
    }

    /// Close both files and remove them from disk.
    pub fn delete_all(self) -> Result<()> {
        self.index.delete_file()?;
        self.records.delete_file()
    }
}

/// I/O counters of a [`Store`], one snapshot per file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub index: StatsSnapshot,
    pub records: StatsSnapshot,
}

impl StoreSnapshot {
    /// Writes to either file.
    pub fn writes(&self) -> u64 {
        self.index.writes() + self.records.writes()
    }
}

impl fmt::Display for StoreSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "index: {}, records: {}", self.index, self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Field, Record, RecordValue};
    use tempfile::tempdir;

    fn config(dir: &std::path::Path) -> StorageConfig {
        StorageConfig::in_dir(dir).sync_writes(false)
    }

    #[test]
    fn test_open_creates_both_files() {
        let dir = tempdir().unwrap();
        let store = Store::open(&config(dir.path())).unwrap();

        assert!(store.is_empty());
        assert!(dir.path().join("index.tc").exists());
        assert!(dir.path().join("record.tc").exists());
    }

    #[test]
    fn test_reset_empties_both_files() {
        let dir = tempdir().unwrap();
        let mut store = Store::open(&config(dir.path())).unwrap();

        store.index_mut().allocate_page().unwrap();
        store
            .records_mut()
            .append_record(&Record::new(1, RecordValue::new().with_field("a", Field::Int32(1))))
            .unwrap();
        assert_eq!(store.stats().writes(), 2);

        store.reset().unwrap();

        assert!(store.is_empty());
        assert_eq!(store.records().record_count(), 0);
        assert_eq!(store.records().record_size(), None);
    }

    #[test]
    fn test_delete_all_removes_files() {
        let dir = tempdir().unwrap();
        let store = Store::open(&config(dir.path())).unwrap();

        store.delete_all().unwrap();

        assert!(!dir.path().join("index.tc").exists());
        assert!(!dir.path().join("record.tc").exists());
    }
}
