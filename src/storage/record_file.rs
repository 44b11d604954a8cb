//! Record file - fixed-size record slots behind a 4-byte size header.

use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::common::config::RECORD_FILE_HEADER_SIZE;
use crate::common::{Error, RecordId, Result};
use crate::storage::page_store::PageStore;
use crate::storage::slot_file::{SlotFile, SlotLayout};
use crate::storage::stats::{StatsSnapshot, StoreStats};
use crate::types::Record;

/// Stores serialized [`Record`]s in fixed-size slots.
///
/// # File Layout
/// ```text
/// ┌──────────────────┬──────────┬──────────┬─────┐
/// │ record_size: i32 │ Record 0 │ Record 1 │ ... │
/// │ (4B, big-endian) │          │          │     │
/// └──────────────────┴──────────┴──────────┴─────┘
/// ```
///
/// The slot size is the serialized size of the first record ever appended.
/// It is written to the header at that point and fixed until the file is
/// truncated.
pub struct RecordFile {
    slots: SlotFile,
}

impl RecordFile {
    /// Open the record file, creating it if it doesn't exist.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` if an existing header is truncated or holds
    /// a non-positive size, or the file ends in a partial record.
    pub fn open<P: AsRef<Path>>(path: P, sync_writes: bool) -> Result<Self> {
        let mut slots = SlotFile::open(path, sync_writes)?;

        let len = slots.file_len()?;
        if len > 0 {
            if len < RECORD_FILE_HEADER_SIZE as u64 {
                return Err(Error::corrupted(format!(
                    "{} is too short for a record file header",
                    slots.path().display()
                )));
            }
            let mut header = [0u8; RECORD_FILE_HEADER_SIZE];
            slots.read_at(0, &mut header)?;
            let record_size = i32::from_be_bytes(header);
            if record_size <= 0 {
                return Err(Error::corrupted(format!(
                    "invalid record size {} in {}",
                    record_size,
                    slots.path().display()
                )));
            }
            slots.set_layout(Self::layout(record_size as usize))?;
        }

        info!(
            path = %slots.path().display(),
            record_size = ?slots.slot_size(),
            records = slots.slot_count(),
            "opened record file"
        );
        Ok(Self { slots })
    }

    fn layout(record_size: usize) -> SlotLayout {
        SlotLayout {
            slot_size: record_size,
            data_start: RECORD_FILE_HEADER_SIZE as u64,
        }
    }

    /// Fixed record size, or `None` if no record has been written yet.
    #[inline]
    pub fn record_size(&self) -> Option<usize> {
        self.slots.slot_size()
    }

    /// Check that a record of `len` bytes fits this file's slots.
    ///
    /// Always succeeds before the first append.
    pub fn check_record_size(&self, len: usize) -> Result<()> {
        match self.record_size() {
            Some(expected) if expected != len => Err(Error::SlotSizeMismatch {
                expected,
                actual: len,
            }),
            _ => Ok(()),
        }
    }

    /// Number of record slots, including deleted ones.
    #[inline]
    pub fn record_count(&self) -> u64 {
        self.slots.slot_count()
    }

    fn append_bytes(&mut self, bytes: &[u8]) -> Result<RecordId> {
        if self.slots.layout().is_none() {
            let record_size = i32::try_from(bytes.len()).map_err(|_| {
                Error::Encoding(format!("record of {} bytes is too large", bytes.len()))
            })?;
            if record_size == 0 {
                return Err(Error::Encoding("empty record".into()));
            }
            self.slots.write_at(0, &record_size.to_be_bytes())?;
            self.slots.set_layout(Self::layout(bytes.len()))?;
            debug!(record_size, "fixed record size");
        }
        self.slots.append_slot(bytes).map(RecordId::new)
    }

    /// Serialize and append a record.
    ///
    /// # Panics
    /// Panics if the record holds an overlong string; call
    /// [`Record::validate`] first.
    pub fn append_record(&mut self, record: &Record) -> Result<RecordId> {
        let bytes = record.serialize();
        self.check_record_size(bytes.len())?;
        self.append_bytes(&bytes)
    }

    /// Read and decode a record.
    pub fn read_record(&self, id: RecordId) -> Result<Record> {
        let bytes = self.slots.read_slot(id.0)?;
        Record::deserialize(&bytes)
    }

    /// Overwrite a record in place.
    pub fn update_record(&mut self, id: RecordId, record: &Record) -> Result<()> {
        self.slots.write_slot(id.0, &record.serialize())
    }

    /// Zero-fill a record slot.
    pub fn delete_record(&mut self, id: RecordId) -> Result<()> {
        self.slots.zero_slot(id.0)
    }

    /// Drop every record and the header. The next append fixes a new size.
    pub fn truncate(&mut self) -> Result<()> {
        self.slots.truncate()?;
        self.slots.clear_layout();
        Ok(())
    }

    #[inline]
    pub fn path(&self) -> &Path {
        self.slots.path()
    }

    #[inline]
    pub fn io_stats(&self) -> &StoreStats {
        self.slots.stats()
    }

    /// Flush and release the file handle.
    pub fn close(mut self) -> Result<()> {
        self.slots.sync()
    }

    /// Release the file handle and remove the file.
    pub fn delete_file(self) -> Result<()> {
        let path = self.path().to_path_buf();
        drop(self);
        fs::remove_file(&path)?;
        info!(path = %path.display(), "deleted record file");
        Ok(())
    }
}

impl PageStore for RecordFile {
    type Offset = RecordId;

    fn append(&mut self, bytes: &[u8]) -> Result<RecordId> {
        self.append_bytes(bytes)
    }

    fn read(&self, offset: RecordId) -> Result<Vec<u8>> {
        self.slots.read_slot(offset.0)
    }

    fn update(&mut self, offset: RecordId, bytes: &[u8]) -> Result<()> {
        self.slots.write_slot(offset.0, bytes)
    }

    fn delete(&mut self, offset: RecordId) -> Result<()> {
        self.delete_record(offset)
    }

    fn slot_count(&self) -> u64 {
        self.record_count()
    }

    fn slot_size(&self) -> Option<usize> {
        self.record_size()
    }

    fn sync(&mut self) -> Result<()> {
        self.slots.sync()
    }

    fn stats(&self) -> StatsSnapshot {
        self.slots.stats().snapshot()
    }
}
