//! Slot File - low-level file I/O for fixed-size slots.
//!
//! The [`SlotFile`] handles all direct file operations shared by the index
//! and record files:
//! - Reading, overwriting and zero-filling slots
//! - Appending new slots at the end of the file
//! - Truncating the file on reset

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::common::{Error, Result};
use crate::storage::stats::StoreStats;

/// Where slots start and how large each one is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    /// Size of every slot in bytes.
    pub slot_size: usize,
    /// Byte address of slot 0 (the length of any file header).
    pub data_start: u64,
}

impl SlotLayout {
    #[inline]
    fn address(&self, slot: u64) -> u64 {
        self.data_start + slot * self.slot_size as u64
    }
}

/// Manages disk I/O for one store file.
///
/// # File Layout
/// ```text
/// ┌──────────┬─────────┬─────────┬─────────┬─────────┐
/// │ header   │ Slot 0  │ Slot 1  │  ...    │ Slot N  │
/// │ (0+ B)   │         │         │         │         │
/// └──────────┴─────────┴─────────┴─────────┴─────────┘
/// ```
///
/// Slot N is located at byte `data_start + N × slot_size`. The layout may be
/// unknown when the file is empty (the record file fixes its slot size on
/// the first append).
///
/// # Durability
/// With `sync_writes` enabled every write is followed by `fsync()`.
pub struct SlotFile {
    file: File,
    path: PathBuf,
    layout: Option<SlotLayout>,
    slot_count: u64,
    sync_writes: bool,
    stats: StoreStats,
}

impl SlotFile {
    /// Open a store file, creating it if it doesn't exist.
    ///
    /// New files are created owner read/write only (`0o600`) on Unix.
    pub fn open<P: AsRef<Path>>(path: P, sync_writes: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(&path)?;

        Ok(Self {
            file,
            path,
            layout: None,
            slot_count: 0,
            sync_writes,
            stats: StoreStats::new(),
        })
    }

    /// Current length of the file in bytes.
    pub fn file_len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    /// Fix the slot layout and derive the slot count from the file length.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` if the file ends in a partial slot.
    pub fn set_layout(&mut self, layout: SlotLayout) -> Result<()> {
        if layout.slot_size == 0 {
            return Err(Error::corrupted("slot size must be non-zero"));
        }
        let data_len = self.file_len()?.saturating_sub(layout.data_start);
        if data_len % layout.slot_size as u64 != 0 {
            return Err(Error::corrupted(format!(
                "{} ends in a partial slot ({} bytes of {}-byte slots)",
                self.path.display(),
                data_len,
                layout.slot_size
            )));
        }
        self.layout = Some(layout);
        self.slot_count = data_len / layout.slot_size as u64;
        Ok(())
    }

    /// Forget the slot layout. Only meaningful on an empty file.
    pub fn clear_layout(&mut self) {
        self.layout = None;
        self.slot_count = 0;
    }

    #[inline]
    pub fn layout(&self) -> Option<SlotLayout> {
        self.layout
    }

    #[inline]
    pub fn slot_size(&self) -> Option<usize> {
        self.layout.map(|l| l.slot_size)
    }

    /// Number of slots in the file.
    #[inline]
    pub fn slot_count(&self) -> u64 {
        self.slot_count
    }

    fn checked_layout(&self, slot: u64) -> Result<SlotLayout> {
        match self.layout {
            Some(layout) if slot < self.slot_count => Ok(layout),
            _ => Err(Error::SlotOutOfBounds(slot)),
        }
    }

    fn check_len(layout: SlotLayout, len: usize) -> Result<()> {
        if len != layout.slot_size {
            return Err(Error::SlotSizeMismatch {
                expected: layout.slot_size,
                actual: len,
            });
        }
        Ok(())
    }

    /// Read a slot into `buf`, which must be exactly one slot long.
    ///
    /// # Errors
    /// Returns `Error::SlotOutOfBounds` if the slot doesn't exist.
    pub fn read_slot_into(&self, slot: u64, buf: &mut [u8]) -> Result<()> {
        let layout = self.checked_layout(slot)?;
        Self::check_len(layout, buf.len())?;

        self.read_at(layout.address(slot), buf)?;
        self.stats.record_read();
        trace!(path = %self.path.display(), slot, "read slot");
        Ok(())
    }

    /// Read a slot from disk.
    pub fn read_slot(&self, slot: u64) -> Result<Vec<u8>> {
        let layout = self.checked_layout(slot)?;
        let mut buf = vec![0u8; layout.slot_size];
        self.read_slot_into(slot, &mut buf)?;
        Ok(buf)
    }

    /// Overwrite an existing slot in place.
    ///
    /// # Errors
    /// Returns `Error::SlotOutOfBounds` if the slot doesn't exist and
    /// `Error::SlotSizeMismatch` if `bytes` is not exactly one slot long.
    pub fn write_slot(&mut self, slot: u64, bytes: &[u8]) -> Result<()> {
        let layout = self.checked_layout(slot)?;
        Self::check_len(layout, bytes.len())?;

        self.write_at(layout.address(slot), bytes)?;
        self.stats.record_update();
        trace!(path = %self.path.display(), slot, "updated slot");
        Ok(())
    }

    /// Append a slot at the end of the file and return its index.
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if no layout has been set.
    pub fn append_slot(&mut self, bytes: &[u8]) -> Result<u64> {
        let layout = self.layout.ok_or_else(|| {
            Error::InvalidOperation(format!(
                "append to {} before its slot size is known",
                self.path.display()
            ))
        })?;
        Self::check_len(layout, bytes.len())?;

        let slot = self.slot_count;
        self.write_at(layout.address(slot), bytes)?;
        self.slot_count += 1;
        self.stats.record_append();
        trace!(path = %self.path.display(), slot, "appended slot");
        Ok(slot)
    }

    /// Overwrite a slot with zeros. The slot stays allocated.
    pub fn zero_slot(&mut self, slot: u64) -> Result<()> {
        let layout = self.checked_layout(slot)?;
        let zeros = vec![0u8; layout.slot_size];

        self.write_at(layout.address(slot), &zeros)?;
        self.stats.record_delete();
        trace!(path = %self.path.display(), slot, "zeroed slot");
        Ok(())
    }

    /// Read raw bytes at a byte address (used for file headers).
    pub fn read_at(&self, pos: u64, buf: &mut [u8]) -> Result<()> {
        let mut file = &self.file;
        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(buf)?;
        Ok(())
    }

    /// Write raw bytes at a byte address (used for file headers).
    pub fn write_at(&mut self, pos: u64, bytes: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(pos))?;
        self.file.write_all(bytes)?;
        if self.sync_writes {
            self.file.sync_all()?; // fsync for durability
        }
        Ok(())
    }

    /// Drop every slot (and any header). The layout is kept.
    pub fn truncate(&mut self) -> Result<()> {
        self.file.set_len(0)?;
        if self.sync_writes {
            self.file.sync_all()?;
        }
        self.slot_count = 0;
        Ok(())
    }

    /// Flush file contents and metadata to disk.
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }
}
