//! Index file - page-granular storage for tree nodes.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::common::config::PAGE_SIZE;
use crate::common::{PageId, Result};
use crate::storage::page::Page;
use crate::storage::page_store::PageStore;
use crate::storage::slot_file::{SlotFile, SlotLayout};
use crate::storage::stats::{StatsSnapshot, StoreStats};

const PAGE_LAYOUT: SlotLayout = SlotLayout {
    slot_size: PAGE_SIZE,
    data_start: 0,
};

/// Sequence of `PAGE_SIZE` pages. Page N lives at byte `N × PAGE_SIZE`.
pub struct IndexFile {
    slots: SlotFile,
}

impl IndexFile {
    /// Open the index file, creating it if it doesn't exist.
    pub fn open<P: AsRef<Path>>(path: P, sync_writes: bool) -> Result<Self> {
        let mut slots = SlotFile::open(path, sync_writes)?;
        slots.set_layout(PAGE_LAYOUT)?;
        info!(
            path = %slots.path().display(),
            pages = slots.slot_count(),
            "opened index file"
        );
        Ok(Self { slots })
    }

    /// Allocate a new zeroed page at the end of the file.
    pub fn allocate_page(&mut self) -> Result<PageId> {
        let page = Page::new();
        let slot = self.slots.append_slot(page.as_slice())?;
        Ok(PageId::new(slot))
    }

    /// Read a page from disk.
    ///
    /// # Errors
    /// Returns `Error::SlotOutOfBounds` if the page hasn't been allocated.
    pub fn read_page(&self, page_id: PageId) -> Result<Page> {
        let mut page = Page::new();
        self.slots.read_slot_into(page_id.0, page.as_mut_slice())?;
        Ok(page)
    }

    /// Write a page to disk.
    ///
    /// The page must have been previously allocated with `allocate_page()`.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        self.slots.write_slot(page_id.0, page.as_slice())
    }

    /// Zero-fill a page. It is never handed out again.
    pub fn zero_page(&mut self, page_id: PageId) -> Result<()> {
        self.slots.zero_slot(page_id.0)
    }

    /// Get the number of pages in the file.
    #[inline]
    pub fn page_count(&self) -> u64 {
        self.slots.slot_count()
    }

    /// Get the total size of the index file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        self.page_count() * PAGE_SIZE as u64
    }

    /// Drop every page.
    pub fn truncate(&mut self) -> Result<()> {
        self.slots.truncate()
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
        info!(path = %path.display(), "deleted index file");
        Ok(())
    }
}

impl PageStore for IndexFile {
    type Offset = PageId;

    fn append(&mut self, bytes: &[u8]) -> Result<PageId> {
        self.slots.append_slot(bytes).map(PageId::new)
    }

    fn read(&self, offset: PageId) -> Result<Vec<u8>> {
        self.slots.read_slot(offset.0)
    }

    fn update(&mut self, offset: PageId, bytes: &[u8]) -> Result<()> {
        self.slots.write_slot(offset.0, bytes)
    }

    fn delete(&mut self, offset: PageId) -> Result<()> {
        self.zero_page(offset)
    }

    fn slot_count(&self) -> u64 {
        self.page_count()
    }

    fn slot_size(&self) -> Option<usize> {
        Some(PAGE_SIZE)
    }

    fn sync(&mut self) -> Result<()> {
        self.slots.sync()
    }

    fn stats(&self) -> StatsSnapshot {
        self.slots.stats().snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;
    use tempfile::tempdir;

    #[test]
    fn test_new_index_file_is_empty() {
        let dir = tempdir().unwrap();
        let file = IndexFile::open(dir.path().join("index.tc"), false).unwrap();
        assert_eq!(file.page_count(), 0);
        assert_eq!(file.file_size(), 0);
    }

    #[test]
    fn test_allocate_and_read_page() {
        let dir = tempdir().unwrap();
        let mut file = IndexFile::open(dir.path().join("index.tc"), false).unwrap();

        let page_id = file.allocate_page().unwrap();
        assert_eq!(page_id, PageId::new(0));
        assert_eq!(file.page_count(), 1);

        let page = file.read_page(page_id).unwrap();
        assert!(page.is_zeroed());
    }

    #[test]
    fn test_write_and_read_page() {
        let dir = tempdir().unwrap();
        let mut file = IndexFile::open(dir.path().join("index.tc"), false).unwrap();
        let page_id = file.allocate_page().unwrap();

        let mut page = Page::new();
        page.as_mut_slice()[0] = 0xAB;
        page.as_mut_slice()[4095] = 0xEF;
        file.write_page(page_id, &page).unwrap();

        let read_page = file.read_page(page_id).unwrap();
        assert_eq!(read_page.as_slice()[0], 0xAB);
        assert_eq!(read_page.as_slice()[4095], 0xEF);

        file.zero_page(page_id).unwrap();
        assert!(file.read_page(page_id).unwrap().is_zeroed());
    }

    #[test]
    fn test_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.tc");

        {
            let mut file = IndexFile::open(&path, true).unwrap();
            for i in 0..4u8 {
                let page_id = file.allocate_page().unwrap();
                let mut page = Page::new();
                page.as_mut_slice()[0] = i;
                file.write_page(page_id, &page).unwrap();
            }
            file.close().unwrap();
        }

        {
            let file = IndexFile::open(&path, true).unwrap();
            assert_eq!(file.page_count(), 4);
            assert_eq!(file.file_size(), 4 * PAGE_SIZE as u64);
            for i in 0..4u8 {
                assert_eq!(file.read_page(PageId::new(i as u64)).unwrap().as_slice()[0], i);
            }
        }
    }

    #[test]
    fn test_write_unallocated_page_fails() {
        let dir = tempdir().unwrap();
        let mut file = IndexFile::open(dir.path().join("index.tc"), false).unwrap();

        let result = file.write_page(PageId::new(0), &Page::new());
        assert!(matches!(result, Err(Error::SlotOutOfBounds(0))));
    }

    #[test]
    fn test_delete_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.tc");
        let mut file = IndexFile::open(&path, false).unwrap();
        file.allocate_page().unwrap();

        file.delete_file().unwrap();
        assert!(!path.exists());
    }
}
