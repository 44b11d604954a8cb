//! Page - the fixed 4KB unit of index storage.
//!
//! A [`Page`] is a raw 4KB byte array that serves as the unit of I/O
//! between the index file and the node codec.

use crate::common::config::PAGE_SIZE;
use crate::common::{Error, Result};

use super::node_header::NodeHeader;

/// A page of data (4KB, 4KB-aligned).
///
/// # Memory Layout
/// - Size: 4096 bytes (4KB)
/// - Alignment: 4096 bytes
///
/// # Clone Implementation
/// `Page` does NOT implement `Clone` in production code (copying 4KB
/// should be explicit). A `#[cfg(test)]` Clone is provided for tests.
///
/// # Example
/// ```
/// use pagetree::storage::page::Page;
///
/// let mut page = Page::new();
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// ```
#[repr(align(4096))]
pub struct Page {
    data: [u8; PAGE_SIZE],
}

impl Page {
    /// Create a new zeroed page.
    #[inline]
    pub fn new() -> Self {
        Self {
            data: [0u8; PAGE_SIZE],
        }
    }

    /// Copy a page out of a byte slice of exactly `PAGE_SIZE` bytes.
    ///
    /// # Errors
    /// Returns `Error::SlotSizeMismatch` for any other length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != PAGE_SIZE {
            return Err(Error::SlotSizeMismatch {
                expected: PAGE_SIZE,
                actual: bytes.len(),
            });
        }
        let mut page = Page::new();
        page.data.copy_from_slice(bytes);
        Ok(page)
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Zero out the entire page.
    pub fn reset(&mut self) {
        self.data.fill(0);
    }

    /// Check whether every byte is zero (a deleted or never-written page).
    pub fn is_zeroed(&self) -> bool {
        self.data.iter().all(|&b| b == 0)
    }

    /// Get the size of a page.
    #[inline]
    pub const fn size() -> usize {
        PAGE_SIZE
    }

    /// Read the node header.
    pub fn node_header(&self) -> Result<NodeHeader> {
        NodeHeader::from_bytes(&self.data)
    }

    /// Write a node header.
    pub fn set_node_header(&mut self, header: &NodeHeader) {
        header.write_to(&mut self.data);
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::new()
    }
}

// Clone only available in tests - forces explicit copying in production
#[cfg(test)]
impl Clone for Page {
    fn clone(&self) -> Self {
        let mut new_page = Page::new();
        new_page.data.copy_from_slice(&self.data);
        new_page
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::PageId;
    use crate::types::FieldType;

    #[test]
    fn test_page_size_and_alignment() {
        assert_eq!(std::mem::size_of::<Page>(), PAGE_SIZE);
        assert_eq!(std::mem::align_of::<Page>(), 4096);
    }

    #[test]
    fn test_page_new() {
        let page = Page::new();
        assert!(page.is_zeroed());
    }

    #[test]
    fn test_page_reset() {
        let mut page = Page::new();
        page.as_mut_slice()[0] = 0xFF;
        page.as_mut_slice()[100] = 0xAB;
        assert!(!page.is_zeroed());

        page.reset();

        assert!(page.is_zeroed());
    }

    #[test]
    fn test_from_bytes_checks_length() {
        assert!(Page::from_bytes(&[0u8; PAGE_SIZE]).is_ok());
        assert!(matches!(
            Page::from_bytes(&[0u8; 100]),
            Err(Error::SlotSizeMismatch {
                expected: PAGE_SIZE,
                actual: 100
            })
        ));
    }

    #[test]
    fn test_node_header_accessors() {
        let mut page = Page::new();
        let header = NodeHeader::leaf(FieldType::Int32, Some(PageId::new(4)), PageId::new(5));
        page.set_node_header(&header);
        assert_eq!(page.node_header().unwrap(), header);

        let cloned = page.clone();
        assert_eq!(cloned.node_header().unwrap(), header);
    }
}
