//! The tree header kept in page 0 of the index file.

use crate::common::config::FANOUT;
use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;
use crate::types::FieldType;

/// Identifies an index file written by this crate.
pub const MAGIC: [u8; 4] = *b"PTIX";

/// Tree-wide metadata.
///
/// # Layout (big-endian)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       4     magic "PTIX"
/// 4       1     key_type_signal
/// 5       8     root_offset
/// 13      4     fanout
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeHeader {
    pub key_type: FieldType,
    pub root: PageId,
}

impl TreeHeader {
    pub const SIZE: usize = 17;

    pub fn to_page(&self) -> Page {
        let mut page = Page::new();
        let data = page.as_mut_slice();
        data[0..4].copy_from_slice(&MAGIC);
        data[4] = self.key_type.signal();
        data[5..13].copy_from_slice(&self.root.0.to_be_bytes());
        data[13..17].copy_from_slice(&(FANOUT as u32).to_be_bytes());
        page
    }

    /// Decode a header page.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` on a bad magic or key type, and
    /// `Error::InvalidOperation` if the file was built with another fanout.
    pub fn from_page(page: &Page) -> Result<Self> {
        let data = page.as_slice();
        if data[0..4] != MAGIC {
            return Err(Error::corrupted("index file has no tree header"));
        }
        let key_type = FieldType::from_signal(data[4])?;

        let mut root = [0u8; 8];
        root.copy_from_slice(&data[5..13]);
        let root = PageId::new(u64::from_be_bytes(root));
        if root.is_header() {
            return Err(Error::corrupted("tree root points at the header page"));
        }

        let mut fanout = [0u8; 4];
        fanout.copy_from_slice(&data[13..17]);
        let fanout = u32::from_be_bytes(fanout);
        if fanout as usize != FANOUT {
            return Err(Error::InvalidOperation(format!(
                "index file uses fanout {}, this build uses {}",
                fanout, FANOUT
            )));
        }

        Ok(Self { key_type, root })
    }
}
