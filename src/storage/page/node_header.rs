//! Node header and kind definitions.
//!
//! Every node page starts with a [`NodeHeader`] containing:
//! - the key type signal shared by all keys in the page
//! - the [`NodeKind`] discriminator
//! - the parent link and the page's own offset

use crate::common::{Error, PageId, Result};
use crate::types::FieldType;

/// Kind of B+tree node stored in a page.
///
/// Uses `#[repr(u8)]` so the discriminant is the persisted `is_leaf` byte.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Internal node: keys route to child pages.
    Internal = 0,
    /// Leaf node: keys map to record slots.
    Leaf = 1,
}

impl NodeKind {
    /// Convert from the persisted `is_leaf` byte.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(NodeKind::Internal),
            1 => Ok(NodeKind::Leaf),
            other => Err(Error::corrupted(format!("invalid is_leaf byte {:#04x}", other))),
        }
    }
}

/// Metadata stored at the beginning of every node page.
///
/// # Layout (19 bytes, big-endian)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     key_type_signal
/// 1       1     is_leaf (NodeKind as u8)
/// 2       1     has_parent
/// 3       8     parent_offset (zero when there is no parent)
/// 11      8     self_offset
/// ```
///
/// Nodes reference each other only through these offsets; a parent is
/// resolved by reading its page on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHeader {
    /// Type of every key in the node.
    pub key_type: FieldType,
    /// Leaf or internal.
    pub kind: NodeKind,
    /// Page of the parent node, `None` for the root.
    pub parent: Option<PageId>,
    /// Page this node is stored at.
    pub page_id: PageId,
}

impl NodeHeader {
    /// Size of the header in bytes.
    pub const SIZE: usize = 19;

    /// Offset of each field within the header.
    pub const OFFSET_KEY_TYPE: usize = 0;
    pub const OFFSET_IS_LEAF: usize = 1;
    pub const OFFSET_HAS_PARENT: usize = 2;
    pub const OFFSET_PARENT: usize = 3;
    pub const OFFSET_PAGE_ID: usize = 11;

    /// Header of a leaf node.
    pub fn leaf(key_type: FieldType, parent: Option<PageId>, page_id: PageId) -> Self {
        Self {
            key_type,
            kind: NodeKind::Leaf,
            parent,
            page_id,
        }
    }

    /// Header of an internal node.
    pub fn internal(key_type: FieldType, parent: Option<PageId>, page_id: PageId) -> Self {
        Self {
            key_type,
            kind: NodeKind::Internal,
            parent,
            page_id,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.kind == NodeKind::Leaf
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Read a header from the beginning of a byte slice.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` if the slice is too short or a tag byte is invalid.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::corrupted("buffer too small for NodeHeader"));
        }

        let key_type = FieldType::from_signal(data[Self::OFFSET_KEY_TYPE])?;
        let kind = NodeKind::from_u8(data[Self::OFFSET_IS_LEAF])?;

        let parent_offset = u64::from_be_bytes(
            data[Self::OFFSET_PARENT..Self::OFFSET_PARENT + 8]
                .try_into()
                .map_err(|_| Error::corrupted("parent offset"))?,
        );
        let parent = match data[Self::OFFSET_HAS_PARENT] {
            0 => None,
            1 => Some(PageId::new(parent_offset)),
            other => {
                return Err(Error::corrupted(format!(
                    "invalid has_parent byte {:#04x}",
                    other
                )))
            }
        };

        let page_id = PageId::new(u64::from_be_bytes(
            data[Self::OFFSET_PAGE_ID..Self::OFFSET_PAGE_ID + 8]
                .try_into()
                .map_err(|_| Error::corrupted("self offset"))?,
        ));

        Ok(Self {
            key_type,
            kind,
            parent,
            page_id,
        })
    }

    /// Write this header to the beginning of a byte slice.
    ///
    /// # Panics
    /// Panics if `data.len() < NodeHeader::SIZE`.
    pub fn write_to(&self, data: &mut [u8]) {
        assert!(data.len() >= Self::SIZE, "buffer too small for NodeHeader");

        data[Self::OFFSET_KEY_TYPE] = self.key_type.signal();
        data[Self::OFFSET_IS_LEAF] = self.kind as u8;

        let (has_parent, parent_offset) = match self.parent {
            Some(parent) => (1u8, parent.0),
            None => (0u8, 0),
        };
        data[Self::OFFSET_HAS_PARENT] = has_parent;
        data[Self::OFFSET_PARENT..Self::OFFSET_PARENT + 8]
            .copy_from_slice(&parent_offset.to_be_bytes());
        data[Self::OFFSET_PAGE_ID..Self::OFFSET_PAGE_ID + 8]
            .copy_from_slice(&self.page_id.0.to_be_bytes());
    }
}

// ============================================================================
// TESTS
// ============================================================================
