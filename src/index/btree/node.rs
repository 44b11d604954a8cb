//! B+tree nodes and their page encoding.
//!
//! # Page layout (big-endian)
//! ```text
//! ┌──────────────┬───────┬──────────────────────────┬──────────┬──────────┬─────────┐
//! │ NodeHeader   │ count │ offsets (8B each),       │ num_keys │ keys     │ zero    │
//! │ (19B)        │ (4B)  │ zero-padded to           │ (4B)     │          │ padding │
//! │              │       │ MAX_CHILDREN slots       │          │          │         │
//! └──────────────┴───────┴──────────────────────────┴──────────┴──────────┴─────────┘
//! ```
//! Leaves store record offsets, internal nodes store child page offsets.
//! Keys are encoded without a per-key type tag; the header carries the
//! key type for the whole page.

use crate::common::config::{FANOUT, MAX_CHILDREN, OFFSET_SIZE};
use crate::common::{Error, PageId, RecordId, Result};
use crate::storage::page::{NodeHeader, NodeKind, Page};
use crate::types::codec::ByteReader;
use crate::types::{Field, FieldType};

const OFFSETS_START: usize = NodeHeader::SIZE + 4;
const KEYS_START: usize = OFFSETS_START + MAX_CHILDREN * OFFSET_SIZE;

/// A leaf: sorted keys, each paired with the slot of its record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafNode {
    pub page_id: PageId,
    pub parent: Option<PageId>,
    pub key_type: FieldType,
    pub keys: Vec<Field>,
    /// `records[i]` holds the record for `keys[i]`.
    pub records: Vec<RecordId>,
}

/// An internal node: `keys.len() + 1` children.
///
/// Child `i` holds keys `< keys[i]`; child `i + 1` holds keys `>= keys[i]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalNode {
    pub page_id: PageId,
    pub parent: Option<PageId>,
    pub key_type: FieldType,
    pub keys: Vec<Field>,
    pub children: Vec<PageId>,
}

/// A node read from, or about to be written to, an index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Leaf(LeafNode),
    Internal(InternalNode),
}

impl LeafNode {
    /// An empty leaf.
    pub fn new(page_id: PageId, parent: Option<PageId>, key_type: FieldType) -> Self {
        Self {
            page_id,
            parent,
            key_type,
            keys: Vec::new(),
            records: Vec::new(),
        }
    }

    pub fn header(&self) -> NodeHeader {
        NodeHeader::leaf(self.key_type, self.parent, self.page_id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn to_page(&self) -> Result<Page> {
        if self.keys.len() != self.records.len() {
            return Err(Error::invariant(format!(
                "leaf {} has {} keys but {} records",
                self.page_id,
                self.keys.len(),
                self.records.len()
            )));
        }
        let offsets: Vec<u64> = self.records.iter().map(|r| r.0).collect();
        encode(&self.header(), &offsets, &self.keys)
    }
}

impl InternalNode {
    pub fn header(&self) -> NodeHeader {
        NodeHeader::internal(self.key_type, self.parent, self.page_id)
    }

    /// Position of `child` in this node's child list.
    ///
    /// # Errors
    /// Returns `Error::InvariantViolation` if `child` is not a child of this node.
    pub fn child_index(&self, child: PageId) -> Result<usize> {
        self.children
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| {
                Error::invariant(format!("{} is not a child of {}", child, self.page_id))
            })
    }

    pub fn to_page(&self) -> Result<Page> {
        if self.children.len() != self.keys.len() + 1 {
            return Err(Error::invariant(format!(
                "internal node {} has {} keys but {} children",
                self.page_id,
                self.keys.len(),
                self.children.len()
            )));
        }
        let offsets: Vec<u64> = self.children.iter().map(|c| c.0).collect();
        encode(&self.header(), &offsets, &self.keys)
    }
}

fn encode(header: &NodeHeader, offsets: &[u64], keys: &[Field]) -> Result<Page> {
    if offsets.len() > MAX_CHILDREN || keys.len() > FANOUT {
        return Err(Error::invariant(format!(
            "{} overflows its page ({} offsets, {} keys)",
            header.page_id,
            offsets.len(),
            keys.len()
        )));
    }
    if let Some(key) = keys.iter().find(|k| k.field_type() != header.key_type) {
        return Err(Error::InvalidOperation(format!(
            "key {} does not match node key type {:?}",
            key, header.key_type
        )));
    }

    let mut buf = Vec::with_capacity(KEYS_START + 4 + keys.len() * header.key_type.size());
    buf.resize(NodeHeader::SIZE, 0);
    header.write_to(&mut buf);

    buf.extend_from_slice(&(offsets.len() as u32).to_be_bytes());
    for offset in offsets {
        buf.extend_from_slice(&offset.to_be_bytes());
    }
    buf.resize(KEYS_START, 0);

    buf.extend_from_slice(&(keys.len() as u32).to_be_bytes());
    for key in keys {
        key.encode_into(&mut buf);
    }

    let mut page = Page::new();
    page.as_mut_slice()[..buf.len()].copy_from_slice(&buf);
    Ok(page)
}

impl Node {
    /// Decode a node page.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` if the page is zeroed, truncated, or its
    /// counts are inconsistent with its kind.
    pub fn from_page(page: &Page) -> Result<Node> {
        let header = page.node_header()?;
        let mut reader = ByteReader::new(page.as_slice());
        reader.skip(NodeHeader::SIZE)?;

        let count = reader.read_u32()? as usize;
        if count > MAX_CHILDREN {
            return Err(Error::corrupted(format!(
                "{} claims {} offsets",
                header.page_id, count
            )));
        }
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(reader.read_u64()?);
        }
        reader.skip((MAX_CHILDREN - count) * OFFSET_SIZE)?;

        let num_keys = reader.read_u32()? as usize;
        if num_keys > FANOUT {
            return Err(Error::corrupted(format!(
                "{} claims {} keys",
                header.page_id, num_keys
            )));
        }
        let mut keys = Vec::with_capacity(num_keys);
        for _ in 0..num_keys {
            keys.push(Field::decode(header.key_type, &mut reader)?);
        }

        match header.kind {
            NodeKind::Leaf => {
                if count != num_keys {
                    return Err(Error::corrupted(format!(
                        "leaf {} has {} keys but {} records",
                        header.page_id, num_keys, count
                    )));
                }
                Ok(Node::Leaf(LeafNode {
                    page_id: header.page_id,
                    parent: header.parent,
                    key_type: header.key_type,
                    keys,
                    records: offsets.into_iter().map(RecordId::new).collect(),
                }))
            }
            NodeKind::Internal => {
                if count != num_keys + 1 {
                    return Err(Error::corrupted(format!(
                        "internal node {} has {} keys but {} children",
                        header.page_id, num_keys, count
                    )));
                }
                Ok(Node::Internal(InternalNode {
                    page_id: header.page_id,
                    parent: header.parent,
                    key_type: header.key_type,
                    keys,
                    children: offsets.into_iter().map(PageId::new).collect(),
                }))
            }
        }
    }

    pub fn to_page(&self) -> Result<Page> {
        match self {
            Node::Leaf(leaf) => leaf.to_page(),
            Node::Internal(internal) => internal.to_page(),
        }
    }

    pub fn page_id(&self) -> PageId {
        match self {
            Node::Leaf(leaf) => leaf.page_id,
            Node::Internal(internal) => internal.page_id,
        }
    }

    pub fn parent(&self) -> Option<PageId> {
        match self {
            Node::Leaf(leaf) => leaf.parent,
            Node::Internal(internal) => internal.parent,
        }
    }

    pub fn key_type(&self) -> FieldType {
        match self {
            Node::Leaf(leaf) => leaf.key_type,
            Node::Internal(internal) => internal.key_type,
        }
    }

    pub fn keys(&self) -> &[Field] {
        match self {
            Node::Leaf(leaf) => &leaf.keys,
            Node::Internal(internal) => &internal.keys,
        }
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Unwrap a leaf.
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` for an internal node.
    pub fn into_leaf(self) -> Result<LeafNode> {
        match self {
            Node::Leaf(leaf) => Ok(leaf),
            Node::Internal(internal) => Err(Error::InvalidOperation(format!(
                "expected a leaf at {}, found an internal node",
                internal.page_id
            ))),
        }
    }

    /// Unwrap an internal node.
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` for a leaf.
    pub fn into_internal(self) -> Result<InternalNode> {
        match self {
            Node::Internal(internal) => Ok(internal),
            Node::Leaf(leaf) => Err(Error::InvalidOperation(format!(
                "expected an internal node at {}, found a leaf",
                leaf.page_id
            ))),
        }
    }
}

impl From<LeafNode> for Node {
    fn from(leaf: LeafNode) -> Self {
        Node::Leaf(leaf)
    }
}

impl From<InternalNode> for Node {
    fn from(internal: InternalNode) -> Self {
        Node::Internal(internal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf() -> LeafNode {
        LeafNode {
            page_id: PageId::new(3),
            parent: Some(PageId::new(1)),
            key_type: FieldType::Int32,
            keys: vec![Field::Int32(1), Field::Int32(5), Field::Int32(9)],
            records: vec![RecordId::new(0), RecordId::new(7), RecordId::new(2)],
        }
    }

    fn full_internal() -> InternalNode {
        let keys: Vec<Field> = ["b", "d", "f", "h", "j"]
            .iter()
            .map(|s| Field::string(s.repeat(45)).unwrap())
            .collect();
        InternalNode {
            page_id: PageId::new(8),
            parent: None,
            key_type: FieldType::Str,
            keys,
            children: (10..16).map(PageId::new).collect(),
        }
    }

    #[test]
    fn test_leaf_roundtrip() {
        let node = Node::from(leaf());
        let page = node.to_page().unwrap();
        assert_eq!(Node::from_page(&page).unwrap(), node);
    }

    #[test]
    fn test_full_internal_roundtrip() {
        let node = Node::from(full_internal());
        let page = node.to_page().unwrap();
        assert_eq!(Node::from_page(&page).unwrap(), node);
    }

    #[test]
    fn test_leaf_byte_layout() {
        let page = leaf().to_page().unwrap();
        let bytes = page.as_slice();

        assert_eq!(&bytes[19..23], &3u32.to_be_bytes());
        assert_eq!(&bytes[23..31], &0u64.to_be_bytes());
        assert_eq!(&bytes[31..39], &7u64.to_be_bytes());
        // Unused offset slots are zero padded up to MAX_CHILDREN.
        assert!(bytes[47..KEYS_START].iter().all(|&b| b == 0));
        assert_eq!(&bytes[KEYS_START..KEYS_START + 4], &3u32.to_be_bytes());
        assert_eq!(&bytes[KEYS_START + 4..KEYS_START + 8], &1i32.to_be_bytes());
        assert!(bytes[KEYS_START + 16..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_root_leaf_roundtrip() {
        let node = Node::from(LeafNode::new(PageId::new(1), None, FieldType::Int64));
        let page = node.to_page().unwrap();
        let decoded = Node::from_page(&page).unwrap();
        assert!(decoded.is_leaf());
        assert!(decoded.keys().is_empty());
        assert_eq!(decoded.parent(), None);
    }

    #[test]
    fn test_overflowing_node_is_rejected() {
        let mut node = leaf();
        for k in 10..13 {
            node.keys.push(Field::Int32(k));
            node.records.push(RecordId::new(k as u64));
        }
        assert!(matches!(node.to_page(), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_mismatched_key_type_is_rejected() {
        let mut node = leaf();
        node.keys[1] = Field::Int64(5);
        assert!(matches!(node.to_page(), Err(Error::InvalidOperation(_))));
    }

    #[test]
    fn test_zeroed_page_is_corrupt() {
        assert!(matches!(
            Node::from_page(&Page::new()),
            Err(Error::Corrupted(_))
        ));
    }

    #[test]
    fn test_wrong_kind_is_invalid_operation() {
        let node = Node::from(leaf());
        assert!(matches!(
            node.clone().into_internal(),
            Err(Error::InvalidOperation(_))
        ));
        assert!(node.into_leaf().is_ok());
    }

    #[test]
    fn test_child_index() {
        let node = full_internal();
        assert_eq!(node.child_index(PageId::new(12)).unwrap(), 2);
        assert!(matches!(
            node.child_index(PageId::new(99)),
            Err(Error::InvariantViolation(_))
        ));
    }
}
