//! Disk-resident B+tree.
//!
//! - [`BTree`] - The tree handle: lookups and mutations
//! - [`Node`] / [`LeafNode`] / [`InternalNode`] - Decoded index pages
//! - [`TreeHeader`] - Root and key type, kept in page 0
//! - [`search_for_index`] / [`find_first_larger_index`] - Key search within a node
//!
//! Nodes refer to each other only by [`PageId`](crate::PageId): parents are
//! re-read from the index file when a split or merge needs them. Splits and
//! underflow fix-ups walk up the parent chain iteratively.

mod delete;
mod insert;
mod integrity;
mod meta;
mod node;
mod search;
mod tree;

pub use integrity::TreeSummary;
pub use meta::{TreeHeader, MAGIC};
pub use node::{InternalNode, LeafNode, Node};
pub use search::{find_first_larger_index, search_for_index};
pub use tree::BTree;
