//! Insertion: leaf insert, leaf/internal splits and upward propagation.

use tracing::debug;

use crate::common::config::{FANOUT, MAX_CHILDREN, MAX_LEAF_KEYS};
use crate::common::{Error, PageId, Result};
use crate::types::{Field, Record};

use super::node::{InternalNode, LeafNode};
use super::search::{find_first_larger_index, search_for_index};
use super::tree::BTree;

/// Records kept by the left half of a split leaf: `ceil((FANOUT + 1) / 2)`.
const LEAF_SPLIT_AT: usize = (FANOUT + 1).div_ceil(2);

/// Index of the key promoted out of a split internal node.
const INTERNAL_SPLIT_AT: usize = FANOUT / 2;

impl BTree {
    pub(super) fn insert_record(&mut self, record: Record) -> Result<()> {
        let mut leaf = self.find_target_leaf(&record.key)?;
        if search_for_index(&record.key, &leaf.keys).is_some() {
            return Err(Error::AlreadyExists(record.key));
        }

        let record_id = self.store.records_mut().append_record(&record)?;
        let pos = find_first_larger_index(&record.key, &leaf.keys);
        leaf.keys.insert(pos, record.key);
        leaf.records.insert(pos, record_id);

        if leaf.len() <= MAX_LEAF_KEYS {
            return self.write_leaf(&leaf);
        }
        self.split_leaf(leaf)
    }

    /// Split an overfull leaf in two and hand the right half to the parent.
    ///
    /// The separator is the first key of the new right leaf, so a lookup for
    /// it descends right.
    fn split_leaf(&mut self, mut leaf: LeafNode) -> Result<()> {
        let right_id = self.allocate_page()?;
        let right = LeafNode {
            page_id: right_id,
            parent: leaf.parent,
            key_type: leaf.key_type,
            keys: leaf.keys.split_off(LEAF_SPLIT_AT),
            records: leaf.records.split_off(LEAF_SPLIT_AT),
        };
        let separator = right.keys[0].clone();

        self.write_leaf(&leaf)?;
        self.write_leaf(&right)?;
        debug!(
            left = %leaf.page_id,
            right = %right_id,
            separator = %separator,
            "split leaf"
        );

        self.insert_into_parent(leaf.page_id, leaf.parent, separator, right_id)
    }

    /// Insert `separator` and `right` (the new right sibling of `left`) into
    /// `left`'s parent, splitting ancestors for as long as they overflow.
    fn insert_into_parent(
        &mut self,
        mut left: PageId,
        mut parent: Option<PageId>,
        mut separator: Field,
        mut right: PageId,
    ) -> Result<()> {
        loop {
            let Some(parent_id) = parent else {
                return self.grow_root(left, separator, right);
            };

            let mut node = self.read_internal(parent_id)?;
            let pos = find_first_larger_index(&separator, &node.keys);
            if node.children.get(pos) != Some(&left) {
                return Err(Error::invariant(format!(
                    "{} is not at child slot {} of {}",
                    left, pos, parent_id
                )));
            }
            node.keys.insert(pos, separator);
            node.children.insert(pos + 1, right);

            if node.children.len() <= MAX_CHILDREN {
                return self.write_internal(&node);
            }

            let (promoted, new_right) = self.split_internal(&mut node)?;
            left = node.page_id;
            parent = node.parent;
            separator = promoted;
            right = new_right;
        }
    }

    /// Split an overfull internal node. The middle key moves up and is kept
    /// in neither half. Returns it with the page of the new right node.
    fn split_internal(&mut self, node: &mut InternalNode) -> Result<(Field, PageId)> {
        let right_id = self.allocate_page()?;

        let right_keys = node.keys.split_off(INTERNAL_SPLIT_AT + 1);
        let promoted = node.keys.pop().ok_or_else(|| {
            Error::invariant(format!("internal node {} split with no keys", node.page_id))
        })?;
        let right = InternalNode {
            page_id: right_id,
            parent: node.parent,
            key_type: node.key_type,
            keys: right_keys,
            children: node.children.split_off(INTERNAL_SPLIT_AT + 1),
        };

        self.write_internal(node)?;
        self.write_internal(&right)?;
        for &child in &right.children {
            self.set_parent(child, Some(right_id))?;
        }
        debug!(
            left = %node.page_id,
            right = %right_id,
            promoted = %promoted,
            "split internal node"
        );

        Ok((promoted, right_id))
    }

    /// Put a new internal root above the two halves of the old root.
    fn grow_root(&mut self, left: PageId, separator: Field, right: PageId) -> Result<()> {
        let root_id = self.allocate_page()?;
        let root = InternalNode {
            page_id: root_id,
            parent: None,
            key_type: self.key_type,
            keys: vec![separator],
            children: vec![left, right],
        };

        self.write_internal(&root)?;
        self.set_parent(left, Some(root_id))?;
        self.set_parent(right, Some(root_id))?;
        self.set_root(root_id)?;
        debug!(root = %root_id, "tree grew a level");
        Ok(())
    }
}
