//! Deletion: leaf removal and the merge/rebalance fix-up that keeps every
//! non-root node at least half full.
//!
//! A node that drops below its minimum first tries to merge with its right
//! sibling, then its left one. When both siblings are too full to absorb it,
//! one entry is moved over from a sibling that has a surplus instead. Merges
//! remove a child from the parent, so the fix-up walks up the parent chain
//! until a node is left within bounds or the root is reached.

use tracing::debug;

use crate::common::config::{MAX_CHILDREN, MAX_LEAF_KEYS, MIN_CHILDREN, MIN_LEAF_KEYS};
use crate::common::{Error, PageId, Result};
use crate::types::Field;

use super::node::{InternalNode, LeafNode};
use super::search::search_for_index;
use super::tree::BTree;

/// Checks that `right` directly follows `left` in `parent` and returns the
/// index of `left`.
fn adjacent_position(parent: &InternalNode, left: PageId, right: PageId) -> Result<usize> {
    let left_pos = parent.child_index(left)?;
    let right_pos = parent.child_index(right)?;
    if right_pos != left_pos + 1 {
        return Err(Error::invariant(format!(
            "{} (slot {}) and {} (slot {}) are not adjacent siblings in {}",
            left, left_pos, right, right_pos, parent.page_id
        )));
    }
    Ok(left_pos)
}

impl BTree {
    pub(super) fn delete_key(&mut self, key: &Field) -> Result<()> {
        let mut leaf = self.find_target_leaf(key)?;
        let index =
            search_for_index(key, &leaf.keys).ok_or_else(|| Error::NotFound(key.clone()))?;

        leaf.keys.remove(index);
        let record_id = leaf.records.remove(index);
        self.store.records_mut().delete_record(record_id)?;

        if leaf.parent.is_none() || leaf.len() >= MIN_LEAF_KEYS {
            return self.write_leaf(&leaf);
        }
        self.fix_leaf_underflow(leaf)
    }

    /// Restore the minimum occupancy of a non-root leaf.
    fn fix_leaf_underflow(&mut self, leaf: LeafNode) -> Result<()> {
        let parent_id = leaf
            .parent
            .ok_or_else(|| Error::invariant("root leaf passed to underflow fix-up"))?;
        let mut parent = self.read_internal(parent_id)?;
        let pos = parent.child_index(leaf.page_id)?;

        let right = match parent.children.get(pos + 1) {
            Some(&id) => Some(self.read_leaf(id)?),
            None => None,
        };
        let left = match pos.checked_sub(1) {
            Some(i) => Some(self.read_leaf(parent.children[i])?),
            None => None,
        };

        match (left, right) {
            (_, Some(right)) if leaf.len() + right.len() <= MAX_LEAF_KEYS => {
                self.merge_leaves(&mut parent, leaf, right)?;
                self.fix_internal(parent)
            }
            (Some(left), _) if left.len() + leaf.len() <= MAX_LEAF_KEYS => {
                self.merge_leaves(&mut parent, left, leaf)?;
                self.fix_internal(parent)
            }
            (_, Some(right)) if right.len() > MIN_LEAF_KEYS => {
                self.borrow_from_right_leaf(&mut parent, leaf, right)
            }
            (Some(left), _) if left.len() > MIN_LEAF_KEYS => {
                self.borrow_from_left_leaf(&mut parent, left, leaf)
            }
            _ => Err(Error::invariant(format!(
                "leaf {} has no sibling to merge with or borrow from",
                leaf.page_id
            ))),
        }
    }

    /// Move every entry of `right` into `left` and drop `right` from the
    /// parent. The parent is not written; the caller fixes it up.
    fn merge_leaves(
        &mut self,
        parent: &mut InternalNode,
        mut left: LeafNode,
        right: LeafNode,
    ) -> Result<()> {
        let pos = adjacent_position(parent, left.page_id, right.page_id)?;

        left.keys.extend(right.keys);
        left.records.extend(right.records);
        parent.keys.remove(pos);
        parent.children.remove(pos + 1);

        self.write_leaf(&left)?;
        self.store.index_mut().zero_page(right.page_id)?;
        debug!(into = %left.page_id, removed = %right.page_id, "merged leaves");
        Ok(())
    }

    fn borrow_from_right_leaf(
        &mut self,
        parent: &mut InternalNode,
        mut leaf: LeafNode,
        mut right: LeafNode,
    ) -> Result<()> {
        let pos = adjacent_position(parent, leaf.page_id, right.page_id)?;

        leaf.keys.push(right.keys.remove(0));
        leaf.records.push(right.records.remove(0));
        parent.keys[pos] = right.keys[0].clone();

        self.write_leaf(&leaf)?;
        self.write_leaf(&right)?;
        self.write_internal(parent)?;
        debug!(from = %right.page_id, to = %leaf.page_id, "moved first entry of right leaf");
        Ok(())
    }

    fn borrow_from_left_leaf(
        &mut self,
        parent: &mut InternalNode,
        mut left: LeafNode,
        mut leaf: LeafNode,
    ) -> Result<()> {
        let pos = adjacent_position(parent, left.page_id, leaf.page_id)?;

        let (Some(key), Some(record)) = (left.keys.pop(), left.records.pop()) else {
            return Err(Error::invariant(format!("leaf {} is empty", left.page_id)));
        };
        parent.keys[pos] = key.clone();
        leaf.keys.insert(0, key);
        leaf.records.insert(0, record);

        self.write_leaf(&left)?;
        self.write_leaf(&leaf)?;
        self.write_internal(parent)?;
        debug!(from = %left.page_id, to = %leaf.page_id, "moved last entry of left leaf");
        Ok(())
    }

    /// Persist an internal node that just lost a child, merging or
    /// rebalancing it and its ancestors as needed.
    fn fix_internal(&mut self, mut node: InternalNode) -> Result<()> {
        loop {
            let Some(parent_id) = node.parent else {
                return self.settle_root(node);
            };
            if node.children.len() >= MIN_CHILDREN {
                return self.write_internal(&node);
            }

            let mut parent = self.read_internal(parent_id)?;
            let pos = parent.child_index(node.page_id)?;

            let right = match parent.children.get(pos + 1) {
                Some(&id) => Some(self.read_internal(id)?),
                None => None,
            };
            let left = match pos.checked_sub(1) {
                Some(i) => Some(self.read_internal(parent.children[i])?),
                None => None,
            };

            match (left, right) {
                (_, Some(right)) if node.children.len() + right.children.len() <= MAX_CHILDREN => {
                    self.merge_internal(&mut parent, node, right)?;
                }
                (Some(left), _) if left.children.len() + node.children.len() <= MAX_CHILDREN => {
                    self.merge_internal(&mut parent, left, node)?;
                }
                (_, Some(right)) if right.children.len() > MIN_CHILDREN => {
                    return self.rotate_from_right(&mut parent, node, right);
                }
                (Some(left), _) if left.children.len() > MIN_CHILDREN => {
                    return self.rotate_from_left(&mut parent, left, node);
                }
                _ => {
                    return Err(Error::invariant(format!(
                        "internal node {} has no sibling to merge with or borrow from",
                        node.page_id
                    )))
                }
            }

            node = parent;
        }
    }

    /// Write the root, or drop it if it is left with a single child.
    fn settle_root(&mut self, root: InternalNode) -> Result<()> {
        if root.children.len() > 1 {
            return self.write_internal(&root);
        }
        let child = root.children[0];
        self.set_parent(child, None)?;
        self.set_root(child)?;
        self.store.index_mut().zero_page(root.page_id)?;
        debug!(old_root = %root.page_id, new_root = %child, "tree shrank a level");
        Ok(())
    }

    /// Fold `right` into `left`, pulling the separator down from the parent.
    fn merge_internal(
        &mut self,
        parent: &mut InternalNode,
        mut left: InternalNode,
        right: InternalNode,
    ) -> Result<()> {
        let pos = adjacent_position(parent, left.page_id, right.page_id)?;

        left.keys.push(parent.keys.remove(pos));
        left.keys.extend(right.keys);
        parent.children.remove(pos + 1);
        for &child in &right.children {
            self.set_parent(child, Some(left.page_id))?;
        }
        left.children.extend(right.children);

        self.write_internal(&left)?;
        self.store.index_mut().zero_page(right.page_id)?;
        debug!(into = %left.page_id, removed = %right.page_id, "merged internal nodes");
        Ok(())
    }

    /// Move the first child of `right` under `node`, rotating keys through
    /// the parent.
    fn rotate_from_right(
        &mut self,
        parent: &mut InternalNode,
        mut node: InternalNode,
        mut right: InternalNode,
    ) -> Result<()> {
        let pos = adjacent_position(parent, node.page_id, right.page_id)?;

        let separator = std::mem::replace(&mut parent.keys[pos], right.keys.remove(0));
        node.keys.push(separator);
        let child = right.children.remove(0);
        node.children.push(child);

        self.set_parent(child, Some(node.page_id))?;
        self.write_internal(&node)?;
        self.write_internal(&right)?;
        self.write_internal(parent)?;
        debug!(from = %right.page_id, to = %node.page_id, "rotated child from right sibling");
        Ok(())
    }

    /// Move the last child of `left` under `node`, rotating keys through
    /// the parent.
    fn rotate_from_left(
        &mut self,
        parent: &mut InternalNode,
        mut left: InternalNode,
        mut node: InternalNode,
    ) -> Result<()> {
        let pos = adjacent_position(parent, left.page_id, node.page_id)?;

        let (Some(key), Some(child)) = (left.keys.pop(), left.children.pop()) else {
            return Err(Error::invariant(format!(
                "internal node {} is empty",
                left.page_id
            )));
        };
        let separator = std::mem::replace(&mut parent.keys[pos], key);
        node.keys.insert(0, separator);
        node.children.insert(0, child);

        self.set_parent(child, Some(node.page_id))?;
        self.write_internal(&left)?;
        self.write_internal(&node)?;
        self.write_internal(parent)?;
        debug!(from = %left.page_id, to = %node.page_id, "rotated child from left sibling");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::StorageConfig;
    use crate::storage::Store;
    use crate::types::{FieldType, Record, RecordValue};
    use tempfile::{tempdir, TempDir};

    fn new_tree() -> (TempDir, BTree) {
        let dir = tempdir().unwrap();
        let store = Store::open(&StorageConfig::in_dir(dir.path()).sync_writes(false)).unwrap();
        (dir, BTree::create(store, FieldType::Int32).unwrap())
    }

    fn record(key: i32) -> Record {
        Record::new(key, RecordValue::new().with_field("v", Field::Int32(key)))
    }

    fn fill(tree: &mut BTree, keys: impl IntoIterator<Item = i32>) {
        for key in keys {
            tree.insert(record(key)).unwrap();
        }
    }

    fn leaf_keys(tree: &BTree, page_id: PageId) -> Vec<i32> {
        tree.node(page_id)
            .unwrap()
            .keys()
            .iter()
            .map(|k| match k {
                Field::Int32(v) => *v,
                other => panic!("unexpected key {}", other),
            })
            .collect()
    }

    #[test]
    fn test_adjacent_position() {
        let parent = InternalNode {
            page_id: PageId::new(1),
            parent: None,
            key_type: FieldType::Int32,
            keys: vec![Field::Int32(10), Field::Int32(20)],
            children: vec![PageId::new(2), PageId::new(3), PageId::new(4)],
        };
        assert_eq!(
            adjacent_position(&parent, PageId::new(3), PageId::new(4)).unwrap(),
            1
        );
        assert!(matches!(
            adjacent_position(&parent, PageId::new(2), PageId::new(4)),
            Err(Error::InvariantViolation(_))
        ));
        assert!(matches!(
            adjacent_position(&parent, PageId::new(4), PageId::new(3)),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_delete_from_root_leaf() {
        let (_dir, mut tree) = new_tree();
        fill(&mut tree, [1, 2]);

        tree.delete(&Field::Int32(1)).unwrap();
        tree.delete(&Field::Int32(2)).unwrap();

        assert!(tree.is_empty().unwrap());
        assert!(matches!(
            tree.delete(&Field::Int32(2)),
            Err(Error::NotFound(Field::Int32(2)))
        ));
        assert!(!tree.needs_repair());
    }

    #[test]
    fn test_leaf_merge_collapses_root() {
        let (_dir, mut tree) = new_tree();
        // [0 1 2] [3 4 5]
        fill(&mut tree, 0..6);

        tree.delete(&Field::Int32(0)).unwrap();

        // [1 2] + [3 4 5] fits in one leaf, which becomes the root.
        assert_eq!(tree.height().unwrap(), 1);
        assert_eq!(leaf_keys(&tree, tree.root_page()), vec![1, 2, 3, 4, 5]);
        assert_eq!(tree.node(tree.root_page()).unwrap().parent(), None);
        tree.check_integrity().unwrap();
    }

    #[test]
    fn test_borrow_from_right_leaf() {
        let (_dir, mut tree) = new_tree();
        // [0 1 2] [3 4 5 6]
        fill(&mut tree, 0..7);

        tree.delete(&Field::Int32(0)).unwrap();

        let root = tree.node(tree.root_page()).unwrap().into_internal().unwrap();
        assert_eq!(leaf_keys(&tree, root.children[0]), vec![1, 2, 3]);
        assert_eq!(leaf_keys(&tree, root.children[1]), vec![4, 5, 6]);
        assert_eq!(root.keys, vec![Field::Int32(4)]);
        tree.check_integrity().unwrap();
    }

    #[test]
    fn test_borrow_from_left_leaf() {
        let (_dir, mut tree) = new_tree();
        // [0 1 2] [3 4 5], then the left leaf grows to [-2 -1 0 1 2].
        fill(&mut tree, 0..6);
        fill(&mut tree, [-2, -1]);

        tree.delete(&Field::Int32(5)).unwrap();

        let root = tree.node(tree.root_page()).unwrap().into_internal().unwrap();
        assert_eq!(leaf_keys(&tree, root.children[0]), vec![-2, -1, 0, 1]);
        assert_eq!(leaf_keys(&tree, root.children[1]), vec![2, 3, 4]);
        assert_eq!(root.keys, vec![Field::Int32(2)]);
        tree.check_integrity().unwrap();
    }

    #[test]
    fn test_deleted_record_slot_is_zeroed() {
        let (_dir, mut tree) = new_tree();
        fill(&mut tree, [7]);
        let leaf = tree.find_target_leaf(&Field::Int32(7)).unwrap();
        let record_id = leaf.records[0];

        tree.delete(&Field::Int32(7)).unwrap();

        assert!(matches!(
            tree.store().records().read_record(record_id),
            Err(Error::Corrupted(_))
        ));
    }

    #[test]
    fn test_internal_merge_shrinks_tree() {
        let (_dir, mut tree) = new_tree();
        fill(&mut tree, 0..21);
        assert_eq!(tree.height().unwrap(), 3);

        for key in 0..21 {
            tree.delete(&Field::Int32(key)).unwrap();
            tree.check_integrity().unwrap();
        }

        assert_eq!(tree.height().unwrap(), 1);
        assert!(tree.is_empty().unwrap());
    }

    #[test]
    fn test_rotate_from_right_internal() {
        let (_dir, mut tree) = new_tree();
        // Root over two internal nodes with 3 and 6 leaves.
        fill(&mut tree, 0..27);
        let root = tree.node(tree.root_page()).unwrap().into_internal().unwrap();
        assert_eq!(root.children.len(), 2);

        // The leftmost leaves merge, leaving the left internal node with 2 children.
        tree.delete(&Field::Int32(0)).unwrap();

        let root = tree.node(tree.root_page()).unwrap().into_internal().unwrap();
        let left = tree.node(root.children[0]).unwrap().into_internal().unwrap();
        let right = tree.node(root.children[1]).unwrap().into_internal().unwrap();
        assert_eq!(left.children.len(), 3);
        assert_eq!(right.children.len(), 5);
        assert_eq!(root.keys, vec![Field::Int32(12)]);
        assert_eq!(
            tree.node(left.children[2]).unwrap().parent(),
            Some(left.page_id)
        );
        tree.check_integrity().unwrap();
    }

    #[test]
    fn test_rotate_from_left_internal() {
        let (_dir, mut tree) = new_tree();
        fill(&mut tree, 0..21);
        // Grow the left internal node to 5 leaves.
        fill(&mut tree, (-6..0).rev());

        for key in 9..13 {
            tree.delete(&Field::Int32(key)).unwrap();
            tree.check_integrity().unwrap();
        }

        let root = tree.node(tree.root_page()).unwrap().into_internal().unwrap();
        let left = tree.node(root.children[0]).unwrap().into_internal().unwrap();
        let right = tree.node(root.children[1]).unwrap().into_internal().unwrap();
        assert_eq!(left.children.len(), 4);
        assert_eq!(right.children.len(), 3);
        for key in (-6..9).chain(13..21) {
            assert!(tree.contains(&Field::Int32(key)).unwrap());
        }
    }
}
