//! Structural verification of a persisted tree.

use std::collections::VecDeque;
use std::fmt;

use crate::common::config::{MAX_CHILDREN, MAX_LEAF_KEYS, MIN_CHILDREN, MIN_LEAF_KEYS};
use crate::common::{Error, PageId, Result};
use crate::types::Field;

use super::node::Node;
use super::tree::BTree;

/// Shape of a tree that passed [`BTree::check_integrity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeSummary {
    /// Number of levels, counting the root.
    pub height: usize,
    /// Number of live node pages.
    pub nodes: usize,
    pub leaves: usize,
    /// Number of records reachable from the leaves.
    pub records: usize,
}

impl fmt::Display for TreeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "height {}, {} nodes ({} leaves), {} records",
            self.height, self.nodes, self.leaves, self.records
        )
    }
}

/// A node waiting to be checked, with the key range its parent allows.
struct Pending {
    page_id: PageId,
    parent: Option<PageId>,
    depth: usize,
    lower: Option<Field>,
    upper: Option<Field>,
}

impl BTree {
    /// Walk the whole tree breadth-first and verify its structure:
    /// - keys strictly ascending within each node and inside the range set
    ///   by the parent's separators
    /// - non-root occupancy within bounds, root internal nodes with at least
    ///   two children
    /// - every child's parent link pointing at its parent
    /// - all leaves at the same depth
    /// - every leaf entry resolving to a record with the same key
    ///
    /// # Errors
    /// Returns `Error::InvariantViolation` describing the first violation found.
    pub fn check_integrity(&self) -> Result<TreeSummary> {
        let mut summary = TreeSummary {
            height: 0,
            nodes: 0,
            leaves: 0,
            records: 0,
        };

        let mut queue = VecDeque::from([Pending {
            page_id: self.root,
            parent: None,
            depth: 1,
            lower: None,
            upper: None,
        }]);

        while let Some(pending) = queue.pop_front() {
            let node = self.read_node(pending.page_id)?;
            summary.nodes += 1;
            self.check_node(&node, &pending)?;

            match node {
                Node::Leaf(leaf) => {
                    if summary.leaves > 0 && pending.depth != summary.height {
                        return Err(Error::invariant(format!(
                            "leaf {} is at depth {}, other leaves at {}",
                            leaf.page_id, pending.depth, summary.height
                        )));
                    }
                    summary.height = pending.depth;
                    summary.leaves += 1;

                    for (key, &record_id) in leaf.keys.iter().zip(&leaf.records) {
                        let record = self.store.records().read_record(record_id)?;
                        if record.key != *key {
                            return Err(Error::invariant(format!(
                                "leaf {} maps {} to {} holding key {}",
                                leaf.page_id, key, record_id, record.key
                            )));
                        }
                    }
                    summary.records += leaf.len();
                }
                Node::Internal(internal) => {
                    for (i, &child) in internal.children.iter().enumerate() {
                        let lower = match i {
                            0 => pending.lower.clone(),
                            _ => Some(internal.keys[i - 1].clone()),
                        };
                        let upper = match internal.keys.get(i) {
                            Some(key) => Some(key.clone()),
                            None => pending.upper.clone(),
                        };
                        queue.push_back(Pending {
                            page_id: child,
                            parent: Some(internal.page_id),
                            depth: pending.depth + 1,
                            lower,
                            upper,
                        });
                    }
                }
            }
        }

        Ok(summary)
    }

    fn check_node(&self, node: &Node, pending: &Pending) -> Result<()> {
        let page_id = node.page_id();
        if node.parent() != pending.parent {
            return Err(Error::invariant(format!(
                "{} has parent {:?}, expected {:?}",
                page_id,
                node.parent(),
                pending.parent
            )));
        }
        if node.key_type() != self.key_type {
            return Err(Error::invariant(format!(
                "{} holds {:?} keys in a {:?} tree",
                page_id,
                node.key_type(),
                self.key_type
            )));
        }

        let keys = node.keys();
        if let Some(pair) = keys.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::invariant(format!(
                "{} keys out of order: {} then {}",
                page_id, pair[0], pair[1]
            )));
        }
        if let (Some(lower), Some(first)) = (&pending.lower, keys.first()) {
            if first < lower {
                return Err(Error::invariant(format!(
                    "{} key {} is below its separator {}",
                    page_id, first, lower
                )));
            }
        }
        if let (Some(upper), Some(last)) = (&pending.upper, keys.last()) {
            if last >= upper {
                return Err(Error::invariant(format!(
                    "{} key {} is not below its separator {}",
                    page_id, last, upper
                )));
            }
        }

        let is_root = pending.parent.is_none();
        match node {
            Node::Leaf(leaf) => {
                let len = leaf.len();
                if len > MAX_LEAF_KEYS || (!is_root && len < MIN_LEAF_KEYS) {
                    return Err(Error::invariant(format!(
                        "leaf {} holds {} records",
                        page_id, len
                    )));
                }
            }
            Node::Internal(internal) => {
                let children = internal.children.len();
                let min = if is_root { 2 } else { MIN_CHILDREN };
                if children > MAX_CHILDREN || children < min {
                    return Err(Error::invariant(format!(
                        "internal node {} has {} children",
                        page_id, children
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::StorageConfig;
    use crate::index::btree::LeafNode;
    use crate::storage::Store;
    use crate::types::{FieldType, Record, RecordValue};
    use tempfile::{tempdir, TempDir};

    fn new_tree() -> (TempDir, BTree) {
        let dir = tempdir().unwrap();
        let store = Store::open(&StorageConfig::in_dir(dir.path()).sync_writes(false)).unwrap();
        (dir, BTree::create(store, FieldType::Int64).unwrap())
    }

    fn record(key: i64) -> Record {
        Record::new(key, RecordValue::new().with_field("v", Field::Int64(key)))
    }

    #[test]
    fn test_empty_tree_summary() {
        let (_dir, tree) = new_tree();
        let summary = tree.check_integrity().unwrap();
        assert_eq!(
            summary,
            TreeSummary {
                height: 1,
                nodes: 1,
                leaves: 1,
                records: 0
            }
        );
    }

    #[test]
    fn test_summary_counts() {
        let (_dir, mut tree) = new_tree();
        for key in 0..6 {
            tree.insert(record(key)).unwrap();
        }

        let summary = tree.check_integrity().unwrap();
        assert_eq!(summary.height, 2);
        assert_eq!(summary.nodes, 3);
        assert_eq!(summary.leaves, 2);
        assert_eq!(summary.records, 6);
    }

    #[test]
    fn test_detects_unsorted_leaf() {
        let (_dir, mut tree) = new_tree();
        for key in [1, 2] {
            tree.insert(record(key)).unwrap();
        }

        let mut root: LeafNode = tree.node(tree.root_page()).unwrap().into_leaf().unwrap();
        root.keys.swap(0, 1);
        root.records.swap(0, 1);
        tree.write_leaf(&root).unwrap();

        assert!(matches!(
            tree.check_integrity(),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_detects_wrong_parent_link() {
        let (_dir, mut tree) = new_tree();
        for key in 0..6 {
            tree.insert(record(key)).unwrap();
        }
        let root = tree.node(tree.root_page()).unwrap().into_internal().unwrap();
        tree.set_parent(root.children[1], Some(PageId::new(99))).unwrap();

        assert!(matches!(
            tree.check_integrity(),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_detects_underfull_leaf() {
        let (_dir, mut tree) = new_tree();
        for key in 0..6 {
            tree.insert(record(key)).unwrap();
        }
        let root = tree.node(tree.root_page()).unwrap().into_internal().unwrap();
        let mut left = tree.node(root.children[0]).unwrap().into_leaf().unwrap();
        left.keys.pop();
        left.records.pop();
        tree.write_leaf(&left).unwrap();

        assert!(matches!(
            tree.check_integrity(),
            Err(Error::InvariantViolation(_))
        ));
    }
}
