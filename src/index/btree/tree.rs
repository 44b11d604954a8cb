//! The B+tree handle: traversal, lookups and the mutation entry points.

use tracing::{info, warn};

use crate::common::config::FANOUT;
use crate::common::{Error, PageId, Result};
use crate::storage::{Store, StoreSnapshot};
use crate::types::{Field, FieldType, Record};

use super::meta::TreeHeader;
use super::node::{InternalNode, LeafNode, Node};
use super::search::{find_first_larger_index, search_for_index};

/// A disk-resident B+tree mapping typed keys to records.
///
/// The tree owns a [`Store`]: nodes live in the index file (page 0 is the
/// [`TreeHeader`], nodes follow), records in the record file. Nothing is
/// cached; every step of a traversal reads a page and every mutation writes
/// the pages it touches before returning.
///
/// # Example
/// ```no_run
/// use pagetree::{BTree, Field, FieldType, Record, RecordValue, StorageConfig, Store};
///
/// let store = Store::open(&StorageConfig::in_dir("/tmp/db"))?;
/// let mut tree = BTree::create(store, FieldType::Int32)?;
///
/// tree.insert(Record::new(7, RecordValue::new().with_field("age", Field::Int32(30))))?;
/// assert!(tree.find_record(&Field::Int32(7))?.is_some());
/// # Ok::<(), pagetree::Error>(())
/// ```
pub struct BTree {
    pub(super) store: Store,
    pub(super) root: PageId,
    pub(super) key_type: FieldType,
    pub(super) needs_repair: bool,
}

impl BTree {
    /// Build an empty tree in an empty store.
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if the index file already holds pages.
    pub fn create(store: Store, key_type: FieldType) -> Result<Self> {
        if !store.is_empty() {
            return Err(Error::InvalidOperation(format!(
                "{} already holds a tree",
                store.config().index_path.display()
            )));
        }
        let mut tree = Self {
            store,
            root: PageId::HEADER,
            key_type,
            needs_repair: false,
        };
        tree.init()?;
        info!(key_type = ?key_type, fanout = FANOUT, "created tree");
        Ok(tree)
    }

    /// Reopen the tree persisted in `store`.
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` for an empty store and
    /// `Error::Corrupted` if the header page is invalid.
    pub fn open(store: Store) -> Result<Self> {
        if store.is_empty() {
            return Err(Error::InvalidOperation(format!(
                "{} holds no tree",
                store.config().index_path.display()
            )));
        }
        let header = TreeHeader::from_page(&store.index().read_page(PageId::HEADER)?)?;
        let tree = Self {
            store,
            root: header.root,
            key_type: header.key_type,
            needs_repair: false,
        };
        info!(key_type = ?tree.key_type, root = %tree.root, "opened tree");
        Ok(tree)
    }

    /// Reopen the tree in `store`, or create one if the store is empty.
    ///
    /// # Errors
    /// Returns `Error::InvalidOperation` if the persisted key type differs.
    pub fn open_or_create(store: Store, key_type: FieldType) -> Result<Self> {
        if store.is_empty() {
            return Self::create(store, key_type);
        }
        let tree = Self::open(store)?;
        if tree.key_type != key_type {
            return Err(Error::InvalidOperation(format!(
                "tree keys are {:?}, not {:?}",
                tree.key_type, key_type
            )));
        }
        Ok(tree)
    }

    /// Write the header page and an empty root leaf.
    fn init(&mut self) -> Result<()> {
        let header_page = self.store.index_mut().allocate_page()?;
        debug_assert!(header_page.is_header());

        let root = self.allocate_page()?;
        self.write_leaf(&LeafNode::new(root, None, self.key_type))?;
        self.set_root(root)
    }

    // ------------------------------------------------------------------
    // Page I/O
    // ------------------------------------------------------------------

    pub(super) fn read_node(&self, page_id: PageId) -> Result<Node> {
        if page_id.is_header() {
            return Err(Error::invariant("node reference to the header page"));
        }
        let node = Node::from_page(&self.store.index().read_page(page_id)?)?;
        if node.page_id() != page_id {
            return Err(Error::corrupted(format!(
                "{} holds the node for {}",
                page_id,
                node.page_id()
            )));
        }
        Ok(node)
    }

    pub(super) fn read_leaf(&self, page_id: PageId) -> Result<LeafNode> {
        self.read_node(page_id)?.into_leaf()
    }

    pub(super) fn read_internal(&self, page_id: PageId) -> Result<InternalNode> {
        self.read_node(page_id)?.into_internal()
    }

    pub(super) fn write_leaf(&mut self, leaf: &LeafNode) -> Result<()> {
        let page = leaf.to_page()?;
        self.store.index_mut().write_page(leaf.page_id, &page)
    }

    pub(super) fn write_internal(&mut self, node: &InternalNode) -> Result<()> {
        let page = node.to_page()?;
        self.store.index_mut().write_page(node.page_id, &page)
    }

    pub(super) fn allocate_page(&mut self) -> Result<PageId> {
        self.store.index_mut().allocate_page()
    }

    /// Rewrite only the parent link of a node.
    pub(super) fn set_parent(&mut self, page_id: PageId, parent: Option<PageId>) -> Result<()> {
        let mut page = self.store.index().read_page(page_id)?;
        let mut header = page.node_header()?;
        header.parent = parent;
        page.set_node_header(&header);
        self.store.index_mut().write_page(page_id, &page)
    }

    /// Adopt a new root and persist it in the header page.
    pub(super) fn set_root(&mut self, root: PageId) -> Result<()> {
        let header = TreeHeader {
            key_type: self.key_type,
            root,
        };
        self.store
            .index_mut()
            .write_page(PageId::HEADER, &header.to_page())?;
        self.root = root;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Descend from the root to the leaf that does or would hold `key`.
    pub fn find_target_leaf(&self, key: &Field) -> Result<LeafNode> {
        let mut page_id = self.root;
        loop {
            match self.read_node(page_id)? {
                Node::Leaf(leaf) => return Ok(leaf),
                Node::Internal(node) => {
                    page_id = node.children[find_first_larger_index(key, &node.keys)];
                }
            }
        }
    }

    /// Look up the record stored under `key`.
    ///
    /// Reads only; the store is never written.
    pub fn find_record(&self, key: &Field) -> Result<Option<Record>> {
        self.check_key_type(key)?;

        let leaf = self.find_target_leaf(key)?;
        let Some(index) = search_for_index(key, &leaf.keys) else {
            return Ok(None);
        };
        let record = self.store.records().read_record(leaf.records[index])?;
        if record.key != *key {
            return Err(Error::corrupted(format!(
                "{} in leaf {} holds key {}, expected {}",
                leaf.records[index], leaf.page_id, record.key, key
            )));
        }
        Ok(Some(record))
    }

    /// Whether `key` is in the tree.
    pub fn contains(&self, key: &Field) -> Result<bool> {
        self.check_key_type(key)?;
        let leaf = self.find_target_leaf(key)?;
        Ok(search_for_index(key, &leaf.keys).is_some())
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Insert a record under its key.
    ///
    /// # Errors
    /// - `Error::AlreadyExists` if the key is present (nothing is written)
    /// - `Error::InvalidOperation` / `Error::Encoding` if the key type or a
    ///   field is invalid
    /// - `Error::SlotSizeMismatch` if the record's size differs from the
    ///   records already stored
    pub fn insert(&mut self, record: Record) -> Result<()> {
        self.check_writable()?;
        self.check_record(&record)?;
        self.mutate(|tree| tree.insert_record(record))
    }

    /// Replace the value stored under `record.key` in place.
    ///
    /// # Errors
    /// Returns `Error::NotFound` if the key is absent.
    pub fn update(&mut self, record: Record) -> Result<()> {
        self.check_writable()?;
        self.check_record(&record)?;
        self.mutate(|tree| {
            let leaf = tree.find_target_leaf(&record.key)?;
            let index = search_for_index(&record.key, &leaf.keys)
                .ok_or_else(|| Error::NotFound(record.key.clone()))?;
            tree.store
                .records_mut()
                .update_record(leaf.records[index], &record)
        })
    }

    /// Remove `key` and its record.
    ///
    /// # Errors
    /// Returns `Error::NotFound` if the key is absent (nothing is written).
    pub fn delete(&mut self, key: &Field) -> Result<()> {
        self.check_writable()?;
        self.check_key_type(key)?;
        self.mutate(|tree| tree.delete_key(key))
    }

    /// Remove every record, keeping the key type.
    ///
    /// This also clears the repair flag: the files are rebuilt from scratch.
    pub fn clear(&mut self) -> Result<()> {
        self.store.reset()?;
        self.needs_repair = false;
        self.init()?;
        info!(key_type = ?self.key_type, "cleared tree");
        Ok(())
    }

    /// Run a mutation, flagging the tree for repair if it fails after
    /// touching the store.
    fn mutate<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let writes_before = self.store.stats().writes();
        let result = op(self);
        if let Err(err) = &result {
            let wrote = self.store.stats().writes() != writes_before;
            if wrote || matches!(err, Error::Io(_)) {
                self.needs_repair = true;
                warn!(error = %err, "mutation failed part-way, tree needs repair");
            }
        }
        result
    }

    fn check_writable(&self) -> Result<()> {
        if self.needs_repair {
            return Err(Error::NeedsRepair);
        }
        Ok(())
    }

    fn check_key_type(&self, key: &Field) -> Result<()> {
        if key.field_type() != self.key_type {
            return Err(Error::InvalidOperation(format!(
                "key {} is {:?}, tree keys are {:?}",
                key,
                key.field_type(),
                self.key_type
            )));
        }
        Ok(())
    }

    fn check_record(&self, record: &Record) -> Result<()> {
        self.check_key_type(&record.key)?;
        record.validate()?;
        self.store.records().check_record_size(record.size())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Whether the tree holds no records.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(match self.read_node(self.root)? {
            Node::Leaf(leaf) => leaf.is_empty(),
            Node::Internal(_) => false,
        })
    }

    /// Number of levels, counting the root (an empty tree has height 1).
    pub fn height(&self) -> Result<usize> {
        let mut height = 1;
        let mut page_id = self.root;
        while let Node::Internal(node) = self.read_node(page_id)? {
            page_id = node.children[0];
            height += 1;
        }
        Ok(height)
    }

    #[inline]
    pub fn root_page(&self) -> PageId {
        self.root
    }

    #[inline]
    pub fn key_type(&self) -> FieldType {
        self.key_type
    }

    /// Whether a failed mutation left the tree in need of repair.
    #[inline]
    pub fn needs_repair(&self) -> bool {
        self.needs_repair
    }

    /// Read any node, e.g. to walk the tree.
    pub fn node(&self, page_id: PageId) -> Result<Node> {
        self.read_node(page_id)
    }

    #[inline]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// I/O counters of the underlying files.
    pub fn stats(&self) -> StoreSnapshot {
        self.store.stats()
    }

    /// Flush and close the store.
    pub fn close(self) -> Result<()> {
        self.store.close()
    }

    /// Give back the store, e.g. to reopen the tree later.
    pub fn into_store(self) -> Store {
        self.store
    }
}
