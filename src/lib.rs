//! pagetree - a disk-resident B+tree index.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            pagetree                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/btree/)                  │   │
//! │  │   BTree: find / insert / update / delete                 │   │
//! │  │   Node: split, merge, rebalance, root growth & collapse  │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Types (types/)                              │   │
//! │  │   Field (Int32 | Int64 | Str) + Record / RecordValue     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │           Storage Layer (storage/)                       │   │
//! │  │   Store = IndexFile (4KB pages) + RecordFile (records)   │   │
//! │  │   SlotFile + Page + NodeHeader + StoreStats              │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no buffer pool: every traversal step reads a page from disk and
//! every mutation writes the pages it touches before returning. A tree is
//! single-threaded; callers sharing one across threads must lock it.
//!
//! # Modules
//! - [`common`] - Shared primitives (PageId, RecordId, Error, config)
//! - [`types`] - Field and record codecs
//! - [`storage`] - Store files and page formats
//! - [`index`] - The B+tree
//!
//! # Quick Start
//! ```no_run
//! use pagetree::{BTree, Field, FieldType, Record, RecordValue, StorageConfig, Store};
//!
//! let store = Store::open(&StorageConfig::in_dir("/tmp/pagetree"))?;
//! let mut tree = BTree::open_or_create(store, FieldType::Str)?;
//!
//! let value = RecordValue::new().with_field("age", Field::Int32(30));
//! tree.insert(Record::new(Field::string("alice")?, value))?;
//!
//! let found = tree.find_record(&Field::string("alice")?)?;
//! assert!(found.is_some());
//! # Ok::<(), pagetree::Error>(())
//! ```

// Core modules
pub mod common;
pub mod index;
pub mod storage;
pub mod types;

// Re-export commonly used items at crate root for convenience
pub use common::config::{StorageConfig, FANOUT, PAGE_SIZE};
pub use common::{Error, ErrorKind, PageId, RecordId, Result};

pub use index::btree::{BTree, InternalNode, LeafNode, Node, TreeSummary};
pub use storage::page::Page;
pub use storage::{IndexFile, PageStore, RecordFile, StatsSnapshot, Store, StoreSnapshot, StoreStats};
pub use types::{Field, FieldType, Record, RecordValue};
