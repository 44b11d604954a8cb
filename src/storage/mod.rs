//! Storage layer - disk I/O and page formats.
//!
//! This module handles persistent storage:
//! - [`SlotFile`] - Low-level fixed-slot file I/O
//! - [`IndexFile`] / [`RecordFile`] - The two [`PageStore`]s
//! - [`Store`] - Owns both files for one tree
//! - [`page`] - Page types and layouts

mod index_file;
pub mod page;
mod page_store;
mod record_file;
mod slot_file;
mod stats;
mod store;

pub use index_file::IndexFile;
pub use page_store::PageStore;
pub use record_file::RecordFile;
pub use slot_file::{SlotFile, SlotLayout};
pub use stats::{StatsSnapshot, StoreStats};
pub use store::{Store, StoreSnapshot};
