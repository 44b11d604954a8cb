//! Configuration for pagetree.
//!
//! Layout constants are fixed at compile time because they are baked into
//! the on-disk format. File locations and durability are runtime options in
//! [`StorageConfig`].

use std::path::{Path, PathBuf};

/// Size of an index page in bytes (4KB).
///
/// Every B+tree node and the tree header occupy exactly one page.
/// Page N of the index file is located at byte `N × PAGE_SIZE`.
pub const PAGE_SIZE: usize = 4096;

/// Tree order: the maximum number of keys a node holds before it splits.
pub const FANOUT: usize = 5;

/// Maximum number of records in a leaf.
pub const MAX_LEAF_KEYS: usize = FANOUT;

/// Maximum number of child pointers in an internal node.
pub const MAX_CHILDREN: usize = FANOUT + 1;

/// Minimum number of records in a non-root leaf: `ceil(FANOUT / 2)`.
pub const MIN_LEAF_KEYS: usize = FANOUT.div_ceil(2);

/// Minimum number of children of a non-root internal node: `ceil((FANOUT + 1) / 2)`.
pub const MIN_CHILDREN: usize = (FANOUT + 1).div_ceil(2);

/// Size of a persisted offset (page or record slot index).
pub const OFFSET_SIZE: usize = 8;

/// Longest string (in bytes) a string field can hold.
pub const MAX_STRING_LEN: usize = 45;

/// Fixed on-disk size of a string field: 4-byte length prefix plus padded content.
pub const STRING_SLOT_SIZE: usize = 50;

/// Size of the record file header (`record_size` as a big-endian i32).
pub const RECORD_FILE_HEADER_SIZE: usize = 4;

/// Default index file name used by [`StorageConfig::in_dir`].
pub const DEFAULT_INDEX_FILE: &str = "index.tc";

/// Default record file name used by [`StorageConfig::in_dir`].
pub const DEFAULT_RECORD_FILE: &str = "record.tc";

/// Bytes used by a node page when every slot is full:
/// header (19) + count (4) + `MAX_CHILDREN` offsets + key count (4) + `FANOUT` widest keys.
pub const MAX_NODE_BYTES: usize =
    19 + 4 + MAX_CHILDREN * OFFSET_SIZE + 4 + FANOUT * STRING_SLOT_SIZE;

const _: () = assert!(MAX_NODE_BYTES <= PAGE_SIZE, "node layout does not fit in a page");
const _: () = assert!(MAX_STRING_LEN + 4 <= STRING_SLOT_SIZE);

/// Where the two store files live and how writes are made durable.
///
/// # Example
/// ```
/// use pagetree::common::config::StorageConfig;
///
/// let config = StorageConfig::in_dir("/tmp/db").sync_writes(false);
/// assert!(config.index_path.ends_with("index.tc"));
/// assert!(!config.sync_writes);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Path of the index (node page) file.
    pub index_path: PathBuf,
    /// Path of the record file.
    pub record_path: PathBuf,
    /// Call `fsync()` after every write.
    pub sync_writes: bool,
}

impl StorageConfig {
    /// Config with explicit file paths and synchronous writes.
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(index_path: P, record_path: Q) -> Self {
        Self {
            index_path: index_path.into(),
            record_path: record_path.into(),
            sync_writes: true,
        }
    }

    /// Config using the default file names inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(DEFAULT_INDEX_FILE), dir.join(DEFAULT_RECORD_FILE))
    }

    /// Enable or disable `fsync()` after each write.
    pub fn sync_writes(mut self, sync: bool) -> Self {
        self.sync_writes = sync;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_size_is_power_of_two() {
        assert!(PAGE_SIZE.is_power_of_two());
        assert_eq!(PAGE_SIZE, 4096);
    }

    #[test]
    fn test_occupancy_bounds() {
        assert_eq!(MIN_LEAF_KEYS, 3);
        assert_eq!(MIN_CHILDREN, 3);
        assert_eq!(MAX_CHILDREN, 6);
    }

    #[test]
    fn test_in_dir_uses_default_names() {
        let config = StorageConfig::in_dir("/data");
        assert_eq!(config.index_path, PathBuf::from("/data/index.tc"));
        assert_eq!(config.record_path, PathBuf::from("/data/record.tc"));
        assert!(config.sync_writes);
    }
}
