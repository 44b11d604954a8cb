//! Integration tests for the store files.
//!
//! Both files implement the same `PageStore` contract; the generic checks
//! below run against each of them.

use pagetree::{
    Error, Field, IndexFile, PageStore, Record, RecordFile, RecordValue, StorageConfig, Store,
    PAGE_SIZE,
};
use tempfile::tempdir;

/// Append, read, update and delete through the trait alone.
fn exercise_store<S: PageStore>(store: &mut S, slot: impl Fn(u8) -> Vec<u8>) -> Vec<S::Offset> {
    let offsets: Vec<S::Offset> = (1..=3).map(|i| store.append(&slot(i)).unwrap()).collect();
    assert_eq!(store.slot_count(), 3);
    assert_eq!(store.slot_size(), Some(slot(0).len()));

    assert_eq!(store.read(offsets[1]).unwrap(), slot(2));

    store.update(offsets[1], &slot(9)).unwrap();
    assert_eq!(store.read(offsets[1]).unwrap(), slot(9));

    store.delete(offsets[0]).unwrap();
    assert!(store.read(offsets[0]).unwrap().iter().all(|&b| b == 0));
    // Deleted slots stay allocated.
    assert_eq!(store.slot_count(), 3);

    assert!(matches!(
        store.update(offsets[2], &[1, 2, 3]),
        Err(Error::SlotSizeMismatch { .. })
    ));
    store.sync().unwrap();

    let stats = store.stats();
    assert_eq!(stats.slots_appended, 3);
    assert_eq!(stats.slots_updated, 1);
    assert_eq!(stats.slots_deleted, 1);
    offsets
}

#[test]
fn test_index_file_contract() {
    let dir = tempdir().unwrap();
    let mut file = IndexFile::open(dir.path().join("index.tc"), false).unwrap();

    let offsets = exercise_store(&mut file, |i| vec![i; PAGE_SIZE]);

    assert_eq!(offsets[2].0, 2);
    assert_eq!(file.file_size(), 3 * PAGE_SIZE as u64);
}

#[test]
fn test_record_file_contract() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("record.tc");
    let mut file = RecordFile::open(&path, false).unwrap();

    exercise_store(&mut file, |i| vec![i; 24]);

    // 4-byte header, then three 24-byte slots.
    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(&bytes[..4], &24i32.to_be_bytes());
    assert_eq!(bytes.len(), 4 + 3 * 24);
}

#[test]
fn test_out_of_bounds_offsets() {
    let dir = tempdir().unwrap();
    let index = IndexFile::open(dir.path().join("index.tc"), false).unwrap();
    let records = RecordFile::open(dir.path().join("record.tc"), false).unwrap();

    assert!(matches!(
        index.read(pagetree::PageId::new(0)),
        Err(Error::SlotOutOfBounds(0))
    ));
    assert!(matches!(
        records.read(pagetree::RecordId::new(4)),
        Err(Error::SlotOutOfBounds(4))
    ));
}

#[test]
fn test_store_reopen_and_reset() {
    let dir = tempdir().unwrap();
    let config = StorageConfig::in_dir(dir.path());
    let record = Record::new(
        1,
        RecordValue::new().with_field("name", Field::string("ada").unwrap()),
    );

    {
        let mut store = Store::open(&config).unwrap();
        store.index_mut().allocate_page().unwrap();
        store.records_mut().append_record(&record).unwrap();
        store.close().unwrap();
    }

    let mut store = Store::open(&config).unwrap();
    assert_eq!(store.index().page_count(), 1);
    assert_eq!(store.records().record_size(), Some(record.size()));
    assert_eq!(
        store.records().read_record(pagetree::RecordId::new(0)).unwrap(),
        record
    );

    store.reset().unwrap();
    assert!(store.is_empty());
    assert_eq!(store.records().record_count(), 0);
    store.delete_all().unwrap();
    assert!(!config.index_path.exists());
}
