//! Record identifier type.

use std::fmt;

/// Identifies a record slot in the record file.
///
/// The byte address of a record is `header + record_id × record_size`.
/// Leaves reference records exclusively through this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId(pub u64);

impl RecordId {
    /// Create a new RecordId.
    #[inline]
    pub fn new(id: u64) -> Self {
        RecordId(id)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Record({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_equality() {
        assert_eq!(RecordId::new(5), RecordId::new(5));
        assert_ne!(RecordId::new(5), RecordId::new(6));
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(format!("{}", RecordId::new(7)), "Record(7)");
    }
}
