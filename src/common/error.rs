//! Error types for pagetree.

use thiserror::Error;

use crate::types::Field;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the stores and the tree.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from a store file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Update or delete of a key that is not in the tree.
    #[error("key {0} not found")]
    NotFound(Field),

    /// Insert of a key that is already in the tree.
    #[error("key {0} already exists")]
    AlreadyExists(Field),

    /// An operation was called on the wrong kind of node or with the wrong key type.
    ///
    /// This indicates a bug in the caller.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The tree structure is inconsistent (e.g. a merge partner is not an adjacent sibling).
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// A value cannot be encoded (e.g. a string longer than the field slot).
    #[error("encoding error: {0}")]
    Encoding(String),

    /// Bytes read from a store cannot be decoded.
    #[error("corrupted data: {0}")]
    Corrupted(String),

    /// Requested slot does not exist in the store.
    #[error("slot {0} is out of bounds")]
    SlotOutOfBounds(u64),

    /// Write whose length differs from the store's fixed slot size.
    #[error("slot size mismatch: expected {expected} bytes, got {actual}")]
    SlotSizeMismatch { expected: usize, actual: usize },

    /// A previous mutation failed part-way; the on-disk tree must be repaired.
    #[error("tree needs integrity repair after a failed mutation")]
    NeedsRepair,
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidOperation,
    InvariantViolation,
    StoreIo,
}

impl Error {
    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Error::InvalidOperation(_) | Error::Encoding(_) => ErrorKind::InvalidOperation,
            Error::InvariantViolation(_) | Error::Corrupted(_) | Error::NeedsRepair => {
                ErrorKind::InvariantViolation
            }
            Error::Io(_) | Error::SlotOutOfBounds(_) | Error::SlotSizeMismatch { .. } => {
                ErrorKind::StoreIo
            }
        }
    }

    /// Whether the caller can carry on using the tree after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self.kind(), ErrorKind::NotFound | ErrorKind::AlreadyExists)
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Error::InvariantViolation(msg.into())
    }

    pub(crate) fn corrupted(msg: impl Into<String>) -> Self {
        Error::Corrupted(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotFound(Field::Int32(42));
        assert_eq!(format!("{}", err), "key 42 not found");

        let err = Error::SlotSizeMismatch {
            expected: 16,
            actual: 20,
        };
        assert_eq!(
            format!("{}", err),
            "slot size mismatch: expected 16 bytes, got 20"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
        assert_eq!(err.kind(), ErrorKind::StoreIo);
    }

    #[test]
    fn test_recoverable_kinds() {
        assert!(Error::NotFound(Field::Int64(1)).is_recoverable());
        assert!(Error::AlreadyExists(Field::Int64(1)).is_recoverable());
        assert!(!Error::invariant("siblings not adjacent").is_recoverable());
        assert!(!Error::NeedsRepair.is_recoverable());
        assert!(!Error::SlotOutOfBounds(3).is_recoverable());
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(
            Error::Encoding("too long".into()).kind(),
            ErrorKind::InvalidOperation
        );
        assert_eq!(
            Error::corrupted("bad tag").kind(),
            ErrorKind::InvariantViolation
        );
    }
}
