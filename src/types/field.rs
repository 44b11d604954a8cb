//! Typed scalar fields and their fixed-size binary encoding.
//!
//! # Wire format (big-endian)
//! ```text
//! Int32   4 bytes   two's complement
//! Int64   8 bytes   two's complement
//! Str    50 bytes   length (u32) | content | zero padding
//! ```
//! The type of a field is not part of its encoding; callers store the
//! one-byte [`FieldType`] signal next to it (record values) or once per
//! page (node keys).

use std::cmp::Ordering;
use std::fmt;

use crate::common::config::{MAX_STRING_LEN, STRING_SLOT_SIZE};
use crate::common::{Error, Result};
use crate::types::codec::ByteReader;

/// Type tag of a [`Field`].
///
/// Uses `#[repr(u8)]` so the discriminant is the persisted type signal.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// 32-bit signed integer.
    Int32 = 0x01,
    /// Bounded UTF-8 string.
    Str = 0x02,
    /// 64-bit signed integer.
    Int64 = 0x03,
}

impl FieldType {
    /// Decode a type signal byte.
    ///
    /// # Errors
    /// Returns `Error::Corrupted` for bytes that are not a known signal.
    pub fn from_signal(signal: u8) -> Result<Self> {
        match signal {
            0x01 => Ok(FieldType::Int32),
            0x02 => Ok(FieldType::Str),
            0x03 => Ok(FieldType::Int64),
            other => Err(Error::corrupted(format!(
                "unknown field type signal {:#04x}",
                other
            ))),
        }
    }

    /// The persisted one-byte signal.
    #[inline]
    pub fn signal(self) -> u8 {
        self as u8
    }

    /// Encoded size of a field of this type.
    #[inline]
    pub fn size(self) -> usize {
        match self {
            FieldType::Int32 => 4,
            FieldType::Int64 => 8,
            FieldType::Str => STRING_SLOT_SIZE,
        }
    }
}

/// A typed scalar value: used both as a record key and as a record value.
///
/// # Example
/// ```
/// use pagetree::{Field, FieldType};
///
/// let field = Field::string("hello").unwrap();
/// assert_eq!(field.field_type(), FieldType::Str);
/// assert_eq!(field.serialize().len(), 50);
///
/// let decoded = Field::deserialize(FieldType::Str, &field.serialize()).unwrap();
/// assert_eq!(decoded, field);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Int32(i32),
    Int64(i64),
    /// At most [`MAX_STRING_LEN`] bytes; use [`Field::string`] to build one safely.
    Str(String),
}

impl Field {
    /// Build a string field, rejecting content longer than [`MAX_STRING_LEN`] bytes.
    pub fn string(value: impl Into<String>) -> Result<Self> {
        let field = Field::Str(value.into());
        field.validate()?;
        Ok(field)
    }

    /// The type tag of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            Field::Int32(_) => FieldType::Int32,
            Field::Int64(_) => FieldType::Int64,
            Field::Str(_) => FieldType::Str,
        }
    }

    /// The persisted one-byte type signal.
    #[inline]
    pub fn type_signal(&self) -> u8 {
        self.field_type().signal()
    }

    /// Encoded size in bytes (4, 8 or 50).
    #[inline]
    pub fn size(&self) -> usize {
        self.field_type().size()
    }

    /// Check that the value can be encoded.
    ///
    /// # Errors
    /// Returns `Error::Encoding` for strings longer than [`MAX_STRING_LEN`] bytes.
    pub fn validate(&self) -> Result<()> {
        match self {
            Field::Str(s) if s.len() > MAX_STRING_LEN => Err(Error::Encoding(format!(
                "string of {} bytes exceeds the {} byte limit",
                s.len(),
                MAX_STRING_LEN
            ))),
            _ => Ok(()),
        }
    }

    /// Encode the value into a fresh buffer of exactly [`Field::size`] bytes.
    ///
    /// # Panics
    /// Panics if a string is longer than [`MAX_STRING_LEN`]; call
    /// [`Field::validate`] (or build with [`Field::string`]) first.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        self.encode_into(&mut out);
        out
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            Field::Int32(v) => out.extend_from_slice(&v.to_be_bytes()),
            Field::Int64(v) => out.extend_from_slice(&v.to_be_bytes()),
            Field::Str(s) => {
                let bytes = s.as_bytes();
                assert!(
                    bytes.len() <= MAX_STRING_LEN,
                    "string field exceeds {} bytes",
                    MAX_STRING_LEN
                );
                let start = out.len();
                out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
                out.extend_from_slice(bytes);
                out.resize(start + STRING_SLOT_SIZE, 0);
            }
        }
    }

    /// Decode a value of type `field_type` from the start of `bytes`.
    ///
    /// Padding after a string's content is ignored.
    pub fn deserialize(field_type: FieldType, bytes: &[u8]) -> Result<Self> {
        Self::decode(field_type, &mut ByteReader::new(bytes))
    }

    pub(crate) fn decode(field_type: FieldType, reader: &mut ByteReader<'_>) -> Result<Self> {
        match field_type {
            FieldType::Int32 => Ok(Field::Int32(reader.read_i32()?)),
            FieldType::Int64 => Ok(Field::Int64(reader.read_i64()?)),
            FieldType::Str => {
                let len = reader.read_u32()? as usize;
                if len > MAX_STRING_LEN {
                    return Err(Error::corrupted(format!(
                        "string length {} exceeds the {} byte limit",
                        len, MAX_STRING_LEN
                    )));
                }
                let slot = reader.read_bytes(STRING_SLOT_SIZE - 4)?;
                String::from_utf8(slot[..len].to_vec())
                    .map(Field::Str)
                    .map_err(|e| Error::corrupted(format!("string field is not UTF-8: {}", e)))
            }
        }
    }
}

impl Ord for Field {
    /// Values of the same type compare naturally (strings byte-wise);
    /// values of different types order by their type signal.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Field::Int32(a), Field::Int32(b)) => a.cmp(b),
            (Field::Int64(a), Field::Int64(b)) => a.cmp(b),
            (Field::Str(a), Field::Str(b)) => a.cmp(b),
            _ => self.type_signal().cmp(&other.type_signal()),
        }
    }
}

impl PartialOrd for Field {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Int32(v) => write!(f, "{}", v),
            Field::Int64(v) => write!(f, "{}", v),
            Field::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i32> for Field {
    fn from(value: i32) -> Self {
        Field::Int32(value)
    }
}

impl From<i64> for Field {
    fn from(value: i64) -> Self {
        Field::Int64(value)
    }
}

impl TryFrom<&str> for Field {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        Field::string(value)
    }
}

impl TryFrom<String> for Field {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Field::string(value)
    }
}
