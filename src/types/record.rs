//! Records: a key plus a schemaless, insertion-ordered set of named fields.
//!
//! # Wire format (big-endian)
//! ```text
//! key_type(1) | key(field size)
//! then, per value field in insertion order:
//!     name_len(4) | name bytes | type_signal(1) | value(field size)
//! ```
//! A record has no trailer: decoding consumes value fields until the buffer
//! ends, which works because the record store hands back exactly one
//! record-sized slot.

use std::cmp::Ordering;

use crate::common::{Error, Result};
use crate::types::codec::ByteReader;
use crate::types::field::{Field, FieldType};

/// Ordered mapping of field name to [`Field`].
///
/// No schema: any two records may carry different field sets. Setting an
/// existing name replaces its value in place and keeps its position.
///
/// # Example
/// ```
/// use pagetree::{Field, RecordValue};
///
/// let value = RecordValue::new()
///     .with_field("name", Field::string("ada").unwrap())
///     .with_field("age", Field::Int32(36));
///
/// assert_eq!(value.get("age"), Some(&Field::Int32(36)));
/// assert_eq!(value.iter().map(|(n, _)| n).collect::<Vec<_>>(), ["name", "age"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordValue {
    fields: Vec<(String, Field)>,
}

impl RecordValue {
    /// An empty value.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`RecordValue::insert`].
    pub fn with_field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.insert(name, field);
        self
    }

    /// Set a field, returning the previous value if the name was present.
    pub fn insert(&mut self, name: impl Into<String>, field: Field) -> Option<Field> {
        let name = name.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => Some(std::mem::replace(existing, field)),
            None => {
                self.fields.push((name, field));
                None
            }
        }
    }

    /// Look up a field by name.
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, field)| field)
    }

    /// Iterate fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Field)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        self.fields
            .iter()
            .map(|(name, field)| 4 + name.len() + 1 + field.size())
            .sum()
    }

    /// Check that every field can be encoded.
    pub fn validate(&self) -> Result<()> {
        for (name, field) in &self.fields {
            if u32::try_from(name.len()).is_err() {
                return Err(Error::Encoding(format!(
                    "field name of {} bytes is too long",
                    name.len()
                )));
            }
            field.validate()?;
        }
        Ok(())
    }

    pub(crate) fn encode_into(&self, out: &mut Vec<u8>) {
        for (name, field) in &self.fields {
            out.extend_from_slice(&(name.len() as u32).to_be_bytes());
            out.extend_from_slice(name.as_bytes());
            out.push(field.type_signal());
            field.encode_into(out);
        }
    }

    /// Decode fields until the reader is exhausted.
    pub(crate) fn decode(reader: &mut ByteReader<'_>) -> Result<Self> {
        let mut value = RecordValue::new();
        while !reader.is_empty() {
            let name_len = reader.read_u32()? as usize;
            let name = std::str::from_utf8(reader.read_bytes(name_len)?)
                .map_err(|e| Error::corrupted(format!("field name is not UTF-8: {}", e)))?
                .to_string();
            let field_type = FieldType::from_signal(reader.read_u8()?)?;
            let field = Field::decode(field_type, reader)?;
            value.fields.push((name, field));
        }
        Ok(value)
    }
}

impl<N: Into<String>> FromIterator<(N, Field)> for RecordValue {
    fn from_iter<I: IntoIterator<Item = (N, Field)>>(iter: I) -> Self {
        let mut value = RecordValue::new();
        for (name, field) in iter {
            value.insert(name, field);
        }
        value
    }
}

/// A key and its value, as stored in one record slot.
///
/// Records order by key only (see [`Record::cmp_key`]); equality compares
/// key and value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub key: Field,
    pub value: RecordValue,
}

impl Record {
    pub fn new(key: impl Into<Field>, value: RecordValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }

    /// Compare two records by key.
    pub fn cmp_key(&self, other: &Record) -> Ordering {
        self.key.cmp(&other.key)
    }

    /// Encoded size in bytes.
    pub fn size(&self) -> usize {
        1 + self.key.size() + self.value.size()
    }

    /// Check that the key and every value field can be encoded.
    pub fn validate(&self) -> Result<()> {
        self.key.validate()?;
        self.value.validate()
    }

    /// Encode as `key_type | key | value fields`.
    ///
    /// # Panics
    /// Panics if a string field is too long; see [`Record::validate`].
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        out.push(self.key.type_signal());
        self.key.encode_into(&mut out);
        self.value.encode_into(&mut out);
        out
    }

    /// Decode a record occupying all of `bytes`.
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        let mut reader = ByteReader::new(bytes);
        let key_type = FieldType::from_signal(reader.read_u8()?)?;
        let key = Field::decode(key_type, &mut reader)?;
        let value = RecordValue::decode(&mut reader)?;
        Ok(Self { key, value })
    }
}
