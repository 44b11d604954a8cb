//! Field and record types with their binary codecs.
//!
//! - [`Field`] / [`FieldType`] - typed scalars with a one-byte type signal
//! - [`Record`] / [`RecordValue`] - a key plus named value fields

pub(crate) mod codec;
mod field;
mod record;

pub use field::{Field, FieldType};
pub use record::{Record, RecordValue};
