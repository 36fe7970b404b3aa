//! Core types and traits for docrec
//!
//! This crate defines the foundational types used by the record engine:
//! - RecordId: Persistent record identity (`#cluster:position`)
//! - RecordHandle: Generation-checked arena handle
//! - FieldType: Declared field type tags
//! - Value: Closed tagged union of field payloads
//! - LinkBag: Multiset of record identities
//! - FieldPath: Pre-parsed dotted/bracket paths
//! - Schema: Class and property descriptors, `SchemaProvider`
//! - Conversion: `TypeConverter` and `DefaultConverter`
//! - Error: Error type hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
pub mod convert;
pub mod error;
pub mod field_type;
pub mod link_bag;
pub mod path;
pub mod schema;
pub mod types;
pub mod value;

// Re-export commonly used types and traits
pub use convert::{DefaultConverter, TypeConverter};
pub use error::{ConversionError, Error, Result, ValidationError};
pub use field_type::FieldType;
pub use link_bag::LinkBag;
pub use path::{FieldPath, PathParseError, PathSegment, MAX_PATH_LENGTH};
pub use schema::{ClassDescriptor, PropertyDescriptor, SchemaProvider};
pub use types::{RecordHandle, RecordId};
pub use value::Value;
