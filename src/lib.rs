//! docrec - schema-aware mutable document records
//!
//! A record is a named, ordered bag of typed fields that lives inside a
//! [`Records`] arena. Records may be bound to a schema class, embed other
//! records, carry links to persisted ones, and be lazily decoded from a
//! raw buffer produced by a [`Serializer`].
//!
//! # Quick Start
//!
//! ```ignore
//! use docrec::{BinarySerializer, Context, MemorySession, Records, SchemaRegistry, Value};
//!
//! let serializer = BinarySerializer::new();
//! let session = MemorySession::new();
//! let ctx = Context::new(&serializer).with_session(&session);
//!
//! let mut records = Records::new();
//! let person = records.create();
//! records.set(person, "name", "Ada", &ctx)?;
//! assert_eq!(records.get(person, "name", &ctx)?, Value::from("Ada"));
//!
//! let bytes = records.to_stream(person, &ctx)?;
//! ```
//!
//! # Architecture
//!
//! - `docrec-core`: identities, values, field types, paths, schema
//!   descriptors and type conversion
//! - `docrec-record`: the record arena and every record operation
//! - `docrec-codec`: the field-addressable binary format

pub use docrec_codec::{BinarySerializer, FLAG_DELTA, FORMAT_VERSION};
pub use docrec_core::{
    ClassDescriptor, ConversionError, DefaultConverter, Error, FieldPath, FieldType, LinkBag,
    PathSegment, PropertyDescriptor, RecordHandle, RecordId, Result, SchemaProvider,
    TypeConverter, ValidationError, Value,
};
pub use docrec_record::{
    check_field_name, ChangeEvent, ChangeKey, ChangeListener, Context, EntryStore, FieldEntry,
    ImageField, ImageValue, MemorySession, Record, RecordConfig, RecordImage, RecordStatus,
    Records, SchemaRegistry, Serializer, Session, StoredRecord, Timeline, TrackedMut,
    ATTRIBUTE_CLASS, ATTRIBUTE_RID, ATTRIBUTE_VERSION, CONFIG_FILE_NAME,
};
