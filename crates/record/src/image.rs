//! Record images
//!
//! A `RecordImage` is the self-contained, arena-free form of a record that
//! crosses the serializer boundary. Embedded records are nested images, so a
//! serializer never needs to see arena handles.

use chrono::{DateTime, NaiveDate, Utc};
use docrec_core::{FieldType, LinkBag, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Field payload inside an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ImageValue {
    /// Null value
    Null,
    /// Boolean value
    Bool(bool),
    /// 8-bit signed integer
    Byte(i8),
    /// 16-bit signed integer
    Short(i16),
    /// 32-bit signed integer
    Integer(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 32-bit floating point
    Float(f32),
    /// 64-bit floating point
    Double(f64),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Binary(Vec<u8>),
    /// Calendar date
    Date(NaiveDate),
    /// Point in time
    DateTime(DateTime<Utc>),
    /// Reference by identity
    Link(RecordId),
    /// Nested record
    Embedded(Box<RecordImage>),
    /// Ordered list
    List(Vec<ImageValue>),
    /// Set of unique values
    Set(Vec<ImageValue>),
    /// String-keyed map
    Map(BTreeMap<String, ImageValue>),
    /// Reference bag
    LinkBag(LinkBag),
}

/// One field of an image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageField {
    /// Field name
    pub name: String,
    /// Declared type, if any
    pub field_type: Option<FieldType>,
    /// Tombstone of a removed field (delta images only)
    pub removed: bool,
    /// Payload
    pub value: ImageValue,
}

impl ImageField {
    /// A present field
    pub fn new(name: impl Into<String>, value: ImageValue) -> Self {
        ImageField {
            name: name.into(),
            field_type: None,
            removed: false,
            value,
        }
    }

    /// Set the declared type
    pub fn with_type(mut self, t: FieldType) -> Self {
        self.field_type = Some(t);
        self
    }

    /// A removal tombstone
    pub fn tombstone(name: impl Into<String>) -> Self {
        ImageField {
            name: name.into(),
            field_type: None,
            removed: true,
            value: ImageValue::Null,
        }
    }
}

/// Arena-free form of a record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordImage {
    /// Class name
    pub class_name: Option<String>,
    /// Fields, in record order
    pub fields: Vec<ImageField>,
}

impl RecordImage {
    /// Empty, class-less image
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the class name
    pub fn with_class(mut self, name: impl Into<String>) -> Self {
        self.class_name = Some(name.into());
        self
    }

    /// Append a field
    pub fn with_field(mut self, name: impl Into<String>, value: ImageValue) -> Self {
        self.fields.push(ImageField::new(name, value));
        self
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&ImageField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of present (non-tombstone) fields
    pub fn field_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .filter(|f| !f.removed)
            .map(|f| f.name.clone())
            .collect()
    }

    /// Keep only the named fields
    pub fn retain_fields(&mut self, names: &[String]) {
        self.fields.retain(|f| names.iter().any(|n| *n == f.name));
    }
}
