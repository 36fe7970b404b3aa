//! Value types for docrec
//!
//! This module defines:
//! - Value: the closed tagged union every record field holds
//!
//! ## Value Model
//!
//! A field slot holds exactly one of:
//! - a scalar (`Bool`, `Byte`, `Short`, `Integer`, `Long`, `Float`,
//!   `Double`, `String`, `Binary`, `Date`, `DateTime`)
//! - a reference to another record by identity (`Link`)
//! - a nested record owned by the holder (`Embedded`), addressed by arena handle
//! - a multi-valued container (`List`, `Set`, `Map`, `LinkBag`)
//!
//! ### Equality Rules
//!
//! - Different variants are NEVER equal: `Integer(1) != Long(1)`
//! - Float equality follows IEEE-754: `NaN != NaN`, `-0.0 == 0.0`
//! - `Set` equality ignores element order
//! - `Embedded` compares handles; structural comparison of embedded records
//!   needs the arena and lives with the record engine

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

use crate::link_bag::LinkBag;
use crate::types::{RecordHandle, RecordId};

/// Dynamically typed field payload
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// Null value
    #[default]
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
    /// Reference to a record by identity
    Link(RecordId),
    /// Nested record owned by the container holding this value
    Embedded(RecordHandle),
    /// Ordered list
    List(Vec<Value>),
    /// Insertion-ordered set of unique values
    Set(Vec<Value>),
    /// String-keyed map
    Map(BTreeMap<String, Value>),
    /// Reference bag
    LinkBag(LinkBag),
}

// Custom PartialEq implementation for IEEE-754 float and set semantics
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Short(a), Value::Short(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Long(a), Value::Long(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Double(a), Value::Double(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::Link(a), Value::Link(b)) => a == b,
            (Value::Embedded(a), Value::Embedded(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().all(|v| b.contains(v))
            }
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::LinkBag(a), Value::LinkBag(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Byte(_) => "Byte",
            Value::Short(_) => "Short",
            Value::Integer(_) => "Integer",
            Value::Long(_) => "Long",
            Value::Float(_) => "Float",
            Value::Double(_) => "Double",
            Value::String(_) => "String",
            Value::Binary(_) => "Binary",
            Value::Date(_) => "Date",
            Value::DateTime(_) => "DateTime",
            Value::Link(_) => "Link",
            Value::Embedded(_) => "Embedded",
            Value::List(_) => "List",
            Value::Set(_) => "Set",
            Value::Map(_) => "Map",
            Value::LinkBag(_) => "LinkBag",
        }
    }

    /// Check if this is a null value
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Containers that can carry a change listener
    pub fn is_trackable(&self) -> bool {
        matches!(
            self,
            Value::List(_) | Value::Set(_) | Value::Map(_) | Value::LinkBag(_)
        )
    }

    /// Values whose mutations are observed by the record engine itself
    ///
    /// Writing an equal value of this kind is a no-op; writing an equal
    /// plain scalar still dirties the record.
    pub fn is_record_element(&self) -> bool {
        self.is_trackable() || matches!(self, Value::Embedded(_))
    }

    /// Number of elements of a multi-valued value
    pub fn multi_value_len(&self) -> Option<usize> {
        match self {
            Value::List(v) | Value::Set(v) => Some(v.len()),
            Value::Map(m) => Some(m.len()),
            Value::LinkBag(b) => Some(b.len()),
            _ => None,
        }
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Widen any integer variant to i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Byte(v) => Some(i64::from(*v)),
            Value::Short(v) => Some(i64::from(*v)),
            Value::Integer(v) => Some(i64::from(*v)),
            Value::Long(v) => Some(*v),
            _ => None,
        }
    }

    /// Widen any numeric variant to f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|i| i as f64),
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the link target if this is a Link value
    pub fn as_link(&self) -> Option<RecordId> {
        match self {
            Value::Link(id) => Some(*id),
            _ => None,
        }
    }

    /// Get the arena handle if this is an Embedded value
    pub fn as_embedded(&self) -> Option<RecordHandle> {
        match self {
            Value::Embedded(h) => Some(*h),
            _ => None,
        }
    }

    /// Get the elements if this is a List or Set value
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) | Value::Set(v) => Some(v),
            _ => None,
        }
    }

    /// Get as map if this is a Map value
    pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Does a multi-valued value contain `item`
    ///
    /// Maps are searched by value, bags by link.
    pub fn contains_item(&self, item: &Value) -> bool {
        match self {
            Value::List(v) | Value::Set(v) => v.contains(item),
            Value::Map(m) => m.values().any(|v| v == item),
            Value::LinkBag(b) => item.as_link().map_or(false, |id| b.contains(&id)),
            _ => false,
        }
    }

    /// Iterate the elements of a multi-valued value (map values, bag links)
    pub fn multi_value_items(&self) -> Vec<Value> {
        match self {
            Value::List(v) | Value::Set(v) => v.clone(),
            Value::Map(m) => m.values().cloned().collect(),
            Value::LinkBag(b) => b.iter().map(|id| Value::Link(*id)).collect(),
            _ => Vec::new(),
        }
    }

    /// Collect the handles of every embedded record reachable inside this value
    ///
    /// Does not descend into the embedded records themselves.
    pub fn collect_embedded(&self, out: &mut Vec<RecordHandle>) {
        match self {
            Value::Embedded(h) => out.push(*h),
            Value::List(v) | Value::Set(v) => v.iter().for_each(|i| i.collect_embedded(out)),
            Value::Map(m) => m.values().for_each(|i| i.collect_embedded(out)),
            _ => {}
        }
    }

    /// The embedded handles reachable inside this value
    pub fn embedded_handles(&self) -> Vec<RecordHandle> {
        let mut out = Vec::new();
        self.collect_embedded(&mut out);
        out
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i16> for Value {
    fn from(i: i16) -> Self {
        Value::Short(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Long(i)
    }
}

impl From<f32> for Value {
    fn from(f: f32) -> Self {
        Value::Float(f)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(a: Vec<Value>) -> Self {
        Value::List(a)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(m: BTreeMap<String, Value>) -> Self {
        Value::Map(m)
    }
}

impl From<RecordId> for Value {
    fn from(id: RecordId) -> Self {
        Value::Link(id)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::DateTime(d)
    }
}

impl From<LinkBag> for Value {
    fn from(b: LinkBag) -> Self {
        Value::LinkBag(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// ============================================================================
// serde_json interop for ergonomic JSON construction
// ============================================================================

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    i32::try_from(i).map_or(Value::Long(i), Value::Integer)
                } else {
                    Value::Double(n.as_f64().unwrap_or(0.0))
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::List(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Map(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
