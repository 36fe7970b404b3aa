//! Declared field types
//!
//! A `FieldType` is the type tag a field carries once it is declared, either
//! explicitly by the caller or by the schema property bound to it. Fields
//! without a declared type fall back to value-based inference at read time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::value::Value;

/// Enumerated type tag for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Boolean
    Boolean,
    /// 8-bit signed integer
    Byte,
    /// 16-bit signed integer
    Short,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    Long,
    /// 32-bit float
    Float,
    /// 64-bit float
    Double,
    /// UTF-8 string
    String,
    /// Raw bytes
    Binary,
    /// Calendar date
    Date,
    /// Point in time (UTC)
    DateTime,
    /// Reference to another record by identity
    Link,
    /// Ordered list of links
    LinkList,
    /// Set of links
    LinkSet,
    /// String-keyed map of links
    LinkMap,
    /// Reference bag (multiset of links)
    LinkBag,
    /// Nested record owned by the container
    Embedded,
    /// Ordered list of embedded values
    EmbeddedList,
    /// Set of embedded values
    EmbeddedSet,
    /// String-keyed map of embedded values
    EmbeddedMap,
    /// Any type, no coercion
    Any,
}

impl FieldType {
    /// All variants, in declaration order
    pub const ALL: [FieldType; 21] = [
        FieldType::Boolean,
        FieldType::Byte,
        FieldType::Short,
        FieldType::Integer,
        FieldType::Long,
        FieldType::Float,
        FieldType::Double,
        FieldType::String,
        FieldType::Binary,
        FieldType::Date,
        FieldType::DateTime,
        FieldType::Link,
        FieldType::LinkList,
        FieldType::LinkSet,
        FieldType::LinkMap,
        FieldType::LinkBag,
        FieldType::Embedded,
        FieldType::EmbeddedList,
        FieldType::EmbeddedSet,
        FieldType::EmbeddedMap,
        FieldType::Any,
    ];

    /// Upper-case schema name (`EMBEDDEDLIST`, `LINK`, ...)
    pub const fn name(&self) -> &'static str {
        match self {
            FieldType::Boolean => "BOOLEAN",
            FieldType::Byte => "BYTE",
            FieldType::Short => "SHORT",
            FieldType::Integer => "INTEGER",
            FieldType::Long => "LONG",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::String => "STRING",
            FieldType::Binary => "BINARY",
            FieldType::Date => "DATE",
            FieldType::DateTime => "DATETIME",
            FieldType::Link => "LINK",
            FieldType::LinkList => "LINKLIST",
            FieldType::LinkSet => "LINKSET",
            FieldType::LinkMap => "LINKMAP",
            FieldType::LinkBag => "LINKBAG",
            FieldType::Embedded => "EMBEDDED",
            FieldType::EmbeddedList => "EMBEDDEDLIST",
            FieldType::EmbeddedSet => "EMBEDDEDSET",
            FieldType::EmbeddedMap => "EMBEDDEDMAP",
            FieldType::Any => "ANY",
        }
    }

    /// Infer the type of a value
    ///
    /// Returns `None` for `Null`. Lists and sets are typed as embedded
    /// collections unless every element is a link.
    pub fn of(value: &Value) -> Option<FieldType> {
        let ft = match value {
            Value::Null => return None,
            Value::Bool(_) => FieldType::Boolean,
            Value::Byte(_) => FieldType::Byte,
            Value::Short(_) => FieldType::Short,
            Value::Integer(_) => FieldType::Integer,
            Value::Long(_) => FieldType::Long,
            Value::Float(_) => FieldType::Float,
            Value::Double(_) => FieldType::Double,
            Value::String(_) => FieldType::String,
            Value::Binary(_) => FieldType::Binary,
            Value::Date(_) => FieldType::Date,
            Value::DateTime(_) => FieldType::DateTime,
            Value::Link(_) => FieldType::Link,
            Value::Embedded(_) => FieldType::Embedded,
            Value::List(items) if all_links(items) => FieldType::LinkList,
            Value::List(_) => FieldType::EmbeddedList,
            Value::Set(items) if all_links(items) => FieldType::LinkSet,
            Value::Set(_) => FieldType::EmbeddedSet,
            Value::Map(map) if !map.is_empty() && map.values().all(|v| matches!(v, Value::Link(_))) => {
                FieldType::LinkMap
            }
            Value::Map(_) => FieldType::EmbeddedMap,
            Value::LinkBag(_) => FieldType::LinkBag,
        };
        Some(ft)
    }

    /// Collections, maps and bags
    pub const fn is_multi_value(&self) -> bool {
        matches!(
            self,
            FieldType::LinkList
                | FieldType::LinkSet
                | FieldType::LinkMap
                | FieldType::LinkBag
                | FieldType::EmbeddedList
                | FieldType::EmbeddedSet
                | FieldType::EmbeddedMap
        )
    }

    /// Link and link collections
    pub const fn is_link(&self) -> bool {
        matches!(
            self,
            FieldType::Link
                | FieldType::LinkList
                | FieldType::LinkSet
                | FieldType::LinkMap
                | FieldType::LinkBag
        )
    }

    /// Embedded record and embedded collections
    pub const fn is_embedded(&self) -> bool {
        matches!(
            self,
            FieldType::Embedded
                | FieldType::EmbeddedList
                | FieldType::EmbeddedSet
                | FieldType::EmbeddedMap
        )
    }

    /// Scalars: neither records, links nor collections
    pub const fn is_simple(&self) -> bool {
        matches!(
            self,
            FieldType::Boolean
                | FieldType::Byte
                | FieldType::Short
                | FieldType::Integer
                | FieldType::Long
                | FieldType::Float
                | FieldType::Double
                | FieldType::String
                | FieldType::Binary
                | FieldType::Date
                | FieldType::DateTime
        )
    }

    /// Integer and floating point types
    pub const fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Byte
                | FieldType::Short
                | FieldType::Integer
                | FieldType::Long
                | FieldType::Float
                | FieldType::Double
        )
    }
}

fn all_links(items: &[Value]) -> bool {
    !items.is_empty() && items.iter().all(|v| matches!(v, Value::Link(_)))
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldType {
    type Err = Error;

    /// Case-insensitive parse of the schema name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::invalid_argument(format!("unknown field type '{}'", s)))
    }
}
