//! Type conversion
//!
//! The record engine coerces values to declared field types through a
//! `TypeConverter`. `DefaultConverter` covers the scalar, temporal and
//! container conversions a schema can ask for; embedded records are left to
//! the engine because converting them needs the record arena.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::ConversionError;
use crate::field_type::FieldType;
use crate::link_bag::LinkBag;
use crate::types::RecordId;
use crate::value::Value;

/// Date format used for text conversion
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Date-time format used for text conversion
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Coerces values to field types
pub trait TypeConverter: Send + Sync {
    /// Convert `value` to `target`
    fn convert(&self, value: Value, target: FieldType) -> Result<Value, ConversionError>;
}

/// Built-in conversions
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl TypeConverter for DefaultConverter {
    fn convert(&self, value: Value, target: FieldType) -> Result<Value, ConversionError> {
        if value.is_null() || target == FieldType::Any {
            return Ok(value);
        }
        match target {
            FieldType::Boolean => to_bool(value),
            FieldType::Byte => {
                let i = to_i64(&value, target)?;
                i8::try_from(i).map(Value::Byte).map_err(|_| out_of_range(&value, target))
            }
            FieldType::Short => {
                let i = to_i64(&value, target)?;
                i16::try_from(i).map(Value::Short).map_err(|_| out_of_range(&value, target))
            }
            FieldType::Integer => {
                let i = to_i64(&value, target)?;
                i32::try_from(i).map(Value::Integer).map_err(|_| out_of_range(&value, target))
            }
            FieldType::Long => to_i64(&value, target).map(Value::Long),
            FieldType::Float => to_f64(&value, target).map(|f| Value::Float(f as f32)),
            FieldType::Double => to_f64(&value, target).map(Value::Double),
            FieldType::String => to_string(value),
            FieldType::Binary => match value {
                Value::Binary(b) => Ok(Value::Binary(b)),
                Value::String(s) => Ok(Value::Binary(s.into_bytes())),
                other => Err(unsupported(&other, target)),
            },
            FieldType::Date => to_date(value),
            FieldType::DateTime => to_datetime(value),
            FieldType::Link => match value {
                Value::Link(_) | Value::Embedded(_) => Ok(value),
                Value::String(s) => s
                    .parse::<RecordId>()
                    .map(Value::Link)
                    .map_err(|e| ConversionError::new("String", target, e.to_string())),
                other => Err(unsupported(&other, target)),
            },
            FieldType::LinkList | FieldType::EmbeddedList => match value {
                Value::List(v) | Value::Set(v) => Ok(Value::List(v)),
                Value::LinkBag(b) => Ok(Value::List(b.iter().map(|id| Value::Link(*id)).collect())),
                Value::Map(_) => Err(unsupported(&value, target)),
                single => Ok(Value::List(vec![single])),
            },
            FieldType::LinkSet | FieldType::EmbeddedSet => match value {
                Value::List(v) | Value::Set(v) => Ok(Value::Set(dedup(v))),
                Value::LinkBag(b) => Ok(Value::Set(dedup(b.iter().map(|id| Value::Link(*id)).collect()))),
                Value::Map(_) => Err(unsupported(&value, target)),
                single => Ok(Value::Set(vec![single])),
            },
            FieldType::LinkMap | FieldType::EmbeddedMap => match value {
                Value::Map(m) => Ok(Value::Map(m)),
                other => Err(unsupported(&other, target)),
            },
            FieldType::LinkBag => match value {
                Value::LinkBag(b) => Ok(Value::LinkBag(b)),
                Value::List(v) | Value::Set(v) => {
                    let mut bag = LinkBag::new();
                    for item in v {
                        match item {
                            Value::Link(id) => bag.add(id),
                            other => {
                                return Err(ConversionError::new(
                                    other.type_name(),
                                    target,
                                    "reference bags hold links only",
                                ))
                            }
                        }
                    }
                    Ok(Value::LinkBag(bag))
                }
                Value::Link(id) => Ok(Value::LinkBag(std::iter::once(id).collect())),
                other => Err(unsupported(&other, target)),
            },
            FieldType::Embedded => match value {
                Value::Embedded(_) | Value::Map(_) => Ok(value),
                other => Err(unsupported(&other, target)),
            },
            FieldType::Any => Ok(value),
        }
    }
}

fn unsupported(value: &Value, target: FieldType) -> ConversionError {
    ConversionError::new(value.type_name(), target, "unsupported conversion")
}

fn out_of_range(value: &Value, target: FieldType) -> ConversionError {
    ConversionError::new(value.type_name(), target, "value out of range")
}

fn dedup(items: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

fn to_bool(value: Value) -> Result<Value, ConversionError> {
    match value {
        Value::Bool(b) => Ok(Value::Bool(b)),
        Value::String(ref s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(ConversionError::new("String", FieldType::Boolean, format!("'{}' is not a boolean", s))),
        },
        other => match other.as_i64() {
            Some(i) => Ok(Value::Bool(i != 0)),
            None => Err(unsupported(&other, FieldType::Boolean)),
        },
    }
}

fn to_i64(value: &Value, target: FieldType) -> Result<i64, ConversionError> {
    match value {
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Float(_) | Value::Double(_) => {
            let f = value.as_f64().unwrap_or(f64::NAN);
            if f.is_finite() && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Ok(f.trunc() as i64)
            } else {
                Err(out_of_range(value, target))
            }
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ConversionError::new("String", target, format!("'{}' is not a number", s))),
        Value::Date(d) => Ok(date_millis(d)),
        Value::DateTime(dt) => Ok(dt.timestamp_millis()),
        other => other.as_i64().ok_or_else(|| unsupported(other, target)),
    }
}

fn to_f64(value: &Value, target: FieldType) -> Result<f64, ConversionError> {
    match value {
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ConversionError::new("String", target, format!("'{}' is not a number", s))),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        other => other.as_f64().ok_or_else(|| unsupported(other, target)),
    }
}

fn to_string(value: Value) -> Result<Value, ConversionError> {
    let s = match value {
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Byte(v) => v.to_string(),
        Value::Short(v) => v.to_string(),
        Value::Integer(v) => v.to_string(),
        Value::Long(v) => v.to_string(),
        Value::Float(v) => v.to_string(),
        Value::Double(v) => v.to_string(),
        Value::Date(d) => d.format(DATE_FORMAT).to_string(),
        Value::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
        Value::Link(id) => id.to_string(),
        Value::Binary(b) => String::from_utf8(b)
            .map_err(|_| ConversionError::new("Binary", FieldType::String, "not valid UTF-8"))?,
        other => return Err(unsupported(&other, FieldType::String)),
    };
    Ok(Value::String(s))
}

fn date_millis(d: &NaiveDate) -> i64 {
    d.and_hms_opt(0, 0, 0)
        .map(|ndt| Utc.from_utc_datetime(&ndt).timestamp_millis())
        .unwrap_or_default()
}

fn from_millis(millis: i64, target: FieldType) -> Result<DateTime<Utc>, ConversionError> {
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| ConversionError::new("Long", target, "timestamp out of range"))
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(s, DATETIME_FORMAT) {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

fn to_date(value: Value) -> Result<Value, ConversionError> {
    match value {
        Value::Date(d) => Ok(Value::Date(d)),
        Value::DateTime(dt) => Ok(Value::Date(dt.date_naive())),
        Value::String(ref s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
            .ok()
            .or_else(|| parse_datetime(s).map(|dt| dt.date_naive()))
            .map(Value::Date)
            .ok_or_else(|| ConversionError::new("String", FieldType::Date, format!("'{}' is not a date", s))),
        other => match other.as_i64() {
            Some(ms) => from_millis(ms, FieldType::Date).map(|dt| Value::Date(dt.date_naive())),
            None => Err(unsupported(&other, FieldType::Date)),
        },
    }
}

fn to_datetime(value: Value) -> Result<Value, ConversionError> {
    match value {
        Value::DateTime(dt) => Ok(Value::DateTime(dt)),
        Value::Date(d) => Ok(Value::DateTime(
            from_millis(date_millis(&d), FieldType::DateTime)?,
        )),
        Value::String(ref s) => parse_datetime(s)
            .map(Value::DateTime)
            .ok_or_else(|| ConversionError::new("String", FieldType::DateTime, format!("'{}' is not a date-time", s))),
        other => match other.as_i64() {
            Some(ms) => from_millis(ms, FieldType::DateTime).map(Value::DateTime),
            None => Err(unsupported(&other, FieldType::DateTime)),
        },
    }
}
