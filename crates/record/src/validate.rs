//! Schema validation
//!
//! Checks a record against its class: strict mode first, then every
//! declared property (mandatory, not-null, regex, container shape, linked
//! class, min/max, read-only). The first violation is returned as a
//! `ValidationError` naming the property as `Class.property`.

use chrono::{DateTime, Utc};
use docrec_core::{ClassDescriptor, Error, FieldType, PropertyDescriptor, RecordHandle, Result, ValidationError, Value};
use tracing::debug;

use crate::arena::Records;
use crate::context::Context;
use crate::record::RecordStatus;

fn violation(property: &str, reason: impl Into<String>) -> Error {
    Error::Validation(ValidationError::new(property, reason))
}

impl Records {
    /// Validate a record against its class
    ///
    /// Does nothing when validation is disabled, by the session or by the
    /// arena configuration, or when the record has no known class.
    pub fn validate(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<()> {
        if !ctx.validation_enabled(self.config().validation) {
            return Ok(());
        }
        self.materialize(handle, ctx)?;
        let Some(class) = self.class_of(handle, ctx)? else {
            return Ok(());
        };
        let outcome = self.validate_against(handle, &class, ctx);
        if let Err(e) = &outcome {
            debug!(handle = %handle, class = %class.name, error = %e, "validation failed");
        }
        outcome
    }

    fn validate_against(&mut self, handle: RecordHandle, class: &ClassDescriptor, ctx: &Context<'_>) -> Result<()> {
        if class.strict_mode {
            let rec = self.record(handle)?;
            if let Some(extra) = rec.store.names().into_iter().find(|n| !class.has_property(n)) {
                return Err(violation(
                    &extra,
                    format!(
                        "is not allowed: found additional field '{}'. It cannot be added because the schema class '{}' is defined as STRICT",
                        extra, class.name
                    ),
                ));
            }
        }
        for property in &class.properties {
            self.validate_property(handle, class, property, ctx)?;
        }
        Ok(())
    }

    fn validate_property(
        &mut self,
        handle: RecordHandle,
        class: &ClassDescriptor,
        property: &PropertyDescriptor,
        ctx: &Context<'_>,
    ) -> Result<()> {
        let full = format!("{}.{}", class.name, property.name);
        let rec = self.record(handle)?;
        let entry = rec.store.get(&property.name);
        let present = entry.map_or(false, |e| e.exists);
        let value = entry.filter(|e| e.exists).map(|e| e.value.clone()).unwrap_or_default();

        if property.mandatory && !present {
            return Err(violation(&full, format!("is mandatory, but not found on record: {}", rec.id)));
        }
        if property.not_null && present && value.is_null() {
            return Err(violation(&full, "cannot be null"));
        }

        if !value.is_null() {
            if let (Some(pattern), Value::String(s)) = (&property.regex, &value) {
                if !property.matches_regex(s)? {
                    return Err(violation(
                        &full,
                        format!("does not match the regular expression '{}'. Field value is: {}", pattern, s),
                    ));
                }
            }
            self.check_shape(&full, property, &value, ctx)?;
            if let Some(min) = &property.min {
                check_bound(&full, &value, min, true, ctx)?;
            }
            if let Some(max) = &property.max {
                check_bound(&full, &value, max, false, ctx)?;
            }
        }

        if property.readonly {
            self.check_readonly(handle, &full, property)?;
        }
        Ok(())
    }

    fn check_shape(&mut self, full: &str, property: &PropertyDescriptor, value: &Value, ctx: &Context<'_>) -> Result<()> {
        let compatible = match property.field_type {
            FieldType::Link => matches!(value, Value::Link(_) | Value::Embedded(_)),
            FieldType::LinkList | FieldType::EmbeddedList => matches!(value, Value::List(_)),
            FieldType::LinkSet | FieldType::EmbeddedSet => matches!(value, Value::Set(_)),
            FieldType::LinkMap | FieldType::EmbeddedMap => matches!(value, Value::Map(_)),
            FieldType::LinkBag => matches!(value, Value::LinkBag(_)),
            FieldType::Embedded => matches!(value, Value::Embedded(_) | Value::Map(_)),
            _ => true,
        };
        if !compatible {
            return Err(violation(
                full,
                format!(
                    "has been declared as {} but an incompatible type is used. Value: {:?}",
                    property.field_type, value
                ),
            ));
        }

        if property.field_type.is_link() {
            if property.field_type == FieldType::Link {
                self.check_link(full, property, value, ctx)?;
            }
            for item in value.multi_value_items() {
                if !matches!(item, Value::Link(_) | Value::Embedded(_) | Value::Null) {
                    return Err(violation(
                        full,
                        format!(
                            "has been declared as {} but contains a value of type {}",
                            property.field_type,
                            item.type_name()
                        ),
                    ));
                }
                self.check_link(full, property, &item, ctx)?;
            }
        }

        match (property.field_type, value) {
            (FieldType::Embedded, Value::Embedded(child)) => {
                self.check_not_persistent(full, property, *child)?;
                self.check_linked_class(full, property, *child, ctx)?;
                self.validate(*child, ctx)?;
            }
            (FieldType::EmbeddedList | FieldType::EmbeddedSet | FieldType::EmbeddedMap, _) => {
                for item in value.multi_value_items() {
                    match (&item, property.linked_type) {
                        (Value::Embedded(child), _) => {
                            self.check_not_persistent(full, property, *child)?;
                            self.check_linked_class(full, property, *child, ctx)?;
                            self.validate(*child, ctx)?;
                        }
                        (Value::Null, _) | (_, None) => {}
                        (other, Some(linked)) => {
                            if FieldType::of(other) != Some(linked) {
                                return Err(violation(
                                    full,
                                    format!(
                                        "has been declared as {} of {} but contains a value of type {}",
                                        property.field_type,
                                        linked,
                                        other.type_name()
                                    ),
                                ));
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// A link target, when its class is known, must belong to the linked class
    fn check_link(&mut self, full: &str, property: &PropertyDescriptor, item: &Value, ctx: &Context<'_>) -> Result<()> {
        let Some(linked) = &property.linked_class else {
            return Ok(());
        };
        let target_class = match item {
            Value::Null => {
                return Err(violation(
                    full,
                    format!("contains a null record but declares the linked class '{}'", linked),
                ))
            }
            Value::Embedded(child) => self.class_name(*child, ctx)?,
            Value::Link(id) => match self.find_by_identity(id) {
                Some(target) if self.record(target)?.status() != RecordStatus::NotLoaded => {
                    self.class_name(target, ctx)?
                }
                _ => ctx
                    .schema
                    .and_then(|s| s.class_by_cluster(id.cluster))
                    .map(|c| c.name.clone()),
            },
            _ => return Ok(()),
        };
        let Some(target_class) = target_class else {
            return Ok(());
        };
        let compatible = match ctx.schema {
            Some(schema) => schema.is_subclass_of(&target_class, linked),
            None => target_class.eq_ignore_ascii_case(linked),
        };
        if compatible {
            Ok(())
        } else {
            Err(violation(
                full,
                format!(
                    "has been declared as {} of type '{}' but the value is the document {:?} of class '{}'",
                    property.field_type,
                    linked,
                    item,
                    target_class
                ),
            ))
        }
    }

    fn check_not_persistent(&self, full: &str, property: &PropertyDescriptor, child: RecordHandle) -> Result<()> {
        let id = self.record(child)?.id();
        if id.is_valid() {
            return Err(violation(
                full,
                format!(
                    "has been declared as {} but the value is a document with the valid RecordID {}",
                    property.field_type, id
                ),
            ));
        }
        Ok(())
    }

    fn check_linked_class(
        &mut self,
        full: &str,
        property: &PropertyDescriptor,
        child: RecordHandle,
        ctx: &Context<'_>,
    ) -> Result<()> {
        let Some(linked) = &property.linked_class else {
            return Ok(());
        };
        let child_class = self.class_name(child, ctx)?;
        let compatible = match (&child_class, ctx.schema) {
            (Some(c), Some(schema)) => schema.is_subclass_of(c, linked),
            (Some(c), None) => c.eq_ignore_ascii_case(linked),
            (None, _) => false,
        };
        if compatible {
            Ok(())
        } else {
            Err(violation(
                full,
                format!(
                    "has been declared as {} of type '{}' but the value is the document of class '{}'",
                    property.field_type,
                    linked,
                    child_class.unwrap_or_default()
                ),
            ))
        }
    }

    fn check_readonly(&self, handle: RecordHandle, full: &str, property: &PropertyDescriptor) -> Result<()> {
        let Some(entry) = self.record(handle)?.store.get(&property.name) else {
            return Ok(());
        };
        let touched = entry.changed || entry.timeline.as_ref().map_or(false, |t| !t.is_empty());
        if !touched || entry.created {
            return Ok(());
        }
        let current = if entry.exists { entry.value.clone() } else { Value::Null };
        let altered = if property.field_type.is_simple() {
            true
        } else {
            match entry.on_load_value()? {
                Some(original) => !self.value_eq(&original, &current).unwrap_or(false),
                None => !current.is_null(),
            }
        };
        if altered {
            return Err(violation(
                full,
                format!("is immutable and cannot be altered. Field value is: {:?}", current),
            ));
        }
        Ok(())
    }
}

fn to_datetime(value: &Value, ctx: &Context<'_>) -> Option<DateTime<Utc>> {
    match ctx.converter.convert(value.clone(), FieldType::DateTime) {
        Ok(Value::DateTime(dt)) => Some(dt),
        _ => None,
    }
}

fn check_bound(full: &str, value: &Value, bound: &str, is_min: bool, ctx: &Context<'_>) -> Result<()> {
    let kind = if is_min { "min" } else { "max" };
    let invalid_bound = || violation(full, format!("declares an invalid {} value '{}'", kind, bound));

    let size = |len: usize, unit: &str| -> Result<()> {
        let limit: usize = bound.trim().parse().map_err(|_| invalid_bound())?;
        if is_min && len < limit {
            Err(violation(full, format!("contains fewer {} than {} requested", unit, bound)))
        } else if !is_min && len > limit {
            Err(violation(full, format!("contains more {} than {} requested", unit, bound)))
        } else {
            Ok(())
        }
    };

    match value {
        Value::String(s) => size(s.chars().count(), "characters"),
        Value::Binary(b) => size(b.len(), "bytes"),
        Value::Date(_) | Value::DateTime(_) => {
            let actual = to_datetime(value, ctx).ok_or_else(invalid_bound)?;
            let bound_type = if matches!(value, Value::Date(_)) { FieldType::Date } else { FieldType::DateTime };
            let limit = ctx
                .converter
                .convert(Value::String(bound.to_string()), bound_type)
                .ok()
                .and_then(|v| to_datetime(&v, ctx))
                .ok_or_else(invalid_bound)?;
            if is_min && actual < limit {
                Err(violation(
                    full,
                    format!("contains the date {} which precedes the first acceptable date ({})", actual, bound),
                ))
            } else if !is_min && actual > limit {
                Err(violation(
                    full,
                    format!("contains the date {} which is after the last acceptable date ({})", actual, bound),
                ))
            } else {
                Ok(())
            }
        }
        v if v.multi_value_len().is_some() => size(v.multi_value_len().unwrap_or(0), "items"),
        v => {
            let below_or_above = match (v.as_i64(), bound.trim().parse::<i64>()) {
                (Some(actual), Ok(limit)) if !matches!(v, Value::Float(_) | Value::Double(_)) => {
                    if is_min { actual < limit } else { actual > limit }
                }
                _ => match (v.as_f64(), bound.trim().parse::<f64>()) {
                    (Some(actual), Ok(limit)) => {
                        if is_min { actual < limit } else { actual > limit }
                    }
                    (Some(_), Err(_)) => return Err(invalid_bound()),
                    (None, _) => return Ok(()),
                },
            };
            if below_or_above {
                let relation = if is_min { "less" } else { "greater" };
                Err(violation(full, format!("is {} than {}", relation, bound)))
            } else {
                Ok(())
            }
        }
    }
}
