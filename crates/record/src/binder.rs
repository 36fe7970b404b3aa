//! Schema binding
//!
//! Resolves a record's class through the schema provider, caches it per
//! schema version, derives field types from property declarations and
//! converts values to the declared types.

use docrec_core::{
    ClassDescriptor, ConversionError, Error, FieldType, PropertyDescriptor, RecordHandle, Result,
    ValidationError, Value,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use crate::arena::Records;
use crate::context::Context;
use crate::entry::FieldEntry;
use crate::record::RecordStatus;

impl Records {
    /// Bind a record to a class, or unbind it with `None`
    ///
    /// The name is resolved case-insensitively and stored in its canonical
    /// spelling. Binding converts existing fields to the declared property
    /// types and installs declared defaults for missing fields.
    pub fn set_class_name(&mut self, handle: RecordHandle, name: Option<&str>, ctx: &Context<'_>) -> Result<()> {
        self.load_attributes(handle, ctx)?;
        let Some(name) = name else {
            let rec = self.record_mut(handle)?;
            rec.class = None;
            if rec.class_name.take().is_some() {
                self.mark_dirty(handle, ctx)?;
            }
            return Ok(());
        };
        if name.is_empty() {
            return Err(Error::invalid_argument("Class name is empty"));
        }

        let resolved = ctx.schema.and_then(|s| s.class(name));
        let canonical = resolved.as_ref().map_or_else(|| name.to_string(), |c| c.name.clone());
        let schema_version = ctx.schema.map_or(0, |s| s.version());

        let rec = self.record_mut(handle)?;
        let changed = rec.class_name.as_deref() != Some(canonical.as_str());
        let unmarshalling = rec.status == RecordStatus::Unmarshalling;
        rec.class_name = Some(canonical);
        rec.class = resolved.clone();
        rec.schema_version = schema_version;
        debug!(handle = %handle, class = name, resolved = resolved.is_some(), "bound class");

        if let Some(class) = resolved {
            self.convert_fields_to_class(handle, &class, ctx)?;
        }
        if changed && !unmarshalling {
            self.mark_dirty(handle, ctx)?;
        }
        Ok(())
    }

    /// Class name, resolving it from the cluster when unset
    pub fn class_name(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<Option<String>> {
        self.class_of(handle, ctx)?;
        Ok(self.record(handle)?.class_name.clone())
    }

    /// Class descriptor bound to a record, if the schema knows it
    ///
    /// The descriptor is cached until the schema version changes.
    pub fn class_of(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<Option<Arc<ClassDescriptor>>> {
        self.load_attributes(handle, ctx)?;
        let Some(schema) = ctx.schema else {
            return Ok(None);
        };
        let version = schema.version();
        let rec = self.record(handle)?;
        if let Some(class) = &rec.class {
            if rec.schema_version == version {
                return Ok(Some(class.clone()));
            }
        }
        let resolved = match &rec.class_name {
            Some(name) => schema.class(name),
            None if rec.id.is_persistent() => schema.class_by_cluster(rec.id.cluster),
            None => None,
        };

        let rec = self.record_mut(handle)?;
        if let Some(class) = &resolved {
            rec.class_name = Some(class.name.clone());
        }
        rec.class = resolved.clone();
        rec.schema_version = version;
        Ok(resolved)
    }

    /// Declared property of a field, if the record's class has one
    pub fn property(&mut self, handle: RecordHandle, name: &str, ctx: &Context<'_>) -> Result<Option<PropertyDescriptor>> {
        Ok(self
            .class_of(handle, ctx)?
            .and_then(|c| c.get_property(name).cloned()))
    }

    /// Type to store a write with: explicit, then declared, then current
    pub(crate) fn derive_field_type(
        &mut self,
        handle: RecordHandle,
        name: &str,
        explicit: Option<FieldType>,
        ctx: &Context<'_>,
    ) -> Result<Option<FieldType>> {
        if explicit.is_some() {
            return Ok(explicit);
        }
        if let Some(class) = self.class_of(handle, ctx)? {
            if let Some(property) = class.get_property(name) {
                return Ok(Some(property.field_type));
            }
        }
        Ok(self.record(handle)?.store.get(name).and_then(|e| e.field_type))
    }

    /// Convert a value to `field_type`
    ///
    /// An embedded record stored as a link becomes a reference to its
    /// identity, which must be valid.
    pub(crate) fn coerce(&self, value: Value, field_type: FieldType, ctx: &Context<'_>) -> Result<Value> {
        match (field_type, &value) {
            (FieldType::Link, Value::Embedded(child)) => {
                let id = self.record(*child)?.id;
                if id.is_valid() {
                    Ok(Value::Link(id))
                } else {
                    Err(ConversionError::new(
                        value.type_name(),
                        field_type,
                        "the record has no identity to link to",
                    )
                    .into())
                }
            }
            _ => ctx.converter.convert(value, field_type).map_err(Error::from),
        }
    }

    fn convert_fields_to_class(&mut self, handle: RecordHandle, class: &ClassDescriptor, ctx: &Context<'_>) -> Result<()> {
        self.deserialize_fields(handle, None, ctx)?;
        for property in &class.properties {
            let current = self
                .record(handle)?
                .store
                .get(&property.name)
                .map(|e| (e.exists, e.field_type, e.value.clone()));
            match current {
                Some((true, field_type, value)) if field_type != Some(property.field_type) => {
                    if value.is_null() {
                        if let Some(entry) = self.record_mut(handle)?.store.get_mut(&property.name) {
                            entry.field_type = Some(property.field_type);
                        }
                    } else {
                        self.set_field(handle, &property.name, value, Some(property.field_type), ctx)?;
                    }
                }
                // a removed entry keeps its history, so the default goes through set
                Some((false, ..)) => {
                    if let Some(default) = &property.default_value {
                        let value = ctx
                            .converter
                            .convert(Value::String(default.clone()), property.field_type)?;
                        self.set_field(handle, &property.name, value, Some(property.field_type), ctx)?;
                    }
                }
                None => {
                    if let Some(default) = &property.default_value {
                        let value = ctx
                            .converter
                            .convert(Value::String(default.clone()), property.field_type)?;
                        let rec = self.record_mut(handle)?;
                        let mut entry = if rec.tracking {
                            FieldEntry::created(value, Some(property.field_type))
                        } else {
                            FieldEntry::new(value, Some(property.field_type))
                        };
                        entry.refresh_listener(&property.name, rec.tracking);
                        rec.store.insert(property.name.clone(), entry);
                        rec.store.inc_size();
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Convert changed values to the element types their properties declare
    ///
    /// Container elements are converted to the declared linked type, and
    /// maps or class-less records stored in an embedded property of a
    /// linked class are bound to that class.
    pub fn auto_convert_values(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<()> {
        let Some(class) = self.class_of(handle, ctx)? else {
            return Ok(());
        };
        self.deserialize_fields(handle, None, ctx)?;

        for property in &class.properties {
            let value = match self.record(handle)?.store.get(&property.name) {
                Some(e) if e.exists && (e.created || e.changed) => e.value.clone(),
                _ => continue,
            };
            let full_name = format!("{}.{}", class.name, property.name);

            match (property.field_type, property.linked_type, property.linked_class.as_deref()) {
                (FieldType::EmbeddedList | FieldType::EmbeddedSet | FieldType::EmbeddedMap, Some(linked), _) => {
                    let converted = convert_elements(value.clone(), linked, ctx).map_err(|e| {
                        Error::Validation(ValidationError::new(
                            full_name.clone(),
                            format!("impossible to convert value of field \"{}\": {}", property.name, e),
                        ))
                    })?;
                    if converted != value {
                        self.replace_raw(handle, &property.name, converted)?;
                    }
                }
                (FieldType::Embedded, _, Some(linked_class)) => match value {
                    Value::Embedded(child) => {
                        let child_class = self.record(child)?.class_name.clone();
                        match child_class {
                            None => self.set_class_name(child, Some(linked_class), ctx)?,
                            Some(child_class) => {
                                let compatible = ctx
                                    .schema
                                    .map_or(true, |s| s.is_subclass_of(&child_class, linked_class));
                                if !compatible {
                                    return Err(Error::Validation(ValidationError::new(
                                        full_name,
                                        format!(
                                            "has been declared as EMBEDDED of type '{}' but the value is the document of class '{}'",
                                            linked_class, child_class
                                        ),
                                    )));
                                }
                            }
                        }
                    }
                    Value::Map(map) => {
                        let child = self.embedded_from_map(linked_class, map, ctx)?;
                        self.replace_raw(handle, &property.name, Value::Embedded(child))?;
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        Ok(())
    }

    fn embedded_from_map(
        &mut self,
        class_name: &str,
        map: BTreeMap<String, Value>,
        ctx: &Context<'_>,
    ) -> Result<RecordHandle> {
        let child = self.create();
        self.set_class_name(child, Some(class_name), ctx)?;
        for (name, value) in map {
            self.set(child, &name, value, ctx)?;
        }
        Ok(child)
    }

    /// Swap a field value without recording history, keeping owner edges
    fn replace_raw(&mut self, handle: RecordHandle, name: &str, value: Value) -> Result<()> {
        let after = value.embedded_handles();
        let entry = self
            .record_mut(handle)?
            .store
            .get_mut(name)
            .ok_or_else(|| Error::illegal_state(format!("field '{}' vanished during conversion", name)))?;
        let before = std::mem::replace(&mut entry.value, value).embedded_handles();
        self.reconcile_owners(handle, &before, &after)
    }
}

fn convert_elements(value: Value, linked: FieldType, ctx: &Context<'_>) -> std::result::Result<Value, ConversionError> {
    let convert = |item: Value| match item {
        Value::Null | Value::Embedded(_) => Ok(item),
        other => ctx.converter.convert(other, linked),
    };
    Ok(match value {
        Value::List(items) => Value::List(items.into_iter().map(convert).collect::<std::result::Result<_, _>>()?),
        Value::Set(items) => Value::Set(items.into_iter().map(convert).collect::<std::result::Result<_, _>>()?),
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| convert(v).map(|v| (k, v)))
                .collect::<std::result::Result<_, _>>()?,
        ),
        other => other,
    })
}
