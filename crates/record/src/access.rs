//! Field access protocol
//!
//! `get`, `set`, `remove` and friends. Every accessor first makes sure the
//! record is loaded and the addressed field is materialized from the raw
//! buffer. Reserved names (`@class`, `@rid`, `@version`) bypass the entry
//! store, and path-like names resolve segment by segment when chained
//! access is enabled.

use docrec_core::{Error, FieldPath, FieldType, PathSegment, RecordHandle, RecordId, Result, Value};
use tracing::warn;

use crate::arena::Records;
use crate::context::Context;
use crate::entry::FieldEntry;
use crate::record::RecordStatus;
use crate::tracked::TrackedMut;

/// Reserved name of the class attribute
pub const ATTRIBUTE_CLASS: &str = "@class";
/// Reserved name of the identity attribute
pub const ATTRIBUTE_RID: &str = "@rid";
/// Reserved name of the version attribute
pub const ATTRIBUTE_VERSION: &str = "@version";

const INVALID_NAME_CHARS: [char; 6] = [':', ',', ';', '%', '=', ' '];

/// Reject empty names and names with reserved characters
pub fn check_field_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument("Field name is empty"));
    }
    if let Some(c) = name.chars().find(|c| INVALID_NAME_CHARS.contains(c)) {
        return Err(Error::invalid_argument(format!(
            "Invalid field name '{}': character '{}' is not allowed",
            name, c
        )));
    }
    Ok(())
}

fn is_attribute(name: &str) -> bool {
    name.starts_with('@')
}

impl Records {
    // ========================================================================
    // Reads
    // ========================================================================

    /// Value of a field, `Null` when absent
    pub fn get(&mut self, handle: RecordHandle, name: &str, ctx: &Context<'_>) -> Result<Value> {
        if name.is_empty() {
            return Err(Error::invalid_argument("Field name is empty"));
        }
        if is_attribute(name) {
            return self.attribute(handle, name, ctx);
        }
        self.check_for_loading(handle, ctx)?;
        self.deserialize_fields(handle, Some(&[name.to_string()]), ctx)?;

        let rec = self.record(handle)?;
        if let Some(entry) = rec.store.get(name) {
            return Ok(if entry.exists {
                entry.value.clone()
            } else {
                Value::Null
            });
        }
        if rec.chained_access && FieldPath::is_path_like(name) {
            let path: FieldPath = name.parse()?;
            if !path.is_simple() {
                return self.get_path(handle, &path, ctx);
            }
        }
        Ok(Value::Null)
    }

    /// Value at a pre-parsed path, `Null` when any segment is absent
    ///
    /// A field segment applied to a list or set collects that field from
    /// every element.
    pub fn get_path(&mut self, handle: RecordHandle, path: &FieldPath, ctx: &Context<'_>) -> Result<Value> {
        let mut current = self.get(handle, path.root(), ctx)?;
        for seg in path.tail() {
            current = self.step(current, seg, ctx)?;
        }
        Ok(current)
    }

    fn step(&mut self, current: Value, seg: &PathSegment, ctx: &Context<'_>) -> Result<Value> {
        Ok(match (current, seg) {
            (Value::Embedded(child), PathSegment::Field(f)) => self.get(child, f, ctx)?,
            (Value::Link(id), PathSegment::Field(f)) => match self.find_by_identity(&id) {
                Some(target) => self.get(target, f, ctx)?,
                None => Value::Null,
            },
            (Value::Map(mut map), PathSegment::Field(f)) => map.remove(f.as_str()).unwrap_or_default(),
            (Value::List(items) | Value::Set(items), PathSegment::Field(_)) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.step(item, seg, ctx)?);
                }
                Value::List(out)
            }
            (Value::List(mut items) | Value::Set(mut items), PathSegment::Index(i)) => {
                if *i < items.len() {
                    items.swap_remove(*i)
                } else {
                    Value::Null
                }
            }
            (Value::LinkBag(bag), PathSegment::Index(i)) => {
                bag.iter().nth(*i).map_or(Value::Null, |id| Value::Link(*id))
            }
            _ => Value::Null,
        })
    }

    /// Is the field logically present
    pub fn exists(&mut self, handle: RecordHandle, name: &str, ctx: &Context<'_>) -> Result<bool> {
        if is_attribute(name) {
            return Ok(matches!(name, ATTRIBUTE_CLASS | ATTRIBUTE_RID | ATTRIBUTE_VERSION));
        }
        self.check_for_loading(handle, ctx)?;
        self.deserialize_fields(handle, Some(&[name.to_string()]), ctx)?;
        Ok(self.record(handle)?.store.exists(name))
    }

    /// Names of existing fields in record order
    pub fn names(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<Vec<String>> {
        self.materialize(handle, ctx)?;
        Ok(self.record(handle)?.store.names())
    }

    /// Values of existing fields in record order
    pub fn values(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<Vec<Value>> {
        Ok(self.fields(handle, ctx)?.into_iter().map(|(_, v)| v).collect())
    }

    /// Existing fields as name/value pairs in record order
    pub fn fields(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<Vec<(String, Value)>> {
        self.materialize(handle, ctx)?;
        Ok(self
            .record(handle)?
            .store
            .iter()
            .filter(|(_, e)| e.exists)
            .map(|(n, e)| (n.clone(), e.value.clone()))
            .collect())
    }

    /// Number of existing fields
    pub fn field_count(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<usize> {
        self.materialize(handle, ctx)?;
        Ok(self.record(handle)?.store.field_size())
    }

    pub(crate) fn materialize(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<()> {
        self.check_for_loading(handle, ctx)?;
        self.deserialize_fields(handle, None, ctx)?;
        Ok(())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Write a field, typed by the schema or the value
    pub fn set(&mut self, handle: RecordHandle, name: &str, value: impl Into<Value>, ctx: &Context<'_>) -> Result<()> {
        self.set_field(handle, name, value.into(), None, ctx).map(|_| ())
    }

    /// Write a field with an explicit type
    pub fn set_typed(
        &mut self,
        handle: RecordHandle,
        name: &str,
        value: impl Into<Value>,
        field_type: FieldType,
        ctx: &Context<'_>,
    ) -> Result<()> {
        self.set_field(handle, name, value.into(), Some(field_type), ctx)
            .map(|_| ())
    }

    /// Write a field; returns whether the stored value changed
    pub(crate) fn set_field(
        &mut self,
        handle: RecordHandle,
        name: &str,
        value: Value,
        explicit: Option<FieldType>,
        ctx: &Context<'_>,
    ) -> Result<bool> {
        if name.is_empty() {
            return Err(Error::invalid_argument("Field name is empty"));
        }
        if is_attribute(name) {
            self.set_attribute(handle, name, value, ctx)?;
            return Ok(true);
        }
        self.check_for_loading(handle, ctx)?;

        let rec = self.record(handle)?;
        if rec.chained_access && FieldPath::is_path_like(name) && !rec.store.contains(name) {
            let path: FieldPath = name.parse()?;
            if !path.is_simple() {
                self.set_path(handle, &path, value, explicit, ctx)?;
                return Ok(true);
            }
        }
        check_field_name(name)?;
        self.deserialize_fields(handle, Some(&[name.to_string()]), ctx)?;

        let field_type = self.derive_field_type(handle, name, explicit, ctx)?;
        let value = match field_type {
            Some(t) => self.coerce(value, t, ctx)?,
            None => value,
        };
        self.install(handle, name, value, field_type, ctx)
    }

    fn install(
        &mut self,
        handle: RecordHandle,
        name: &str,
        value: Value,
        field_type: Option<FieldType>,
        ctx: &Context<'_>,
    ) -> Result<bool> {
        let unchanged = {
            let rec = self.record(handle)?;
            match rec.store.get(name) {
                Some(e) if e.exists && (field_type.is_none() || field_type == e.field_type) => {
                    match self.value_eq(&e.value, &value) {
                        Ok(eq) => eq,
                        Err(err) => {
                            warn!(handle = %handle, field = name, error = %err, "comparison failed, treating value as changed");
                            false
                        }
                    }
                }
                _ => false,
            }
        };
        if unchanged {
            if !value.is_record_element() {
                self.mark_dirty(handle, ctx)?;
            }
            return Ok(false);
        }

        let before = self
            .record(handle)?
            .store
            .get(name)
            .filter(|e| e.exists)
            .map(|e| e.value.embedded_handles())
            .unwrap_or_default();
        let after = value.embedded_handles();
        self.check_attachable(handle, &before, &after)?;

        let rec = self.record_mut(handle)?;
        let tracking = rec.tracking;
        let unmarshalling = rec.status == RecordStatus::Unmarshalling;
        let mut grew = false;
        match rec.store.get_mut(name) {
            Some(entry) => {
                if tracking && !unmarshalling {
                    entry.mark_changed()?;
                }
                if !entry.exists {
                    entry.exists = true;
                    grew = true;
                }
                entry.value = value;
                entry.timeline = None;
                if field_type.is_some() {
                    entry.field_type = field_type;
                }
                entry.refresh_listener(name, tracking);
            }
            None => {
                let mut entry = if tracking && !unmarshalling {
                    FieldEntry::created(value, field_type)
                } else {
                    FieldEntry::new(value, field_type)
                };
                entry.refresh_listener(name, tracking);
                rec.store.insert(name, entry);
                grew = true;
            }
        }
        if grew {
            rec.store.inc_size();
        }

        self.reconcile_owners(handle, &before, &after)?;
        if !unmarshalling {
            self.mark_dirty(handle, ctx)?;
        }
        Ok(true)
    }

    /// Remove a field, returning its value
    ///
    /// Tracked fields that predate the current dirty episode are kept as
    /// non-existing entries so the removal can be undone and diffed.
    pub fn remove(&mut self, handle: RecordHandle, name: &str, ctx: &Context<'_>) -> Result<Option<Value>> {
        if name.is_empty() {
            return Err(Error::invalid_argument("Field name is empty"));
        }
        if is_attribute(name) {
            return self.remove_attribute(handle, name, ctx).map(Some);
        }
        self.check_for_loading(handle, ctx)?;
        self.deserialize_fields(handle, Some(&[name.to_string()]), ctx)?;

        let rec = self.record_mut(handle)?;
        let tracking = rec.tracking;
        let (old, hard) = match rec.store.get_mut(name) {
            Some(entry) if entry.exists => {
                if tracking && !entry.created {
                    entry.mark_changed()?;
                    entry.exists = false;
                    entry.listener = None;
                    (std::mem::take(&mut entry.value), false)
                } else {
                    (entry.value.clone(), true)
                }
            }
            _ => return Ok(None),
        };
        if hard {
            rec.store.remove(name);
        }
        rec.store.dec_size();

        self.reconcile_owners(handle, &old.embedded_handles(), &[])?;
        self.mark_dirty(handle, ctx)?;
        Ok(Some(old))
    }

    // ========================================================================
    // Paths
    // ========================================================================

    fn set_path(
        &mut self,
        handle: RecordHandle,
        path: &FieldPath,
        value: Value,
        explicit: Option<FieldType>,
        ctx: &Context<'_>,
    ) -> Result<()> {
        let invalid = |reason: String| Error::invalid_path(path.to_string(), reason);
        let Some((last, middle)) = path.tail().split_last() else {
            return self.set_field(handle, path.root(), value, explicit, ctx).map(|_| ());
        };

        // location of the penultimate value: a field of `record`, then `inner`
        let mut record = handle;
        let mut field = path.root().to_string();
        let mut inner: Vec<PathSegment> = Vec::new();
        for seg in middle {
            let current = self.value_at(record, &field, &inner, ctx)?;
            match (&current, seg) {
                (Value::Null, _) => {
                    return Err(invalid(format!("'{}' is null before {}", field, seg)));
                }
                (Value::Embedded(child), PathSegment::Field(f)) => {
                    record = *child;
                    field = f.clone();
                    inner.clear();
                }
                (Value::Link(id), PathSegment::Field(f)) => match self.find_by_identity(id) {
                    Some(target) => {
                        record = target;
                        field = f.clone();
                        inner.clear();
                    }
                    None => return Err(invalid(format!("linked record {} is not loaded", id))),
                },
                (Value::Map(_), PathSegment::Field(_))
                | (Value::List(_) | Value::Set(_), PathSegment::Index(_)) => inner.push(seg.clone()),
                (other, seg) => {
                    return Err(invalid(format!("cannot apply {} to {}", seg, other.type_name())));
                }
            }
        }

        let parent = self.value_at(record, &field, &inner, ctx)?;
        match (parent, last) {
            (Value::Null, _) => Err(invalid(format!("'{}' is null before {}", field, last))),
            (Value::Embedded(child), PathSegment::Field(f)) => {
                self.set_field(child, f, value, explicit, ctx).map(|_| ())
            }
            (Value::Link(id), PathSegment::Field(f)) => match self.find_by_identity(&id) {
                Some(target) => self.set_field(target, f, value, explicit, ctx).map(|_| ()),
                None => Err(invalid(format!("linked record {} is not loaded", id))),
            },
            (Value::Map(_), PathSegment::Field(key)) => {
                let value = self.coerce_opt(value, explicit, ctx)?;
                let key = key.clone();
                self.edit_at(record, &field, &inner, ctx, Box::new(move |t| t.map_insert(key, value).map(|_| ())))
            }
            (Value::List(items), PathSegment::Index(i)) => {
                if *i >= items.len() {
                    return Err(invalid(format!("index {} out of range (len {})", i, items.len())));
                }
                let value = self.coerce_opt(value, explicit, ctx)?;
                let i = *i;
                self.edit_at(record, &field, &inner, ctx, Box::new(move |t| t.set_index(i, value).map(|_| ())))
            }
            (Value::List(items) | Value::Set(items), PathSegment::Field(f)) => {
                for (idx, item) in items.iter().enumerate() {
                    match item {
                        Value::Embedded(child) => {
                            self.set_field(*child, f, value.clone(), explicit, ctx)?;
                        }
                        Value::Map(_) => {
                            let mut nested = inner.clone();
                            nested.push(PathSegment::Index(idx));
                            let (key, v) = (f.clone(), self.coerce_opt(value.clone(), explicit, ctx)?);
                            self.edit_at(record, &field, &nested, ctx, Box::new(move |t| t.map_insert(key, v).map(|_| ())))?;
                        }
                        Value::Link(_) => {
                            return Err(Error::invalid_argument(format!(
                                "cannot set '{}' through the links of '{}'",
                                f, path
                            )));
                        }
                        _ => {}
                    }
                }
                Ok(())
            }
            (other, seg) => Err(invalid(format!("cannot apply {} to {}", seg, other.type_name()))),
        }
    }

    fn value_at(
        &mut self,
        record: RecordHandle,
        field: &str,
        inner: &[PathSegment],
        ctx: &Context<'_>,
    ) -> Result<Value> {
        let mut current = self.get(record, field, ctx)?;
        for seg in inner {
            current = match (current, seg) {
                (Value::Map(mut map), PathSegment::Field(k)) => map.remove(k.as_str()).unwrap_or_default(),
                (Value::List(mut items) | Value::Set(mut items), PathSegment::Index(i)) if *i < items.len() => {
                    items.swap_remove(*i)
                }
                _ => Value::Null,
            };
        }
        Ok(current)
    }

    fn edit_at(
        &mut self,
        record: RecordHandle,
        field: &str,
        inner: &[PathSegment],
        ctx: &Context<'_>,
        edit: Box<dyn FnOnce(&mut TrackedMut<'_>) -> Result<()> + '_>,
    ) -> Result<()> {
        self.edit_field(record, field, ctx, |t| t.at_path(inner, edit))
    }

    fn coerce_opt(&self, value: Value, field_type: Option<FieldType>, ctx: &Context<'_>) -> Result<Value> {
        match field_type {
            Some(t) => self.coerce(value, t, ctx),
            None => Ok(value),
        }
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    fn attribute(&mut self, handle: RecordHandle, name: &str, ctx: &Context<'_>) -> Result<Value> {
        match name {
            ATTRIBUTE_CLASS => Ok(self.class_name(handle, ctx)?.map_or(Value::Null, Value::String)),
            ATTRIBUTE_RID => Ok(Value::Link(self.record(handle)?.id)),
            ATTRIBUTE_VERSION => {
                let version = self.record(handle)?.version;
                Ok(Value::Long(i64::try_from(version).unwrap_or(i64::MAX)))
            }
            other => Err(Error::invalid_argument(format!("unknown attribute '{}'", other))),
        }
    }

    fn set_attribute(&mut self, handle: RecordHandle, name: &str, value: Value, ctx: &Context<'_>) -> Result<()> {
        match name {
            ATTRIBUTE_CLASS => match value {
                Value::Null => self.set_class_name(handle, None, ctx),
                Value::String(class) => self.set_class_name(handle, Some(&class), ctx),
                other => Err(Error::invalid_argument(format!(
                    "{} must be a string, got {}",
                    ATTRIBUTE_CLASS,
                    other.type_name()
                ))),
            },
            ATTRIBUTE_RID => {
                let id = match value {
                    Value::Null => RecordId::unassigned(),
                    Value::Link(id) => id,
                    Value::String(s) => s.parse()?,
                    other => {
                        return Err(Error::invalid_argument(format!(
                            "{} must be a link or text, got {}",
                            ATTRIBUTE_RID,
                            other.type_name()
                        )))
                    }
                };
                self.set_identity(handle, id)
            }
            ATTRIBUTE_VERSION => {
                let version = match &value {
                    Value::String(s) => s.trim().parse::<i64>().ok(),
                    other => other.as_i64(),
                };
                let version = version
                    .and_then(|v| u64::try_from(v).ok())
                    .ok_or_else(|| Error::invalid_argument(format!("invalid {} {:?}", ATTRIBUTE_VERSION, value)))?;
                self.set_version(handle, version)
            }
            other => Err(Error::invalid_argument(format!("unknown attribute '{}'", other))),
        }
    }

    fn remove_attribute(&mut self, handle: RecordHandle, name: &str, ctx: &Context<'_>) -> Result<Value> {
        let old = self.attribute(handle, name, ctx)?;
        match name {
            ATTRIBUTE_CLASS => self.set_class_name(handle, None, ctx)?,
            ATTRIBUTE_RID => self.set_identity(handle, RecordId::unassigned())?,
            _ => self.set_version(handle, 0)?,
        }
        Ok(old)
    }

    /// Identity of a record
    pub fn identity(&self, handle: RecordHandle) -> Result<RecordId> {
        Ok(self.record(handle)?.id)
    }

    /// Assign an identity
    pub fn set_identity(&mut self, handle: RecordHandle, id: RecordId) -> Result<()> {
        self.record_mut(handle)?.id = id;
        Ok(())
    }

    /// Version of a record
    pub fn version(&self, handle: RecordHandle) -> Result<u64> {
        Ok(self.record(handle)?.version)
    }

    /// Assign a version
    pub fn set_version(&mut self, handle: RecordHandle, version: u64) -> Result<()> {
        self.record_mut(handle)?.version = version;
        Ok(())
    }

    /// Enable or disable path resolution of names with `.` or `[`
    pub fn set_allow_chained_access(&mut self, handle: RecordHandle, allow: bool) -> Result<()> {
        self.record_mut(handle)?.chained_access = allow;
        Ok(())
    }
}
