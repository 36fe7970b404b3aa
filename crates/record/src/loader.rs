//! Loading, lazy decoding and the serializer boundary
//!
//! A record may hold its content as a raw buffer. Fields are decoded on
//! demand: a read of `name` decodes just that field, any mutation decodes
//! everything. A fully decoded record drops its buffer; a partial decode
//! keeps it for the remaining fields.

use docrec_core::{Error, FieldPath, RecordHandle, RecordId, Result, Value};
use std::collections::BTreeMap;
use tracing::{debug, trace};

use crate::access::ATTRIBUTE_CLASS;
use crate::arena::Records;
use crate::context::Context;
use crate::entry::FieldEntry;
use crate::image::{ImageField, ImageValue, RecordImage};
use crate::record::{Record, RecordStatus};

impl Records {
    /// Fetch a not-yet-loaded record through the session
    pub fn check_for_loading(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<()> {
        let rec = self.record(handle)?;
        if rec.status != RecordStatus::NotLoaded {
            return Ok(());
        }
        let id = rec.id;
        if !id.is_valid() {
            self.record_mut(handle)?.status = RecordStatus::Loaded;
            return Ok(());
        }
        let session = ctx
            .session
            .ok_or_else(|| Error::illegal_state(format!("cannot load {}: no active session", id)))?;

        self.record_mut(handle)?.status = RecordStatus::Loading;
        debug!(handle = %handle, id = %id, "loading record");
        match session.load_by_identity(&id) {
            Ok(Some(stored)) => {
                let rec = self.record_mut(handle)?;
                rec.source = Some(stored.buffer);
                rec.version = stored.version;
                rec.status = RecordStatus::Loaded;
                rec.dirty = false;
                rec.content_changed = false;
                if !rec.lazy_load {
                    self.deserialize_fields(handle, None, ctx)?;
                }
                Ok(())
            }
            Ok(None) => {
                self.record_mut(handle)?.status = RecordStatus::NotLoaded;
                Err(Error::RecordNotFound(id))
            }
            Err(e) => {
                self.record_mut(handle)?.status = RecordStatus::NotLoaded;
                Err(e)
            }
        }
    }

    /// Load a record; alias of `check_for_loading`
    pub fn load(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<()> {
        self.check_for_loading(handle, ctx)
    }

    /// Decode pending fields from the raw buffer
    ///
    /// `None` decodes everything and drops the buffer. A subset decodes the
    /// root fields of the given names (reserved `@` names decode only the
    /// attributes) and keeps the buffer. Fields already materialized are
    /// never overwritten. Returns whether anything was decoded.
    pub fn deserialize_fields(
        &mut self,
        handle: RecordHandle,
        fields: Option<&[String]>,
        ctx: &Context<'_>,
    ) -> Result<bool> {
        let rec = self.record(handle)?;
        if rec.source.is_none() || rec.status == RecordStatus::Unmarshalling {
            return Ok(false);
        }

        let subset = match fields {
            None => None,
            Some(names) => {
                let mut roots: Vec<String> = Vec::with_capacity(names.len());
                for name in names.iter().filter(|n| !n.starts_with('@')) {
                    let root = FieldPath::root_of(name);
                    if !roots.iter().any(|r| r == root) {
                        roots.push(root.to_string());
                    }
                }
                if roots.is_empty() && rec.class_name.is_some() {
                    return Ok(false);
                }
                if !roots.is_empty() && roots.iter().all(|r| rec.store.contains(r)) {
                    return Ok(false);
                }
                Some(roots)
            }
        };

        let rec = self.record_mut(handle)?;
        let Some(source) = rec.source.take() else {
            return Ok(false);
        };
        rec.status = RecordStatus::Unmarshalling;
        trace!(handle = %handle, fields = ?subset, bytes = source.len(), "decoding record");

        let outcome = ctx
            .serializer
            .decode(&source, subset.as_deref())
            .and_then(|image| self.install_image(handle, image));

        let rec = self.record_mut(handle)?;
        rec.status = RecordStatus::Loaded;
        if subset.is_some() || outcome.is_err() {
            rec.source = Some(source);
        }
        let installed = outcome?;
        debug!(handle = %handle, installed, partial = subset.is_some(), "decoded record");
        Ok(true)
    }

    fn install_image(&mut self, handle: RecordHandle, image: RecordImage) -> Result<usize> {
        let rec = self.record_mut(handle)?;
        if rec.class_name.is_none() {
            rec.class_name = image.class_name;
        }
        let tracking = rec.tracking;

        let mut installed = 0;
        for field in image.fields {
            if field.removed || self.record(handle)?.store.contains(&field.name) {
                continue;
            }
            let value = self.value_from_image(handle, field.value)?;
            let mut entry = FieldEntry::new(value, field.field_type);
            entry.refresh_listener(&field.name, tracking);
            let rec = self.record_mut(handle)?;
            rec.store.insert(field.name, entry);
            rec.store.inc_size();
            installed += 1;
        }
        Ok(installed)
    }

    fn value_from_image(&mut self, owner: RecordHandle, value: ImageValue) -> Result<Value> {
        Ok(match value {
            ImageValue::Null => Value::Null,
            ImageValue::Bool(v) => Value::Bool(v),
            ImageValue::Byte(v) => Value::Byte(v),
            ImageValue::Short(v) => Value::Short(v),
            ImageValue::Integer(v) => Value::Integer(v),
            ImageValue::Long(v) => Value::Long(v),
            ImageValue::Float(v) => Value::Float(v),
            ImageValue::Double(v) => Value::Double(v),
            ImageValue::String(v) => Value::String(v),
            ImageValue::Binary(v) => Value::Binary(v),
            ImageValue::Date(v) => Value::Date(v),
            ImageValue::DateTime(v) => Value::DateTime(v),
            ImageValue::Link(id) => Value::Link(id),
            ImageValue::LinkBag(bag) => Value::LinkBag(bag),
            ImageValue::Embedded(image) => {
                let mut child = Record::new(self.config());
                child.dirty = false;
                child.content_changed = false;
                child.owners.push(owner);
                let child = self.insert(child);
                self.install_image(child, *image)?;
                Value::Embedded(child)
            }
            ImageValue::List(items) => Value::List(
                items
                    .into_iter()
                    .map(|i| self.value_from_image(owner, i))
                    .collect::<Result<_>>()?,
            ),
            ImageValue::Set(items) => Value::Set(
                items
                    .into_iter()
                    .map(|i| self.value_from_image(owner, i))
                    .collect::<Result<_>>()?,
            ),
            ImageValue::Map(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    out.insert(k, self.value_from_image(owner, v)?);
                }
                Value::Map(out)
            }
        })
    }

    // ========================================================================
    // Encoding
    // ========================================================================

    /// Arena-free image of a record, embedded children included
    ///
    /// A delta image holds only dirty fields, with tombstones for removed
    /// ones.
    pub fn to_image(&mut self, handle: RecordHandle, delta_only: bool, ctx: &Context<'_>) -> Result<RecordImage> {
        self.check_for_loading(handle, ctx)?;
        self.deserialize_fields(handle, None, ctx)?;

        let rec = self.record(handle)?;
        let class_name = rec.class_name.clone();
        let entries: Vec<(String, Value, Option<_>, bool)> = rec
            .store
            .iter()
            .filter(|(_, e)| !delta_only || e.is_dirty())
            .map(|(n, e)| (n.clone(), e.value.clone(), e.field_type, e.exists))
            .collect();

        let mut fields = Vec::with_capacity(entries.len());
        for (name, value, field_type, exists) in entries {
            if !exists {
                if delta_only {
                    fields.push(ImageField::tombstone(name));
                }
                continue;
            }
            fields.push(ImageField {
                name,
                field_type,
                removed: false,
                value: self.value_to_image(&value, ctx)?,
            });
        }
        Ok(RecordImage { class_name, fields })
    }

    fn value_to_image(&mut self, value: &Value, ctx: &Context<'_>) -> Result<ImageValue> {
        Ok(match value {
            Value::Null => ImageValue::Null,
            Value::Bool(v) => ImageValue::Bool(*v),
            Value::Byte(v) => ImageValue::Byte(*v),
            Value::Short(v) => ImageValue::Short(*v),
            Value::Integer(v) => ImageValue::Integer(*v),
            Value::Long(v) => ImageValue::Long(*v),
            Value::Float(v) => ImageValue::Float(*v),
            Value::Double(v) => ImageValue::Double(*v),
            Value::String(v) => ImageValue::String(v.clone()),
            Value::Binary(v) => ImageValue::Binary(v.clone()),
            Value::Date(v) => ImageValue::Date(*v),
            Value::DateTime(v) => ImageValue::DateTime(*v),
            Value::Link(id) => ImageValue::Link(*id),
            Value::LinkBag(bag) => ImageValue::LinkBag(bag.clone()),
            Value::Embedded(child) => ImageValue::Embedded(Box::new(self.to_image(*child, false, ctx)?)),
            Value::List(items) => ImageValue::List(
                items
                    .iter()
                    .map(|i| self.value_to_image(i, ctx))
                    .collect::<Result<_>>()?,
            ),
            Value::Set(items) => ImageValue::Set(
                items
                    .iter()
                    .map(|i| self.value_to_image(i, ctx))
                    .collect::<Result<_>>()?,
            ),
            Value::Map(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    out.insert(k.clone(), self.value_to_image(v, ctx)?);
                }
                ImageValue::Map(out)
            }
        })
    }

    /// Serialized form of a record
    ///
    /// A record still backed by an unmodified buffer returns that buffer.
    pub fn to_stream(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<Vec<u8>> {
        self.check_for_loading(handle, ctx)?;
        if let Some(source) = &self.record(handle)?.source {
            return Ok(source.clone());
        }
        self.marshal(handle, false, ctx)
    }

    /// Serialized delta: changed fields and tombstones only
    pub fn to_delta_stream(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<Vec<u8>> {
        self.check_for_loading(handle, ctx)?;
        self.marshal(handle, true, ctx)
    }

    fn marshal(&mut self, handle: RecordHandle, delta_only: bool, ctx: &Context<'_>) -> Result<Vec<u8>> {
        self.deserialize_fields(handle, None, ctx)?;
        let previous = self.record(handle)?.status;
        self.record_mut(handle)?.status = RecordStatus::Marshalling;
        let image = self.to_image(handle, delta_only, ctx);
        self.record_mut(handle)?.status = previous;
        let bytes = ctx.serializer.encode(&image?, delta_only)?;
        trace!(handle = %handle, bytes = bytes.len(), delta = delta_only, "encoded record");
        Ok(bytes)
    }

    /// Replace the content of a record with a raw buffer
    pub fn from_stream(&mut self, handle: RecordHandle, buffer: Vec<u8>, ctx: &Context<'_>) -> Result<()> {
        self.discard_entries(handle)?;
        let rec = self.record_mut(handle)?;
        rec.source = Some(buffer);
        rec.class_name = None;
        rec.class = None;
        rec.status = RecordStatus::Loaded;
        rec.dirty = false;
        rec.content_changed = false;
        if !rec.lazy_load {
            self.deserialize_fields(handle, None, ctx)?;
        }
        Ok(())
    }

    /// Field names, answered from the buffer when the format allows it
    pub fn field_names_fast(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<Vec<String>> {
        self.check_for_loading(handle, ctx)?;
        if let Some(source) = &self.record(handle)?.source {
            if let Some(names) = ctx.serializer.field_names(source)? {
                return Ok(names);
            }
        }
        self.names(handle, ctx)
    }

    /// Enable or disable lazy decoding; disabling decodes now
    pub fn set_lazy_load(&mut self, handle: RecordHandle, lazy: bool, ctx: &Context<'_>) -> Result<()> {
        self.record_mut(handle)?.lazy_load = lazy;
        if !lazy {
            self.deserialize_fields(handle, None, ctx)?;
        }
        Ok(())
    }

    // ========================================================================
    // Reload, unload, reset
    // ========================================================================

    /// Drop every entry, releasing embedded children left without owners
    fn discard_entries(&mut self, handle: RecordHandle) -> Result<()> {
        let mut children = Vec::new();
        for (_, entry) in self.record(handle)?.store.iter() {
            entry.value.collect_embedded(&mut children);
        }
        for child in children {
            self.remove_owner(child, handle);
            if self.is_live(child) && self.live_owners(child)?.is_empty() {
                self.release(child)?;
            }
        }
        self.record_mut(handle)?.store.clear();
        Ok(())
    }

    /// Replace the content with the stored version
    pub fn reload(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<()> {
        let id = self.record(handle)?.id;
        let session = ctx
            .session
            .ok_or_else(|| Error::illegal_state(format!("cannot reload {}: no active session", id)))?;
        let stored = session.load_by_identity(&id)?.ok_or(Error::RecordNotFound(id))?;
        debug!(handle = %handle, id = %id, version = stored.version, "reloading record");

        self.discard_entries(handle)?;
        let rec = self.record_mut(handle)?;
        rec.version = stored.version;
        rec.class_name = None;
        rec.class = None;
        rec.source = Some(stored.buffer);
        rec.status = RecordStatus::Loaded;
        rec.dirty = false;
        rec.content_changed = false;
        if !rec.lazy_load {
            self.deserialize_fields(handle, None, ctx)?;
        }
        Ok(())
    }

    /// Drop the content, keeping the identity for a later load
    pub fn unload(&mut self, handle: RecordHandle) -> Result<()> {
        self.discard_entries(handle)?;
        let rec = self.record_mut(handle)?;
        rec.source = None;
        rec.class_name = None;
        rec.class = None;
        rec.status = RecordStatus::NotLoaded;
        rec.dirty = false;
        rec.content_changed = false;
        Ok(())
    }

    /// Drop the content, keeping identity and class
    pub fn clear(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<()> {
        self.discard_entries(handle)?;
        self.record_mut(handle)?.source = None;
        self.mark_dirty(handle, ctx)
    }

    /// Back to a fresh, unsaved record
    ///
    /// Not allowed while a transaction is active.
    pub fn reset(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<()> {
        if ctx.session.map_or(false, |s| s.is_transaction_active()) {
            return Err(Error::illegal_state("cannot reset a record inside an active transaction"));
        }
        self.discard_entries(handle)?;
        let rec = self.record_mut(handle)?;
        rec.source = None;
        rec.class_name = None;
        rec.class = None;
        rec.id = RecordId::unassigned();
        rec.version = 0;
        rec.status = RecordStatus::Loaded;
        rec.dirty = true;
        rec.content_changed = true;
        Ok(())
    }

    /// Class name, decoding only the attributes when needed
    pub(crate) fn load_attributes(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<()> {
        self.check_for_loading(handle, ctx)?;
        self.deserialize_fields(handle, Some(&[ATTRIBUTE_CLASS.to_string()]), ctx)?;
        Ok(())
    }
}
