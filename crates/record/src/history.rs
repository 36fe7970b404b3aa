//! Change history: undo, clean states and field metadata
//!
//! Between two clean states every entry remembers whether it was created,
//! the value it had before its first replacement, and the structural
//! timeline of in-place container edits. `undo` rolls those back; `mark_clean`
//! forgets them.

use docrec_core::{Error, FieldType, RecordHandle, Result, Value};
use std::collections::BTreeMap;
use tracing::debug;

use crate::access::{ATTRIBUTE_CLASS, ATTRIBUTE_RID};
use crate::arena::Records;
use crate::context::Context;
use crate::entry::FieldEntry;
use crate::listener::Timeline;

enum Rollback {
    Drop,
    Restore(Value),
    Revert(Timeline),
}

impl Records {
    /// Roll every field back to its state at the last clean point
    pub fn undo(&mut self, handle: RecordHandle) -> Result<()> {
        self.require_tracking(handle)?;
        for name in self.record(handle)?.store.entry_names() {
            self.undo_entry(handle, &name)?;
        }
        self.record_mut(handle)?.store.recount();
        debug!(handle = %handle, "undid changes");
        Ok(())
    }

    /// Roll one field back to its state at the last clean point
    pub fn undo_field(&mut self, handle: RecordHandle, name: &str) -> Result<()> {
        self.require_tracking(handle)?;
        self.undo_entry(handle, name)?;
        self.record_mut(handle)?.store.recount();
        Ok(())
    }

    fn require_tracking(&self, handle: RecordHandle) -> Result<()> {
        if self.record(handle)?.tracking {
            Ok(())
        } else {
            Err(Error::illegal_state(format!(
                "change tracking is disabled on {}, nothing to undo",
                handle
            )))
        }
    }

    fn undo_entry(&mut self, handle: RecordHandle, name: &str) -> Result<()> {
        let rec = self.record_mut(handle)?;
        let tracking = rec.tracking;
        let Some(entry) = rec.store.get_mut(name) else {
            return Ok(());
        };
        let before = if entry.exists {
            entry.value.embedded_handles()
        } else {
            Vec::new()
        };
        let rollback = if entry.created {
            Rollback::Drop
        } else if entry.changed {
            Rollback::Restore(entry.original.take().unwrap_or_default())
        } else if let Some(timeline) = entry.timeline.take() {
            Rollback::Revert(timeline)
        } else {
            return Ok(());
        };

        let after = match rollback {
            Rollback::Drop => {
                rec.store.remove(name);
                Vec::new()
            }
            Rollback::Restore(original) => {
                entry.value = original;
                entry.exists = true;
                entry.changed = false;
                entry.timeline = None;
                entry.refresh_listener(name, tracking);
                entry.value.embedded_handles()
            }
            Rollback::Revert(timeline) => {
                timeline.revert(&mut entry.value)?;
                entry.value.embedded_handles()
            }
        };
        self.reconcile_owners(handle, &before, &after)
    }

    /// Forget the dirty episode of a record and its embedded children
    pub fn mark_clean(&mut self, handle: RecordHandle) -> Result<()> {
        let rec = self.record_mut(handle)?;
        rec.dirty = false;
        rec.content_changed = false;
        let tracking = rec.tracking;
        rec.store.retain(|_, e| e.exists);
        let mut children = Vec::new();
        for (name, entry) in rec.store.iter_mut() {
            entry.clear_history();
            entry.refresh_listener(name, tracking);
            entry.value.collect_embedded(&mut children);
        }
        rec.store.recount();
        for child in children {
            if self.is_live(child) {
                self.mark_clean(child)?;
            }
        }
        Ok(())
    }

    /// Turn change tracking on or off
    ///
    /// Turning it off drops the history and the removed-field entries.
    pub fn set_tracking_changes(&mut self, handle: RecordHandle, enabled: bool) -> Result<()> {
        let rec = self.record_mut(handle)?;
        rec.tracking = enabled;
        if !enabled {
            rec.store.retain(|_, e| e.exists);
        }
        for (name, entry) in rec.store.iter_mut() {
            if !enabled {
                entry.clear_history();
            }
            entry.refresh_listener(name, enabled);
        }
        rec.store.recount();
        Ok(())
    }

    /// Attach listeners to every container value, children included
    pub fn convert_to_tracked(&mut self, handle: RecordHandle) -> Result<()> {
        let rec = self.record_mut(handle)?;
        let tracking = rec.tracking;
        let mut children = Vec::new();
        for (name, entry) in rec.store.iter_mut() {
            entry.refresh_listener(name, tracking);
            entry.value.collect_embedded(&mut children);
        }
        for child in children {
            if self.is_live(child) {
                self.convert_to_tracked(child)?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Per-field metadata
    // ========================================================================

    /// Fields created, replaced, removed or edited since the last clean state
    pub fn dirty_fields(&self, handle: RecordHandle) -> Result<Vec<String>> {
        Ok(self
            .record(handle)?
            .store
            .iter()
            .filter(|(_, e)| e.is_dirty())
            .map(|(n, _)| n.clone())
            .collect())
    }

    /// Value of a field at the last clean state
    pub fn original_value(&self, handle: RecordHandle, name: &str) -> Result<Option<Value>> {
        match self.record(handle)?.store.get(name) {
            Some(entry) => entry.on_load_value(),
            None => Ok(None),
        }
    }

    /// Structural edits of a container field since the last clean state
    pub fn timeline(&self, handle: RecordHandle, name: &str) -> Result<Option<Timeline>> {
        Ok(self
            .record(handle)?
            .store
            .get(name)
            .and_then(|e| e.timeline.clone()))
    }

    /// Was the field replaced since the last clean state
    pub fn is_changed(&self, handle: RecordHandle, name: &str) -> Result<bool> {
        Ok(self.record(handle)?.store.get(name).map_or(false, |e| e.changed))
    }

    /// Was the field added since the last clean state
    pub fn is_created(&self, handle: RecordHandle, name: &str) -> Result<bool> {
        Ok(self.record(handle)?.store.get(name).map_or(false, |e| e.created))
    }

    /// Declared type of a field, or the type inferred from its value
    pub fn field_type(&mut self, handle: RecordHandle, name: &str, ctx: &Context<'_>) -> Result<Option<FieldType>> {
        self.check_for_loading(handle, ctx)?;
        self.deserialize_fields(handle, Some(&[name.to_string()]), ctx)?;
        Ok(self
            .record(handle)?
            .store
            .get(name)
            .and_then(FieldEntry::effective_type))
    }

    /// Declare the type of a field, converting a present value
    ///
    /// Declaring a type for a missing field reserves a non-existing entry
    /// that later writes are converted against.
    pub fn set_field_type(
        &mut self,
        handle: RecordHandle,
        name: &str,
        field_type: Option<FieldType>,
        ctx: &Context<'_>,
    ) -> Result<()> {
        self.check_for_loading(handle, ctx)?;
        self.deserialize_fields(handle, Some(&[name.to_string()]), ctx)?;

        let current = self.record(handle)?.store.get(name).map(|e| e.value.clone());
        match (current, field_type) {
            (Some(value), Some(t)) => {
                let converted = if value.is_null() { value } else { self.coerce(value, t, ctx)? };
                if let Some(entry) = self.record_mut(handle)?.store.get_mut(name) {
                    entry.value = converted;
                    entry.field_type = Some(t);
                }
            }
            (Some(_), None) => {
                if let Some(entry) = self.record_mut(handle)?.store.get_mut(name) {
                    entry.field_type = None;
                }
            }
            (None, Some(t)) => {
                let mut entry = FieldEntry::created(Value::Null, Some(t));
                entry.exists = false;
                self.record_mut(handle)?.store.insert(name, entry);
            }
            (None, None) => {}
        }
        Ok(())
    }

    // ========================================================================
    // Conversions
    // ========================================================================

    /// Fields as a map, with `@rid` and `@class` when set
    pub fn to_map(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<BTreeMap<String, Value>> {
        let mut map: BTreeMap<String, Value> = self.fields(handle, ctx)?.into_iter().collect();
        let id = self.record(handle)?.id;
        if id.is_valid() {
            map.insert(ATTRIBUTE_RID.to_string(), Value::Link(id));
        }
        if let Some(class) = self.class_name(handle, ctx)? {
            map.insert(ATTRIBUTE_CLASS.to_string(), Value::String(class));
        }
        Ok(map)
    }

    /// Write every entry of a map; reserved names set attributes
    pub fn from_map<I, K>(&mut self, handle: RecordHandle, fields: I, ctx: &Context<'_>) -> Result<()>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        for (name, value) in fields {
            self.set(handle, name.as_ref(), value, ctx)?;
        }
        Ok(())
    }

    /// Replace embedded records that have a persistent identity by links
    ///
    /// Returns false when something could not be detached: a child without
    /// identity, or a reference bag.
    pub fn detach(&mut self, handle: RecordHandle, ctx: &Context<'_>) -> Result<bool> {
        self.materialize(handle, ctx)?;
        let mut fully = true;
        for (name, value) in self.fields(handle, ctx)? {
            let before = value.embedded_handles();
            let detached = self.detach_value(value, &mut fully)?;
            let after = detached.embedded_handles();
            if before != after {
                if let Some(entry) = self.record_mut(handle)?.store.get_mut(&name) {
                    entry.value = detached;
                }
                self.reconcile_owners(handle, &before, &after)?;
            }
        }
        Ok(fully)
    }

    fn detach_value(&self, value: Value, fully: &mut bool) -> Result<Value> {
        Ok(match value {
            Value::Embedded(child) => {
                let id = self.record(child)?.id;
                if id.is_persistent() {
                    Value::Link(id)
                } else {
                    *fully = false;
                    Value::Embedded(child)
                }
            }
            Value::List(items) => Value::List(
                items
                    .into_iter()
                    .map(|i| self.detach_value(i, fully))
                    .collect::<Result<_>>()?,
            ),
            Value::Set(items) => Value::Set(
                items
                    .into_iter()
                    .map(|i| self.detach_value(i, fully))
                    .collect::<Result<_>>()?,
            ),
            Value::Map(map) => {
                let mut out = BTreeMap::new();
                for (k, v) in map {
                    out.insert(k, self.detach_value(v, fully)?);
                }
                Value::Map(out)
            }
            Value::LinkBag(bag) => {
                *fully = false;
                Value::LinkBag(bag)
            }
            other => other,
        })
    }
}
