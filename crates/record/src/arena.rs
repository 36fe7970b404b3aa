//! Record arena
//!
//! `Records` owns every in-memory record. Records refer to each other only
//! through generation-checked `RecordHandle`s: embedded values hold the
//! child's handle, and children hold their owners' handles. Releasing a
//! record bumps its slot generation, so any handle still pointing at it
//! turns stale instead of aliasing the slot's next occupant.

use docrec_core::{Error, RecordHandle, RecordId, Result, Value};
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::config::RecordConfig;
use crate::context::Context;
use crate::record::{Record, RecordStatus};

#[derive(Debug)]
struct Slot {
    generation: u32,
    record: Option<Record>,
}

/// Arena of records
#[derive(Debug, Default)]
pub struct Records {
    slots: Vec<Slot>,
    free: Vec<u32>,
    config: RecordConfig,
}

impl Records {
    /// Empty arena with the default configuration
    pub fn new() -> Self {
        Self::with_config(RecordConfig::default())
    }

    /// Empty arena seeding new records from `config`
    pub fn with_config(config: RecordConfig) -> Self {
        Records {
            slots: Vec::new(),
            free: Vec::new(),
            config,
        }
    }

    /// Configuration used for new records
    pub fn config(&self) -> &RecordConfig {
        &self.config
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.record.is_some()).count()
    }

    /// True if no record is live
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Does `handle` refer to a live record
    #[inline]
    pub fn is_live(&self, handle: RecordHandle) -> bool {
        self.slots
            .get(handle.index() as usize)
            .map_or(false, |s| s.generation == handle.generation() && s.record.is_some())
    }

    /// Live handles in slot order
    pub fn handles(&self) -> Vec<RecordHandle> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, s)| s.record.is_some())
            .map(|(i, s)| RecordHandle::new(i as u32, s.generation))
            .collect()
    }

    /// Shared access to a record
    pub fn record(&self, handle: RecordHandle) -> Result<&Record> {
        self.slots
            .get(handle.index() as usize)
            .filter(|s| s.generation == handle.generation())
            .and_then(|s| s.record.as_ref())
            .ok_or(Error::StaleHandle(handle))
    }

    pub(crate) fn record_mut(&mut self, handle: RecordHandle) -> Result<&mut Record> {
        self.slots
            .get_mut(handle.index() as usize)
            .filter(|s| s.generation == handle.generation())
            .and_then(|s| s.record.as_mut())
            .ok_or(Error::StaleHandle(handle))
    }

    pub(crate) fn insert(&mut self, record: Record) -> RecordHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.record = Some(record);
            return RecordHandle::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            record: Some(record),
        });
        RecordHandle::new(index, 0)
    }

    fn take(&mut self, handle: RecordHandle) -> Result<Record> {
        let slot = self
            .slots
            .get_mut(handle.index() as usize)
            .filter(|s| s.generation == handle.generation())
            .ok_or(Error::StaleHandle(handle))?;
        let record = slot.record.take().ok_or(Error::StaleHandle(handle))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index());
        Ok(record)
    }

    // ========================================================================
    // Constructors
    // ========================================================================

    /// New, empty, unsaved record
    pub fn create(&mut self) -> RecordHandle {
        let record = Record::new(&self.config);
        self.insert(record)
    }

    /// New record bound to a class
    pub fn create_with_class(&mut self, class_name: &str, ctx: &Context<'_>) -> Result<RecordHandle> {
        let handle = self.create();
        if let Err(e) = self.set_class_name(handle, Some(class_name), ctx) {
            self.release(handle)?;
            return Err(e);
        }
        Ok(handle)
    }

    /// Record backed by a raw buffer
    ///
    /// The buffer is decoded on first access, or right away when lazy
    /// loading is disabled.
    pub fn create_from_buffer(&mut self, buffer: Vec<u8>, ctx: &Context<'_>) -> Result<RecordHandle> {
        let mut record = Record::new(&self.config);
        record.source = Some(buffer);
        record.dirty = false;
        record.content_changed = false;
        let lazy = record.lazy_load;
        let handle = self.insert(record);
        if !lazy {
            if let Err(e) = self.deserialize_fields(handle, None, ctx) {
                self.release(handle)?;
                return Err(e);
            }
        }
        Ok(handle)
    }

    /// Identity-only record, loaded on first access
    pub fn create_placeholder(&mut self, id: RecordId) -> RecordHandle {
        let mut record = Record::new(&self.config);
        record.id = id;
        record.status = RecordStatus::NotLoaded;
        record.dirty = false;
        record.content_changed = false;
        self.insert(record)
    }

    /// Record populated from name/value pairs
    pub fn create_from_map<I, K>(&mut self, fields: I, ctx: &Context<'_>) -> Result<RecordHandle>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let handle = self.create();
        for (name, value) in fields {
            if let Err(e) = self.set(handle, name.as_ref(), value, ctx) {
                self.release(handle)?;
                return Err(e);
            }
        }
        Ok(handle)
    }

    /// Record populated from an alternating name, value list
    pub fn create_from_list(&mut self, items: Vec<Value>, ctx: &Context<'_>) -> Result<RecordHandle> {
        if items.len() % 2 != 0 {
            return Err(Error::invalid_argument(format!(
                "field list must hold name/value pairs, got {} items",
                items.len()
            )));
        }
        let mut pairs = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(name), Some(value)) = (iter.next(), iter.next()) {
            match name {
                Value::String(name) => pairs.push((name, value)),
                other => {
                    return Err(Error::invalid_argument(format!(
                        "field name must be a string, got {}",
                        other.type_name()
                    )))
                }
            }
        }
        self.create_from_map(pairs, ctx)
    }

    /// Identity-only twin of an existing record
    pub fn placeholder(&mut self, handle: RecordHandle) -> Result<RecordHandle> {
        let id = self.record(handle)?.id;
        Ok(self.create_placeholder(id))
    }

    // ========================================================================
    // Release and copy
    // ========================================================================

    /// Drop a record
    ///
    /// Embedded children left without any live owner are released too.
    pub fn release(&mut self, handle: RecordHandle) -> Result<()> {
        let record = self.take(handle)?;
        trace!(handle = %handle, id = %record.id, "released record");
        let mut children = Vec::new();
        for (_, entry) in record.store.iter() {
            entry.value.collect_embedded(&mut children);
        }
        for child in children {
            if self.is_live(child) && self.live_owners(child)?.is_empty() {
                self.release(child)?;
            }
        }
        Ok(())
    }

    /// Deep copy
    ///
    /// The copy keeps identity, version, class, flags and entry history.
    /// Embedded children are copied too and owned by the copy; the copy
    /// itself has no owners.
    pub fn copy(&mut self, handle: RecordHandle) -> Result<RecordHandle> {
        let mut copied = FxHashMap::default();
        let copy = self.copy_inner(handle, &mut copied)?;
        debug!(source = %handle, copy = %copy, records = copied.len(), "copied record");
        Ok(copy)
    }

    fn copy_inner(
        &mut self,
        handle: RecordHandle,
        copied: &mut FxHashMap<RecordHandle, RecordHandle>,
    ) -> Result<RecordHandle> {
        let mut record = self.record(handle)?.clone();
        record.owners.clear();
        let copy = self.insert(record);
        copied.insert(handle, copy);

        let names = self.record(copy)?.store.entry_names();
        for name in names {
            let (value, original) = match self.record(copy)?.store.get(&name) {
                Some(e) => (e.value.clone(), e.original.clone()),
                None => continue,
            };
            let value = self.copy_value(value, copy, copied)?;
            let original = original.map(|o| remap_handles(o, copied));
            if let Some(entry) = self.record_mut(copy)?.store.get_mut(&name) {
                entry.value = value;
                entry.original = original;
            }
        }
        Ok(copy)
    }

    fn copy_value(
        &mut self,
        value: Value,
        owner: RecordHandle,
        copied: &mut FxHashMap<RecordHandle, RecordHandle>,
    ) -> Result<Value> {
        Ok(match value {
            Value::Embedded(child) => {
                let child_copy = match copied.get(&child) {
                    Some(c) => *c,
                    None => self.copy_inner(child, copied)?,
                };
                let rec = self.record_mut(child_copy)?;
                if !rec.owners.contains(&owner) {
                    rec.owners.push(owner);
                }
                Value::Embedded(child_copy)
            }
            Value::List(items) => Value::List(
                items
                    .into_iter()
                    .map(|i| self.copy_value(i, owner, copied))
                    .collect::<Result<_>>()?,
            ),
            Value::Set(items) => Value::Set(
                items
                    .into_iter()
                    .map(|i| self.copy_value(i, owner, copied))
                    .collect::<Result<_>>()?,
            ),
            Value::Map(map) => {
                let mut out = std::collections::BTreeMap::new();
                for (k, v) in map {
                    out.insert(k, self.copy_value(v, owner, copied)?);
                }
                Value::Map(out)
            }
            other => other,
        })
    }

    /// A live, top-level record with the given identity
    pub fn find_by_identity(&self, id: &RecordId) -> Option<RecordHandle> {
        self.slots.iter().enumerate().find_map(|(i, s)| {
            s.record
                .as_ref()
                .filter(|r| r.id == *id && !r.is_embedded())
                .map(|_| RecordHandle::new(i as u32, s.generation))
        })
    }
}

fn remap_handles(value: Value, copied: &FxHashMap<RecordHandle, RecordHandle>) -> Value {
    match value {
        Value::Embedded(h) => Value::Embedded(copied.get(&h).copied().unwrap_or(h)),
        Value::List(items) => Value::List(items.into_iter().map(|i| remap_handles(i, copied)).collect()),
        Value::Set(items) => Value::Set(items.into_iter().map(|i| remap_handles(i, copied)).collect()),
        Value::Map(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (k, remap_handles(v, copied)))
                .collect(),
        ),
        other => other,
    }
}
