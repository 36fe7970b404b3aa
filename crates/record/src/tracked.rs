//! Tracked in-place edits of container fields
//!
//! Structural edits of a list, set, map or reference bag go through a
//! `TrackedMut` guard handed out by `Records::edit_field`. The guard applies
//! the edit and records a `ChangeEvent` for it; when the closure returns,
//! the events are passed to the field's listener, owner edges are updated
//! and the record is marked dirty. A failing closure leaves the field as it
//! was.

use docrec_core::{Error, LinkBag, PathSegment, RecordHandle, RecordId, Result, Value};

use crate::arena::Records;
use crate::context::Context;
use crate::listener::{element_mut, ChangeEvent, ChangeKey, Timeline};
use crate::record::RecordStatus;

fn unsupported(op: &str, value: &Value) -> Error {
    Error::invalid_argument(format!("{} is not supported on {}", op, value.type_name()))
}

/// Mutable view of a container value that records every edit
pub struct TrackedMut<'a> {
    value: &'a mut Value,
    events: Vec<ChangeEvent>,
    changed: bool,
}

impl<'a> TrackedMut<'a> {
    pub(crate) fn new(value: &'a mut Value) -> Self {
        TrackedMut {
            value,
            events: Vec::new(),
            changed: false,
        }
    }

    /// Current value
    pub fn value(&self) -> &Value {
        self.value
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.value.multi_value_len().unwrap_or(0)
    }

    /// True if the container holds no element
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn emit(&mut self, event: ChangeEvent) {
        self.events.push(event);
        self.changed = true;
    }

    /// Append to a list, or add to a set if absent
    pub fn push(&mut self, item: impl Into<Value>) -> Result<()> {
        let item = item.into();
        let event = match &mut *self.value {
            Value::List(items) => {
                items.push(item.clone());
                ChangeEvent::Add {
                    key: ChangeKey::Index(items.len() - 1),
                    value: item,
                }
            }
            Value::Set(items) => {
                if items.contains(&item) {
                    return Ok(());
                }
                items.push(item.clone());
                ChangeEvent::Add {
                    key: ChangeKey::Index(items.len() - 1),
                    value: item,
                }
            }
            Value::LinkBag(_) => {
                let id = item
                    .as_link()
                    .ok_or_else(|| Error::invalid_argument(format!("reference bags hold links, got {}", item.type_name())))?;
                return self.bag_add(id);
            }
            other => return Err(unsupported("push", other)),
        };
        self.emit(event);
        Ok(())
    }

    /// Insert into a list at `index`
    pub fn insert(&mut self, index: usize, item: impl Into<Value>) -> Result<()> {
        let item = item.into();
        let event = match &mut *self.value {
            Value::List(items) => {
                if index > items.len() {
                    return Err(Error::invalid_argument(format!(
                        "insert index {} out of range (len {})",
                        index,
                        items.len()
                    )));
                }
                items.insert(index, item.clone());
                ChangeEvent::Add {
                    key: ChangeKey::Index(index),
                    value: item,
                }
            }
            other => return Err(unsupported("insert", other)),
        };
        self.emit(event);
        Ok(())
    }

    /// Replace the list element at `index`, returning the old one
    pub fn set_index(&mut self, index: usize, item: impl Into<Value>) -> Result<Value> {
        let item = item.into();
        let (old, event) = match &mut *self.value {
            Value::List(items) => {
                let len = items.len();
                let slot = items.get_mut(index).ok_or_else(|| {
                    Error::invalid_argument(format!("index {} out of range (len {})", index, len))
                })?;
                if *slot == item {
                    return Ok(item);
                }
                let old = std::mem::replace(slot, item.clone());
                let event = ChangeEvent::Update {
                    key: ChangeKey::Index(index),
                    old: old.clone(),
                    new: item,
                };
                (old, event)
            }
            other => return Err(unsupported("set_index", other)),
        };
        self.emit(event);
        Ok(old)
    }

    /// Remove the list or set element at `index`
    pub fn remove_at(&mut self, index: usize) -> Result<Value> {
        let old = match &mut *self.value {
            Value::List(items) | Value::Set(items) => {
                if index >= items.len() {
                    return Err(Error::invalid_argument(format!(
                        "index {} out of range (len {})",
                        index,
                        items.len()
                    )));
                }
                items.remove(index)
            }
            other => return Err(unsupported("remove_at", other)),
        };
        self.emit(ChangeEvent::Remove {
            key: ChangeKey::Index(index),
            old: old.clone(),
        });
        Ok(old)
    }

    /// Remove the first element equal to `item`
    pub fn remove_value(&mut self, item: &Value) -> Result<bool> {
        match &*self.value {
            Value::List(items) | Value::Set(items) => match items.iter().position(|i| i == item) {
                Some(index) => self.remove_at(index).map(|_| true),
                None => Ok(false),
            },
            Value::LinkBag(_) => match item.as_link() {
                Some(id) => self.bag_remove(&id),
                None => Ok(false),
            },
            other => Err(unsupported("remove_value", other)),
        }
    }

    /// Insert or replace a map entry, returning the previous value
    pub fn map_insert(&mut self, key: impl Into<String>, item: impl Into<Value>) -> Result<Option<Value>> {
        let (key, item) = (key.into(), item.into());
        let (old, event) = match &mut *self.value {
            Value::Map(map) => {
                let old = map.insert(key.clone(), item.clone());
                let event = match &old {
                    Some(o) if *o == item => return Ok(old),
                    Some(o) => ChangeEvent::Update {
                        key: ChangeKey::Key(key),
                        old: o.clone(),
                        new: item,
                    },
                    None => ChangeEvent::Add {
                        key: ChangeKey::Key(key),
                        value: item,
                    },
                };
                (old, event)
            }
            other => return Err(unsupported("map_insert", other)),
        };
        self.emit(event);
        Ok(old)
    }

    /// Remove a map entry
    pub fn map_remove(&mut self, key: &str) -> Result<Option<Value>> {
        let old = match &mut *self.value {
            Value::Map(map) => map.remove(key),
            other => return Err(unsupported("map_remove", other)),
        };
        if let Some(o) = &old {
            self.emit(ChangeEvent::Remove {
                key: ChangeKey::Key(key.to_string()),
                old: o.clone(),
            });
        }
        Ok(old)
    }

    /// Add a reference to a bag
    pub fn bag_add(&mut self, id: RecordId) -> Result<()> {
        let index = match &mut *self.value {
            Value::LinkBag(bag) => {
                bag.add(id);
                bag.len() - 1
            }
            other => return Err(unsupported("bag_add", other)),
        };
        self.emit(ChangeEvent::Add {
            key: ChangeKey::Index(index),
            value: Value::Link(id),
        });
        Ok(())
    }

    /// Remove one occurrence of a reference from a bag
    pub fn bag_remove(&mut self, id: &RecordId) -> Result<bool> {
        let index = match &mut *self.value {
            Value::LinkBag(bag) => {
                let Some(index) = bag.iter().position(|l| l == id) else {
                    return Ok(false);
                };
                bag.remove(id);
                index
            }
            other => return Err(unsupported("bag_remove", other)),
        };
        self.emit(ChangeEvent::Remove {
            key: ChangeKey::Index(index),
            old: Value::Link(*id),
        });
        Ok(true)
    }

    /// Merge another bag into this one; false if the bags are incompatible
    pub fn bag_merge(&mut self, other: &LinkBag) -> Result<bool> {
        let added: Vec<(usize, RecordId)> = match &mut *self.value {
            Value::LinkBag(bag) => {
                let before = bag.len();
                if !bag.try_merge(other, true) {
                    return Ok(false);
                }
                bag.iter().copied().enumerate().skip(before).collect()
            }
            other => return Err(unsupported("bag_merge", other)),
        };
        for (index, id) in added {
            self.emit(ChangeEvent::Add {
                key: ChangeKey::Index(index),
                value: Value::Link(id),
            });
        }
        Ok(true)
    }

    /// Remove every element
    pub fn clear(&mut self) -> Result<()> {
        let removed: Vec<ChangeEvent> = match &mut *self.value {
            Value::List(items) | Value::Set(items) => items
                .drain(..)
                .enumerate()
                .rev()
                .map(|(i, old)| ChangeEvent::Remove {
                    key: ChangeKey::Index(i),
                    old,
                })
                .collect(),
            Value::Map(map) => std::mem::take(map)
                .into_iter()
                .rev()
                .map(|(k, old)| ChangeEvent::Remove {
                    key: ChangeKey::Key(k),
                    old,
                })
                .collect(),
            Value::LinkBag(bag) => {
                let links: Vec<RecordId> = bag.iter().copied().collect();
                bag.clear();
                links
                    .into_iter()
                    .enumerate()
                    .rev()
                    .map(|(i, id)| ChangeEvent::Remove {
                        key: ChangeKey::Index(i),
                        old: Value::Link(id),
                    })
                    .collect()
            }
            other => return Err(unsupported("clear", other)),
        };
        for event in removed {
            self.emit(event);
        }
        Ok(())
    }

    /// Edit a nested container element in place
    ///
    /// The nested edits are recorded as a single `Nested` event.
    pub fn nested<R>(&mut self, key: ChangeKey, f: impl FnOnce(&mut TrackedMut<'_>) -> Result<R>) -> Result<R> {
        let type_name = self.value.type_name();
        let child = element_mut(self.value, &key).ok_or_else(|| {
            Error::invalid_argument(format!("no element at {} in {}", key, type_name))
        })?;
        if !child.is_trackable() {
            return Err(unsupported("nested edit", child));
        }
        let mut inner = TrackedMut::new(child);
        let result = f(&mut inner)?;
        let TrackedMut { events, changed, .. } = inner;
        if changed {
            self.emit(ChangeEvent::Nested {
                key,
                timeline: Timeline::from(events),
            });
        }
        Ok(result)
    }

    /// Apply `edit` to the container reached by following `path`
    pub(crate) fn at_path(
        &mut self,
        path: &[PathSegment],
        edit: Box<dyn FnOnce(&mut TrackedMut<'_>) -> Result<()> + '_>,
    ) -> Result<()> {
        match path.split_first() {
            None => edit(self),
            Some((seg, rest)) => {
                let key = match seg {
                    PathSegment::Field(k) => ChangeKey::Key(k.clone()),
                    PathSegment::Index(i) => ChangeKey::Index(*i),
                };
                self.nested(key, move |t| t.at_path(rest, edit))
            }
        }
    }
}

impl Records {
    /// Edit a container field in place
    ///
    /// ```ignore
    /// records.edit_field(h, "tags", &ctx, |tags| tags.push("new"))?;
    /// ```
    pub fn edit_field<R>(
        &mut self,
        handle: RecordHandle,
        name: &str,
        ctx: &Context<'_>,
        f: impl FnOnce(&mut TrackedMut<'_>) -> Result<R>,
    ) -> Result<R> {
        if name.is_empty() {
            return Err(Error::invalid_argument("Field name is empty"));
        }
        self.check_for_loading(handle, ctx)?;
        self.deserialize_fields(handle, Some(&[name.to_string()]), ctx)?;

        let rec = self.record_mut(handle)?;
        let unmarshalling = rec.status == RecordStatus::Unmarshalling;
        let entry = rec
            .store
            .get_mut(name)
            .filter(|e| e.exists)
            .ok_or_else(|| Error::invalid_argument(format!("field '{}' not found", name)))?;
        if !entry.value.is_trackable() {
            return Err(Error::invalid_argument(format!(
                "field '{}' holds {}, not a container",
                name,
                entry.value.type_name()
            )));
        }
        let record_events = entry.listener.is_some() && !unmarshalling && !entry.changed;
        let mut value = std::mem::take(&mut entry.value);

        let snapshot = value.clone();
        let before = snapshot.embedded_handles();
        let mut tracked = TrackedMut::new(&mut value);
        let outcome = f(&mut tracked);
        let TrackedMut { events, changed, .. } = tracked;
        let after = value.embedded_handles();
        let outcome = outcome.and_then(|r| {
            if changed {
                self.check_attachable(handle, &before, &after)?;
            }
            Ok(r)
        });

        let entry = self
            .record_mut(handle)?
            .store
            .get_mut(name)
            .ok_or_else(|| Error::illegal_state(format!("field '{}' vanished during edit", name)))?;
        let result = match outcome {
            Ok(r) => r,
            Err(e) => {
                entry.value = snapshot;
                return Err(e);
            }
        };
        entry.value = value;
        if !changed {
            return Ok(result);
        }
        if record_events {
            if let Some(listener) = &entry.listener {
                for event in events {
                    listener.on_change(&mut entry.timeline, event);
                }
            }
        }

        self.reconcile_owners(handle, &before, &after)?;
        if !unmarshalling {
            self.mark_dirty(handle, ctx)?;
        }
        Ok(result)
    }
}
