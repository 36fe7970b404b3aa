//! Structural change events and timelines
//!
//! A trackable field value (list, set, map, reference bag) carries one
//! `ChangeListener`. Every structural edit made through a `TrackedMut`
//! guard is reported to it as a `ChangeEvent`, and the listener appends the
//! event to the field's `Timeline`. Replaying a timeline backwards restores
//! the value it was recorded against.

use docrec_core::{Error, Result, Value};
use std::fmt;
use tracing::trace;

/// Position of a change inside a container
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKey {
    /// List or set position; ignored by reference bags
    Index(usize),
    /// Map key
    Key(String),
}

impl fmt::Display for ChangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKey::Index(i) => write!(f, "[{}]", i),
            ChangeKey::Key(k) => write!(f, "{{{}}}", k),
        }
    }
}

/// One structural change
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    /// Element added
    Add {
        /// Where
        key: ChangeKey,
        /// What
        value: Value,
    },
    /// Element removed
    Remove {
        /// Where
        key: ChangeKey,
        /// Removed element
        old: Value,
    },
    /// Element replaced
    Update {
        /// Where
        key: ChangeKey,
        /// Replaced element
        old: Value,
        /// New element
        new: Value,
    },
    /// Change inside a nested container
    Nested {
        /// Which element
        key: ChangeKey,
        /// Changes applied to it
        timeline: Timeline,
    },
}

impl ChangeEvent {
    /// The key this event applies to
    pub fn key(&self) -> &ChangeKey {
        match self {
            ChangeEvent::Add { key, .. }
            | ChangeEvent::Remove { key, .. }
            | ChangeEvent::Update { key, .. }
            | ChangeEvent::Nested { key, .. } => key,
        }
    }
}

/// Ordered log of structural changes of one field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    events: Vec<ChangeEvent>,
}

impl Timeline {
    /// Empty timeline
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn push(&mut self, event: ChangeEvent) {
        self.events.push(event);
    }

    /// Events in recording order
    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Undo every event on `value`, newest first
    pub fn revert(&self, value: &mut Value) -> Result<()> {
        for event in self.events.iter().rev() {
            revert_event(value, event)?;
        }
        Ok(())
    }

    /// The value as it was before the first recorded event
    pub fn reverted(&self, value: &Value) -> Result<Value> {
        let mut out = value.clone();
        self.revert(&mut out)?;
        Ok(out)
    }
}

impl From<Vec<ChangeEvent>> for Timeline {
    fn from(events: Vec<ChangeEvent>) -> Self {
        Timeline { events }
    }
}

fn mismatch(key: &ChangeKey, type_name: &str) -> Error {
    Error::illegal_state(format!(
        "timeline event at {} does not apply to {}",
        key, type_name
    ))
}

/// Mutable access to the element of `value` addressed by `key`
pub(crate) fn element_mut<'v>(value: &'v mut Value, key: &ChangeKey) -> Option<&'v mut Value> {
    match (value, key) {
        (Value::List(v) | Value::Set(v), ChangeKey::Index(i)) => v.get_mut(*i),
        (Value::Map(m), ChangeKey::Key(k)) => m.get_mut(k),
        _ => None,
    }
}

fn revert_event(value: &mut Value, event: &ChangeEvent) -> Result<()> {
    let type_name = value.type_name();
    match event {
        ChangeEvent::Add { key, value: added } => match (&mut *value, key) {
            (Value::List(v) | Value::Set(v), ChangeKey::Index(i)) if *i < v.len() => {
                v.remove(*i);
            }
            (Value::Map(m), ChangeKey::Key(k)) => {
                m.remove(k);
            }
            (Value::LinkBag(b), _) => {
                if let Value::Link(id) = added {
                    b.remove(id);
                }
            }
            _ => return Err(mismatch(key, type_name)),
        },
        ChangeEvent::Remove { key, old } => match (&mut *value, key) {
            (Value::List(v) | Value::Set(v), ChangeKey::Index(i)) => {
                let at = (*i).min(v.len());
                v.insert(at, old.clone());
            }
            (Value::Map(m), ChangeKey::Key(k)) => {
                m.insert(k.clone(), old.clone());
            }
            (Value::LinkBag(b), _) => {
                if let Value::Link(id) = old {
                    b.add(*id);
                }
            }
            _ => return Err(mismatch(key, type_name)),
        },
        ChangeEvent::Update { key, old, .. } => match (&mut *value, key) {
            (Value::List(v) | Value::Set(v), ChangeKey::Index(i)) if *i < v.len() => {
                v[*i] = old.clone();
            }
            (Value::Map(m), ChangeKey::Key(k)) => {
                m.insert(k.clone(), old.clone());
            }
            _ => return Err(mismatch(key, type_name)),
        },
        ChangeEvent::Nested { key, timeline } => {
            let child = element_mut(value, key).ok_or_else(|| mismatch(key, type_name))?;
            timeline.revert(child)?;
        }
    }
    Ok(())
}

/// Observer bound to one trackable field value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeListener {
    field: String,
}

impl ChangeListener {
    /// Listener for the named field
    pub fn new(field: impl Into<String>) -> Self {
        ChangeListener {
            field: field.into(),
        }
    }

    /// Field this listener observes
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Record `event` into the field's timeline
    pub fn on_change(&self, timeline: &mut Option<Timeline>, event: ChangeEvent) {
        trace!(field = %self.field, key = %event.key(), "structural change");
        timeline.get_or_insert_with(Timeline::new).push(event);
    }
}
