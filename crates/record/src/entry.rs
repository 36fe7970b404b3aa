//! Field entries
//!
//! A `FieldEntry` is one field's slot: the value, its declared type, the
//! lifecycle flags of the current dirty episode and whatever history is
//! needed to undo it.

use docrec_core::{FieldType, Result, Value};

use crate::listener::{ChangeListener, Timeline};

/// One field of a record
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    pub(crate) value: Value,
    pub(crate) field_type: Option<FieldType>,
    pub(crate) exists: bool,
    pub(crate) created: bool,
    pub(crate) changed: bool,
    pub(crate) original: Option<Value>,
    pub(crate) timeline: Option<Timeline>,
    pub(crate) listener: Option<ChangeListener>,
}

impl FieldEntry {
    /// A present, clean entry
    pub fn new(value: Value, field_type: Option<FieldType>) -> Self {
        FieldEntry {
            value,
            field_type,
            exists: true,
            created: false,
            changed: false,
            original: None,
            timeline: None,
            listener: None,
        }
    }

    /// A present entry added in the current dirty episode
    pub(crate) fn created(value: Value, field_type: Option<FieldType>) -> Self {
        FieldEntry {
            created: true,
            changed: true,
            ..FieldEntry::new(value, field_type)
        }
    }

    /// Current value
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Declared type
    pub fn field_type(&self) -> Option<FieldType> {
        self.field_type
    }

    /// Declared type, or the type inferred from the value
    pub fn effective_type(&self) -> Option<FieldType> {
        self.field_type.or_else(|| FieldType::of(&self.value))
    }

    /// Logically present
    pub fn exists(&self) -> bool {
        self.exists
    }

    /// Added since the last clean state
    pub fn is_created(&self) -> bool {
        self.created
    }

    /// Value replaced since the last clean state
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Structural changes recorded since the last clean state
    pub fn timeline(&self) -> Option<&Timeline> {
        self.timeline.as_ref()
    }

    /// True if a listener observes the value
    pub fn has_listener(&self) -> bool {
        self.listener.is_some()
    }

    /// Changed, created or structurally modified
    pub fn is_dirty(&self) -> bool {
        self.changed || self.created || self.timeline.as_ref().map_or(false, |t| !t.is_empty())
    }

    /// The value at the start of the dirty episode
    ///
    /// `None` for entries created in this episode and for untouched entries.
    pub fn on_load_value(&self) -> Result<Option<Value>> {
        if self.created {
            return Ok(None);
        }
        if self.changed {
            return Ok(self.original.clone());
        }
        match &self.timeline {
            Some(t) if !t.is_empty() => t.reverted(&self.value).map(Some),
            _ => Ok(None),
        }
    }

    /// Capture the original before the first replacement of this episode
    ///
    /// A pending structural timeline is folded into the captured original.
    pub(crate) fn mark_changed(&mut self) -> Result<()> {
        if !self.changed {
            let original = match self.timeline.take() {
                Some(t) => t.reverted(&self.value)?,
                None => self.value.clone(),
            };
            self.original = Some(original);
            self.changed = true;
        }
        Ok(())
    }

    /// Attach or drop the listener to match the value and tracking state
    pub(crate) fn refresh_listener(&mut self, name: &str, tracking: bool) {
        if tracking && self.value.is_trackable() {
            if self.listener.is_none() {
                self.listener = Some(ChangeListener::new(name));
            }
        } else {
            self.listener = None;
        }
    }

    /// Forget the dirty episode
    pub(crate) fn clear_history(&mut self) {
        self.created = false;
        self.changed = false;
        self.original = None;
        self.timeline = None;
    }
}
