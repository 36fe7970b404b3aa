//! The record
//!
//! A `Record` is plain state: identity, version, class binding, entries,
//! the pending raw buffer, status and flags, and the owner back-references.
//! All behavior that may touch other records lives on the `Records` arena.

use docrec_core::{ClassDescriptor, RecordHandle, RecordId};
use smallvec::SmallVec;
use std::sync::Arc;

use crate::config::RecordConfig;
use crate::store::EntryStore;

/// Load state of a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordStatus {
    /// Identity only, content not fetched
    NotLoaded,
    /// Fetch in progress
    Loading,
    /// Content available (possibly still as raw buffer)
    Loaded,
    /// Raw buffer being decoded into entries
    Unmarshalling,
    /// Entries being encoded into a buffer
    Marshalling,
}

/// In-memory record state
#[derive(Debug, Clone)]
pub struct Record {
    pub(crate) id: RecordId,
    pub(crate) version: u64,
    pub(crate) class_name: Option<String>,
    pub(crate) class: Option<Arc<ClassDescriptor>>,
    pub(crate) schema_version: u64,
    pub(crate) store: EntryStore,
    pub(crate) source: Option<Vec<u8>>,
    pub(crate) status: RecordStatus,
    pub(crate) dirty: bool,
    pub(crate) content_changed: bool,
    pub(crate) tracking: bool,
    pub(crate) lazy_load: bool,
    pub(crate) chained_access: bool,
    pub(crate) owners: SmallVec<[RecordHandle; 2]>,
}

impl Record {
    /// A new, empty, unsaved record
    pub(crate) fn new(config: &RecordConfig) -> Self {
        Record {
            id: RecordId::unassigned(),
            version: 0,
            class_name: None,
            class: None,
            schema_version: 0,
            store: EntryStore::new(config.ordered),
            source: None,
            status: RecordStatus::Loaded,
            dirty: true,
            content_changed: true,
            tracking: config.tracking_changes,
            lazy_load: config.lazy_load,
            chained_access: config.allow_chained_access,
            owners: SmallVec::new(),
        }
    }

    /// Identity
    pub fn id(&self) -> RecordId {
        self.id
    }

    /// Version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Class name as bound (canonical once resolved)
    pub fn class_name(&self) -> Option<&str> {
        self.class_name.as_deref()
    }

    /// Load state
    pub fn status(&self) -> RecordStatus {
        self.status
    }

    /// Pending changes not yet persisted
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Content changed since the last clean state
    pub fn is_content_changed(&self) -> bool {
        self.content_changed
    }

    /// Change tracking enabled
    pub fn is_tracking_changes(&self) -> bool {
        self.tracking
    }

    /// Lazy decoding enabled
    pub fn is_lazy_load(&self) -> bool {
        self.lazy_load
    }

    /// Path-like names resolve as paths
    pub fn allows_chained_access(&self) -> bool {
        self.chained_access
    }

    /// Fields kept in insertion order
    pub fn is_ordered(&self) -> bool {
        self.store.is_ordered()
    }

    /// Pending raw buffer, if not fully materialized
    pub fn source(&self) -> Option<&[u8]> {
        self.source.as_deref()
    }

    /// Entries materialized so far
    pub fn entries(&self) -> &EntryStore {
        &self.store
    }

    /// Owner back-references as recorded (may include stale handles)
    pub fn owners(&self) -> &[RecordHandle] {
        &self.owners
    }

    /// Embedded in at least one container
    ///
    /// Stale owners are only pruned by the arena, so this may report true
    /// for a record whose containers were all released.
    pub fn is_embedded(&self) -> bool {
        !self.owners.is_empty()
    }
}
