//! In-memory collaborators
//!
//! `MemorySession` and `SchemaRegistry` are complete, thread-safe
//! implementations of the `Session` and `SchemaProvider` seams backed by
//! plain hash maps. They serve embedded use and tests.

use docrec_core::{ClassDescriptor, RecordHandle, RecordId, Result, SchemaProvider};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

use crate::traits::{Session, StoredRecord};

/// Session keeping stored records and the change list in memory
#[derive(Debug)]
pub struct MemorySession {
    stored: RwLock<FxHashMap<RecordId, StoredRecord>>,
    changed: Mutex<Vec<(RecordHandle, RecordId)>>,
    validation: AtomicBool,
    transaction: AtomicBool,
}

impl Default for MemorySession {
    fn default() -> Self {
        MemorySession {
            stored: RwLock::new(FxHashMap::default()),
            changed: Mutex::new(Vec::new()),
            validation: AtomicBool::new(true),
            transaction: AtomicBool::new(false),
        }
    }
}

impl MemorySession {
    /// Empty session with validation enabled
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a buffer under an identity, replacing any previous one
    pub fn store(&self, id: RecordId, version: u64, buffer: Vec<u8>) {
        self.stored.write().insert(id, StoredRecord { version, buffer });
    }

    /// Forget a stored record
    pub fn delete(&self, id: &RecordId) -> bool {
        self.stored.write().remove(id).is_some()
    }

    /// Records registered as changed, in registration order
    pub fn changed_records(&self) -> Vec<(RecordHandle, RecordId)> {
        self.changed.lock().clone()
    }

    /// Drain the change list
    pub fn take_changes(&self) -> Vec<(RecordHandle, RecordId)> {
        std::mem::take(&mut *self.changed.lock())
    }

    /// Empty the change list
    pub fn clear_changes(&self) {
        self.changed.lock().clear();
    }

    /// Toggle validation
    pub fn set_validation_enabled(&self, enabled: bool) {
        self.validation.store(enabled, Ordering::Relaxed);
    }

    /// Toggle the transaction flag
    pub fn set_transaction_active(&self, active: bool) {
        self.transaction.store(active, Ordering::Relaxed);
    }
}

impl Session for MemorySession {
    fn register_changed_record(&self, handle: RecordHandle, id: &RecordId) {
        let mut changed = self.changed.lock();
        if !changed.iter().any(|(h, _)| *h == handle) {
            changed.push((handle, *id));
        }
    }

    fn is_validation_enabled(&self) -> bool {
        self.validation.load(Ordering::Relaxed)
    }

    fn is_transaction_active(&self) -> bool {
        self.transaction.load(Ordering::Relaxed)
    }

    fn load_by_identity(&self, id: &RecordId) -> Result<Option<StoredRecord>> {
        let found = self.stored.read().get(id).cloned();
        trace!(id = %id, found = found.is_some(), "identity lookup");
        Ok(found)
    }
}

/// Versioned class table
///
/// Names are matched case-insensitively. Every registration or removal
/// bumps the version so records re-resolve their cached class.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    classes: RwLock<FxHashMap<String, Arc<ClassDescriptor>>>,
    version: AtomicU64,
}

impl SchemaRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a class
    pub fn register(&self, class: ClassDescriptor) -> Arc<ClassDescriptor> {
        let class = Arc::new(class);
        self.classes
            .write()
            .insert(class.name.to_lowercase(), class.clone());
        self.version.fetch_add(1, Ordering::AcqRel);
        class
    }

    /// Drop a class
    pub fn remove(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        let removed = self.classes.write().remove(&name.to_lowercase());
        if removed.is_some() {
            self.version.fetch_add(1, Ordering::AcqRel);
        }
        removed
    }

    /// Number of classes
    pub fn len(&self) -> usize {
        self.classes.read().len()
    }

    /// True if no class is registered
    pub fn is_empty(&self) -> bool {
        self.classes.read().is_empty()
    }
}

impl SchemaProvider for SchemaRegistry {
    fn class(&self, name: &str) -> Option<Arc<ClassDescriptor>> {
        self.classes.read().get(&name.to_lowercase()).cloned()
    }

    fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    fn class_by_cluster(&self, cluster: i32) -> Option<Arc<ClassDescriptor>> {
        self.classes
            .read()
            .values()
            .find(|c| c.cluster_ids.contains(&cluster))
            .cloned()
    }
}
