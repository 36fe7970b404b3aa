//! Record engine for docrec
//!
//! This crate implements schema-aware, mutable document records:
//! - Records: arena of records addressed by generation-checked handles
//! - FieldEntry / EntryStore: per-field state and insertion-ordered storage
//! - Ownership: embedded records point back at their containers
//! - Dirty tracking: propagation to the root and session registration
//! - Change tracking: listeners, timelines, undo
//! - Lazy loading: partial decode of raw buffers through a `Serializer`
//! - Schema binding, auto-conversion and validation
//! - Merge, comparison, map conversion and detach
//!
//! All operations that may decode, convert or register changes take a
//! `Context` bundling the serializer, converter, schema provider and session.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
pub mod access;
pub mod arena;
pub mod binder;
pub mod compare;
pub mod config;
pub mod context;
pub mod dirty;
pub mod entry;
pub mod history;
pub mod image;
pub mod listener;
pub mod loader;
pub mod memory;
pub mod merge;
pub mod owners;
pub mod record;
pub mod store;
pub mod tracked;
pub mod traits;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types and traits
pub use access::{check_field_name, ATTRIBUTE_CLASS, ATTRIBUTE_RID, ATTRIBUTE_VERSION};
pub use arena::Records;
pub use config::{RecordConfig, CONFIG_FILE_NAME};
pub use context::Context;
pub use entry::FieldEntry;
pub use image::{ImageField, ImageValue, RecordImage};
pub use listener::{ChangeEvent, ChangeKey, ChangeListener, Timeline};
pub use memory::{MemorySession, SchemaRegistry};
pub use record::{Record, RecordStatus};
pub use store::EntryStore;
pub use tracked::TrackedMut;
pub use traits::{Serializer, Session, StoredRecord};
