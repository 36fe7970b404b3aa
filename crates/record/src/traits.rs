//! Collaborator traits
//!
//! The record engine talks to the outside world through these seams:
//! - Serializer: raw buffer <-> `RecordImage`
//! - Session: change list, validation switch, identity lookups
//!
//! Schema metadata and type conversion seams live in `docrec-core`
//! (`SchemaProvider`, `TypeConverter`).

use docrec_core::{RecordHandle, RecordId, Result};

use crate::image::RecordImage;

/// Binary record format
///
/// Implementations must be able to decode a subset of fields without
/// materializing the rest of the buffer.
pub trait Serializer: Send + Sync {
    /// Decode `buf`, restricted to `fields` when given
    ///
    /// An empty subset decodes attributes (class name) only.
    fn decode(&self, buf: &[u8], fields: Option<&[String]>) -> Result<RecordImage>;

    /// Encode an image; delta images carry only changed fields and tombstones
    fn encode(&self, image: &RecordImage, delta_only: bool) -> Result<Vec<u8>>;

    /// Field names stored in `buf`, without decoding values
    ///
    /// Returns `None` when the format cannot answer cheaply.
    fn field_names(&self, buf: &[u8]) -> Result<Option<Vec<String>>>;
}

/// A stored record as returned by identity lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    /// Persisted version
    pub version: u64,
    /// Raw buffer
    pub buffer: Vec<u8>,
}

/// Active database session or transaction
pub trait Session {
    /// Add a top-level record to the change list
    fn register_changed_record(&self, handle: RecordHandle, id: &RecordId);

    /// Should records be validated before persisting
    fn is_validation_enabled(&self) -> bool;

    /// Is a transaction in progress
    fn is_transaction_active(&self) -> bool;

    /// Fetch a stored record by identity
    fn load_by_identity(&self, id: &RecordId) -> Result<Option<StoredRecord>>;
}
