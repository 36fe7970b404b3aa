//! Core identity types for docrec
//!
//! This module defines:
//! - RecordId: Persistent identity of a record (`#cluster:position`)
//! - RecordHandle: Generation-checked arena handle for in-memory records

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Persistent identity of a record
///
/// A record id is a `(cluster, position)` pair. A freshly created record
/// carries the unassigned id `#-1:-1` until storage assigns one.
///
/// - `is_valid()`: the cluster is assigned
/// - `is_new()`: the position is not assigned yet
/// - `is_persistent()`: both parts are assigned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId {
    /// Container (cluster) id
    pub cluster: i32,
    /// Sequence within the container
    pub position: i64,
}

impl RecordId {
    /// Cluster id of an unassigned identity
    pub const CLUSTER_INVALID: i32 = -1;
    /// Position of an unassigned identity
    pub const POSITION_INVALID: i64 = -1;

    /// Create a record id
    pub const fn new(cluster: i32, position: i64) -> Self {
        RecordId { cluster, position }
    }

    /// The unassigned identity
    pub const fn unassigned() -> Self {
        RecordId {
            cluster: Self::CLUSTER_INVALID,
            position: Self::POSITION_INVALID,
        }
    }

    /// True if the cluster part is assigned
    pub fn is_valid(&self) -> bool {
        self.cluster != Self::CLUSTER_INVALID
    }

    /// True if the record has not been given a position yet
    pub fn is_new(&self) -> bool {
        self.position < 0
    }

    /// True if both parts are assigned
    pub fn is_persistent(&self) -> bool {
        self.cluster > Self::CLUSTER_INVALID && self.position > Self::POSITION_INVALID
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::unassigned()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.cluster, self.position)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    /// Parse `#c:p` or `c:p`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let (cluster, position) = body
            .split_once(':')
            .ok_or_else(|| Error::invalid_argument(format!("malformed record id '{}'", s)))?;
        let cluster = cluster
            .parse::<i32>()
            .map_err(|_| Error::invalid_argument(format!("malformed cluster in '{}'", s)))?;
        let position = position
            .parse::<i64>()
            .map_err(|_| Error::invalid_argument(format!("malformed position in '{}'", s)))?;
        Ok(RecordId { cluster, position })
    }
}

/// Handle to a record living in a record arena
///
/// Handles are plain indices paired with the generation of the slot they
/// were issued for. Once the slot is released its generation moves on, so
/// every outstanding handle to the old occupant becomes stale instead of
/// aliasing the next record placed in that slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordHandle {
    index: u32,
    generation: u32,
}

impl RecordHandle {
    /// Create a handle from raw parts
    pub const fn new(index: u32, generation: u32) -> Self {
        RecordHandle { index, generation }
    }

    /// Slot index
    #[inline]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Slot generation this handle was issued for
    #[inline]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Display for RecordHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}v{}", self.index, self.generation)
    }
}
