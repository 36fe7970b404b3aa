//! Error types for docrec
//!
//! This module defines all error types used by the record engine.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.

use crate::field_type::FieldType;
use crate::types::{RecordHandle, RecordId};
use thiserror::Error;

/// Result type alias for record operations
pub type Result<T> = std::result::Result<T, Error>;

/// A schema constraint violation
///
/// Carries the full property name (`Class.property`) and a human-readable
/// reason. Raised by validation before a record is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("The field '{property}' {reason}")]
pub struct ValidationError {
    /// Fully qualified property name
    pub property: String,
    /// Why the property failed
    pub reason: String,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(property: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError {
            property: property.into(),
            reason: reason.into(),
        }
    }
}

/// A failed type coercion
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot convert {value_type} to {target}: {reason}")]
pub struct ConversionError {
    /// Type name of the value being converted
    pub value_type: &'static str,
    /// Requested target type
    pub target: FieldType,
    /// Details
    pub reason: String,
}

impl ConversionError {
    /// Create a new conversion error
    pub fn new(value_type: &'static str, target: FieldType, reason: impl Into<String>) -> Self {
        ConversionError {
            value_type,
            target,
            reason: reason.into(),
        }
    }
}

/// Error types for the record engine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Null or empty field name, malformed path, odd-length field-pair list
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An intermediate path segment could not be resolved on write
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The path as given by the caller
        path: String,
        /// Why it could not be resolved
        reason: String,
    },

    /// Schema constraint violation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Type coercion failure
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Load or reload against an identity storage reports as absent
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),

    /// Operation not allowed in the current state
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Handle refers to a released or reused arena slot
    #[error("Stale record handle: {0:?}")]
    StaleHandle(RecordHandle),

    /// Serializer collaborator failed to decode or encode
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create an invalid-argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// Create an invalid-path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an illegal-state error
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        Error::IllegalState(msg.into())
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// The validation error, if this is one
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Error::Validation(v) => Some(v),
            _ => None,
        }
    }
}
