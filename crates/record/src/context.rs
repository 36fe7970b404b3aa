//! Explicit collaborator bundle
//!
//! Operations that may decode, convert, resolve classes or register changes
//! take a `Context` instead of reaching for ambient state.

use docrec_core::{DefaultConverter, SchemaProvider, TypeConverter};

use crate::traits::{Serializer, Session};

static DEFAULT_CONVERTER: DefaultConverter = DefaultConverter;

/// Collaborators available to a record operation
#[derive(Clone, Copy)]
pub struct Context<'a> {
    /// Raw buffer codec
    pub serializer: &'a dyn Serializer,
    /// Type coercion
    pub converter: &'a dyn TypeConverter,
    /// Class metadata, if any
    pub schema: Option<&'a dyn SchemaProvider>,
    /// Active session, if any
    pub session: Option<&'a dyn Session>,
}

impl<'a> Context<'a> {
    /// Context with a serializer and the default converter
    pub fn new(serializer: &'a dyn Serializer) -> Self {
        Context {
            serializer,
            converter: &DEFAULT_CONVERTER,
            schema: None,
            session: None,
        }
    }

    /// Attach a schema provider
    pub fn with_schema(mut self, schema: &'a dyn SchemaProvider) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Attach a session
    pub fn with_session(mut self, session: &'a dyn Session) -> Self {
        self.session = Some(session);
        self
    }

    /// Replace the converter
    pub fn with_converter(mut self, converter: &'a dyn TypeConverter) -> Self {
        self.converter = converter;
        self
    }

    /// Validation switch: the session decides when present
    pub fn validation_enabled(&self, fallback: bool) -> bool {
        self.session.map_or(fallback, |s| s.is_validation_enabled())
    }
}
