//! Shared fixtures for unit tests

use docrec_core::{Error, Result};

use crate::context::Context;
use crate::image::RecordImage;
use crate::memory::{MemorySession, SchemaRegistry};
use crate::traits::Serializer;

/// Serializer storing images as JSON
#[derive(Debug, Default)]
pub(crate) struct JsonSerializer;

impl Serializer for JsonSerializer {
    fn decode(&self, buf: &[u8], fields: Option<&[String]>) -> Result<RecordImage> {
        let mut image: RecordImage =
            serde_json::from_slice(buf).map_err(|e| Error::Serialization(e.to_string()))?;
        if let Some(names) = fields {
            image.retain_fields(names);
        }
        Ok(image)
    }

    fn encode(&self, image: &RecordImage, _delta_only: bool) -> Result<Vec<u8>> {
        serde_json::to_vec(image).map_err(|e| Error::Serialization(e.to_string()))
    }

    fn field_names(&self, buf: &[u8]) -> Result<Option<Vec<String>>> {
        self.decode(buf, None).map(|image| Some(image.field_names()))
    }
}

pub(crate) struct TestParts {
    pub serializer: JsonSerializer,
    pub schema: SchemaRegistry,
    pub session: MemorySession,
}

impl TestParts {
    pub fn context(&self) -> Context<'_> {
        Context::new(&self.serializer)
            .with_schema(&self.schema)
            .with_session(&self.session)
    }
}

pub(crate) fn ctx_parts() -> TestParts {
    TestParts {
        serializer: JsonSerializer,
        schema: SchemaRegistry::new(),
        session: MemorySession::new(),
    }
}
