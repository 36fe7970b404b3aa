//! Shared fixtures for the record semantics suite.

#![allow(dead_code)]
#![allow(unused_imports)]

pub use chrono::NaiveDate;
pub use docrec::{
    BinarySerializer, ClassDescriptor, Context, Error, FieldPath, FieldType, ImageField, ImageValue, LinkBag,
    MemorySession, PropertyDescriptor, RecordHandle, RecordId, RecordImage, RecordStatus, Records,
    SchemaRegistry, Serializer, ValidationError, Value,
};
pub use std::collections::BTreeMap;
use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Route library events to the test harness output
fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Collaborators shared by one test
pub struct TestEnv {
    pub serializer: BinarySerializer,
    pub schema: SchemaRegistry,
    pub session: MemorySession,
}

impl TestEnv {
    pub fn new() -> Self {
        init_tracing();
        TestEnv {
            serializer: BinarySerializer::new(),
            schema: SchemaRegistry::new(),
            session: MemorySession::new(),
        }
    }

    pub fn ctx(&self) -> Context<'_> {
        Context::new(&self.serializer)
            .with_schema(&self.schema)
            .with_session(&self.session)
    }

    /// Encode an image and make it loadable under `id`
    pub fn persist(&self, id: RecordId, version: u64, image: &RecordImage) {
        let buf = self.serializer.encode(image, false).unwrap();
        self.session.store(id, version, buf);
    }
}

pub const PERSON_ID: RecordId = RecordId::new(5, 0);

/// A stored person with an embedded address
pub fn person_image() -> RecordImage {
    let address = RecordImage::new()
        .with_class("Address")
        .with_field("city", ImageValue::String("Rome".into()))
        .with_field("zip", ImageValue::String("00100".into()));
    RecordImage::new()
        .with_class("Person")
        .with_field("name", ImageValue::String("Ada".into()))
        .with_field("age", ImageValue::Integer(36))
        .with_field("nickname", ImageValue::String("countess".into()))
        .with_field("address", ImageValue::Embedded(Box::new(address)))
        .with_field(
            "tags",
            ImageValue::List(vec![
                ImageValue::String("math".into()),
                ImageValue::String("poetry".into()),
            ]),
        )
}

/// Arena with the person loaded as a placeholder
pub fn loaded_person(env: &TestEnv) -> (Records, RecordHandle) {
    env.persist(PERSON_ID, 1, &person_image());
    let mut records = Records::new();
    let handle = records.create_placeholder(PERSON_ID);
    (records, handle)
}

pub fn sorted(mut names: Vec<String>) -> Vec<String> {
    names.sort();
    names
}
