//! Lazy loading through the session and partial decoding of buffers.

use crate::common::*;

#[test]
fn test_placeholder_loads_on_first_read() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);
    assert_eq!(records.record(person).unwrap().status(), RecordStatus::NotLoaded);

    assert_eq!(records.get(person, "name", &ctx).unwrap(), Value::from("Ada"));
    let rec = records.record(person).unwrap();
    assert_eq!(rec.status(), RecordStatus::Loaded);
    assert_eq!(rec.version(), 1);
    assert!(!rec.is_dirty());
}

#[test]
fn test_single_field_read_decodes_only_that_field() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);

    records.get(person, "age", &ctx).unwrap();
    let rec = records.record(person).unwrap();
    assert_eq!(rec.entries().len(), 1);
    assert!(rec.source().is_some());

    // Names come from the buffer header
    assert_eq!(
        records.field_names_fast(person, &ctx).unwrap(),
        vec!["name", "age", "nickname", "address", "tags"]
    );
    assert_eq!(records.record(person).unwrap().entries().len(), 1);
}

#[test]
fn test_mutation_decodes_everything_and_drops_buffer() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);

    records.set(person, "age", 37, &ctx).unwrap();
    let rec = records.record(person).unwrap();
    assert!(rec.source().is_none());
    assert_eq!(rec.entries().len(), 5);
    assert!(rec.is_dirty());
    assert_eq!(records.get(person, "nickname", &ctx).unwrap(), Value::from("countess"));
}

#[test]
fn test_disabling_lazy_load_decodes_now() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let buf = env.serializer.encode(&person_image(), false).unwrap();
    let mut records = Records::new();
    let person = records.create_from_buffer(buf, &ctx).unwrap();
    assert!(records.record(person).unwrap().entries().is_empty());

    records.set_lazy_load(person, false, &ctx).unwrap();
    let rec = records.record(person).unwrap();
    assert!(rec.source().is_none());
    assert_eq!(rec.entries().len(), 5);
    assert!(!rec.is_dirty());
}

#[test]
fn test_missing_identity_is_not_found() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let ghost = records.create_placeholder(RecordId::new(7, 3));

    let err = records.get(ghost, "name", &ctx).unwrap_err();
    assert!(matches!(err, Error::RecordNotFound(id) if id == RecordId::new(7, 3)));
    assert_eq!(records.record(ghost).unwrap().status(), RecordStatus::NotLoaded);
}

#[test]
fn test_loading_without_session_fails() {
    let env = TestEnv::new();
    let ctx = Context::new(&env.serializer);
    let (mut records, person) = loaded_person(&env);

    let err = records.get(person, "name", &ctx).unwrap_err();
    assert!(matches!(err, Error::IllegalState(_)));
}

#[test]
fn test_corrupt_buffer_surfaces_on_access_and_is_kept() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut buf = env.serializer.encode(&person_image(), false).unwrap();
    let last = buf.len() - 1;
    buf[last] ^= 0xAA;

    let mut records = Records::new();
    let person = records.create_from_buffer(buf, &ctx).unwrap();
    let err = records.get(person, "name", &ctx).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
    assert!(records.record(person).unwrap().source().is_some());
}

#[test]
fn test_reload_discards_local_changes() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);
    records.set(person, "name", "Grace", &ctx).unwrap();

    let mut changed = person_image();
    changed.fields[1].value = ImageValue::Integer(40);
    env.persist(PERSON_ID, 2, &changed);

    records.reload(person, &ctx).unwrap();
    assert_eq!(records.get(person, "name", &ctx).unwrap(), Value::from("Ada"));
    assert_eq!(records.get(person, "age", &ctx).unwrap(), Value::from(40));
    assert_eq!(records.version(person).unwrap(), 2);
    assert!(!records.record(person).unwrap().is_dirty());
}

#[test]
fn test_unload_then_access_fetches_again() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);
    let address = records.get(person, "address", &ctx).unwrap().as_embedded().unwrap();

    records.unload(person).unwrap();
    assert_eq!(records.record(person).unwrap().status(), RecordStatus::NotLoaded);
    assert!(!records.is_live(address));

    assert_eq!(records.get(person, "address.city", &ctx).unwrap(), Value::from("Rome"));
}

#[test]
fn test_config_file_turns_off_lazy_loading() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join(docrec::CONFIG_FILE_NAME);
    std::fs::write(&path, "lazy_load = false\ntracking_changes = false\n").unwrap();
    let config = docrec::RecordConfig::from_file(&path).unwrap();
    assert!(config.ordered);

    let env = TestEnv::new();
    let ctx = env.ctx();
    let buf = env.serializer.encode(&person_image(), false).unwrap();
    let mut records = Records::with_config(config);
    let person = records.create_from_buffer(buf, &ctx).unwrap();

    let rec = records.record(person).unwrap();
    assert!(rec.source().is_none());
    assert!(!rec.is_tracking_changes());
    assert_eq!(rec.entries().len(), 5);
}
