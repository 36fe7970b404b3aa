//! Merging records loaded from storage with local ones.

use crate::common::*;

#[test]
fn test_merge_into_loaded_record_tracks_changes() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);
    let patch = records
        .create_from_map([("age", Value::from(37)), ("email", Value::from("ada@example.org"))], &ctx)
        .unwrap();

    records.merge(person, patch, true, false, &ctx).unwrap();
    assert_eq!(records.get(person, "age", &ctx).unwrap(), Value::from(37));
    assert_eq!(records.get(person, "name", &ctx).unwrap(), Value::from("Ada"));
    assert_eq!(sorted(records.dirty_fields(person).unwrap()), vec!["age", "email"]);
    assert_eq!(env.session.changed_records(), vec![(person, PERSON_ID)]);

    records.undo(person).unwrap();
    assert_eq!(records.get(person, "age", &ctx).unwrap(), Value::from(36));
    assert!(!records.exists(person, "email", &ctx).unwrap());
}

#[test]
fn test_full_merge_mirrors_the_source() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);
    let buf = env
        .serializer
        .encode(
            &RecordImage::new()
                .with_field("name", ImageValue::String("Ada".into()))
                .with_field("age", ImageValue::Integer(36)),
            false,
        )
        .unwrap();
    let source = records.create_from_buffer(buf, &ctx).unwrap();

    records.merge(person, source, false, false, &ctx).unwrap();
    assert_eq!(sorted(records.names(person, &ctx).unwrap()), vec!["age", "name"]);
    assert_eq!(records.class_name(person, &ctx).unwrap().as_deref(), Some("Person"));
    assert!(!records.is_changed(person, "name").unwrap());
}

#[test]
fn test_merge_items_extends_loaded_containers() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);
    let patch = records.create();
    records
        .set(patch, "tags", vec![Value::from("poetry"), Value::from("engines")], &ctx)
        .unwrap();

    records.merge(person, patch, true, true, &ctx).unwrap();
    assert_eq!(
        records.get(person, "tags", &ctx).unwrap(),
        Value::List(vec![Value::from("math"), Value::from("poetry"), Value::from("engines")])
    );
    assert_eq!(records.timeline(person, "tags").unwrap().unwrap().len(), 1);
}

#[test]
fn test_merged_embedded_records_are_copies() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);
    let other = records.create();
    let loaded_address = records.get(person, "address", &ctx).unwrap().as_embedded().unwrap();
    records.merge(other, person, true, false, &ctx).unwrap();

    let copied = records.get(other, "address", &ctx).unwrap().as_embedded().unwrap();
    assert_ne!(copied, loaded_address);
    assert_eq!(records.get(other, "address.city", &ctx).unwrap(), Value::from("Rome"));

    records.set(other, "address.city", "Turin", &ctx).unwrap();
    assert_eq!(records.get(person, "address.city", &ctx).unwrap(), Value::from("Rome"));
}
