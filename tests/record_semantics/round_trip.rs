//! Encoding records to buffers and back.

use crate::common::*;

fn build_person(records: &mut Records, ctx: &Context<'_>) -> RecordHandle {
    let person = records.create_with_class("Person", ctx).unwrap();
    records.set(person, "name", "Ada", ctx).unwrap();
    records
        .set(person, "born", NaiveDate::from_ymd_opt(1815, 12, 10).unwrap(), ctx)
        .unwrap();
    records.set(person, "friend", RecordId::new(5, 9), ctx).unwrap();
    records
        .set(person, "tags", vec![Value::from("math"), Value::from("poetry")], ctx)
        .unwrap();

    let address = records.create_with_class("Address", ctx).unwrap();
    records.set(address, "city", "London", ctx).unwrap();
    records.set(person, "address", Value::Embedded(address), ctx).unwrap();
    person
}

#[test]
fn test_stream_round_trip_preserves_content() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let person = build_person(&mut records, &ctx);

    let buf = records.to_stream(person, &ctx).unwrap();
    let copy = records.create_from_buffer(buf, &ctx).unwrap();

    assert!(records.has_same_content(person, copy, &ctx).unwrap());
    assert_eq!(records.class_name(copy, &ctx).unwrap().as_deref(), Some("Person"));
    assert_eq!(records.get(copy, "address.city", &ctx).unwrap(), Value::from("London"));
    assert_eq!(records.names(copy, &ctx).unwrap(), records.names(person, &ctx).unwrap());
}

#[test]
fn test_decoded_children_belong_to_the_decoded_record() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let person = build_person(&mut records, &ctx);
    let buf = records.to_stream(person, &ctx).unwrap();

    let copy = records.create_from_buffer(buf, &ctx).unwrap();
    let child = records.get(copy, "address", &ctx).unwrap().as_embedded().unwrap();
    assert_eq!(records.live_owners(child).unwrap(), vec![copy]);
    assert!(records.is_embedded(child).unwrap());
}

#[test]
fn test_untouched_record_returns_its_buffer() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);

    records.get(person, "name", &ctx).unwrap();
    let stored = env.serializer.encode(&person_image(), false).unwrap();
    assert_eq!(records.to_stream(person, &ctx).unwrap(), stored);
}

#[test]
fn test_delta_stream_carries_changes_and_tombstones() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);

    records.set(person, "age", 37, &ctx).unwrap();
    records.remove(person, "nickname", &ctx).unwrap();

    let delta = records.to_delta_stream(person, &ctx).unwrap();
    assert!(env.serializer.is_delta(&delta).unwrap());

    let image = env.serializer.decode(&delta, None).unwrap();
    assert_eq!(image.fields.len(), 2);
    assert_eq!(image.field("age").unwrap().value, ImageValue::Integer(37));
    assert!(image.field("nickname").unwrap().removed);
    assert!(image.field("name").is_none());
    assert_eq!(env.serializer.field_names(&delta).unwrap().unwrap(), vec!["age"]);
}

#[test]
fn test_full_stream_after_removal_omits_the_field() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);
    records.remove(person, "nickname", &ctx).unwrap();

    let buf = records.to_stream(person, &ctx).unwrap();
    let image = env.serializer.decode(&buf, None).unwrap();
    assert!(image.field("nickname").is_none());
    assert_eq!(image.fields.len(), 4);
}

#[test]
fn test_from_stream_replaces_content() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let person = build_person(&mut records, &ctx);
    let old_child = records.get(person, "address", &ctx).unwrap().as_embedded().unwrap();

    let other = RecordImage::new()
        .with_class("Robot")
        .with_field("serial", ImageValue::Long(42));
    let buf = env.serializer.encode(&other, false).unwrap();
    records.from_stream(person, buf, &ctx).unwrap();

    assert!(!records.is_live(old_child));
    assert_eq!(records.class_name(person, &ctx).unwrap().as_deref(), Some("Robot"));
    assert_eq!(records.names(person, &ctx).unwrap(), vec!["serial"]);
    assert_eq!(records.get(person, "serial", &ctx).unwrap(), Value::Long(42));
}

#[test]
fn test_content_differs_after_edit() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let person = build_person(&mut records, &ctx);
    let buf = records.to_stream(person, &ctx).unwrap();
    let copy = records.create_from_buffer(buf, &ctx).unwrap();

    records.set(copy, "address.city", "Paris", &ctx).unwrap();
    assert!(!records.has_same_content(person, copy, &ctx).unwrap());
}
