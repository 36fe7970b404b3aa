//! Class binding, declared types and conversion.

use crate::common::*;

fn register_person(env: &TestEnv) {
    env.schema.register(
        ClassDescriptor::new("Person")
            .cluster(5)
            .property(PropertyDescriptor::new("age", FieldType::Integer))
            .property(PropertyDescriptor::new("born", FieldType::Date))
            .property(PropertyDescriptor::new("active", FieldType::Boolean).default_value("true"))
            .property(
                PropertyDescriptor::new("scores", FieldType::EmbeddedList).linked_type(FieldType::Long),
            )
            .property(PropertyDescriptor::new("address", FieldType::Embedded).linked_class("Address")),
    );
    env.schema.register(
        ClassDescriptor::new("Address").property(PropertyDescriptor::new("zip", FieldType::String)),
    );
}

#[test]
fn test_writes_are_converted_to_declared_types() {
    let env = TestEnv::new();
    register_person(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create_with_class("person", &ctx).unwrap();

    records.set(h, "age", "42", &ctx).unwrap();
    records.set(h, "born", "1815-12-10", &ctx).unwrap();
    assert_eq!(records.get(h, "age", &ctx).unwrap(), Value::Integer(42));
    assert_eq!(
        records.get(h, "born", &ctx).unwrap(),
        Value::Date(NaiveDate::from_ymd_opt(1815, 12, 10).unwrap())
    );
    assert_eq!(records.field_type(h, "age", &ctx).unwrap(), Some(FieldType::Integer));
    assert_eq!(records.class_name(h, &ctx).unwrap().as_deref(), Some("Person"));
}

#[test]
fn test_unconvertible_write_fails_and_keeps_old_value() {
    let env = TestEnv::new();
    register_person(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create_with_class("Person", &ctx).unwrap();
    records.set(h, "age", 30, &ctx).unwrap();

    let err = records.set(h, "age", "thirty", &ctx).unwrap_err();
    assert!(matches!(err, Error::Conversion(_)));
    assert_eq!(records.get(h, "age", &ctx).unwrap(), Value::Integer(30));
}

#[test]
fn test_binding_converts_existing_fields_and_installs_defaults() {
    let env = TestEnv::new();
    register_person(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create();
    records.set(h, "age", "7", &ctx).unwrap();
    records.set(h, "extra", "kept", &ctx).unwrap();

    records.set_class_name(h, Some("Person"), &ctx).unwrap();
    assert_eq!(records.get(h, "age", &ctx).unwrap(), Value::Integer(7));
    assert_eq!(records.get(h, "active", &ctx).unwrap(), Value::Bool(true));
    assert_eq!(records.get(h, "extra", &ctx).unwrap(), Value::from("kept"));
}

#[test]
fn test_class_resolved_from_cluster() {
    let env = TestEnv::new();
    register_person(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create();
    records.set_identity(h, RecordId::new(5, 12)).unwrap();

    assert_eq!(records.class_name(h, &ctx).unwrap().as_deref(), Some("Person"));
    assert!(records.property(h, "age", &ctx).unwrap().is_some());
}

#[test]
fn test_schema_changes_are_picked_up() {
    let env = TestEnv::new();
    register_person(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create_with_class("Person", &ctx).unwrap();
    assert!(records.property(h, "nickname", &ctx).unwrap().is_none());

    env.schema.register(
        ClassDescriptor::new("Person").property(PropertyDescriptor::new("nickname", FieldType::String)),
    );
    assert_eq!(
        records.property(h, "nickname", &ctx).unwrap().map(|p| p.field_type),
        Some(FieldType::String)
    );
}

#[test]
fn test_auto_convert_elements_and_embedded_maps() {
    let env = TestEnv::new();
    register_person(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create_with_class("Person", &ctx).unwrap();
    records
        .set(h, "scores", vec![Value::from("1"), Value::Integer(2)], &ctx)
        .unwrap();
    let mut address = BTreeMap::new();
    address.insert("zip".to_string(), Value::from("00100"));
    records.set(h, "address", Value::Map(address), &ctx).unwrap();

    records.auto_convert_values(h, &ctx).unwrap();
    assert_eq!(
        records.get(h, "scores", &ctx).unwrap(),
        Value::List(vec![Value::Long(1), Value::Long(2)])
    );
    let child = records.get(h, "address", &ctx).unwrap().as_embedded().unwrap();
    assert_eq!(records.class_name(child, &ctx).unwrap().as_deref(), Some("Address"));
    assert_eq!(records.get(h, "address.zip", &ctx).unwrap(), Value::from("00100"));
    assert_eq!(records.live_owners(child).unwrap(), vec![h]);
}

#[test]
fn test_unbinding_clears_the_class() {
    let env = TestEnv::new();
    register_person(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create_with_class("Person", &ctx).unwrap();

    records.set(h, "@class", Value::Null, &ctx).unwrap();
    assert_eq!(records.class_name(h, &ctx).unwrap(), None);
    assert!(records.class_of(h, &ctx).unwrap().is_none());
}
