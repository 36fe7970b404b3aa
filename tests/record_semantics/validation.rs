//! Validation of records against their class.

use crate::common::*;

fn register(env: &TestEnv) {
    env.schema.register(
        ClassDescriptor::new("Person")
            .property(PropertyDescriptor::new("name", FieldType::String).mandatory(true).not_null(true))
            .property(PropertyDescriptor::new("age", FieldType::Integer).min("0").max("150"))
            .property(PropertyDescriptor::new("email", FieldType::String).regex(r"[^@]+@[^@]+"))
            .property(PropertyDescriptor::new("born", FieldType::Date).min("1900-01-01"))
            .property(PropertyDescriptor::new("address", FieldType::Embedded).linked_class("Address")),
    );
    env.schema.register(ClassDescriptor::new("Address"));
    env.schema.register(ClassDescriptor::new("Location"));
    env.schema.register(
        ClassDescriptor::new("Strict")
            .strict(true)
            .property(PropertyDescriptor::new("a", FieldType::Integer)),
    );
}

fn violation(err: Error) -> ValidationError {
    match err {
        Error::Validation(v) => v,
        other => panic!("not a validation error: {}", other),
    }
}

fn person(records: &mut Records, ctx: &Context<'_>) -> RecordHandle {
    let h = records.create_with_class("Person", ctx).unwrap();
    records.set(h, "name", "Ada", ctx).unwrap();
    h
}

#[test]
fn test_valid_record_passes() {
    let env = TestEnv::new();
    register(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = person(&mut records, &ctx);
    records.set(h, "age", 36, &ctx).unwrap();
    records.set(h, "email", "ada@example.org", &ctx).unwrap();
    records.validate(h, &ctx).unwrap();
}

#[test]
fn test_mandatory_and_not_null() {
    let env = TestEnv::new();
    register(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create_with_class("Person", &ctx).unwrap();

    let v = violation(records.validate(h, &ctx).unwrap_err());
    assert_eq!(v.property, "Person.name");
    assert!(v.reason.contains("is mandatory"));

    records.set(h, "name", Value::Null, &ctx).unwrap();
    let v = violation(records.validate(h, &ctx).unwrap_err());
    assert!(v.reason.contains("cannot be null"));
}

#[test]
fn test_numeric_bounds() {
    let env = TestEnv::new();
    register(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = person(&mut records, &ctx);

    records.set(h, "age", 200, &ctx).unwrap();
    let v = violation(records.validate(h, &ctx).unwrap_err());
    assert_eq!(v.property, "Person.age");
    assert!(v.reason.contains("is greater than 150"));

    records.set(h, "age", -1, &ctx).unwrap();
    let v = violation(records.validate(h, &ctx).unwrap_err());
    assert!(v.reason.contains("is less than 0"));
}

#[test]
fn test_date_bound() {
    let env = TestEnv::new();
    register(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = person(&mut records, &ctx);
    records.set(h, "born", "1815-12-10", &ctx).unwrap();

    let v = violation(records.validate(h, &ctx).unwrap_err());
    assert_eq!(v.property, "Person.born");
    assert!(v.reason.contains("precedes the first acceptable date"));

    records.set(h, "born", "1906-12-09", &ctx).unwrap();
    records.validate(h, &ctx).unwrap();
}

#[test]
fn test_regex() {
    let env = TestEnv::new();
    register(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = person(&mut records, &ctx);
    records.set(h, "email", "not-an-address", &ctx).unwrap();

    let v = violation(records.validate(h, &ctx).unwrap_err());
    assert_eq!(v.property, "Person.email");
    assert!(v.reason.contains("does not match the regular expression"));
}

#[test]
fn test_embedded_linked_class() {
    let env = TestEnv::new();
    register(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = person(&mut records, &ctx);
    let wrong = records.create_with_class("Location", &ctx).unwrap();
    records.set(h, "address", Value::Embedded(wrong), &ctx).unwrap();

    let v = violation(records.validate(h, &ctx).unwrap_err());
    assert_eq!(v.property, "Person.address");
    assert!(v.reason.contains("'Location'"));

    let right = records.create_with_class("Address", &ctx).unwrap();
    records.set(h, "address", Value::Embedded(right), &ctx).unwrap();
    records.validate(h, &ctx).unwrap();
}

#[test]
fn test_strict_class_rejects_undeclared_fields() {
    let env = TestEnv::new();
    register(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create_with_class("Strict", &ctx).unwrap();
    records.set(h, "a", 1, &ctx).unwrap();
    records.validate(h, &ctx).unwrap();

    records.set(h, "b", 2, &ctx).unwrap();
    let v = violation(records.validate(h, &ctx).unwrap_err());
    assert!(v.reason.contains("STRICT"));
}

#[test]
fn test_readonly_field_cannot_change_after_load() {
    let env = TestEnv::new();
    env.schema.register(
        ClassDescriptor::new("Person").property(PropertyDescriptor::new("name", FieldType::String).readonly(true)),
    );
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);
    records.validate(person, &ctx).unwrap();

    records.set(person, "name", "Grace", &ctx).unwrap();
    let v = violation(records.validate(person, &ctx).unwrap_err());
    assert!(v.reason.contains("is immutable"));

    records.undo_field(person, "name").unwrap();
    records.validate(person, &ctx).unwrap();
}

#[test]
fn test_session_can_disable_validation() {
    let env = TestEnv::new();
    register(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create_with_class("Person", &ctx).unwrap();

    env.session.set_validation_enabled(false);
    records.validate(h, &ctx).unwrap();
    env.session.set_validation_enabled(true);
    assert!(records.validate(h, &ctx).is_err());
}

#[test]
fn test_link_set_rejects_targets_of_other_classes() {
    let env = TestEnv::new();
    env.schema.register(ClassDescriptor::new("City").cluster(21));
    env.schema.register(ClassDescriptor::new("Dog").cluster(22));
    env.schema.register(
        ClassDescriptor::new("Traveller")
            .property(PropertyDescriptor::new("visited", FieldType::LinkSet).linked_class("City")),
    );
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create_with_class("Traveller", &ctx).unwrap();
    let rome = records.create_with_class("City", &ctx).unwrap();
    records.set_identity(rome, RecordId::new(21, 0)).unwrap();
    let rex = records.create_with_class("Dog", &ctx).unwrap();
    records.set_identity(rex, RecordId::new(22, 0)).unwrap();

    records
        .set(h, "visited", vec![Value::Link(RecordId::new(21, 0))], &ctx)
        .unwrap();
    records.validate(h, &ctx).unwrap();

    records
        .set(
            h,
            "visited",
            vec![Value::Link(RecordId::new(21, 0)), Value::Link(RecordId::new(22, 0))],
            &ctx,
        )
        .unwrap();
    let v = violation(records.validate(h, &ctx).unwrap_err());
    assert_eq!(v.property, "Traveller.visited");
    assert!(v.reason.contains("'Dog'"));
}

#[test]
fn test_embedded_record_with_identity_is_rejected() {
    let env = TestEnv::new();
    register(&env);
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = person(&mut records, &ctx);
    let address = records.create_with_class("Address", &ctx).unwrap();
    records.set_identity(address, RecordId::new(4, 2)).unwrap();
    records.set(h, "address", Value::Embedded(address), &ctx).unwrap();

    let v = violation(records.validate(h, &ctx).unwrap_err());
    assert_eq!(v.property, "Person.address");
    assert!(v.reason.contains("valid RecordID"));
}
