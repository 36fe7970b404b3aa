//! Dirty marking, propagation to containers and session registration.

use crate::common::*;

#[test]
fn test_embedded_edit_registers_the_root_once() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);

    records.set(person, "address.city", "Paris", &ctx).unwrap();
    let address = records.get(person, "address", &ctx).unwrap().as_embedded().unwrap();
    assert!(records.record(address).unwrap().is_dirty());
    assert!(records.record(person).unwrap().is_dirty());
    assert_eq!(env.session.changed_records(), vec![(person, PERSON_ID)]);

    records.set(person, "address.zip", "75001", &ctx).unwrap();
    records.set(person, "age", 50, &ctx).unwrap();
    assert_eq!(env.session.changed_records().len(), 1);
}

#[test]
fn test_new_records_are_never_registered() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let fresh = records.create();
    records.set(fresh, "a", 1, &ctx).unwrap();
    assert!(records.record(fresh).unwrap().is_dirty());
    assert!(env.session.changed_records().is_empty());
}

#[test]
fn test_clean_record_registers_again_after_mark_clean() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let root = records.create();
    records.set_identity(root, RecordId::new(3, 3)).unwrap();
    records.set(root, "tags", vec![Value::from(1)], &ctx).unwrap();
    records.mark_clean(root).unwrap();

    records.edit_field(root, "tags", &ctx, |tags| tags.push(2)).unwrap();
    assert_eq!(env.session.take_changes(), vec![(root, RecordId::new(3, 3))]);

    records.mark_clean(root).unwrap();
    assert!(!records.record(root).unwrap().is_dirty());
    records.edit_field(root, "tags", &ctx, |tags| tags.push(3)).unwrap();
    assert_eq!(env.session.changed_records().len(), 1);
}

#[test]
fn test_setting_an_equal_value_keeps_field_clean() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);

    records.set(person, "name", "Ada", &ctx).unwrap();
    assert!(!records.is_changed(person, "name").unwrap());
    assert!(records.dirty_fields(person).unwrap().is_empty());
}

#[test]
fn test_list_of_embedded_records_propagates() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let root = records.create();
    records.set_identity(root, RecordId::new(4, 1)).unwrap();
    let a = records.create();
    let b = records.create();
    records
        .set(root, "items", vec![Value::Embedded(a), Value::Embedded(b)], &ctx)
        .unwrap();
    records.mark_clean(root).unwrap();
    assert!(!records.record(b).unwrap().is_dirty());

    records.set(b, "qty", 2, &ctx).unwrap();
    assert_eq!(records.root_of(b).unwrap(), root);
    assert!(records.record(root).unwrap().is_dirty());
    assert!(!records.record(a).unwrap().is_dirty());
    assert_eq!(env.session.changed_records(), vec![(root, RecordId::new(4, 1))]);
}

#[test]
fn test_released_owner_is_pruned_from_shared_child() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let first = records.create();
    let second = records.create();
    let shared = records.create();
    records.set(first, "child", Value::Embedded(shared), &ctx).unwrap();
    records.set(second, "child", Value::Embedded(shared), &ctx).unwrap();
    assert_eq!(records.live_owners(shared).unwrap(), vec![first, second]);

    records.release(first).unwrap();
    assert!(records.is_live(shared));
    assert_eq!(records.live_owners(shared).unwrap(), vec![second]);

    records.mark_clean(second).unwrap();
    records.set(shared, "x", 1, &ctx).unwrap();
    assert!(records.record(second).unwrap().is_dirty());

    records.release(second).unwrap();
    assert!(!records.is_live(shared));
}

#[test]
fn test_embedding_a_container_in_itself_is_rejected() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let outer = records.create();
    let inner = records.create();
    records.set(outer, "inner", Value::Embedded(inner), &ctx).unwrap();

    let err = records.set(inner, "outer", Value::Embedded(outer), &ctx).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert!(!records.exists(inner, "outer", &ctx).unwrap());
}
