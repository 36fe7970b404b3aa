//! Change tracking, undo and clean points.

use crate::common::*;

#[test]
fn test_undo_restores_the_last_clean_state() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create();
    records.set(h, "a", 1, &ctx).unwrap();
    records.set(h, "b", 2, &ctx).unwrap();
    records.mark_clean(h).unwrap();

    records.set(h, "a", 10, &ctx).unwrap();
    records.set(h, "a", 11, &ctx).unwrap();
    records.remove(h, "b", &ctx).unwrap();
    records.set(h, "c", 3, &ctx).unwrap();
    assert_eq!(sorted(records.dirty_fields(h).unwrap()), vec!["a", "b", "c"]);
    assert_eq!(records.original_value(h, "a").unwrap(), Some(Value::from(1)));
    assert!(records.is_created(h, "c").unwrap());
    assert_eq!(records.field_count(h, &ctx).unwrap(), 2);

    records.undo(h).unwrap();
    assert_eq!(records.get(h, "a", &ctx).unwrap(), Value::from(1));
    assert_eq!(records.get(h, "b", &ctx).unwrap(), Value::from(2));
    assert!(!records.exists(h, "c", &ctx).unwrap());
    assert_eq!(records.field_count(h, &ctx).unwrap(), 2);
    assert!(records.dirty_fields(h).unwrap().is_empty());
}

#[test]
fn test_undo_single_field() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);
    records.set(person, "name", "Grace", &ctx).unwrap();
    records.set(person, "age", 85, &ctx).unwrap();

    records.undo_field(person, "name").unwrap();
    assert_eq!(records.get(person, "name", &ctx).unwrap(), Value::from("Ada"));
    assert_eq!(records.get(person, "age", &ctx).unwrap(), Value::from(85));
}

#[test]
fn test_undo_reverts_container_timeline() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);

    records
        .edit_field(person, "tags", &ctx, |tags| {
            tags.push("chess")?;
            tags.remove_at(0)?;
            tags.set_index(0, "verse")?;
            Ok(())
        })
        .unwrap();
    assert_eq!(
        records.get(person, "tags", &ctx).unwrap(),
        Value::List(vec![Value::from("verse"), Value::from("chess")])
    );
    assert_eq!(records.timeline(person, "tags").unwrap().unwrap().len(), 3);
    assert!(!records.is_changed(person, "tags").unwrap());

    records.undo_field(person, "tags").unwrap();
    assert_eq!(
        records.get(person, "tags", &ctx).unwrap(),
        Value::List(vec![Value::from("math"), Value::from("poetry")])
    );
}

#[test]
fn test_map_edits_through_paths_are_undoable() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create();
    let mut prefs = BTreeMap::new();
    prefs.insert("theme".to_string(), Value::from("dark"));
    records.set(h, "prefs", Value::Map(prefs.clone()), &ctx).unwrap();
    records.mark_clean(h).unwrap();

    records.set(h, "prefs.theme", "light", &ctx).unwrap();
    records.set(h, "prefs.lang", "it", &ctx).unwrap();
    assert_eq!(records.get(h, "prefs.lang", &ctx).unwrap(), Value::from("it"));

    records.undo(h).unwrap();
    assert_eq!(records.get(h, "prefs", &ctx).unwrap(), Value::Map(prefs));
}

#[test]
fn test_failed_edit_leaves_value_untouched() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);

    let err = records
        .edit_field(person, "tags", &ctx, |tags| {
            tags.push("chess")?;
            tags.remove_at(10).map(|_| ())
        })
        .unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
    assert_eq!(
        records.get(person, "tags", &ctx).unwrap(),
        Value::List(vec![Value::from("math"), Value::from("poetry")])
    );
}

#[test]
fn test_undo_requires_tracking() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create();
    records.set(h, "a", 1, &ctx).unwrap();
    records.set_tracking_changes(h, false).unwrap();

    assert!(matches!(records.undo(h), Err(Error::IllegalState(_))));
    records.set(h, "a", 2, &ctx).unwrap();
    assert!(records.original_value(h, "a").unwrap().is_none());
}

#[test]
fn test_clean_point_commits_changes() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let (mut records, person) = loaded_person(&env);
    records.set(person, "age", 37, &ctx).unwrap();
    records.remove(person, "nickname", &ctx).unwrap();

    records.mark_clean(person).unwrap();
    assert!(records.dirty_fields(person).unwrap().is_empty());
    assert!(!records.record(person).unwrap().entries().contains("nickname"));

    records.undo(person).unwrap();
    assert_eq!(records.get(person, "age", &ctx).unwrap(), Value::from(37));
    assert!(!records.exists(person, "nickname", &ctx).unwrap());
}
