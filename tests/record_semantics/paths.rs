//! Chained field access with dotted and bracketed paths.

use crate::common::*;

fn order(records: &mut Records, ctx: &Context<'_>) -> RecordHandle {
    let order = records.create();
    let mut lines = Vec::new();
    for (sku, qty) in [("a-1", 2), ("b-2", 5)] {
        let line = records.create();
        records.set(line, "sku", sku, ctx).unwrap();
        records.set(line, "qty", qty, ctx).unwrap();
        lines.push(Value::Embedded(line));
    }
    records.set(order, "lines", lines, ctx).unwrap();

    let mut meta = BTreeMap::new();
    meta.insert("channel".to_string(), Value::from("web"));
    records.set(order, "meta", Value::Map(meta), ctx).unwrap();
    order
}

#[test]
fn test_index_and_field_segments() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = order(&mut records, &ctx);

    assert_eq!(records.get(h, "lines[1].sku", &ctx).unwrap(), Value::from("b-2"));
    assert_eq!(records.get(h, "meta.channel", &ctx).unwrap(), Value::from("web"));
    assert_eq!(records.get(h, "lines[7].sku", &ctx).unwrap(), Value::Null);
    assert_eq!(records.get(h, "meta.missing.deeper", &ctx).unwrap(), Value::Null);
}

#[test]
fn test_field_over_list_collects_from_every_element() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = order(&mut records, &ctx);

    assert_eq!(
        records.get(h, "lines.qty", &ctx).unwrap(),
        Value::List(vec![Value::from(2), Value::from(5)])
    );

    records.set(h, "lines.qty", 0, &ctx).unwrap();
    assert_eq!(
        records.get(h, "lines.qty", &ctx).unwrap(),
        Value::List(vec![Value::from(0), Value::from(0)])
    );
}

#[test]
fn test_pre_parsed_path() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = order(&mut records, &ctx);

    let path = FieldPath::field("lines").index(0).key("sku");
    assert_eq!(records.get_path(h, &path, &ctx).unwrap(), Value::from("a-1"));
}

#[test]
fn test_write_through_null_is_an_invalid_path() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create();
    records.set(h, "parent", Value::Null, &ctx).unwrap();

    let err = records.set(h, "parent.child", 1, &ctx).unwrap_err();
    assert!(matches!(err, Error::InvalidPath { .. }));
}

#[test]
fn test_list_index_write_out_of_range() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create();
    records.set(h, "xs", vec![Value::from(1)], &ctx).unwrap();

    records.set(h, "xs[0]", 9, &ctx).unwrap();
    assert_eq!(records.get(h, "xs", &ctx).unwrap(), Value::List(vec![Value::from(9)]));
    assert!(matches!(
        records.set(h, "xs[3]", 9, &ctx).unwrap_err(),
        Error::InvalidPath { .. }
    ));
}

#[test]
fn test_chained_access_disabled_uses_literal_names() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create();
    records.set_allow_chained_access(h, false).unwrap();

    records.set(h, "a.b", 1, &ctx).unwrap();
    assert_eq!(records.names(h, &ctx).unwrap(), vec!["a.b"]);
    assert_eq!(records.get(h, "a.b", &ctx).unwrap(), Value::from(1));
}

#[test]
fn test_attributes_are_reserved_names() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create();
    records.set(h, "@class", "Person", &ctx).unwrap();
    records.set(h, "@rid", RecordId::new(9, 4), &ctx).unwrap();

    assert_eq!(records.get(h, "@class", &ctx).unwrap(), Value::from("Person"));
    assert_eq!(records.identity(h).unwrap(), RecordId::new(9, 4));
    assert!(records.names(h, &ctx).unwrap().is_empty());
}

#[test]
fn test_invalid_field_names() {
    let env = TestEnv::new();
    let ctx = env.ctx();
    let mut records = Records::new();
    let h = records.create();
    for bad in ["a b", "x:y", "p,q", "k=v", "50%", "semi;colon"] {
        let err = records.set(h, bad, 1, &ctx).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)), "{} accepted", bad);
    }
    assert!(records.get(h, "", &ctx).is_err());
}
