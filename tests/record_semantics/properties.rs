//! Property tests over random edit sequences.

use crate::common::*;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Set(String, i64),
    SetText(String, String),
    Remove(String),
}

fn op() -> impl Strategy<Value = Op> {
    let name = "[a-e]";
    prop_oneof![
        (name, any::<i64>()).prop_map(|(n, v)| Op::Set(n, v)),
        (name, "[a-z]{0,8}").prop_map(|(n, v)| Op::SetText(n, v)),
        name.prop_map(Op::Remove),
    ]
}

fn apply(records: &mut Records, h: RecordHandle, ops: &[Op], ctx: &Context<'_>) {
    for op in ops {
        match op {
            Op::Set(n, v) => records.set(h, n, Value::Long(*v), ctx).unwrap(),
            Op::SetText(n, v) => records.set(h, n, v.as_str(), ctx).unwrap(),
            Op::Remove(n) => {
                records.remove(h, n, ctx).unwrap();
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn stream_round_trip_keeps_content(ops in proptest::collection::vec(op(), 0..24)) {
        let env = TestEnv::new();
        let ctx = env.ctx();
        let mut records = Records::new();
        let h = records.create();
        apply(&mut records, h, &ops, &ctx);

        let buf = records.to_stream(h, &ctx).unwrap();
        let copy = records.create_from_buffer(buf, &ctx).unwrap();
        prop_assert!(records.has_same_content(h, copy, &ctx).unwrap());
        prop_assert_eq!(records.to_map(h, &ctx).unwrap(), records.to_map(copy, &ctx).unwrap());
    }

    #[test]
    fn undo_returns_to_clean_point(
        before in proptest::collection::vec(op(), 0..12),
        after in proptest::collection::vec(op(), 0..12),
    ) {
        let env = TestEnv::new();
        let ctx = env.ctx();
        let mut records = Records::new();
        let h = records.create();
        apply(&mut records, h, &before, &ctx);
        records.mark_clean(h).unwrap();
        let snapshot = records.to_map(h, &ctx).unwrap();
        let count = records.field_count(h, &ctx).unwrap();

        apply(&mut records, h, &after, &ctx);
        records.undo(h).unwrap();
        prop_assert_eq!(records.to_map(h, &ctx).unwrap(), snapshot);
        prop_assert_eq!(records.field_count(h, &ctx).unwrap(), count);
        prop_assert!(records.dirty_fields(h).unwrap().is_empty());
    }

    #[test]
    fn field_count_matches_names(ops in proptest::collection::vec(op(), 0..24)) {
        let env = TestEnv::new();
        let ctx = env.ctx();
        let mut records = Records::new();
        let h = records.create();
        records.mark_clean(h).unwrap();
        apply(&mut records, h, &ops, &ctx);
        prop_assert_eq!(records.field_count(h, &ctx).unwrap(), records.names(h, &ctx).unwrap().len());
    }
}
