//! Property tests: block skipping never hides a match, and query results
//! agree with a brute-force scan.

mod common;

use proptest::prelude::*;
use tessera_core::predicate::{
    ByteIn, DoubleBetween, LongBetween, Not, Or, Predicate, ShortBetween, ShortIn, StringIn,
    StringLike,
};
use tessera_core::schema::{ColumnDef, ColumnType, Schema};
use tessera_core::{row, Row, Store, StoreConfig, Value};

fn build(schema: Schema, block_capacity: usize, rows: Vec<Row>) -> Store {
    let config = StoreConfig {
        block_capacity,
        default_increment: 3,
        ..Default::default()
    };
    let mut store = Store::new(schema, config).unwrap();
    store.add_all(rows).unwrap();
    store
}

/// Every block a matcher rejects must contain no matching row.
fn assert_sound(store: &Store, predicate: &dyn Predicate) -> Result<(), TestCaseError> {
    let matcher = predicate.prepare(store).unwrap();
    for block in store.blocks() {
        if !matcher.check_block(block) {
            for position in block.start()..block.end() {
                prop_assert!(
                    !matcher.check_value(position),
                    "block at {} rejected but row {} matches",
                    block.start(),
                    position
                );
            }
        }
    }
    Ok(())
}

fn short_store(values: &[i16], block_capacity: usize) -> Store {
    build(
        Schema::new(vec![ColumnDef::new("v", ColumnType::Short)]),
        block_capacity,
        values.iter().map(|v| row![*v]).collect(),
    )
}

proptest! {
    #[test]
    fn proptest_short_in_matches_scan(
        values in prop::collection::vec(-50i16..50, 0..200),
        wanted in prop::collection::vec(-50i16..50, 0..6),
        block_capacity in 1usize..32,
    ) {
        let store = short_store(&values, block_capacity);
        let predicate = ShortIn::new("v", wanted.clone());
        assert_sound(&store, &predicate)?;

        let expected: Vec<usize> = values
            .iter()
            .enumerate()
            .filter(|(_, v)| wanted.contains(v))
            .map(|(i, _)| i)
            .collect();
        prop_assert_eq!(store.select_positions(&[predicate.boxed()]).unwrap(), expected);
    }

    #[test]
    fn proptest_short_between_matches_scan(
        values in prop::collection::vec(any::<i16>(), 0..200),
        low in any::<i16>(),
        high in any::<i16>(),
        block_capacity in 1usize..32,
    ) {
        let store = short_store(&values, block_capacity);
        let predicate = ShortBetween::new("v", low, high);
        assert_sound(&store, &predicate)?;

        let expected = values.iter().filter(|v| low <= **v && **v <= high).count();
        prop_assert_eq!(store.count(&[predicate.boxed()]).unwrap(), expected);
    }

    #[test]
    fn proptest_multi_long_between(
        values in prop::collection::vec(prop::collection::vec(any::<i64>(), 0..4), 0..100),
        low in any::<i64>(),
        span in 0i64..1_000_000_000_000,
        block_capacity in 1usize..16,
    ) {
        let high = low.saturating_add(span);
        let store = build(
            Schema::new(vec![ColumnDef::new("m", ColumnType::MultiLong)]),
            block_capacity,
            values.iter().map(|v| row![v.clone()]).collect(),
        );
        let predicate = LongBetween::new("m", low, high);
        assert_sound(&store, &predicate)?;

        let expected = values
            .iter()
            .filter(|row| row.iter().any(|v| low <= *v && *v <= high))
            .count();
        prop_assert_eq!(store.count(&[predicate.boxed()]).unwrap(), expected);
    }

    #[test]
    fn proptest_ascii_like_on_plain_strings(
        values in prop::collection::vec("[a-dA-D ]{0,8}", 0..100),
        pattern in "[a-dA-D]{0,3}",
        block_capacity in 1usize..16,
    ) {
        let store = build(
            Schema::new(vec![ColumnDef::new("s", ColumnType::String)]),
            block_capacity,
            values.iter().map(|v| row![v.as_str()]).collect(),
        );
        let predicate = StringLike::new("s", &pattern);
        assert_sound(&store, &predicate)?;

        let needle = pattern.to_lowercase();
        let expected = values.iter().filter(|v| v.to_lowercase().contains(&needle)).count();
        prop_assert_eq!(store.count(&[predicate.boxed()]).unwrap(), expected);
    }

    #[test]
    fn proptest_dictionary_equality(
        values in prop::collection::vec(prop::option::of("[xyz]{1,2}"), 0..100),
        wanted in prop::collection::vec(prop::option::of("[xyz]{1,2}"), 0..4),
        block_capacity in 1usize..16,
    ) {
        let store = build(
            Schema::new(vec![ColumnDef::new("d", ColumnType::DictStringShort)]),
            block_capacity,
            values.iter().map(|v| row![v.as_deref()]).collect(),
        );
        let predicate = StringIn::nullable("d", wanted.clone());
        assert_sound(&store, &predicate)?;

        let expected = values.iter().filter(|v| wanted.contains(v)).count();
        prop_assert_eq!(store.count(&[predicate.boxed()]).unwrap(), expected);
    }

    #[test]
    fn proptest_not_and_or_partition_rows(
        values in prop::collection::vec(-3i8..10, 0..100),
        first in -3i8..10,
        second in -3i8..10,
        block_capacity in 1usize..16,
    ) {
        let store = build(
            Schema::new(vec![ColumnDef::new("b", ColumnType::Byte)]),
            block_capacity,
            values.iter().map(|v| row![*v]).collect(),
        );
        let either = || Or::new(vec![
            ByteIn::new("b", [first]).boxed(),
            ByteIn::new("b", [second]).boxed(),
        ]);
        assert_sound(&store, &either())?;
        assert_sound(&store, &Not::new(either()))?;

        let inside = store.count(&[either().boxed()]).unwrap();
        let outside = store.count(&[Not::new(either()).boxed()]).unwrap();
        prop_assert_eq!(inside + outside, values.len());
    }

    #[test]
    fn proptest_growth_keeps_values(
        values in prop::collection::vec(any::<f64>().prop_filter("finite", |v| v.is_finite()), 0..300),
    ) {
        let store = build(
            Schema::new(vec![ColumnDef::new("d", ColumnType::Double).with_increment(2)]),
            7,
            values.iter().map(|v| row![*v]).collect(),
        );
        prop_assert_eq!(store.len(), values.len());
        for (i, v) in values.iter().enumerate() {
            let row = store.row(i).unwrap();
            prop_assert_eq!(row.get(0), Some(&Value::Double(*v)));
        }

        let all = store.count(&[DoubleBetween::new("d", f64::MIN, f64::MAX).boxed()]).unwrap();
        prop_assert_eq!(all, values.len());
    }
}
