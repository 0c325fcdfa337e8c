#![allow(dead_code)]

use std::sync::Once;

use tessera_core::schema::{ColumnDef, ColumnType, Schema};
use tessera_core::{Row, Store, StoreConfig, Value};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Routes tracing output through the test harness. `RUST_LOG` overrides the
/// default filter.
pub fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("tessera_core=debug")),
            )
            .init();
    });
}

/// One column of every supported type.
pub fn every_type_schema() -> Schema {
    Schema::new(
        ColumnType::ALL
            .iter()
            .map(|t| ColumnDef::new(t.as_str(), *t).with_increment(8))
            .collect(),
    )
}

/// Deterministic row for `every_type_schema`, including nulls and empty lists.
pub fn every_type_row(i: usize) -> Row {
    let n = i as i64;
    let mut row = Row::new();
    for column_type in ColumnType::ALL {
        let value = match column_type {
            ColumnType::Byte => Value::Byte((n % 120) as i8 - 60),
            ColumnType::Short => Value::Short((n * -3) as i16),
            ColumnType::Int => Value::Int((n * 1000) as i32),
            ColumnType::Long => Value::Long(n << 33),
            ColumnType::Double => Value::Double(n as f64 / 3.0),
            ColumnType::MultiByte => Value::MultiByte(vec![(n % 100) as i8, -1]),
            ColumnType::MultiShort => Value::MultiShort(Vec::new()),
            ColumnType::MultiInt => Value::MultiInt((0..(n % 4) as i32).collect()),
            ColumnType::MultiLong => Value::MultiLong(vec![n, -n]),
            ColumnType::String if i % 7 == 0 => Value::Null,
            ColumnType::String => Value::String(format!("row {} ÄÖ", i)),
            ColumnType::DictStringByte if i % 5 == 0 => Value::Null,
            ColumnType::DictStringByte => Value::String(format!("cat{}", i % 3)),
            ColumnType::DictStringShort => Value::String(format!("group-{}", i % 40)),
            ColumnType::DictStringInt => Value::String(format!("key{}", i)),
        };
        row.push(value);
    }
    row
}

pub fn every_type_store(rows: usize, block_capacity: usize) -> Store {
    let mut store = Store::new(
        every_type_schema(),
        StoreConfig::with_block_capacity(block_capacity),
    )
    .unwrap();
    store.add_all((0..rows).map(every_type_row)).unwrap();
    store
}
