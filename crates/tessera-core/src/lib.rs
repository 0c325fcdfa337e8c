pub mod block;
pub mod callback;
pub mod column;
pub mod config;
pub mod errors;
pub mod persist;
pub mod predicate;
pub mod schema;
pub mod shared;
pub mod stats;
pub mod store;
pub mod value;

pub use block::{Block, SelectStats};
pub use callback::{CountCollector, GroupCounter, PositionCollector, RowCallback, SortedCollector};
pub use column::{Column, ColumnData};
pub use config::StoreConfig;
pub use errors::{Result, TesseraError};
pub use predicate::{Matcher, Predicate};
pub use schema::{ColumnDef, ColumnType, Schema};
pub use shared::{SharedStore, StoreReader, StoreWriter};
pub use store::Store;
pub use value::{Record, Row, Value, ValueRef};
