use tracing::{debug, info, instrument};

use crate::block::{Block, SelectStats};
use crate::callback::{CountCollector, PositionCollector, RowCallback};
use crate::column::Column;
use crate::config::StoreConfig;
use crate::errors::{Result, TesseraError};
use crate::predicate::Predicate;
use crate::schema::Schema;
use crate::value::{Record, Row, ValueRef};

/// Columns plus the blocks partitioning their rows.
///
/// A store has a single writer. Queries only read, so any number may run at
/// once while nothing is appending; `SharedStore` packages that handoff.
#[derive(Debug, Clone)]
pub struct Store {
    config: StoreConfig,
    schema: Schema,
    columns: Vec<Column>,
    blocks: Vec<Block>,
}

impl Store {
    pub fn new(schema: Schema, config: StoreConfig) -> Result<Self> {
        schema.validate()?;
        config.validate()?;

        let columns = schema
            .columns
            .iter()
            .map(|def| Column::new(def, config.default_increment))
            .collect();

        info!(
            "Created store with {} columns, block capacity {}",
            schema.len(),
            config.block_capacity
        );

        Ok(Self {
            config,
            schema,
            columns,
            blocks: Vec::new(),
        })
    }

    /// Assembles a store from already-populated columns and rebuilds the
    /// block statistics with one pass over every row.
    pub(crate) fn from_parts(
        schema: Schema,
        config: StoreConfig,
        columns: Vec<Column>,
    ) -> Result<Self> {
        config.validate()?;
        if columns.len() != schema.len() {
            return Err(TesseraError::InvalidSchema(format!(
                "schema has {} columns but {} were supplied",
                schema.len(),
                columns.len()
            )));
        }

        let rows = columns.first().map_or(0, Column::len);
        if let Some(column) = columns.iter().find(|c| c.len() != rows) {
            return Err(TesseraError::Corrupt(format!(
                "column '{}' has {} rows, expected {}",
                column.name(),
                column.len(),
                rows
            )));
        }

        let capacity = config.block_capacity;
        let mut blocks = Vec::with_capacity(rows.div_ceil(capacity));
        let mut start = 0;
        while start < rows {
            let end = (start + capacity).min(rows);
            let mut block = Block::new(start, capacity, &columns);
            for position in start..end {
                block.observe(&columns, position);
            }
            blocks.push(block);
            start = end;
        }

        debug!("Rebuilt {} blocks over {} rows", blocks.len(), rows);

        Ok(Self {
            config,
            schema,
            columns,
            blocks,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.schema.index_of(name).map(|i| &self.columns[i])
    }

    /// Index and column for `name`, or `UnknownColumn`.
    pub fn resolve(&self, name: &str) -> Result<(usize, &Column)> {
        self.schema
            .index_of(name)
            .map(|i| (i, &self.columns[i]))
            .ok_or_else(|| TesseraError::UnknownColumn(name.to_string()))
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.iter().map(Block::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of a block with room for one more row, opening a new block when
    /// there is none or the last one is sealed.
    fn open_block(&mut self) -> usize {
        if self.blocks.last().map_or(true, Block::is_full) {
            let start = self.len();
            self.blocks
                .push(Block::new(start, self.config.block_capacity, &self.columns));
        }
        self.blocks.len() - 1
    }

    pub fn add<R: Record + ?Sized>(&mut self, record: &R) -> Result<()> {
        let index = self.open_block();
        self.blocks[index].append(&mut self.columns, record)
    }

    /// Appends records in order. On failure, rows before the failing one stay
    /// in the store and the failing row leaves no trace.
    pub fn add_all<I>(&mut self, records: I) -> Result<usize>
    where
        I: IntoIterator,
        I::Item: Record,
    {
        let mut added = 0;
        for record in records {
            self.add(&record)?;
            added += 1;
        }
        debug!("Appended {} rows, store now holds {}", added, self.len());
        Ok(added)
    }

    /// Prepares every predicate, then walks the blocks oldest first. Matching
    /// positions reach `callback` in ascending order. Predicates are ANDed.
    pub fn select(
        &self,
        predicates: &[Box<dyn Predicate>],
        callback: &mut dyn RowCallback,
    ) -> Result<SelectStats> {
        let matchers = predicates
            .iter()
            .map(|p| p.prepare(self))
            .collect::<Result<Vec<_>>>()?;

        let mut stats = SelectStats::default();
        for block in &self.blocks {
            block.select(&matchers, callback, &mut stats);
        }

        debug!(
            "Select over {} blocks: {} skipped, {} rows scanned, {} matched",
            stats.blocks_total, stats.blocks_skipped, stats.rows_scanned, stats.rows_matched
        );
        Ok(stats)
    }

    pub fn select_positions(&self, predicates: &[Box<dyn Predicate>]) -> Result<Vec<usize>> {
        let mut collector = PositionCollector::new();
        self.select(predicates, &mut collector)?;
        Ok(collector.into_positions())
    }

    pub fn count(&self, predicates: &[Box<dyn Predicate>]) -> Result<usize> {
        let mut counter = CountCollector::new();
        self.select(predicates, &mut counter)?;
        Ok(counter.count)
    }

    pub fn collect_rows(&self, predicates: &[Box<dyn Predicate>]) -> Result<Vec<Row>> {
        self.select_positions(predicates)?
            .into_iter()
            .map(|p| self.row(p))
            .collect()
    }

    /// Reconstructs the row at `position`, one value per schema column.
    pub fn row(&self, position: usize) -> Result<Row> {
        let len = self.len();
        if position >= len {
            return Err(TesseraError::OutOfBounds { position, len });
        }

        let mut row = Row::with_capacity(self.columns.len());
        for column in &self.columns {
            row.push(column.value(position)?.to_value());
        }
        Ok(row)
    }

    pub fn value(&self, column: &str, position: usize) -> Result<ValueRef<'_>> {
        let (_, column) = self.resolve(column)?;
        column.value(position)
    }

    /// New store with the same schema and configuration holding only the
    /// rows admitted by `predicates`, in their original order. The result
    /// shares no storage with `self`.
    #[instrument(skip(self, predicates), fields(rows = self.len()))]
    pub fn filter(&self, predicates: &[Box<dyn Predicate>]) -> Result<Store> {
        let positions = self.select_positions(predicates)?;

        let mut target = Store::new(self.schema.clone(), self.config.clone())?;
        for position in &positions {
            let index = target.open_block();
            target.blocks[index].append_from(&mut target.columns, &self.columns, *position)?;
        }

        info!("Filtered {} of {} rows into a new store", positions.len(), self.len());
        Ok(target)
    }

    /// Independent deep copy of every row.
    pub fn copy(&self) -> Store {
        self.clone()
    }

    /// Drops growth headroom from every column.
    pub fn compact(&mut self) {
        for column in &mut self.columns {
            column.compact();
        }
    }

    pub fn memory_estimate(&self) -> usize {
        self.columns.iter().map(Column::memory_estimate).sum::<usize>()
            + self.blocks.iter().map(Block::memory_estimate).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::callback::{GroupCounter, SortedCollector};
    use crate::predicate::{
        DoubleBetween, IntBetween, IntIn, Matcher, Not, Or, StringIn, StringLike,
    };
    use crate::row;
    use crate::schema::{ColumnDef, ColumnType};
    use crate::value::Value;
    use std::cell::Cell;
    use std::rc::Rc;

    fn store_with(columns: Vec<ColumnDef>, block_capacity: usize) -> Store {
        let config = StoreConfig {
            block_capacity,
            default_increment: 4,
            ..Default::default()
        };
        Store::new(Schema::new(columns), config).unwrap()
    }

    fn int_store(values: &[i32], block_capacity: usize) -> Store {
        let mut store = store_with(vec![ColumnDef::new("value1", ColumnType::Int)], block_capacity);
        store
            .add_all(values.iter().map(|v| row![*v]))
            .unwrap();
        store
    }

    #[test]
    fn test_equality_at_various_block_sizes() {
        for block_capacity in [1, 10, 100] {
            let mut store = store_with(
                vec![
                    ColumnDef::new("value1", ColumnType::Int),
                    ColumnDef::new("name", ColumnType::String),
                ],
                block_capacity,
            );
            store
                .add_all(vec![row![12i32, "a"], row![9i32, "b"], row![1000i32, "c"]])
                .unwrap();

            let found = store
                .collect_rows(&[IntIn::new("value1", [12]).boxed()])
                .unwrap();
            assert_eq!(found, vec![row![12i32, "a"]], "block capacity {}", block_capacity);
        }
    }

    #[test]
    fn test_between_is_inclusive() {
        let store = int_store(&[i32::MIN, -11, 0, 11, 5, 4, i32::MAX], 3);

        let between = |min, max| {
            store
                .select_positions(&[IntBetween::new("value1", min, max).boxed()])
                .unwrap()
        };
        assert_eq!(between(4, 5), vec![4, 5]);
        assert_eq!(between(4, 4), vec![5]);
        assert!(between(5, 4).is_empty());
        assert_eq!(between(i32::MIN, i32::MIN), vec![0]);
    }

    #[test]
    fn test_not_negates_and_never_skips() {
        let store = int_store(&[0, 91, 89], 10);

        let not = Not::new(IntIn::new("value1", [0]));
        assert_eq!(store.select_positions(&[not.boxed()]).unwrap(), vec![1, 2]);

        // Inner rejects the block outright; NOT must still admit it.
        let not = Not::new(IntIn::new("value1", [5000]));
        let matcher = not.prepare(&store).unwrap();
        assert!(matcher.check_block(&store.blocks()[0]));
    }

    struct Fixed {
        answer: bool,
        block_calls: Rc<Cell<usize>>,
        value_calls: Rc<Cell<usize>>,
    }

    impl Fixed {
        fn new(answer: bool) -> Self {
            Self {
                answer,
                block_calls: Rc::new(Cell::new(0)),
                value_calls: Rc::new(Cell::new(0)),
            }
        }
    }

    struct FixedMatcher {
        answer: bool,
        block_calls: Rc<Cell<usize>>,
        value_calls: Rc<Cell<usize>>,
    }

    impl Matcher for FixedMatcher {
        fn check_block(&self, _block: &Block) -> bool {
            self.block_calls.set(self.block_calls.get() + 1);
            self.answer
        }

        fn check_value(&self, _position: usize) -> bool {
            self.value_calls.set(self.value_calls.get() + 1);
            self.answer
        }
    }

    impl Predicate for Fixed {
        fn prepare<'s>(&self, _store: &'s Store) -> Result<Box<dyn Matcher + 's>> {
            Ok(Box::new(FixedMatcher {
                answer: self.answer,
                block_calls: self.block_calls.clone(),
                value_calls: self.value_calls.clone(),
            }))
        }
    }

    #[test]
    fn test_or_short_circuits() {
        let store = int_store(&[1, 2, 3], 10);

        let first = Fixed::new(false);
        let second = Fixed::new(true);
        let third = Fixed::new(true);
        let (first_values, second_values) = (first.value_calls.clone(), second.value_calls.clone());
        let (third_blocks, third_values) = (third.block_calls.clone(), third.value_calls.clone());

        let or = Or::new(Vec::new()).push(first).push(second).push(third);
        let positions = store.select_positions(&[or.boxed()]).unwrap();

        assert_eq!(positions, vec![0, 1, 2]);
        assert_eq!(first_values.get(), 3);
        assert_eq!(second_values.get(), 3);
        assert_eq!(third_blocks.get(), 0);
        assert_eq!(third_values.get(), 0);
    }

    #[test]
    fn test_empty_or_matches_nothing() {
        let store = int_store(&[1, 2, 3], 2);
        let or = Or::new(Vec::new());
        assert_eq!(store.count(&[or.boxed()]).unwrap(), 0);
    }

    #[test]
    fn test_dictionary_like_with_null() {
        let mut store = store_with(vec![ColumnDef::new("s", ColumnType::DictStringByte)], 10);
        store
            .add_all(vec![row![None::<&str>], row!["aRa"]])
            .unwrap();

        let like = |pattern: &str| {
            store
                .select_positions(&[StringLike::new("s", pattern).boxed()])
                .unwrap()
        };
        assert_eq!(like(""), vec![0, 1]);
        assert_eq!(like("ar"), vec![1]);
        assert!(like("x").is_empty());

        assert_eq!(store.value("s", 0).unwrap(), ValueRef::Null);
    }

    #[test]
    fn test_multi_int_contains() {
        let mut store = store_with(vec![ColumnDef::new("tags", ColumnType::MultiInt)], 2);
        store
            .add_all(vec![
                row![vec![1i32, 2]],
                row![vec![11i32, 12]],
                row![vec![33i32, 12]],
                row![vec![1i32, 0]],
            ])
            .unwrap();

        let positions = store
            .select_positions(&[IntIn::new("tags", [12]).boxed()])
            .unwrap();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn test_blocks_rotate_and_prune() {
        let store = int_store(&[1, 2, 3, 4, 5, 1000], 2);
        assert_eq!(store.blocks().len(), 3);
        assert_eq!(store.len(), 6);

        let mut collector = PositionCollector::new();
        let stats = store
            .select(&[IntIn::new("value1", [1000]).boxed()], &mut collector)
            .unwrap();
        assert_eq!(collector.into_positions(), vec![5]);
        assert_eq!(stats.blocks_total, 3);
        assert_eq!(stats.blocks_skipped, 2);
        assert_eq!(stats.rows_scanned, 2);
    }

    #[test]
    fn test_unknown_column_fails_before_scanning() {
        let store = int_store(&[1], 10);
        let result = store.count(&[IntIn::new("missing", [1]).boxed()]);
        assert!(matches!(result, Err(TesseraError::UnknownColumn(name)) if name == "missing"));
    }

    #[test]
    fn test_unsupported_predicate_type() {
        let store = int_store(&[1], 10);
        let result = store.count(&[StringIn::new("value1", ["1"]).boxed()]);
        assert!(matches!(result, Err(TesseraError::UnsupportedColumnType { .. })));

        let result = store.count(&[DoubleBetween::new("value1", 0.0, 1.0).boxed()]);
        assert!(matches!(result, Err(TesseraError::UnsupportedColumnType { .. })));
    }

    #[test]
    fn test_plain_string_null_matches_empty() {
        let mut store = store_with(vec![ColumnDef::new("s", ColumnType::String)], 10);
        store
            .add_all(vec![row![None::<&str>], row![""], row!["x"]])
            .unwrap();

        let found = store
            .select_positions(&[StringIn::nullable("s", vec![None]).boxed()])
            .unwrap();
        assert_eq!(found, vec![0, 1]);

        let found = store
            .select_positions(&[StringIn::new("s", [""]).boxed()])
            .unwrap();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn test_filter_produces_independent_store() {
        let mut store = store_with(
            vec![
                ColumnDef::new("id", ColumnType::Int),
                ColumnDef::new("city", ColumnType::DictStringShort),
            ],
            2,
        );
        store
            .add_all(vec![
                row![1i32, "Oslo"],
                row![2i32, "Lima"],
                row![3i32, "Oslo"],
                row![4i32, "Kyiv"],
            ])
            .unwrap();

        let mut filtered = store
            .filter(&[StringIn::new("city", ["Oslo"]).boxed()])
            .unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered.row(1).unwrap(), row![3i32, "Oslo"]);

        filtered.add(&row![5i32, "Oslo"]).unwrap();
        assert_eq!(filtered.len(), 3);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn test_failed_add_keeps_earlier_rows() {
        let mut store = store_with(vec![ColumnDef::new("b", ColumnType::Byte)], 10);
        let result = store.add_all(vec![row![1i32], row![2i32], row![300i32], row![4i32]]);
        assert!(matches!(result, Err(TesseraError::ValueOutOfRange { .. })));
        assert_eq!(store.len(), 2);
        assert_eq!(store.columns()[0].len(), 2);
    }

    #[test]
    fn test_rejected_rows_do_not_fill_dictionary() {
        let mut store = store_with(
            vec![
                ColumnDef::new("s", ColumnType::DictStringByte),
                ColumnDef::new("b", ColumnType::Byte),
            ],
            16,
        );
        for i in 0..127 {
            let result = store.add(&row![format!("bad{}", i), 300i32]);
            assert!(matches!(result, Err(TesseraError::ValueOutOfRange { .. })));
        }
        assert!(store.is_empty());

        store.add(&row!["good", 1i32]).unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.value("s", 0).unwrap(), ValueRef::String("good"));
    }

    #[test]
    fn test_row_out_of_bounds() {
        let store = int_store(&[1, 2], 10);
        assert!(matches!(
            store.row(2),
            Err(TesseraError::OutOfBounds { position: 2, len: 2 })
        ));
    }

    #[test]
    fn test_sorted_and_grouped_callbacks() {
        let mut store = store_with(
            vec![
                ColumnDef::new("score", ColumnType::Double),
                ColumnDef::new("team", ColumnType::DictStringByte),
            ],
            2,
        );
        store
            .add_all(vec![
                row![3.5, "red"],
                row![1.0, "blue"],
                row![2.0, "red"],
                row![9.0, "green"],
            ])
            .unwrap();

        let mut sorted = SortedCollector::new(&store, "score").unwrap().descending();
        store
            .select(&[DoubleBetween::new("score", 1.5, 10.0).boxed()], &mut sorted)
            .unwrap();
        assert_eq!(sorted.into_sorted(), vec![3, 0, 2]);

        let mut groups = GroupCounter::new(&store, "team").unwrap();
        store.select(&[], &mut groups).unwrap();
        let groups = groups.into_sorted();
        assert_eq!(groups[0], (Value::from("red"), 2));
        assert_eq!(groups.len(), 3);
    }

    #[test]
    fn test_from_parts_rebuilds_blocks() {
        let store = int_store(&[5, 6, 7, 8, 9], 2);
        let rebuilt = Store::from_parts(
            store.schema().clone(),
            store.config().clone(),
            store.columns().to_vec(),
        )
        .unwrap();

        assert_eq!(rebuilt.blocks().len(), 3);
        assert_eq!(rebuilt.len(), 5);
        for (a, b) in store.blocks().iter().zip(rebuilt.blocks()) {
            assert_eq!(a.start(), b.start());
            assert_eq!(a.len(), b.len());
            assert_eq!(a.stats(0), b.stats(0));
        }
    }

    #[test]
    fn test_compact_keeps_rows() {
        let mut store = int_store(&[1, 2, 3], 10);
        let before = store.memory_estimate();
        store.compact();
        assert!(store.memory_estimate() <= before);
        assert_eq!(store.row(2).unwrap(), row![3i32]);
    }
}
