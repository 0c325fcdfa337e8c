use crate::callback::RowCallback;
use crate::column::Column;
use crate::errors::Result;
use crate::predicate::Matcher;
use crate::stats::ColumnStats;
use crate::value::Record;

/// Counters gathered while a query walks the blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectStats {
    pub blocks_total: usize,
    pub blocks_skipped: usize,
    pub rows_scanned: usize,
    pub rows_matched: usize,
}

/// A contiguous run `[start, start + len)` of global row positions with one
/// statistic per column.
#[derive(Debug, Clone)]
pub struct Block {
    start: usize,
    len: usize,
    capacity: usize,
    stats: Vec<ColumnStats>,
}

impl Block {
    pub fn new(start: usize, capacity: usize, columns: &[Column]) -> Self {
        Self {
            start,
            len: 0,
            capacity,
            stats: columns
                .iter()
                .map(|c| ColumnStats::for_type(c.column_type()))
                .collect(),
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }

    pub fn stats(&self, column: usize) -> &ColumnStats {
        &self.stats[column]
    }

    /// Appends one record to every column and folds it into the statistics.
    ///
    /// The caller rotates blocks so this block is never full here. If any
    /// column rejects its value, columns already written for this row are
    /// rolled back, dictionary entries included, so the row leaves no trace.
    pub fn append<R: Record + ?Sized>(&mut self, columns: &mut [Column], record: &R) -> Result<()> {
        debug_assert!(!self.is_full());
        let position = self.end();
        let mut marks = Vec::with_capacity(columns.len());

        for index in 0..columns.len() {
            marks.push(columns[index].mark());
            if let Err(e) = columns[index].add(record.value(index)) {
                for (column, mark) in columns[..=index].iter_mut().zip(marks) {
                    column.rollback(mark);
                }
                return Err(e);
            }
        }

        self.observe(columns, position);
        Ok(())
    }

    /// Appends the row at `position` of `source` (same schema) to `columns`.
    pub fn append_from(
        &mut self,
        columns: &mut [Column],
        source: &[Column],
        position: usize,
    ) -> Result<()> {
        debug_assert!(!self.is_full());
        let target = self.end();

        for (index, column) in columns.iter_mut().enumerate() {
            column.push_from(&source[index], position)?;
        }

        self.observe(columns, target);
        Ok(())
    }

    /// Counts an already-stored row at `position` into this block.
    pub(crate) fn observe(&mut self, columns: &[Column], position: usize) {
        debug_assert_eq!(position, self.end());
        for (stat, column) in self.stats.iter_mut().zip(columns) {
            stat.observe(column, position);
        }
        self.len += 1;
    }

    /// Two-phase filtered scan: skip the block if any matcher rejects its
    /// statistics, otherwise test every row against all matchers in order
    /// and report the positions that pass all of them.
    pub fn select<'s>(
        &self,
        matchers: &[Box<dyn Matcher + 's>],
        callback: &mut dyn RowCallback,
        stats: &mut SelectStats,
    ) {
        stats.blocks_total += 1;
        if !matchers.iter().all(|m| m.check_block(self)) {
            stats.blocks_skipped += 1;
            return;
        }

        for position in self.start..self.end() {
            stats.rows_scanned += 1;
            if matchers.iter().all(|m| m.check_value(position)) {
                stats.rows_matched += 1;
                callback.on_row(position);
            }
        }
    }

    pub fn memory_estimate(&self) -> usize {
        std::mem::size_of::<Self>() + self.stats.iter().map(|s| s.memory_estimate()).sum::<usize>()
    }
}
