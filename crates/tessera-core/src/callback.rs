//! Result consumers for `Store::select`.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::column::Column;
use crate::errors::Result;
use crate::store::Store;
use crate::value::Value;

/// Receives the global position of every row that passes a query, in
/// ascending position order.
pub trait RowCallback {
    fn on_row(&mut self, position: usize);
}

impl<F: FnMut(usize)> RowCallback for F {
    fn on_row(&mut self, position: usize) {
        self(position)
    }
}

#[derive(Debug, Default)]
pub struct PositionCollector {
    pub positions: Vec<usize>,
}

impl PositionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_positions(self) -> Vec<usize> {
        self.positions
    }
}

impl RowCallback for PositionCollector {
    fn on_row(&mut self, position: usize) {
        self.positions.push(position);
    }
}

#[derive(Debug, Default)]
pub struct CountCollector {
    pub count: usize,
}

impl CountCollector {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RowCallback for CountCollector {
    fn on_row(&mut self, _position: usize) {
        self.count += 1;
    }
}

/// Collects positions, then stable-sorts them by one column's values.
pub struct SortedCollector<'s> {
    column: &'s Column,
    descending: bool,
    positions: Vec<usize>,
}

impl<'s> SortedCollector<'s> {
    pub fn new(store: &'s Store, column: &str) -> Result<Self> {
        let (_, column) = store.resolve(column)?;
        Ok(Self {
            column,
            descending: false,
            positions: Vec::new(),
        })
    }

    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    pub fn into_sorted(mut self) -> Vec<usize> {
        let column = self.column;
        if self.descending {
            self.positions.sort_by(|a, b| column.compare(*b, *a));
        } else {
            self.positions.sort_by(|a, b| column.compare(*a, *b));
        }
        self.positions
    }
}

impl RowCallback for SortedCollector<'_> {
    fn on_row(&mut self, position: usize) {
        self.positions.push(position);
    }
}

/// Counts matching rows per distinct value of one column.
pub struct GroupCounter<'s> {
    column: &'s Column,
    counts: HashMap<Value, usize>,
}

impl<'s> GroupCounter<'s> {
    pub fn new(store: &'s Store, column: &str) -> Result<Self> {
        let (_, column) = store.resolve(column)?;
        Ok(Self {
            column,
            counts: HashMap::new(),
        })
    }

    pub fn counts(&self) -> &HashMap<Value, usize> {
        &self.counts
    }

    /// Groups ordered by descending count; ties are ordered by the value's
    /// debug rendering so the result is deterministic.
    pub fn into_sorted(self) -> Vec<(Value, usize)> {
        let mut groups: Vec<(Value, usize)> = self.counts.into_iter().collect();
        groups.sort_by(|a, b| match b.1.cmp(&a.1) {
            Ordering::Equal => format!("{:?}", a.0).cmp(&format!("{:?}", b.0)),
            other => other,
        });
        groups
    }
}

impl RowCallback for GroupCounter<'_> {
    fn on_row(&mut self, position: usize) {
        // Positions handed to callbacks always exist in every column.
        if let Ok(value) = self.column.value(position) {
            *self.counts.entry(value.to_value()).or_insert(0) += 1;
        }
    }
}
