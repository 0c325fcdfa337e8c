use super::{unsupported, Matcher, Predicate};
use crate::block::Block;
use crate::column::{ColumnData, Integer, MultiColumn};
use crate::errors::Result;
use crate::store::Store;

/// Inclusive range `[min, max]` over an integer column. A multi-value row
/// matches if any of its values is in range. `min > max` matches nothing.
#[derive(Debug, Clone)]
pub struct Between<T> {
    column: String,
    min: T,
    max: T,
}

pub type ByteBetween = Between<i8>;
pub type ShortBetween = Between<i16>;
pub type IntBetween = Between<i32>;
pub type LongBetween = Between<i64>;

impl<T: Integer> Between<T> {
    pub fn new(column: impl Into<String>, min: T, max: T) -> Self {
        Self {
            column: column.into(),
            min,
            max,
        }
    }
}

struct ScalarBetween<'s, T> {
    column: usize,
    values: &'s [T],
    min: T,
    max: T,
}

impl<T: Integer> Matcher for ScalarBetween<'_, T> {
    fn check_block(&self, block: &Block) -> bool {
        block
            .stats(self.column)
            .admits_range(self.min.into(), self.max.into())
    }

    #[inline]
    fn check_value(&self, position: usize) -> bool {
        let v = self.values[position];
        self.min <= v && v <= self.max
    }
}

struct MultiBetween<'s, T> {
    column: usize,
    values: &'s MultiColumn<T>,
    min: T,
    max: T,
}

impl<T: Integer> Matcher for MultiBetween<'_, T> {
    fn check_block(&self, block: &Block) -> bool {
        block
            .stats(self.column)
            .admits_range(self.min.into(), self.max.into())
    }

    fn check_value(&self, position: usize) -> bool {
        self.values
            .row(position)
            .iter()
            .any(|v| self.min <= *v && *v <= self.max)
    }
}

impl<T: Integer> Predicate for Between<T> {
    fn prepare<'s>(&self, store: &'s Store) -> Result<Box<dyn Matcher + 's>> {
        let (index, column) = store.resolve(&self.column)?;

        if let Some(buffer) = T::scalar(column.data()) {
            return Ok(Box::new(ScalarBetween {
                column: index,
                values: buffer.as_slice(),
                min: self.min,
                max: self.max,
            }));
        }
        if let Some(multi) = T::multi(column.data()) {
            return Ok(Box::new(MultiBetween {
                column: index,
                values: multi,
                min: self.min,
                max: self.max,
            }));
        }
        Err(unsupported(column, "a range with this element width"))
    }
}

/// Inclusive range over a double column. Doubles carry no block statistic,
/// so this always scans every row.
#[derive(Debug, Clone)]
pub struct DoubleBetween {
    column: String,
    min: f64,
    max: f64,
}

impl DoubleBetween {
    pub fn new(column: impl Into<String>, min: f64, max: f64) -> Self {
        Self {
            column: column.into(),
            min,
            max,
        }
    }
}

struct DoubleBetweenMatcher<'s> {
    values: &'s [f64],
    min: f64,
    max: f64,
}

impl Matcher for DoubleBetweenMatcher<'_> {
    fn check_block(&self, _block: &Block) -> bool {
        true
    }

    #[inline]
    fn check_value(&self, position: usize) -> bool {
        let v = self.values[position];
        self.min <= v && v <= self.max
    }
}

impl Predicate for DoubleBetween {
    fn prepare<'s>(&self, store: &'s Store) -> Result<Box<dyn Matcher + 's>> {
        let (_, column) = store.resolve(&self.column)?;
        match column.data() {
            ColumnData::Double(buffer) => Ok(Box::new(DoubleBetweenMatcher {
                values: buffer.as_slice(),
                min: self.min,
                max: self.max,
            })),
            _ => Err(unsupported(column, "a double range")),
        }
    }
}
