use super::{unsupported, Matcher, Predicate};
use crate::block::Block;
use crate::column::{Integer, MultiColumn};
use crate::errors::Result;
use crate::store::Store;

/// Row matches if its value (or, for multi-value columns, any of its
/// values) is one of the requested values.
#[derive(Debug, Clone)]
pub struct InSet<T> {
    column: String,
    values: Vec<T>,
}

pub type ByteIn = InSet<i8>;
pub type ShortIn = InSet<i16>;
pub type IntIn = InSet<i32>;
pub type LongIn = InSet<i64>;

impl<T: Integer> InSet<T> {
    pub fn new(column: impl Into<String>, values: impl IntoIterator<Item = T>) -> Self {
        Self {
            column: column.into(),
            values: values.into_iter().collect(),
        }
    }
}

/// Membership structure built once per query. Narrow domains use a direct
/// presence table indexed by value; wide ones binary-search a sorted copy.
#[derive(Debug)]
enum Lookup<T> {
    Plain { present: Vec<bool>, negatives: Vec<T> },
    Sorted(Vec<T>),
}

impl<T: Integer> Lookup<T> {
    fn new(sorted: &[T]) -> Self {
        if T::WIDTH > 2 {
            return Lookup::Sorted(sorted.to_vec());
        }

        let max: i64 = sorted.last().map_or(-1, |v| (*v).into());
        let mut present = vec![false; (max + 1).max(0) as usize];
        let mut negatives = Vec::new();
        for v in sorted {
            let wide: i64 = (*v).into();
            if wide >= 0 {
                present[wide as usize] = true;
            } else {
                negatives.push(*v);
            }
        }
        Lookup::Plain { present, negatives }
    }

    #[inline]
    fn contains(&self, value: T) -> bool {
        match self {
            Lookup::Plain { present, negatives } => {
                let wide: i64 = value.into();
                if wide >= 0 {
                    present.get(wide as usize).copied().unwrap_or(false)
                } else {
                    negatives.binary_search(&value).is_ok()
                }
            }
            Lookup::Sorted(sorted) => sorted.binary_search(&value).is_ok(),
        }
    }
}

struct ScalarIn<'s, T> {
    column: usize,
    values: &'s [T],
    lookup: Lookup<T>,
    gate: Vec<i64>,
}

impl<T: Integer> Matcher for ScalarIn<'_, T> {
    fn check_block(&self, block: &Block) -> bool {
        block.stats(self.column).admits_any(&self.gate)
    }

    #[inline]
    fn check_value(&self, position: usize) -> bool {
        self.lookup.contains(self.values[position])
    }
}

struct MultiIn<'s, T> {
    column: usize,
    values: &'s MultiColumn<T>,
    lookup: Lookup<T>,
    gate: Vec<i64>,
}

impl<T: Integer> Matcher for MultiIn<'_, T> {
    fn check_block(&self, block: &Block) -> bool {
        block.stats(self.column).admits_any(&self.gate)
    }

    fn check_value(&self, position: usize) -> bool {
        self.values
            .row(position)
            .iter()
            .any(|v| self.lookup.contains(*v))
    }
}

impl<T: Integer> Predicate for InSet<T> {
    fn prepare<'s>(&self, store: &'s Store) -> Result<Box<dyn Matcher + 's>> {
        let (index, column) = store.resolve(&self.column)?;

        let mut sorted = self.values.clone();
        sorted.sort_unstable();
        sorted.dedup();
        let gate: Vec<i64> = sorted.iter().map(|v| (*v).into()).collect();
        let lookup = Lookup::new(&sorted);

        if let Some(buffer) = T::scalar(column.data()) {
            return Ok(Box::new(ScalarIn {
                column: index,
                values: buffer.as_slice(),
                lookup,
                gate,
            }));
        }
        if let Some(multi) = T::multi(column.data()) {
            return Ok(Box::new(MultiIn {
                column: index,
                values: multi,
                lookup,
                gate,
            }));
        }
        Err(unsupported(column, "equality with this element width"))
    }
}
