//! Per-block skip statistics.
//!
//! Each block keeps one `ColumnStats` per column, chosen by column type:
//! presence bits for byte/short domains and their dictionary codes, a
//! min/max range for int/long domains, a byte-presence set for plain
//! strings, and nothing for doubles. Statistics only ever widen, so an
//! admission test may answer "maybe" for a block with no match but never
//! "no" for a block that has one.

pub mod bitset;
pub mod range;

pub use bitset::Bitset;
pub use range::RangeStat;

use crate::column::{Column, ColumnData, GrowBuffer, Integer, MultiColumn};
use crate::schema::ColumnType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnStats {
    Range(RangeStat),
    Bitset(Bitset),
    /// Every byte value occurring in the block's strings.
    Bytes(Bitset),
    Untracked,
}

impl ColumnStats {
    pub fn for_type(column_type: ColumnType) -> Self {
        match column_type {
            ColumnType::Byte
            | ColumnType::Short
            | ColumnType::MultiByte
            | ColumnType::MultiShort
            | ColumnType::DictStringByte
            | ColumnType::DictStringShort => ColumnStats::Bitset(Bitset::new()),
            ColumnType::Int
            | ColumnType::Long
            | ColumnType::MultiInt
            | ColumnType::MultiLong
            | ColumnType::DictStringInt => ColumnStats::Range(RangeStat::new()),
            ColumnType::String => ColumnStats::Bytes(Bitset::new()),
            ColumnType::Double => ColumnStats::Untracked,
        }
    }

    /// Folds the value stored at `position` of `column` into the statistic.
    pub fn observe(&mut self, column: &Column, position: usize) {
        fn scalar<T: Integer>(buffer: &GrowBuffer<T>, position: usize) -> i64 {
            buffer.as_slice()[position].into()
        }
        fn each<T: Integer>(column: &MultiColumn<T>, position: usize, mut f: impl FnMut(i64)) {
            for v in column.row(position) {
                f((*v).into());
            }
        }

        match (self, column.data()) {
            (ColumnStats::Bitset(b), ColumnData::Byte(c)) => b.mark(scalar(c, position)),
            (ColumnStats::Bitset(b), ColumnData::Short(c)) => b.mark(scalar(c, position)),
            (ColumnStats::Range(r), ColumnData::Int(c)) => r.widen(scalar(c, position)),
            (ColumnStats::Range(r), ColumnData::Long(c)) => r.widen(scalar(c, position)),
            (ColumnStats::Bitset(b), ColumnData::MultiByte(c)) => each(c, position, |v| b.mark(v)),
            (ColumnStats::Bitset(b), ColumnData::MultiShort(c)) => {
                each(c, position, |v| b.mark(v))
            }
            (ColumnStats::Range(r), ColumnData::MultiInt(c)) => each(c, position, |v| r.widen(v)),
            (ColumnStats::Range(r), ColumnData::MultiLong(c)) => {
                each(c, position, |v| r.widen(v))
            }
            (ColumnStats::Bitset(b), ColumnData::DictByte(c)) => b.mark(c.code_at(position) as i64),
            (ColumnStats::Bitset(b), ColumnData::DictShort(c)) => {
                b.mark(c.code_at(position) as i64)
            }
            (ColumnStats::Range(r), ColumnData::DictInt(c)) => r.widen(c.code_at(position) as i64),
            (ColumnStats::Bytes(b), ColumnData::String(c)) => {
                for byte in c.bytes_at(position) {
                    b.mark(*byte as i64);
                }
            }
            _ => {}
        }
    }

    /// Whether the block may hold one of `sorted` (ascending, widened to i64).
    pub fn admits_any(&self, sorted: &[i64]) -> bool {
        match self {
            ColumnStats::Range(r) => r.contains_any(sorted),
            ColumnStats::Bitset(b) => {
                // Negative values are never marked, so asking for one is a "maybe".
                sorted.first().is_some_and(|v| *v < 0) || b.contains_any(sorted)
            }
            ColumnStats::Bytes(_) | ColumnStats::Untracked => true,
        }
    }

    /// Whether the block may hold a value in `[low, high]`.
    pub fn admits_range(&self, low: i64, high: i64) -> bool {
        if low > high {
            return false;
        }
        match self {
            ColumnStats::Range(r) => r.overlaps(low, high),
            ColumnStats::Bitset(b) => low < 0 || b.any_in_range(low, high),
            ColumnStats::Bytes(_) | ColumnStats::Untracked => true,
        }
    }

    /// Whether the block may hold a string containing `pattern` with ASCII
    /// case folding: each pattern byte must occur in upper or lower case.
    pub fn admits_ascii_pattern(&self, pattern: &[u8]) -> bool {
        match self {
            ColumnStats::Bytes(b) => pattern.iter().all(|c| {
                b.contains(c.to_ascii_lowercase() as i64) || b.contains(c.to_ascii_uppercase() as i64)
            }),
            _ => true,
        }
    }

    pub fn memory_estimate(&self) -> usize {
        match self {
            ColumnStats::Range(_) => std::mem::size_of::<RangeStat>(),
            ColumnStats::Bitset(b) | ColumnStats::Bytes(b) => b.memory_estimate(),
            ColumnStats::Untracked => 0,
        }
    }
}
