use std::cmp::Ordering;
use std::io::{Read, Write};
use std::ops::Range;

use super::buffer::{GrowBuffer, Primitive};
use crate::errors::{Result, TesseraError};

/// Variable-length lists of `T`, one list per row.
///
/// `index[i]` is the offset of row i's first value in `data`; the row ends
/// where the next one starts, or at `data.len()` for the last row.
#[derive(Debug, Clone)]
pub struct MultiColumn<T> {
    index: GrowBuffer<i32>,
    data: GrowBuffer<T>,
}

pub(crate) fn offset_of(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| {
        TesseraError::Other(format!(
            "multi-value data of {} elements exceeds the i32 offset range",
            len
        ))
    })
}

/// Row bounds shared by every index/data column pair.
#[inline]
pub(crate) fn row_range(index: &[i32], data_len: usize, row: usize) -> Range<usize> {
    let start = index[row] as usize;
    let end = index.get(row + 1).map_or(data_len, |next| *next as usize);
    start..end
}

impl<T: Primitive> MultiColumn<T> {
    pub fn new(increment: usize) -> Self {
        Self {
            index: GrowBuffer::new(increment),
            data: GrowBuffer::new(increment),
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn add(&mut self, values: &[T]) -> Result<()> {
        let start = offset_of(self.data.len())?;
        offset_of(self.data.len() + values.len())?;
        self.index.push(start);
        self.data.extend_from_slice(values);
        Ok(())
    }

    pub fn get(&self, row: usize) -> Result<&[T]> {
        if row >= self.len() {
            return Err(TesseraError::OutOfBounds {
                position: row,
                len: self.len(),
            });
        }
        Ok(self.row(row))
    }

    /// Unchecked-by-Result variant for hot loops; panics past the end.
    #[inline]
    pub fn row(&self, row: usize) -> &[T] {
        &self.data.as_slice()[row_range(self.index.as_slice(), self.data.len(), row)]
    }

    pub fn offsets(&self) -> &[i32] {
        self.index.as_slice()
    }

    pub fn values(&self) -> &[T] {
        self.data.as_slice()
    }

    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        let (left, right) = (self.row(a), self.row(b));
        for (x, y) in left.iter().zip(right) {
            match x.order(y) {
                Ordering::Equal => continue,
                other => return other,
            }
        }
        left.len().cmp(&right.len())
    }

    pub fn truncate(&mut self, rows: usize) {
        if rows >= self.len() {
            return;
        }
        let data_len = self.index.as_slice()[rows] as usize;
        self.index.truncate(rows);
        self.data.truncate(data_len);
    }

    pub fn compact(&mut self) {
        self.index.compact();
        self.data.compact();
    }

    pub fn memory_estimate(&self) -> usize {
        self.index.memory_estimate() + self.data.memory_estimate()
    }

    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.index.save(writer)?;
        self.data.save(writer)
    }

    pub fn load<R: Read>(reader: &mut R, increment: usize) -> Result<Self> {
        let index = GrowBuffer::<i32>::load(reader, increment)?;
        let data = GrowBuffer::<T>::load(reader, increment)?;
        validate_offsets(index.as_slice(), data.len())?;
        Ok(Self { index, data })
    }
}

pub(crate) fn validate_offsets(index: &[i32], data_len: usize) -> Result<()> {
    let mut previous = 0i32;
    for &offset in index {
        if offset < previous || offset as usize > data_len {
            return Err(TesseraError::Corrupt(format!(
                "invalid multi-value offset {} (data length {})",
                offset, data_len
            )));
        }
        previous = offset;
    }
    if index.first().is_some_and(|first| *first != 0) {
        return Err(TesseraError::Corrupt(
            "multi-value index must start at offset 0".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> MultiColumn<i32> {
        let mut column = MultiColumn::new(2);
        column.add(&[1, 2]).unwrap();
        column.add(&[11, 12]).unwrap();
        column.add(&[]).unwrap();
        column.add(&[33, 12, 7]).unwrap();
        column
    }

    #[test]
    fn test_row_boundaries() {
        let column = sample();
        assert_eq!(column.len(), 4);
        assert_eq!(column.get(0).unwrap(), &[1, 2]);
        assert_eq!(column.get(1).unwrap(), &[11, 12]);
        assert!(column.get(2).unwrap().is_empty());
        assert_eq!(column.get(3).unwrap(), &[33, 12, 7]);
        assert!(column.get(4).is_err());
        assert_eq!(column.offsets(), &[0, 2, 4, 4]);
    }

    #[test]
    fn test_compare_is_lexicographic() {
        let column = sample();
        assert_eq!(column.compare(0, 1), Ordering::Less);
        assert_eq!(column.compare(2, 0), Ordering::Less);
        assert_eq!(column.compare(3, 3), Ordering::Equal);
    }

    #[test]
    fn test_truncate_drops_rows_and_data() {
        let mut column = sample();
        column.truncate(2);
        assert_eq!(column.len(), 2);
        assert_eq!(column.values(), &[1, 2, 11, 12]);
    }

    #[test]
    fn test_save_and_load() {
        let column = sample();
        let mut bytes = Vec::new();
        column.save(&mut bytes).unwrap();

        let loaded = MultiColumn::<i32>::load(&mut Cursor::new(bytes), 16).unwrap();
        assert_eq!(loaded.len(), 4);
        for row in 0..4 {
            assert_eq!(loaded.get(row).unwrap(), column.get(row).unwrap());
        }
    }

    #[test]
    fn test_load_rejects_decreasing_offsets() {
        let mut bytes = Vec::new();
        GrowBuffer::from_vec(vec![0i32, 3, 1], 1).save(&mut bytes).unwrap();
        GrowBuffer::from_vec(vec![1i32, 2, 3], 1).save(&mut bytes).unwrap();
        let result = MultiColumn::<i32>::load(&mut Cursor::new(bytes), 1);
        assert!(matches!(result, Err(TesseraError::Corrupt(_))));
    }
}
