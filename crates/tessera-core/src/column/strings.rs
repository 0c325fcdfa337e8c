use std::cmp::Ordering;
use std::io::{Read, Write};

use super::buffer::GrowBuffer;
use super::multi::{offset_of, row_range, validate_offsets};
use crate::errors::{Result, TesseraError};

/// Plain UTF-8 strings laid out like a multi-byte column: an offset index
/// into one flat byte buffer. Nulls are stored as the empty string.
#[derive(Debug, Clone)]
pub struct StringColumn {
    index: GrowBuffer<i32>,
    data: GrowBuffer<u8>,
}

impl StringColumn {
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

    pub fn add(&mut self, value: Option<&str>) -> Result<()> {
        let bytes = value.unwrap_or_default().as_bytes();
        let start = offset_of(self.data.len())?;
        offset_of(self.data.len() + bytes.len())?;
        self.index.push(start);
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    pub fn get(&self, row: usize) -> Result<&str> {
        if row >= self.len() {
            return Err(TesseraError::OutOfBounds {
                position: row,
                len: self.len(),
            });
        }
        Ok(self.str_at(row))
    }

    #[inline]
    pub fn bytes_at(&self, row: usize) -> &[u8] {
        &self.data.as_slice()[row_range(self.index.as_slice(), self.data.len(), row)]
    }

    /// Row boundaries always fall on `&str` boundaries: rows are appended
    /// from `&str` and validated on load.
    #[inline]
    pub fn str_at(&self, row: usize) -> &str {
        std::str::from_utf8(self.bytes_at(row)).unwrap_or_default()
    }

    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        self.str_at(a).cmp(self.str_at(b))
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
        let data = GrowBuffer::<u8>::load(reader, increment)?;
        validate_offsets(index.as_slice(), data.len())?;

        let column = Self { index, data };
        for row in 0..column.len() {
            if std::str::from_utf8(column.bytes_at(row)).is_err() {
                return Err(TesseraError::Corrupt(format!(
                    "string column row {} is not valid UTF-8",
                    row
                )));
            }
        }
        Ok(column)
    }
}
