//! Typed column storage.
//!
//! Every column is one variant of `ColumnData`: a scalar `GrowBuffer`, a
//! `MultiColumn` (offset index plus flat values), a `StringColumn`, or a
//! `DictColumn` holding codes of the width its type tag names. Dispatch is by
//! exhaustive match, so adding a type forces every operation to handle it.

pub mod buffer;
pub mod dictionary;
pub mod multi;
pub mod strings;

use std::borrow::Cow;
use std::cmp::Ordering;
use std::hash::Hash;
use std::io::{Read, Write};

use crate::errors::{Result, TesseraError};
use crate::schema::{ColumnDef, ColumnType};
use crate::value::ValueRef;

pub use buffer::{GrowBuffer, Primitive};
pub use dictionary::{DictColumn, Dictionary, NULL_CODE};
pub use multi::MultiColumn;
pub use strings::StringColumn;

/// Lengths captured by `Column::mark`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMark {
    rows: usize,
    entries: usize,
}

#[derive(Debug, Clone)]
pub enum ColumnData {
    Byte(GrowBuffer<i8>),
    Short(GrowBuffer<i16>),
    Int(GrowBuffer<i32>),
    Long(GrowBuffer<i64>),
    Double(GrowBuffer<f64>),
    MultiByte(MultiColumn<i8>),
    MultiShort(MultiColumn<i16>),
    MultiInt(MultiColumn<i32>),
    MultiLong(MultiColumn<i64>),
    String(StringColumn),
    DictByte(DictColumn<i8>),
    DictShort(DictColumn<i16>),
    DictInt(DictColumn<i32>),
}

/// Integer element types, with accessors for the column variants that store
/// them. Predicates use these to bind a generic request to typed storage.
pub trait Integer: Primitive + Ord + Hash + Into<i64> + TryFrom<i64> {
    const COLUMN_TYPE: ColumnType;
    const MULTI_COLUMN_TYPE: ColumnType;

    fn scalar(data: &ColumnData) -> Option<&GrowBuffer<Self>>;
    fn multi(data: &ColumnData) -> Option<&MultiColumn<Self>>;
    fn slice_of<'a>(value: ValueRef<'a>) -> Option<&'a [Self]>;
}

macro_rules! impl_integer {
    ($t:ty, $scalar:ident, $multi:ident, $ct:expr, $mct:expr) => {
        impl Integer for $t {
            const COLUMN_TYPE: ColumnType = $ct;
            const MULTI_COLUMN_TYPE: ColumnType = $mct;

            fn scalar(data: &ColumnData) -> Option<&GrowBuffer<Self>> {
                match data {
                    ColumnData::$scalar(buffer) => Some(buffer),
                    _ => None,
                }
            }

            fn multi(data: &ColumnData) -> Option<&MultiColumn<Self>> {
                match data {
                    ColumnData::$multi(column) => Some(column),
                    _ => None,
                }
            }

            fn slice_of<'a>(value: ValueRef<'a>) -> Option<&'a [Self]> {
                match value {
                    ValueRef::$multi(values) => Some(values),
                    _ => None,
                }
            }
        }
    };
}

impl_integer!(i8, Byte, MultiByte, ColumnType::Byte, ColumnType::MultiByte);
impl_integer!(i16, Short, MultiShort, ColumnType::Short, ColumnType::MultiShort);
impl_integer!(i32, Int, MultiInt, ColumnType::Int, ColumnType::MultiInt);
impl_integer!(i64, Long, MultiLong, ColumnType::Long, ColumnType::MultiLong);

#[derive(Debug, Clone)]
pub struct Column {
    name: String,
    column_type: ColumnType,
    data: ColumnData,
}

impl Column {
    pub fn new(def: &ColumnDef, default_increment: usize) -> Self {
        let increment = def.increment.unwrap_or(default_increment);
        Self::with_increment(def.name.clone(), def.column_type, increment)
    }

    pub fn with_increment(name: String, column_type: ColumnType, increment: usize) -> Self {
        let data = match column_type {
            ColumnType::Byte => ColumnData::Byte(GrowBuffer::new(increment)),
            ColumnType::Short => ColumnData::Short(GrowBuffer::new(increment)),
            ColumnType::Int => ColumnData::Int(GrowBuffer::new(increment)),
            ColumnType::Long => ColumnData::Long(GrowBuffer::new(increment)),
            ColumnType::Double => ColumnData::Double(GrowBuffer::new(increment)),
            ColumnType::MultiByte => ColumnData::MultiByte(MultiColumn::new(increment)),
            ColumnType::MultiShort => ColumnData::MultiShort(MultiColumn::new(increment)),
            ColumnType::MultiInt => ColumnData::MultiInt(MultiColumn::new(increment)),
            ColumnType::MultiLong => ColumnData::MultiLong(MultiColumn::new(increment)),
            ColumnType::String => ColumnData::String(StringColumn::new(increment)),
            ColumnType::DictStringByte => {
                ColumnData::DictByte(DictColumn::new(increment, i8::MAX as usize))
            }
            ColumnType::DictStringShort => {
                ColumnData::DictShort(DictColumn::new(increment, i16::MAX as usize))
            }
            ColumnType::DictStringInt => {
                ColumnData::DictInt(DictColumn::new(increment, i32::MAX as usize))
            }
        };
        Self {
            name,
            column_type,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.column_type
    }

    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    pub fn len(&self) -> usize {
        match &self.data {
            ColumnData::Byte(c) => c.len(),
            ColumnData::Short(c) => c.len(),
            ColumnData::Int(c) => c.len(),
            ColumnData::Long(c) => c.len(),
            ColumnData::Double(c) => c.len(),
            ColumnData::MultiByte(c) => c.len(),
            ColumnData::MultiShort(c) => c.len(),
            ColumnData::MultiInt(c) => c.len(),
            ColumnData::MultiLong(c) => c.len(),
            ColumnData::String(c) => c.len(),
            ColumnData::DictByte(c) => c.len(),
            ColumnData::DictShort(c) => c.len(),
            ColumnData::DictInt(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends one value, converting it to the column's native type.
    pub fn add(&mut self, value: ValueRef<'_>) -> Result<()> {
        match &mut self.data {
            ColumnData::Byte(c) => c.push(narrow(&self.name, self.column_type, value)?),
            ColumnData::Short(c) => c.push(narrow(&self.name, self.column_type, value)?),
            ColumnData::Int(c) => c.push(narrow(&self.name, self.column_type, value)?),
            ColumnData::Long(c) => c.push(narrow(&self.name, self.column_type, value)?),
            ColumnData::Double(c) => {
                let v = match value {
                    ValueRef::Double(v) => v,
                    other => match other.as_i64() {
                        Some(v) => v as f64,
                        None => return Err(mismatch(&self.name, self.column_type, value)),
                    },
                };
                c.push(v);
            }
            ColumnData::MultiByte(c) => {
                c.add(&multi_values(&self.name, self.column_type, value)?)?
            }
            ColumnData::MultiShort(c) => {
                c.add(&multi_values(&self.name, self.column_type, value)?)?
            }
            ColumnData::MultiInt(c) => {
                c.add(&multi_values(&self.name, self.column_type, value)?)?
            }
            ColumnData::MultiLong(c) => {
                c.add(&multi_values(&self.name, self.column_type, value)?)?
            }
            ColumnData::String(c) => c.add(string_value(&self.name, self.column_type, value)?)?,
            ColumnData::DictByte(c) => {
                c.add(string_value(&self.name, self.column_type, value)?, &self.name)?
            }
            ColumnData::DictShort(c) => {
                c.add(string_value(&self.name, self.column_type, value)?, &self.name)?
            }
            ColumnData::DictInt(c) => {
                c.add(string_value(&self.name, self.column_type, value)?, &self.name)?
            }
        }
        Ok(())
    }

    /// Appends the value stored at `position` in `source`.
    pub fn push_from(&mut self, source: &Column, position: usize) -> Result<()> {
        self.add(source.value(position)?)
    }

    pub fn value(&self, position: usize) -> Result<ValueRef<'_>> {
        let value = match &self.data {
            ColumnData::Byte(c) => ValueRef::Byte(c.get(position)?),
            ColumnData::Short(c) => ValueRef::Short(c.get(position)?),
            ColumnData::Int(c) => ValueRef::Int(c.get(position)?),
            ColumnData::Long(c) => ValueRef::Long(c.get(position)?),
            ColumnData::Double(c) => ValueRef::Double(c.get(position)?),
            ColumnData::MultiByte(c) => ValueRef::MultiByte(c.get(position)?),
            ColumnData::MultiShort(c) => ValueRef::MultiShort(c.get(position)?),
            ColumnData::MultiInt(c) => ValueRef::MultiInt(c.get(position)?),
            ColumnData::MultiLong(c) => ValueRef::MultiLong(c.get(position)?),
            ColumnData::String(c) => ValueRef::String(c.get(position)?),
            ColumnData::DictByte(c) => c.get(position)?.map_or(ValueRef::Null, ValueRef::String),
            ColumnData::DictShort(c) => c.get(position)?.map_or(ValueRef::Null, ValueRef::String),
            ColumnData::DictInt(c) => c.get(position)?.map_or(ValueRef::Null, ValueRef::String),
        };
        Ok(value)
    }

    /// Orders two rows by their natural value order. Dictionary columns
    /// compare decoded strings, not codes. Panics if either position is out
    /// of bounds.
    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        fn scalar<T: Primitive>(c: &GrowBuffer<T>, a: usize, b: usize) -> Ordering {
            let values = c.as_slice();
            values[a].order(&values[b])
        }

        match &self.data {
            ColumnData::Byte(c) => scalar(c, a, b),
            ColumnData::Short(c) => scalar(c, a, b),
            ColumnData::Int(c) => scalar(c, a, b),
            ColumnData::Long(c) => scalar(c, a, b),
            ColumnData::Double(c) => scalar(c, a, b),
            ColumnData::MultiByte(c) => c.compare(a, b),
            ColumnData::MultiShort(c) => c.compare(a, b),
            ColumnData::MultiInt(c) => c.compare(a, b),
            ColumnData::MultiLong(c) => c.compare(a, b),
            ColumnData::String(c) => c.compare(a, b),
            ColumnData::DictByte(c) => c.compare(a, b),
            ColumnData::DictShort(c) => c.compare(a, b),
            ColumnData::DictInt(c) => c.compare(a, b),
        }
    }

    /// Hash of the decoded value at `position`; rows that compare equal hash
    /// equally. Panics if `position` is out of bounds.
    pub fn hash(&self, position: usize) -> u64 {
        fn scalar<T: Primitive>(c: &GrowBuffer<T>, position: usize) -> u64 {
            buffer::stable_hash(|h| c.as_slice()[position].hash_into(h))
        }
        fn multi<T: Primitive>(c: &MultiColumn<T>, position: usize) -> u64 {
            buffer::stable_hash(|h| {
                let row = c.row(position);
                row.len().hash(h);
                for v in row {
                    v.hash_into(h);
                }
            })
        }
        fn decoded(value: Option<&str>) -> u64 {
            buffer::stable_hash(|h| value.hash(h))
        }

        match &self.data {
            ColumnData::Byte(c) => scalar(c, position),
            ColumnData::Short(c) => scalar(c, position),
            ColumnData::Int(c) => scalar(c, position),
            ColumnData::Long(c) => scalar(c, position),
            ColumnData::Double(c) => scalar(c, position),
            ColumnData::MultiByte(c) => multi(c, position),
            ColumnData::MultiShort(c) => multi(c, position),
            ColumnData::MultiInt(c) => multi(c, position),
            ColumnData::MultiLong(c) => multi(c, position),
            ColumnData::String(c) => decoded(Some(c.str_at(position))),
            ColumnData::DictByte(c) => decoded(c.dictionary().decode(c.code_at(position))),
            ColumnData::DictShort(c) => decoded(c.dictionary().decode(c.code_at(position))),
            ColumnData::DictInt(c) => decoded(c.dictionary().decode(c.code_at(position))),
        }
    }

    /// Drops rows at and after `len`. Used to undo a partially appended row.
    pub fn truncate(&mut self, len: usize) {
        match &mut self.data {
            ColumnData::Byte(c) => c.truncate(len),
            ColumnData::Short(c) => c.truncate(len),
            ColumnData::Int(c) => c.truncate(len),
            ColumnData::Long(c) => c.truncate(len),
            ColumnData::Double(c) => c.truncate(len),
            ColumnData::MultiByte(c) => c.truncate(len),
            ColumnData::MultiShort(c) => c.truncate(len),
            ColumnData::MultiInt(c) => c.truncate(len),
            ColumnData::MultiLong(c) => c.truncate(len),
            ColumnData::String(c) => c.truncate(len),
            ColumnData::DictByte(c) => c.truncate(len),
            ColumnData::DictShort(c) => c.truncate(len),
            ColumnData::DictInt(c) => c.truncate(len),
        }
    }

    /// Current row count and dictionary size, for undoing a partial row.
    pub fn mark(&self) -> ColumnMark {
        let entries = match &self.data {
            ColumnData::DictByte(c) => c.dictionary().len(),
            ColumnData::DictShort(c) => c.dictionary().len(),
            ColumnData::DictInt(c) => c.dictionary().len(),
            _ => 0,
        };
        ColumnMark {
            rows: self.len(),
            entries,
        }
    }

    /// Restores the column to `mark`, dropping rows and dictionary entries
    /// added since.
    pub fn rollback(&mut self, mark: ColumnMark) {
        match &mut self.data {
            ColumnData::DictByte(c) => c.truncate_to(mark.rows, mark.entries),
            ColumnData::DictShort(c) => c.truncate_to(mark.rows, mark.entries),
            ColumnData::DictInt(c) => c.truncate_to(mark.rows, mark.entries),
            _ => self.truncate(mark.rows),
        }
    }

    pub fn compact(&mut self) {
        match &mut self.data {
            ColumnData::Byte(c) => c.compact(),
            ColumnData::Short(c) => c.compact(),
            ColumnData::Int(c) => c.compact(),
            ColumnData::Long(c) => c.compact(),
            ColumnData::Double(c) => c.compact(),
            ColumnData::MultiByte(c) => c.compact(),
            ColumnData::MultiShort(c) => c.compact(),
            ColumnData::MultiInt(c) => c.compact(),
            ColumnData::MultiLong(c) => c.compact(),
            ColumnData::String(c) => c.compact(),
            ColumnData::DictByte(c) => c.compact(),
            ColumnData::DictShort(c) => c.compact(),
            ColumnData::DictInt(c) => c.compact(),
        }
    }

    /// Allocated bytes, growth headroom and dictionary strings included.
    pub fn memory_estimate(&self) -> usize {
        match &self.data {
            ColumnData::Byte(c) => c.memory_estimate(),
            ColumnData::Short(c) => c.memory_estimate(),
            ColumnData::Int(c) => c.memory_estimate(),
            ColumnData::Long(c) => c.memory_estimate(),
            ColumnData::Double(c) => c.memory_estimate(),
            ColumnData::MultiByte(c) => c.memory_estimate(),
            ColumnData::MultiShort(c) => c.memory_estimate(),
            ColumnData::MultiInt(c) => c.memory_estimate(),
            ColumnData::MultiLong(c) => c.memory_estimate(),
            ColumnData::String(c) => c.memory_estimate(),
            ColumnData::DictByte(c) => c.memory_estimate(),
            ColumnData::DictShort(c) => c.memory_estimate(),
            ColumnData::DictInt(c) => c.memory_estimate(),
        }
    }

    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        match &self.data {
            ColumnData::Byte(c) => c.save(writer),
            ColumnData::Short(c) => c.save(writer),
            ColumnData::Int(c) => c.save(writer),
            ColumnData::Long(c) => c.save(writer),
            ColumnData::Double(c) => c.save(writer),
            ColumnData::MultiByte(c) => c.save(writer),
            ColumnData::MultiShort(c) => c.save(writer),
            ColumnData::MultiInt(c) => c.save(writer),
            ColumnData::MultiLong(c) => c.save(writer),
            ColumnData::String(c) => c.save(writer),
            ColumnData::DictByte(c) => c.save(writer),
            ColumnData::DictShort(c) => c.save(writer),
            ColumnData::DictInt(c) => c.save(writer),
        }
    }

    pub fn load<R: Read>(
        name: String,
        column_type: ColumnType,
        reader: &mut R,
        increment: usize,
    ) -> Result<Self> {
        let limit = column_type.dictionary_limit().unwrap_or(0);
        let data = match column_type {
            ColumnType::Byte => ColumnData::Byte(GrowBuffer::load(reader, increment)?),
            ColumnType::Short => ColumnData::Short(GrowBuffer::load(reader, increment)?),
            ColumnType::Int => ColumnData::Int(GrowBuffer::load(reader, increment)?),
            ColumnType::Long => ColumnData::Long(GrowBuffer::load(reader, increment)?),
            ColumnType::Double => ColumnData::Double(GrowBuffer::load(reader, increment)?),
            ColumnType::MultiByte => ColumnData::MultiByte(MultiColumn::load(reader, increment)?),
            ColumnType::MultiShort => {
                ColumnData::MultiShort(MultiColumn::load(reader, increment)?)
            }
            ColumnType::MultiInt => ColumnData::MultiInt(MultiColumn::load(reader, increment)?),
            ColumnType::MultiLong => ColumnData::MultiLong(MultiColumn::load(reader, increment)?),
            ColumnType::String => ColumnData::String(StringColumn::load(reader, increment)?),
            ColumnType::DictStringByte => {
                ColumnData::DictByte(DictColumn::load(reader, increment, limit)?)
            }
            ColumnType::DictStringShort => {
                ColumnData::DictShort(DictColumn::load(reader, increment, limit)?)
            }
            ColumnType::DictStringInt => {
                ColumnData::DictInt(DictColumn::load(reader, increment, limit)?)
            }
        };
        Ok(Self {
            name,
            column_type,
            data,
        })
    }
}

fn mismatch(column: &str, column_type: ColumnType, value: ValueRef<'_>) -> TesseraError {
    TesseraError::TypeMismatch {
        column: column.to_string(),
        expected: column_type,
        actual: value.kind(),
    }
}

fn narrow<T: Integer>(column: &str, column_type: ColumnType, value: ValueRef<'_>) -> Result<T> {
    let wide = value
        .as_i64()
        .ok_or_else(|| mismatch(column, column_type, value))?;
    T::try_from(wide).map_err(|_| TesseraError::ValueOutOfRange {
        column: column.to_string(),
        column_type,
        value: wide.to_string(),
    })
}

fn multi_values<'a, T: Integer>(
    column: &str,
    column_type: ColumnType,
    value: ValueRef<'a>,
) -> Result<Cow<'a, [T]>> {
    if let Some(values) = T::slice_of(value) {
        return Ok(Cow::Borrowed(values));
    }

    fn convert<T: Integer, S: Copy + Into<i64>>(
        column: &str,
        column_type: ColumnType,
        values: &[S],
    ) -> Result<Vec<T>> {
        values
            .iter()
            .map(|v| narrow(column, column_type, ValueRef::Long((*v).into())))
            .collect()
    }

    let converted = match value {
        ValueRef::Null => Vec::new(),
        ValueRef::MultiByte(v) => convert(column, column_type, v)?,
        ValueRef::MultiShort(v) => convert(column, column_type, v)?,
        ValueRef::MultiInt(v) => convert(column, column_type, v)?,
        ValueRef::MultiLong(v) => convert(column, column_type, v)?,
        other => return Err(mismatch(column, column_type, other)),
    };
    Ok(Cow::Owned(converted))
}

fn string_value<'a>(
    column: &str,
    column_type: ColumnType,
    value: ValueRef<'a>,
) -> Result<Option<&'a str>> {
    match value {
        ValueRef::Null => Ok(None),
        ValueRef::String(s) => Ok(Some(s)),
        other => Err(mismatch(column, column_type, other)),
    }
}
