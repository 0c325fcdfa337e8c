use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{self, Read, Write};

use crate::errors::{Result, TesseraError};

/// Fixed-width element type that can live in a `GrowBuffer` and be written
/// to the store format as raw little-endian values.
pub trait Primitive: Copy + Default + PartialOrd + fmt::Debug + Send + Sync + 'static {
    const WIDTH: usize;

    fn write_all<W: Write>(values: &[Self], writer: &mut W) -> io::Result<()>;

    fn read_into<R: Read>(reader: &mut R, out: &mut [Self]) -> io::Result<()>;

    /// Total order used by `Column::compare`.
    fn order(&self, other: &Self) -> Ordering;

    fn hash_into<H: Hasher>(&self, state: &mut H);
}

macro_rules! impl_integer_primitive {
    ($t:ty, $write:ident, $read:ident) => {
        impl Primitive for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();

            fn write_all<W: Write>(values: &[Self], writer: &mut W) -> io::Result<()> {
                for v in values {
                    writer.$write::<LittleEndian>(*v)?;
                }
                Ok(())
            }

            fn read_into<R: Read>(reader: &mut R, out: &mut [Self]) -> io::Result<()> {
                reader.$read::<LittleEndian>(out)
            }

            fn order(&self, other: &Self) -> Ordering {
                self.cmp(other)
            }

            fn hash_into<H: Hasher>(&self, state: &mut H) {
                self.hash(state);
            }
        }
    };
}

impl_integer_primitive!(i16, write_i16, read_i16_into);
impl_integer_primitive!(i32, write_i32, read_i32_into);
impl_integer_primitive!(i64, write_i64, read_i64_into);

impl Primitive for i8 {
    const WIDTH: usize = 1;

    fn write_all<W: Write>(values: &[Self], writer: &mut W) -> io::Result<()> {
        for v in values {
            writer.write_i8(*v)?;
        }
        Ok(())
    }

    fn read_into<R: Read>(reader: &mut R, out: &mut [Self]) -> io::Result<()> {
        reader.read_i8_into(out)
    }

    fn order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.hash(state);
    }
}

impl Primitive for u8 {
    const WIDTH: usize = 1;

    fn write_all<W: Write>(values: &[Self], writer: &mut W) -> io::Result<()> {
        writer.write_all(values)
    }

    fn read_into<R: Read>(reader: &mut R, out: &mut [Self]) -> io::Result<()> {
        reader.read_exact(out)
    }

    fn order(&self, other: &Self) -> Ordering {
        self.cmp(other)
    }

    fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.hash(state);
    }
}

impl Primitive for f64 {
    const WIDTH: usize = 8;

    fn write_all<W: Write>(values: &[Self], writer: &mut W) -> io::Result<()> {
        for v in values {
            writer.write_f64::<LittleEndian>(*v)?;
        }
        Ok(())
    }

    fn read_into<R: Read>(reader: &mut R, out: &mut [Self]) -> io::Result<()> {
        reader.read_f64_into::<LittleEndian>(out)
    }

    fn order(&self, other: &Self) -> Ordering {
        self.total_cmp(other)
    }

    fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.to_bits().hash(state);
    }
}

pub(crate) fn stable_hash<F: FnOnce(&mut DefaultHasher)>(feed: F) -> u64 {
    let mut hasher = DefaultHasher::new();
    feed(&mut hasher);
    hasher.finish()
}

/// Append-only vector that grows by a fixed number of elements instead of
/// doubling, so the caller bounds the slack kept for very large columns.
#[derive(Debug, Clone)]
pub struct GrowBuffer<T> {
    data: Vec<T>,
    increment: usize,
}

impl<T: Primitive> GrowBuffer<T> {
    pub fn new(increment: usize) -> Self {
        Self {
            data: Vec::new(),
            increment: increment.max(1),
        }
    }

    pub fn from_vec(data: Vec<T>, increment: usize) -> Self {
        Self {
            data,
            increment: increment.max(1),
        }
    }

    pub fn push(&mut self, value: T) {
        if self.data.len() == self.data.capacity() {
            self.data.reserve_exact(self.increment);
        }
        self.data.push(value);
    }

    pub fn extend_from_slice(&mut self, values: &[T]) {
        let len = self.data.len();
        let capacity = self.data.capacity();
        if len + values.len() > capacity {
            let missing = len + values.len() - capacity;
            let grow_by = missing.div_ceil(self.increment) * self.increment;
            self.data.reserve_exact(capacity + grow_by - len);
        }
        self.data.extend_from_slice(values);
    }

    pub fn get(&self, position: usize) -> Result<T> {
        self.data
            .get(position)
            .copied()
            .ok_or(TesseraError::OutOfBounds {
                position,
                len: self.data.len(),
            })
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    pub fn increment(&self) -> usize {
        self.increment
    }

    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Drops the growth headroom so capacity equals length.
    pub fn compact(&mut self) {
        self.data.shrink_to_fit();
    }

    pub fn memory_estimate(&self) -> usize {
        self.data.capacity() * T::WIDTH
    }

    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        let len = i32::try_from(self.data.len()).map_err(|_| {
            TesseraError::Other(format!(
                "buffer of {} elements exceeds the store format limit",
                self.data.len()
            ))
        })?;
        writer.write_i32::<LittleEndian>(len)?;
        T::write_all(&self.data, writer)?;
        Ok(())
    }

    pub fn load<R: Read>(reader: &mut R, increment: usize) -> Result<Self> {
        let len = reader.read_i32::<LittleEndian>()?;
        if len < 0 {
            return Err(TesseraError::Corrupt(format!(
                "negative buffer length {}",
                len
            )));
        }
        let mut data = vec![T::default(); len as usize];
        T::read_into(reader, &mut data)?;
        Ok(Self::from_vec(data, increment))
    }
}
