use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::{Read, Write};

use super::buffer::{GrowBuffer, Primitive};
use crate::errors::{Result, TesseraError};

/// Code 0 is reserved for null in every dictionary.
pub const NULL_CODE: u32 = 0;

/// String arena shared by all blocks of a dictionary column. Codes are
/// assigned in first-seen order and never reused or removed.
#[derive(Debug, Clone)]
pub struct Dictionary {
    values: Vec<Option<String>>,
    indices: HashMap<String, u32>,
    limit: usize,
}

impl Dictionary {
    pub fn new(limit: usize) -> Self {
        Self {
            values: vec![None],
            indices: HashMap::new(),
            limit,
        }
    }

    /// Number of entries, the null entry included.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.len() == 1
    }

    /// Maximum number of distinct non-null strings.
    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn code_of(&self, value: Option<&str>) -> Option<u32> {
        match value {
            None => Some(NULL_CODE),
            Some(s) => self.indices.get(s).copied(),
        }
    }

    pub fn decode(&self, code: u32) -> Option<&str> {
        self.values.get(code as usize).and_then(|v| v.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Option<&str>)> {
        self.values
            .iter()
            .enumerate()
            .map(|(code, value)| (code as u32, value.as_deref()))
    }

    pub fn add(&mut self, value: Option<&str>, column: &str) -> Result<u32> {
        let Some(value) = value else {
            return Ok(NULL_CODE);
        };
        if let Some(&code) = self.indices.get(value) {
            return Ok(code);
        }
        if self.values.len() > self.limit {
            return Err(TesseraError::DictionaryOverflow {
                column: column.to_string(),
                limit: self.limit,
            });
        }

        let code = self.values.len() as u32;
        self.indices.insert(value.to_string(), code);
        self.values.push(Some(value.to_string()));
        Ok(code)
    }

    /// Drops entries with codes at or above `len`. The null entry always
    /// stays. No row may still refer to a dropped code.
    pub fn truncate(&mut self, len: usize) {
        let len = len.max(1);
        if len >= self.values.len() {
            return;
        }
        for value in self.values.drain(len..).flatten() {
            self.indices.remove(&value);
        }
    }

    pub fn memory_estimate(&self) -> usize {
        // Each string is held twice: in the arena and as a map key.
        let strings: usize = self
            .values
            .iter()
            .flatten()
            .map(|s| s.capacity() * 2)
            .sum();
        strings
            + self.values.capacity() * std::mem::size_of::<Option<String>>()
            + self.indices.capacity() * (std::mem::size_of::<String>() + 4)
    }

    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<LittleEndian>(self.values.len() as i32)?;
        for value in &self.values {
            write_string(writer, value.as_deref())?;
        }
        Ok(())
    }

    pub fn load<R: Read>(reader: &mut R, limit: usize) -> Result<Self> {
        let size = reader.read_i32::<LittleEndian>()?;
        if size < 1 || (size as usize) > limit + 1 {
            return Err(TesseraError::Corrupt(format!(
                "dictionary size {} outside 1..={}",
                size,
                limit + 1
            )));
        }

        let mut dictionary = Self::new(limit);
        if read_string(reader)?.is_some() {
            return Err(TesseraError::Corrupt(
                "dictionary entry 0 must be the null entry".into(),
            ));
        }
        for _ in 1..size {
            let value = read_string(reader)?.ok_or_else(|| {
                TesseraError::Corrupt("dictionary holds a second null entry".into())
            })?;
            let code = dictionary.values.len() as u32;
            if dictionary.indices.insert(value.clone(), code).is_some() {
                return Err(TesseraError::Corrupt(format!(
                    "duplicate dictionary entry '{}'",
                    value
                )));
            }
            dictionary.values.push(Some(value));
        }
        Ok(dictionary)
    }
}

/// Length-prefixed UTF-8; a length of -1 encodes null.
pub fn write_string<W: Write>(writer: &mut W, value: Option<&str>) -> Result<()> {
    match value {
        None => writer.write_i32::<LittleEndian>(-1)?,
        Some(s) => {
            let len = i32::try_from(s.len())
                .map_err(|_| TesseraError::Other("string longer than i32::MAX bytes".into()))?;
            writer.write_i32::<LittleEndian>(len)?;
            writer.write_all(s.as_bytes())?;
        }
    }
    Ok(())
}

pub fn read_string<R: Read>(reader: &mut R) -> Result<Option<String>> {
    let len = reader.read_i32::<LittleEndian>()?;
    match len {
        -1 => Ok(None),
        len if len < 0 => Err(TesseraError::Corrupt(format!(
            "invalid string length {}",
            len
        ))),
        len => {
            let mut bytes = vec![0u8; len as usize];
            reader.read_exact(&mut bytes)?;
            String::from_utf8(bytes)
                .map(Some)
                .map_err(|e| TesseraError::Corrupt(format!("invalid UTF-8 string: {}", e)))
        }
    }
}

/// Integer width used to store dictionary codes.
pub trait Code: Primitive {
    fn from_code(code: u32) -> Self;
    fn code(self) -> u32;
}

impl Code for i8 {
    fn from_code(code: u32) -> Self {
        code as i8
    }
    fn code(self) -> u32 {
        self as u32
    }
}

impl Code for i16 {
    fn from_code(code: u32) -> Self {
        code as i16
    }
    fn code(self) -> u32 {
        self as u32
    }
}

impl Code for i32 {
    fn from_code(code: u32) -> Self {
        code as i32
    }
    fn code(self) -> u32 {
        self as u32
    }
}

/// Dictionary-compressed strings: one code per row plus the shared dictionary.
#[derive(Debug, Clone)]
pub struct DictColumn<C> {
    codes: GrowBuffer<C>,
    dictionary: Dictionary,
}

impl<C: Code> DictColumn<C> {
    pub fn new(increment: usize, limit: usize) -> Self {
        Self {
            codes: GrowBuffer::new(increment),
            dictionary: Dictionary::new(limit),
        }
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn add(&mut self, value: Option<&str>, column: &str) -> Result<()> {
        let code = self.dictionary.add(value, column)?;
        self.codes.push(C::from_code(code));
        Ok(())
    }

    pub fn get(&self, row: usize) -> Result<Option<&str>> {
        let code = self.codes.get(row)?;
        Ok(self.dictionary.decode(code.code()))
    }

    #[inline]
    pub fn code_at(&self, row: usize) -> u32 {
        self.codes.as_slice()[row].code()
    }

    pub fn codes(&self) -> &[C] {
        self.codes.as_slice()
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Orders by decoded string, null first.
    pub fn compare(&self, a: usize, b: usize) -> Ordering {
        let left = self.dictionary.decode(self.code_at(a));
        let right = self.dictionary.decode(self.code_at(b));
        left.cmp(&right)
    }

    pub fn truncate(&mut self, rows: usize) {
        self.codes.truncate(rows);
    }

    /// Drops rows at and after `rows` and dictionary entries at and after
    /// `entries`, undoing appends made since both lengths were taken.
    pub fn truncate_to(&mut self, rows: usize, entries: usize) {
        self.codes.truncate(rows);
        self.dictionary.truncate(entries);
    }

    pub fn compact(&mut self) {
        self.codes.compact();
    }

    pub fn memory_estimate(&self) -> usize {
        self.codes.memory_estimate() + self.dictionary.memory_estimate()
    }

    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.dictionary.save(writer)?;
        self.codes.save(writer)
    }

    pub fn load<R: Read>(reader: &mut R, increment: usize, limit: usize) -> Result<Self> {
        let dictionary = Dictionary::load(reader, limit)?;
        let codes = GrowBuffer::<C>::load(reader, increment)?;
        let size = dictionary.len() as u32;
        if let Some(bad) = codes.as_slice().iter().find(|c| c.code() >= size) {
            return Err(TesseraError::Corrupt(format!(
                "dictionary code {:?} outside dictionary of {} entries",
                bad, size
            )));
        }
        Ok(Self { codes, dictionary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_first_seen_code_assignment() {
        let mut dict = Dictionary::new(10);

        assert_eq!(dict.add(Some("apple"), "fruit").unwrap(), 1);
        assert_eq!(dict.add(Some("banana"), "fruit").unwrap(), 2);
        assert_eq!(dict.add(Some("apple"), "fruit").unwrap(), 1);
        assert_eq!(dict.add(None, "fruit").unwrap(), NULL_CODE);

        assert_eq!(dict.len(), 3);
        assert_eq!(dict.decode(1), Some("apple"));
        assert_eq!(dict.decode(NULL_CODE), None);
        assert_eq!(dict.code_of(Some("cherry")), None);
    }

    #[test]
    fn test_overflow_is_fatal() {
        let mut column = DictColumn::<i8>::new(16, 127);
        for i in 0..127 {
            column.add(Some(&format!("v{}", i)), "c").unwrap();
        }
        // Existing values and null still fit.
        column.add(Some("v0"), "c").unwrap();
        column.add(None, "c").unwrap();

        let err = column.add(Some("one too many"), "c").unwrap_err();
        assert!(matches!(
            err,
            TesseraError::DictionaryOverflow { limit: 127, .. }
        ));
        assert_eq!(column.code_at(126), 127);
    }

    #[test]
    fn test_truncate_to_frees_dictionary_slots() {
        let mut column = DictColumn::<i8>::new(4, 2);
        column.add(Some("a"), "c").unwrap();
        let (rows, entries) = (column.len(), column.dictionary().len());

        column.add(Some("b"), "c").unwrap();
        column.truncate_to(rows, entries);
        assert_eq!(column.len(), 1);
        assert_eq!(column.dictionary().len(), 2);
        assert_eq!(column.dictionary().code_of(Some("b")), None);

        // The freed slot is reused by the next new value.
        column.add(Some("c"), "c").unwrap();
        assert_eq!(column.code_at(1), 2);
        column.add(Some("a"), "c").unwrap();
        assert_eq!(column.code_at(2), 1);
    }

    #[test]
    fn test_null_and_empty_are_distinct() {
        let mut column = DictColumn::<i16>::new(4, 100);
        column.add(None, "c").unwrap();
        column.add(Some(""), "c").unwrap();
        assert_eq!(column.get(0).unwrap(), None);
        assert_eq!(column.get(1).unwrap(), Some(""));
        assert_eq!(column.compare(0, 1), Ordering::Less);
    }

    #[test]
    fn test_save_and_load() {
        let mut column = DictColumn::<i32>::new(4, i32::MAX as usize);
        for v in [Some("x"), None, Some("y"), Some("x")] {
            column.add(v, "c").unwrap();
        }
        let mut bytes = Vec::new();
        column.save(&mut bytes).unwrap();

        let loaded =
            DictColumn::<i32>::load(&mut Cursor::new(bytes), 4, i32::MAX as usize).unwrap();
        assert_eq!(loaded.len(), 4);
        assert_eq!(loaded.get(0).unwrap(), Some("x"));
        assert_eq!(loaded.get(1).unwrap(), None);
        assert_eq!(loaded.get(3).unwrap(), Some("x"));
        assert_eq!(loaded.dictionary().code_of(Some("y")), Some(2));
    }

    #[test]
    fn test_load_rejects_codes_outside_dictionary() {
        let mut bytes = Vec::new();
        Dictionary::new(127).save(&mut bytes).unwrap();
        GrowBuffer::from_vec(vec![0i8, 3], 1).save(&mut bytes).unwrap();
        let result = DictColumn::<i8>::load(&mut Cursor::new(bytes), 1, 127);
        assert!(matches!(result, Err(TesseraError::Corrupt(_))));
    }
}
