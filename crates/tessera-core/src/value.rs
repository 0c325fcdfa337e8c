//! Cell values and the row adapter used for ingestion.
//!
//! `ValueRef` is what columns hand out and what `Record` implementations
//! supply on append; it borrows strings and multi-value slices so neither
//! direction allocates per cell. `Value` is the owned form used by `Row`.

use std::hash::{Hash, Hasher};

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Double(f64),
    String(String),
    MultiByte(Vec<i8>),
    MultiShort(Vec<i16>),
    MultiInt(Vec<i32>),
    MultiLong(Vec<i64>),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRef<'a> {
    Null,
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Double(f64),
    String(&'a str),
    MultiByte(&'a [i8]),
    MultiShort(&'a [i16]),
    MultiInt(&'a [i32]),
    MultiLong(&'a [i64]),
}

impl Value {
    pub fn as_ref(&self) -> ValueRef<'_> {
        match self {
            Value::Null => ValueRef::Null,
            Value::Byte(v) => ValueRef::Byte(*v),
            Value::Short(v) => ValueRef::Short(*v),
            Value::Int(v) => ValueRef::Int(*v),
            Value::Long(v) => ValueRef::Long(*v),
            Value::Double(v) => ValueRef::Double(*v),
            Value::String(s) => ValueRef::String(s),
            Value::MultiByte(v) => ValueRef::MultiByte(v),
            Value::MultiShort(v) => ValueRef::MultiShort(v),
            Value::MultiInt(v) => ValueRef::MultiInt(v),
            Value::MultiLong(v) => ValueRef::MultiLong(v),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_ref().as_i64()
    }
}

impl<'a> ValueRef<'a> {
    pub fn to_value(self) -> Value {
        match self {
            ValueRef::Null => Value::Null,
            ValueRef::Byte(v) => Value::Byte(v),
            ValueRef::Short(v) => Value::Short(v),
            ValueRef::Int(v) => Value::Int(v),
            ValueRef::Long(v) => Value::Long(v),
            ValueRef::Double(v) => Value::Double(v),
            ValueRef::String(s) => Value::String(s.to_string()),
            ValueRef::MultiByte(v) => Value::MultiByte(v.to_vec()),
            ValueRef::MultiShort(v) => Value::MultiShort(v.to_vec()),
            ValueRef::MultiInt(v) => Value::MultiInt(v.to_vec()),
            ValueRef::MultiLong(v) => Value::MultiLong(v.to_vec()),
        }
    }

    /// Short name of the variant, used in type mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            ValueRef::Null => "null",
            ValueRef::Byte(_) => "byte",
            ValueRef::Short(_) => "short",
            ValueRef::Int(_) => "int",
            ValueRef::Long(_) => "long",
            ValueRef::Double(_) => "double",
            ValueRef::String(_) => "string",
            ValueRef::MultiByte(_) => "multi-byte",
            ValueRef::MultiShort(_) => "multi-short",
            ValueRef::MultiInt(_) => "multi-int",
            ValueRef::MultiLong(_) => "multi-long",
        }
    }

    /// Widens any integer variant to i64.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            ValueRef::Byte(v) => Some(v as i64),
            ValueRef::Short(v) => Some(v as i64),
            ValueRef::Int(v) => Some(v as i64),
            ValueRef::Long(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&'a str> {
        match *self {
            ValueRef::String(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Bitwise so that Eq and Hash agree, NaN included.
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            _ => self.as_ref() == other.as_ref(),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Null => {}
            Value::Byte(v) => v.hash(state),
            Value::Short(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Long(v) => v.hash(state),
            Value::Double(v) => v.to_bits().hash(state),
            Value::String(s) => s.hash(state),
            Value::MultiByte(v) => v.hash(state),
            Value::MultiShort(v) => v.hash(state),
            Value::MultiInt(v) => v.hash(state),
            Value::MultiLong(v) => v.hash(state),
        }
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Byte(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Short(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Option<&str>> for Value {
    fn from(v: Option<&str>) -> Self {
        v.map_or(Value::Null, Value::from)
    }
}

impl From<Vec<i8>> for Value {
    fn from(v: Vec<i8>) -> Self {
        Value::MultiByte(v)
    }
}

impl From<Vec<i16>> for Value {
    fn from(v: Vec<i16>) -> Self {
        Value::MultiShort(v)
    }
}

impl From<Vec<i32>> for Value {
    fn from(v: Vec<i32>) -> Self {
        Value::MultiInt(v)
    }
}

impl From<Vec<i64>> for Value {
    fn from(v: Vec<i64>) -> Self {
        Value::MultiLong(v)
    }
}

/// Adapter between a caller's record type and the store's columns.
///
/// `value(i)` returns the field stored in the i-th schema column. Rows are
/// appended through this trait, so domain types implement it by hand instead
/// of being introspected at runtime.
pub trait Record {
    fn value(&self, column: usize) -> ValueRef<'_>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, value: impl Into<Value>) {
        self.values.push(value.into());
    }

    pub fn get(&self, column: usize) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for Row {
    fn from(values: Vec<Value>) -> Self {
        Self { values }
    }
}

impl Record for Row {
    fn value(&self, column: usize) -> ValueRef<'_> {
        self.values.get(column).map_or(ValueRef::Null, Value::as_ref)
    }
}

impl Record for Vec<Value> {
    fn value(&self, column: usize) -> ValueRef<'_> {
        self.get(column).map_or(ValueRef::Null, Value::as_ref)
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn value(&self, column: usize) -> ValueRef<'_> {
        (**self).value(column)
    }
}

/// Builds a `Row` from a list of expressions convertible into `Value`.
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        $crate::value::Row::from(vec![$($crate::value::Value::from($value)),*])
    };
}
