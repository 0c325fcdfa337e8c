//! Error types for the Tessera store

use thiserror::Error;

use crate::schema::ColumnType;

/// Result type alias for store operations
pub type Result<T> = std::result::Result<T, TesseraError>;

/// Errors that can occur when building, querying or persisting a store
#[derive(Error, Debug)]
pub enum TesseraError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Schema or config YAML could not be parsed or written
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// No column with this name
    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    /// Two columns share a name
    #[error("Duplicate column: {0}")]
    DuplicateColumn(String),

    /// Operation not defined for the column's type
    #[error("Column '{column}' of type {column_type} does not support {operation}")]
    UnsupportedColumnType {
        column: String,
        column_type: ColumnType,
        operation: &'static str,
    },

    /// Value kind cannot be stored in the column
    #[error("Type mismatch on column '{column}': expected {expected}, got {actual}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        actual: &'static str,
    },

    /// Integer does not fit the column's width
    #[error("Value {value} does not fit column '{column}' of type {column_type}")]
    ValueOutOfRange {
        column: String,
        column_type: ColumnType,
        value: String,
    },

    /// Dictionary column ran out of codes
    #[error("Dictionary for column '{column}' exceeded {limit} distinct values")]
    DictionaryOverflow { column: String, limit: usize },

    /// File written by an incompatible format version
    #[error("Unsupported format version: expected {expected}, found {found}")]
    FormatVersion { expected: i32, found: i32 },

    /// Row position past the end of a column
    #[error("Position {position} out of bounds for column of length {len}")]
    OutOfBounds { position: usize, len: usize },

    /// Schema failed validation
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    /// Store file is truncated or inconsistent
    #[error("Corrupt store file: {0}")]
    Corrupt(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}
