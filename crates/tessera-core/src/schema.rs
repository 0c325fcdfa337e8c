use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::errors::{Result, TesseraError};

/// Storage type of a column. The kebab-case name doubles as the persisted
/// class name in the binary store format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColumnType {
    Byte,
    Short,
    Int,
    Long,
    Double,
    MultiByte,
    MultiShort,
    MultiInt,
    MultiLong,
    String,
    DictStringByte,
    DictStringShort,
    DictStringInt,
}

impl ColumnType {
    pub const ALL: [ColumnType; 13] = [
        ColumnType::Byte,
        ColumnType::Short,
        ColumnType::Int,
        ColumnType::Long,
        ColumnType::Double,
        ColumnType::MultiByte,
        ColumnType::MultiShort,
        ColumnType::MultiInt,
        ColumnType::MultiLong,
        ColumnType::String,
        ColumnType::DictStringByte,
        ColumnType::DictStringShort,
        ColumnType::DictStringInt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Byte => "byte",
            ColumnType::Short => "short",
            ColumnType::Int => "int",
            ColumnType::Long => "long",
            ColumnType::Double => "double",
            ColumnType::MultiByte => "multi-byte",
            ColumnType::MultiShort => "multi-short",
            ColumnType::MultiInt => "multi-int",
            ColumnType::MultiLong => "multi-long",
            ColumnType::String => "string",
            ColumnType::DictStringByte => "dict-string-byte",
            ColumnType::DictStringShort => "dict-string-short",
            ColumnType::DictStringInt => "dict-string-int",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }

    pub fn is_multi(&self) -> bool {
        matches!(
            self,
            ColumnType::MultiByte
                | ColumnType::MultiShort
                | ColumnType::MultiInt
                | ColumnType::MultiLong
        )
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self,
            ColumnType::String
                | ColumnType::DictStringByte
                | ColumnType::DictStringShort
                | ColumnType::DictStringInt
        )
    }

    pub fn is_dictionary(&self) -> bool {
        matches!(
            self,
            ColumnType::DictStringByte | ColumnType::DictStringShort | ColumnType::DictStringInt
        )
    }

    /// Maximum number of distinct non-null strings a dictionary column of
    /// this type can hold.
    pub fn dictionary_limit(&self) -> Option<usize> {
        match self {
            ColumnType::DictStringByte => Some(i8::MAX as usize),
            ColumnType::DictStringShort => Some(i16::MAX as usize),
            ColumnType::DictStringInt => Some(i32::MAX as usize),
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: ColumnType,
    /// Number of elements added to the backing buffer each time it fills.
    /// Falls back to the store's default increment when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub increment: Option<usize>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            increment: None,
        }
    }

    pub fn with_increment(mut self, increment: usize) -> Self {
        self.increment = Some(increment);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(TesseraError::InvalidSchema(
                "schema must define at least one column".into(),
            ));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            if column.name.is_empty() {
                return Err(TesseraError::InvalidSchema(
                    "column names must not be empty".into(),
                ));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(TesseraError::DuplicateColumn(column.name.clone()));
            }
            if column.increment == Some(0) {
                return Err(TesseraError::InvalidSchema(format!(
                    "column '{}' has a zero growth increment",
                    column.name
                )));
            }
        }

        Ok(())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let schema: Schema = serde_yaml::from_str(&content)?;
        schema.validate()?;
        Ok(schema)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}
