//! Binary store files.
//!
//! ```text
//! i32 format_version
//! i32 row_count
//! i32 column_count
//! column_count x { string type, string name, i64 offset, i32 length }
//! payloads, each at its recorded absolute offset
//! ```
//!
//! Strings are an i32 byte length (-1 for null) followed by UTF-8. All
//! integers are little-endian. Payload ranges are independent, so columns
//! can be decoded in parallel or loaded selectively.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use memmap2::Mmap;
use rayon::prelude::*;
use tracing::{debug, info, instrument, warn};

use crate::column::dictionary::{read_string, write_string};
use crate::column::Column;
use crate::config::StoreConfig;
use crate::errors::{Result, TesseraError};
use crate::schema::{ColumnDef, ColumnType, Schema};
use crate::store::Store;

pub const FORMAT_VERSION: i32 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnEntry {
    pub name: String,
    pub column_type: ColumnType,
    /// Absolute byte offset of the payload.
    pub offset: u64,
    pub length: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreHeader {
    pub format_version: i32,
    pub row_count: usize,
    pub columns: Vec<ColumnEntry>,
}

impl StoreHeader {
    pub fn schema(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|c| ColumnDef::new(c.name.clone(), c.column_type))
                .collect(),
        )
    }

    pub fn column(&self, name: &str) -> Option<&ColumnEntry> {
        self.columns.iter().find(|c| c.name == name)
    }
}

fn string_len(value: &str) -> usize {
    4 + value.len()
}

fn to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| TesseraError::Other(format!("{} {} exceeds the format's i32 limit", what, value)))
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Writes `store` to `path`. The file is written beside the target and
/// renamed into place once complete; on failure the partial file is removed.
#[instrument(skip(store), fields(rows = store.len()))]
pub fn save(store: &Store, path: &Path) -> Result<()> {
    let started = Instant::now();
    let temp = temp_path(path);

    let written = match write_file(store, &temp).and_then(|written| {
        fs::rename(&temp, path)?;
        Ok(written)
    }) {
        Ok(written) => written,
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(&temp) {
                warn!("Failed to remove partial file {:?}: {}", temp, cleanup);
            }
            return Err(e);
        }
    };

    info!(
        "Saved {} rows in {} columns ({} bytes) to {:?} in {:?}",
        store.len(),
        store.columns().len(),
        written,
        path,
        started.elapsed()
    );
    Ok(())
}

fn write_file(store: &Store, path: &Path) -> Result<u64> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    let written = write_to(store, &mut writer)?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(written)
}

/// Encodes `store` into `writer` and returns the number of bytes written.
/// Column payloads are encoded on the rayon pool.
pub fn write_to<W: Write>(store: &Store, writer: &mut W) -> Result<u64> {
    let payloads = store
        .columns()
        .par_iter()
        .map(|column| {
            let mut buffer = Vec::new();
            column.save(&mut buffer)?;
            Ok(buffer)
        })
        .collect::<Result<Vec<Vec<u8>>>>()?;

    let header_len = 12
        + store
            .columns()
            .iter()
            .map(|c| string_len(c.column_type().as_str()) + string_len(c.name()) + 8 + 4)
            .sum::<usize>();

    writer.write_i32::<LittleEndian>(FORMAT_VERSION)?;
    writer.write_i32::<LittleEndian>(to_i32(store.len(), "row count")?)?;
    writer.write_i32::<LittleEndian>(to_i32(store.columns().len(), "column count")?)?;

    let mut offset = header_len as u64;
    for (column, payload) in store.columns().iter().zip(&payloads) {
        write_string(writer, Some(column.column_type().as_str()))?;
        write_string(writer, Some(column.name()))?;
        writer.write_i64::<LittleEndian>(offset as i64)?;
        writer.write_i32::<LittleEndian>(to_i32(payload.len(), "column payload of")?)?;
        offset += payload.len() as u64;
    }

    for payload in &payloads {
        writer.write_all(payload)?;
    }

    Ok(offset)
}

fn parse_header<R: Read>(reader: &mut R) -> Result<StoreHeader> {
    let format_version = reader.read_i32::<LittleEndian>()?;
    if format_version != FORMAT_VERSION {
        return Err(TesseraError::FormatVersion {
            expected: FORMAT_VERSION,
            found: format_version,
        });
    }

    let row_count = reader.read_i32::<LittleEndian>()?;
    let column_count = reader.read_i32::<LittleEndian>()?;
    if row_count < 0 || column_count < 0 {
        return Err(TesseraError::Corrupt(format!(
            "negative row count {} or column count {}",
            row_count, column_count
        )));
    }

    let mut columns = Vec::with_capacity(column_count as usize);
    for _ in 0..column_count {
        let type_name = read_string(reader)?
            .ok_or_else(|| TesseraError::Corrupt("null column type".into()))?;
        let column_type = ColumnType::from_name(&type_name)
            .ok_or_else(|| TesseraError::Corrupt(format!("unknown column type '{}'", type_name)))?;
        let name = read_string(reader)?
            .ok_or_else(|| TesseraError::Corrupt("null column name".into()))?;
        let offset = reader.read_i64::<LittleEndian>()?;
        let length = reader.read_i32::<LittleEndian>()?;
        if offset < 0 || length < 0 {
            return Err(TesseraError::Corrupt(format!(
                "column '{}' has negative offset {} or length {}",
                name, offset, length
            )));
        }
        columns.push(ColumnEntry {
            name,
            column_type,
            offset: offset as u64,
            length: length as usize,
        });
    }

    Ok(StoreHeader {
        format_version,
        row_count: row_count as usize,
        columns,
    })
}

/// Reads only the header of the store file at `path`.
pub fn read_header(path: &Path) -> Result<StoreHeader> {
    let mut reader = BufReader::new(File::open(path)?);
    parse_header(&mut reader)
}

pub fn load(path: &Path, config: &StoreConfig) -> Result<Store> {
    load_selected(path, None, config)
}

/// Loads only the named columns, in the order given.
pub fn load_columns(path: &Path, names: &[&str], config: &StoreConfig) -> Result<Store> {
    load_selected(path, Some(names), config)
}

#[instrument(skip(config))]
fn load_selected(path: &Path, names: Option<&[&str]>, config: &StoreConfig) -> Result<Store> {
    let started = Instant::now();
    let file = File::open(path)?;

    // SAFETY: the map is read-only and dropped before returning; every
    // decoded column copies out of it.
    #[allow(unsafe_code)]
    let map = unsafe { Mmap::map(&file)? };

    let store = from_bytes(&map, names, config)?;
    info!(
        "Loaded {} rows in {} columns from {:?} in {:?}",
        store.len(),
        store.columns().len(),
        path,
        started.elapsed()
    );
    Ok(store)
}

/// Decodes a store from an in-memory image of a store file. With `names`,
/// only those columns are decoded.
pub fn from_bytes(bytes: &[u8], names: Option<&[&str]>, config: &StoreConfig) -> Result<Store> {
    config.validate()?;
    let mut cursor = bytes;
    let header = parse_header(&mut cursor)?;

    let entries: Vec<&ColumnEntry> = match names {
        None => header.columns.iter().collect(),
        Some(names) => names
            .iter()
            .map(|name| {
                header
                    .column(name)
                    .ok_or_else(|| TesseraError::UnknownColumn(name.to_string()))
            })
            .collect::<Result<_>>()?,
    };

    let schema = Schema::new(
        entries
            .iter()
            .map(|e| ColumnDef::new(e.name.clone(), e.column_type))
            .collect(),
    );
    schema.validate()?;

    let decode = |entry: &&ColumnEntry| -> Result<Column> {
        let start = entry.offset as usize;
        let end = start
            .checked_add(entry.length)
            .filter(|end| *end <= bytes.len())
            .ok_or_else(|| {
                TesseraError::Corrupt(format!(
                    "payload of column '{}' lies outside the file",
                    entry.name
                ))
            })?;

        let mut payload = &bytes[start..end];
        let column = Column::load(
            entry.name.clone(),
            entry.column_type,
            &mut payload,
            config.default_increment,
        )?;
        if column.len() != header.row_count {
            return Err(TesseraError::Corrupt(format!(
                "column '{}' holds {} rows, header says {}",
                entry.name,
                column.len(),
                header.row_count
            )));
        }
        Ok(column)
    };

    let columns = if config.parallel_load {
        entries.par_iter().map(decode).collect::<Result<Vec<_>>>()?
    } else {
        entries.iter().map(decode).collect::<Result<Vec<_>>>()?
    };

    debug!("Decoded {} of {} columns", columns.len(), header.columns.len());
    Store::from_parts(schema, config.clone(), columns)
}
