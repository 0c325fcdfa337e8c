//! Single-writer, many-reader handoff around a `Store`.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};
use tracing::{debug, warn};

use crate::errors::Result;
use crate::predicate::Predicate;
use crate::store::Store;
use crate::value::Row;

/// A store behind a read-write lock. Writers take the lock only while a
/// buffered batch is appended; readers hold it for one query.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<RwLock<Store>>,
}

impl SharedStore {
    pub fn new(store: Store) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn read(&self) -> RwLockReadGuard<'_, Store> {
        self.inner.read()
    }

    pub fn writer(&self, buffer_size: usize) -> StoreWriter {
        StoreWriter::new(self.inner.clone(), buffer_size)
    }

    pub fn reader(&self) -> StoreReader {
        StoreReader::new(self.inner.clone())
    }

    /// Returns the store if this is the last handle to it.
    pub fn into_inner(self) -> std::result::Result<Store, Self> {
        Arc::try_unwrap(self.inner)
            .map(RwLock::into_inner)
            .map_err(|inner| Self { inner })
    }
}

/// Buffers rows and appends them in batches once `buffer_size` is reached.
pub struct StoreWriter {
    store: Arc<RwLock<Store>>,
    buffer: Vec<Row>,
    buffer_size: usize,
}

impl StoreWriter {
    pub fn new(store: Arc<RwLock<Store>>, buffer_size: usize) -> Self {
        Self {
            store,
            buffer: Vec::new(),
            buffer_size: buffer_size.max(1),
        }
    }

    pub fn write_row(&mut self, row: Row) -> Result<()> {
        self.buffer.push(row);

        if self.buffer.len() >= self.buffer_size {
            self.flush()?;
        }

        Ok(())
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Appends buffered rows in order and returns how many were stored.
    ///
    /// If a row is rejected, the rows before it stay appended and the
    /// rejected row plus everything after it remain buffered, the rejected
    /// one first. `take_rejected` removes it so the rest can be retried.
    pub fn flush(&mut self) -> Result<usize> {
        if self.buffer.is_empty() {
            return Ok(0);
        }

        let mut added = 0;
        let result = {
            let mut store = self.store.write();
            self.buffer.iter().try_for_each(|row| -> Result<()> {
                store.add(row)?;
                added += 1;
                Ok(())
            })
        };
        self.buffer.drain(..added);

        match result {
            Ok(()) => {
                debug!("Flushed {} buffered rows", added);
                Ok(added)
            }
            Err(e) => {
                warn!(
                    "Flush stopped after {} rows, {} still buffered: {}",
                    added,
                    self.buffer.len(),
                    e
                );
                Err(e)
            }
        }
    }

    /// Removes the oldest buffered row, the one a failed flush stopped at.
    pub fn take_rejected(&mut self) -> Option<Row> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer.remove(0))
        }
    }
}

impl Drop for StoreWriter {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            warn!("Dropping writer with {} unflushed rows", self.buffer.len());
        }
    }
}

pub struct StoreReader {
    store: Arc<RwLock<Store>>,
}

impl StoreReader {
    pub fn new(store: Arc<RwLock<Store>>) -> Self {
        Self { store }
    }

    pub fn select(&self, predicates: &[Box<dyn Predicate>]) -> Result<Vec<usize>> {
        self.store.read().select_positions(predicates)
    }

    pub fn collect_rows(&self, predicates: &[Box<dyn Predicate>]) -> Result<Vec<Row>> {
        self.store.read().collect_rows(predicates)
    }

    pub fn count(&self, predicates: &[Box<dyn Predicate>]) -> Result<usize> {
        self.store.read().count(predicates)
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::errors::TesseraError;
    use crate::predicate::{IntBetween, StringLike};
    use crate::row;
    use crate::schema::{ColumnDef, ColumnType, Schema};

    fn shared() -> SharedStore {
        let schema = Schema::new(vec![
            ColumnDef::new("id", ColumnType::Int),
            ColumnDef::new("name", ColumnType::String),
        ]);
        let store = Store::new(schema, StoreConfig::with_block_capacity(4)).unwrap();
        SharedStore::new(store)
    }

    #[test]
    fn test_writer_and_reader() {
        let shared = shared();
        let mut writer = shared.writer(10);

        for i in 1..=5 {
            writer.write_row(row![i, format!("user_{}", i)]).unwrap();
        }
        writer.flush().unwrap();

        let reader = shared.reader();
        assert_eq!(reader.len(), 5);
        assert_eq!(
            reader
                .select(&[IntBetween::new("id", 2, 3).boxed()])
                .unwrap(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_auto_flush_on_buffer_size() {
        let shared = shared();
        let mut writer = shared.writer(3);

        for i in 1..=2 {
            writer.write_row(row![i, "user"]).unwrap();
        }
        assert_eq!(shared.read().len(), 0);
        assert_eq!(writer.pending(), 2);

        writer.write_row(row![3i32, "user"]).unwrap();
        assert_eq!(shared.read().len(), 3);
        assert_eq!(writer.pending(), 0);
    }

    #[test]
    fn test_failed_flush_keeps_unstored_rows() {
        let schema = Schema::new(vec![ColumnDef::new("b", ColumnType::Byte)]);
        let shared = SharedStore::new(Store::new(schema, StoreConfig::default()).unwrap());
        let mut writer = shared.writer(10);
        for v in [1i32, 300, 3, 4] {
            writer.write_row(row![v]).unwrap();
        }

        let result = writer.flush();
        assert!(matches!(result, Err(TesseraError::ValueOutOfRange { .. })));
        assert_eq!(shared.read().len(), 1);
        assert_eq!(writer.pending(), 3);

        assert_eq!(writer.take_rejected(), Some(row![300i32]));
        assert_eq!(writer.flush().unwrap(), 2);
        assert_eq!(writer.pending(), 0);

        let store = shared.read();
        assert_eq!(store.len(), 3);
        assert_eq!(store.value("b", 2).unwrap(), crate::value::ValueRef::Byte(4));
    }

    #[test]
    fn test_concurrent_readers_after_ingestion() {
        let shared = shared();
        let mut writer = shared.writer(16);
        for i in 0..100 {
            let name = if i % 10 == 0 { "Tenth" } else { "other" };
            writer.write_row(row![i, name]).unwrap();
        }
        writer.flush().unwrap();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                let reader = shared.reader();
                scope.spawn(move || {
                    let count = reader
                        .count(&[StringLike::new("name", "tenth").boxed()])
                        .unwrap();
                    assert_eq!(count, 10);
                });
            }
        });

        drop(writer);
        let store = shared.into_inner().ok().unwrap();
        assert_eq!(store.len(), 100);
    }
}
