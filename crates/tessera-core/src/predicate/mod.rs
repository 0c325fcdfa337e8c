//! Query conditions.
//!
//! A `Predicate` is the request as the caller builds it: a column name and
//! raw comparison values. `prepare` resolves the column against a store and
//! returns a `Matcher` holding direct references to that column's buffers
//! and whatever lookup structure the comparison needs. Only a `Matcher` can
//! be asked about blocks and rows, so an unprepared request cannot be
//! evaluated.
//!
//! Matchers answer two questions. `check_block` looks at a block's
//! statistics and may return `true` for a block without matches, but must
//! never return `false` for a block that has one. `check_value` is exact.

mod between;
mod equality;
mod logic;
mod string;

pub use between::{
    Between, ByteBetween, DoubleBetween, IntBetween, LongBetween, ShortBetween,
};
pub use equality::{ByteIn, InSet, IntIn, LongIn, ShortIn};
pub use logic::{Not, Or};
pub use string::{StringIn, StringLike};

use crate::block::Block;
use crate::column::Column;
use crate::errors::{Result, TesseraError};
use crate::store::Store;

pub trait Matcher {
    /// Whether the block may contain a matching row.
    fn check_block(&self, block: &Block) -> bool;

    /// Whether the row at global `position` matches.
    fn check_value(&self, position: usize) -> bool;
}

pub trait Predicate {
    /// Binds the request to `store`. Fails if the column does not exist or
    /// its type cannot be compared this way.
    fn prepare<'s>(&self, store: &'s Store) -> Result<Box<dyn Matcher + 's>>;

    fn boxed(self) -> Box<dyn Predicate>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

impl<P: Predicate + ?Sized> Predicate for Box<P> {
    fn prepare<'s>(&self, store: &'s Store) -> Result<Box<dyn Matcher + 's>> {
        (**self).prepare(store)
    }
}

pub(crate) fn unsupported(column: &Column, operation: &'static str) -> TesseraError {
    TesseraError::UnsupportedColumnType {
        column: column.name().to_string(),
        column_type: column.column_type(),
        operation,
    }
}
