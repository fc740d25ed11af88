//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for read paths and the
//! in-transaction row operations used by the exchange. Methods are organized
//! across submodules by aggregate:
//! - `balances.rs` - Balance rows and the journal
//! - `orders.rs` - Order rows
//! - `deals.rs` - Deal rows
//! - `messages.rs` - Deal chat messages
//!
//! Functions that take `&mut SqliteConnection` are meant to run inside a
//! transaction opened with [`Repository::begin`]. Every mutating unit starts
//! with one of the `lock_*` functions, which writes to the target row before
//! anything is read so the unit holds the write lock for its whole duration.

pub mod balances;
pub mod deals;
pub mod messages;
pub mod orders;

use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{Row, Sqlite, Transaction};
use std::str::FromStr;

/// Repository for database operations.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Open a storage transaction. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }
}

/// Read a TEXT column and parse it with `FromStr`.
///
/// Money and enum columns are stored as canonical strings; a value that does
/// not parse is a decode error, never a silent default.
pub(crate) fn parsed<T: FromStr>(row: &SqliteRow, column: &str) -> Result<T, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    raw.parse::<T>().map_err(|_| {
        sqlx::Error::Decode(format!("column {} holds unreadable value {:?}", column, raw).into())
    })
}
