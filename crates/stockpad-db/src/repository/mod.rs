//! # Repository Module
//!
//! One repository per table family, each holding a cloned `SqlitePool`.
//!
//! ```text
//! Database
//! ├── products()         → ProductRepository       catalog, FTS search, stock
//! ├── categories()       → CategoryRepository      category CRUD
//! ├── invoices()         → InvoiceRepository       transactional invoice writes
//! ├── sales_summaries()  → SalesSummaryRepository  daily accumulator, rankings
//! └── sync_outbox()      → SyncOutboxRepository    pending remote changes
//! ```
//!
//! Statements that must join a caller's transaction (stock movement, summary
//! accumulation, outbox queueing) are free functions generic over
//! `sqlx::Executor`, so they run against either the pool or `&mut *tx`.
//!
//! Write transactions open with `BEGIN IMMEDIATE`: they take the write lock
//! up front, so a read-then-write body waits on the busy timeout instead of
//! failing with `SQLITE_BUSY` when another connection commits first.

pub mod category;
pub mod invoice;
pub mod product;
pub mod sales_summary;
pub mod sync;

use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::error::{DbError, DbResult};

/// Starts a transaction that holds the database write lock from its first
/// statement.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

pub(crate) async fn commit(tx: Transaction<'static, Sqlite>) -> DbResult<()> {
    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

/// `LIMIT` value for an optional limit; SQLite treats a negative limit as
/// unbounded.
pub(crate) fn sql_limit(limit: Option<u32>) -> i64 {
    limit.map(i64::from).unwrap_or(-1)
}
