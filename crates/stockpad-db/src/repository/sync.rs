//! # Sync Outbox Repository
//!
//! Queue of local changes waiting to be pushed to the remote API.
//!
//! ## The Outbox Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Outbox Pattern Implementation                        │
//! │                                                                         │
//! │  LOCAL OPERATION (create_invoice)                                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │  1. INSERT INTO invoices / invoice_lines                        │   │
//! │  │  2. UPDATE products (stock), upsert product_sales_summary       │   │
//! │  │  3. INSERT INTO sync_outbox ('invoice', id, <invoice JSON>)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← all or nothing                                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  PushPendingChanges (stockpad-app)                                     │
//! │  ├── get_retryable(batch, max_attempts)                                │
//! │  ├── success → mark_synced                                             │
//! │  └── failure → mark_failed (attempts += 1, last_error)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use stockpad_core::SyncOutboxEntry;

const OUTBOX_COLUMNS: &str =
    "id, entity_type, entity_id, payload, attempts, last_error, created_at, attempted_at, synced_at";

/// Queues a payload through any executor, so it can share the transaction
/// of the change it describes.
pub(crate) async fn queue_entry<'e, E>(
    executor: E,
    entity_type: &str,
    entity_id: &str,
    payload: &str,
    now: DateTime<Utc>,
) -> DbResult<SyncOutboxEntry>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(entity_type = %entity_type, entity_id = %entity_id, "Queuing for sync");

    let entry = SyncOutboxEntry {
        id: Uuid::new_v4().to_string(),
        entity_type: entity_type.to_string(),
        entity_id: entity_id.to_string(),
        payload: payload.to_string(),
        attempts: 0,
        last_error: None,
        created_at: now,
        attempted_at: None,
        synced_at: None,
    };

    sqlx::query(
        r#"
        INSERT INTO sync_outbox (
            id, entity_type, entity_id, payload,
            attempts, last_error, created_at, attempted_at, synced_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        "#,
    )
    .bind(&entry.id)
    .bind(&entry.entity_type)
    .bind(&entry.entity_id)
    .bind(&entry.payload)
    .bind(entry.attempts)
    .bind(&entry.last_error)
    .bind(entry.created_at)
    .bind(entry.attempted_at)
    .bind(entry.synced_at)
    .execute(executor)
    .await?;

    Ok(entry)
}

/// Repository for sync outbox operations.
#[derive(Debug, Clone)]
pub struct SyncOutboxRepository {
    pool: SqlitePool,
}

impl SyncOutboxRepository {
    /// Creates a new SyncOutboxRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SyncOutboxRepository { pool }
    }

    /// Queues an entity for synchronization.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let payload = serde_json::to_string(&product)?;
    /// repo.queue_for_sync("product", &product.id, &payload).await?;
    /// ```
    pub async fn queue_for_sync(
        &self,
        entity_type: &str,
        entity_id: &str,
        payload: &str,
    ) -> DbResult<SyncOutboxEntry> {
        queue_entry(&self.pool, entity_type, entity_id, payload, Utc::now()).await
    }

    /// Unsynced entries, oldest first.
    pub async fn get_pending(&self, limit: u32) -> DbResult<Vec<SyncOutboxEntry>> {
        let sql = format!(
            r#"
            SELECT {OUTBOX_COLUMNS} FROM sync_outbox
            WHERE synced_at IS NULL
            ORDER BY created_at ASC, id ASC
            LIMIT ?1
            "#
        );

        let entries = sqlx::query_as::<_, SyncOutboxEntry>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Unsynced entries still under `max_attempts`, oldest first.
    ///
    /// Entries that used up their attempts stay in the table but never take
    /// a slot in the batch.
    pub async fn get_retryable(&self, limit: u32, max_attempts: i64) -> DbResult<Vec<SyncOutboxEntry>> {
        let sql = format!(
            r#"
            SELECT {OUTBOX_COLUMNS} FROM sync_outbox
            WHERE synced_at IS NULL AND attempts < ?2
            ORDER BY created_at ASC, id ASC
            LIMIT ?1
            "#
        );

        let entries = sqlx::query_as::<_, SyncOutboxEntry>(&sql)
            .bind(limit)
            .bind(max_attempts)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Counts unsynced entries that reached `max_attempts`.
    pub async fn count_exhausted(&self, max_attempts: i64) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sync_outbox WHERE synced_at IS NULL AND attempts >= ?1",
        )
        .bind(max_attempts)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Marks an entry as successfully synced.
    pub async fn mark_synced(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE sync_outbox SET synced_at = ?2, attempted_at = ?2 WHERE id = ?1",
        )
        .bind(id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SyncOutboxEntry", id));
        }

        Ok(())
    }

    /// Records a failed push attempt.
    pub async fn mark_failed(&self, id: &str, error: &str) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE sync_outbox SET
                attempts = attempts + 1,
                last_error = ?2,
                attempted_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(error)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SyncOutboxEntry", id));
        }

        Ok(())
    }

    /// Counts pending sync entries.
    pub async fn count_pending(&self) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sync_outbox WHERE synced_at IS NULL")
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    /// Deletes entries synced more than `days_old` days ago.
    ///
    /// ## Returns
    /// Number of deleted entries.
    pub async fn cleanup_old_entries(&self, days_old: u32) -> DbResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(days_old));

        let result = sqlx::query(
            "DELETE FROM sync_outbox WHERE synced_at IS NOT NULL AND synced_at < ?1",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;

        debug!(deleted = result.rows_affected(), "Cleaned up synced outbox entries");
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::memory_db;

    #[tokio::test]
    async fn test_queue_and_drain() {
        let db = memory_db().await;
        let repo = db.sync_outbox();

        let first = repo.queue_for_sync("product", "p-1", "{}").await.unwrap();
        repo.queue_for_sync("product", "p-2", "{}").await.unwrap();
        assert_eq!(repo.count_pending().await.unwrap(), 2);

        let pending = repo.get_pending(10).await.unwrap();
        assert_eq!(pending[0].entity_id, "p-1");

        repo.mark_synced(&first.id).await.unwrap();
        assert_eq!(repo.count_pending().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_failed_counts_attempts() {
        let db = memory_db().await;
        let repo = db.sync_outbox();
        let entry = repo.queue_for_sync("invoice", "i-1", "{}").await.unwrap();

        repo.mark_failed(&entry.id, "timeout").await.unwrap();
        repo.mark_failed(&entry.id, "HTTP 503").await.unwrap();

        let pending = repo.get_pending(10).await.unwrap();
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("HTTP 503"));
        assert!(pending[0].attempted_at.is_some());

        assert!(matches!(
            repo.mark_failed("nope", "x").await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_exhausted_entries_leave_the_batch() {
        let db = memory_db().await;
        let repo = db.sync_outbox();
        let stuck = repo.queue_for_sync("product", "p-1", "{}").await.unwrap();
        repo.queue_for_sync("product", "p-2", "{}").await.unwrap();

        repo.mark_failed(&stuck.id, "HTTP 500").await.unwrap();

        let batch = repo.get_retryable(1, 1).await.unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].entity_id, "p-2");

        assert_eq!(repo.count_exhausted(1).await.unwrap(), 1);
        assert_eq!(repo.count_exhausted(2).await.unwrap(), 0);
        assert_eq!(repo.get_retryable(10, 2).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_cleanup_keeps_recent_and_pending() {
        let db = memory_db().await;
        let repo = db.sync_outbox();
        let old = repo.queue_for_sync("product", "p-1", "{}").await.unwrap();
        let recent = repo.queue_for_sync("product", "p-2", "{}").await.unwrap();
        repo.queue_for_sync("product", "p-3", "{}").await.unwrap();

        repo.mark_synced(&recent.id).await.unwrap();
        sqlx::query("UPDATE sync_outbox SET synced_at = ?2 WHERE id = ?1")
            .bind(&old.id)
            .bind(Utc::now() - Duration::days(40))
            .execute(db.pool())
            .await
            .unwrap();

        assert_eq!(repo.cleanup_old_entries(30).await.unwrap(), 1);
        assert_eq!(repo.count_pending().await.unwrap(), 1);
    }
}
