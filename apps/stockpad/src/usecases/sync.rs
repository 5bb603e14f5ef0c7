//! # Outbox Push
//!
//! Drains the sync outbox into the remote API, one batch per call.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  PushPendingChanges::execute()                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  count_exhausted(max_attempts) ──► skipped (left for inspection)        │
//! │       │                                                                 │
//! │  get_retryable(batch_size, max_attempts)                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  remote.push(entry)                                                     │
//! │       ├── Ok  ──► mark_synced (+ invoices.is_synced for invoices)       │
//! │       └── Err ──► mark_failed(attempts += 1, last_error)                │
//! │                                                                         │
//! │  cleanup: synced entries older than 30 days are deleted                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::error::ApiResult;
use stockpad_core::SyncOutboxEntry;
use stockpad_db::{Database, DbError, INVOICE_ENTITY};

/// Synced outbox entries are kept this long before cleanup.
const SYNCED_RETENTION_DAYS: u32 = 30;

/// Why the remote did not take an entry.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// Network or server trouble; worth retrying.
    #[error("Remote unreachable: {0}")]
    Unavailable(String),

    /// The remote refused the payload.
    #[error("Remote rejected entry: {0}")]
    Rejected(String),
}

/// The remote end of synchronization. The HTTP client lives in the shell.
#[async_trait]
pub trait RemoteSync: Send + Sync {
    /// Delivers one outbox entry.
    async fn push(&self, entry: &SyncOutboxEntry) -> Result<(), RemoteError>;
}

/// Outcome of one push round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushReport {
    pub pushed: usize,
    pub failed: usize,
    /// Unsynced entries at the attempt limit, not sent.
    pub skipped: usize,
}

/// Pushes one batch of pending changes.
#[derive(Debug, Clone)]
pub struct PushPendingChanges<R> {
    db: Database,
    remote: R,
    batch_size: u32,
    max_attempts: i64,
}

impl<R: RemoteSync> PushPendingChanges<R> {
    pub fn new(db: Database, remote: R, batch_size: u32, max_attempts: i64) -> Self {
        PushPendingChanges {
            db,
            remote,
            batch_size,
            max_attempts,
        }
    }

    pub async fn execute(&self) -> ApiResult<PushReport> {
        let outbox = self.db.sync_outbox();

        let mut report = PushReport::default();
        let exhausted = outbox.count_exhausted(self.max_attempts).await?;
        if exhausted > 0 {
            warn!(
                count = exhausted,
                max_attempts = self.max_attempts,
                "Outbox entries exceeded max retry attempts"
            );
        }
        report.skipped = usize::try_from(exhausted).unwrap_or_default();

        let entries = outbox
            .get_retryable(self.batch_size, self.max_attempts)
            .await?;
        if entries.is_empty() {
            return Ok(report);
        }

        for entry in &entries {
            match self.remote.push(entry).await {
                Ok(()) => {
                    outbox.mark_synced(&entry.id).await?;
                    if entry.entity_type == INVOICE_ENTITY {
                        self.flag_invoice_synced(&entry.entity_id).await?;
                    }
                    report.pushed += 1;
                }
                Err(e) => {
                    if let RemoteError::Rejected(reason) = &e {
                        warn!(id = %entry.id, reason = %reason, "Remote rejected outbox entry");
                    }
                    outbox.mark_failed(&entry.id, &e.to_string()).await?;
                    report.failed += 1;
                }
            }
        }

        match outbox.cleanup_old_entries(SYNCED_RETENTION_DAYS).await {
            Ok(0) => {}
            Ok(n) => info!(deleted = n, "Cleaned up synced outbox entries"),
            Err(e) => error!(?e, "Outbox cleanup failed"),
        }

        info!(
            pushed = report.pushed,
            failed = report.failed,
            skipped = report.skipped,
            "Outbox push complete"
        );
        Ok(report)
    }

    /// The invoice may have been deleted since it was queued.
    async fn flag_invoice_synced(&self, invoice_id: &str) -> ApiResult<()> {
        match self.db.invoices().mark_synced(invoice_id).await {
            Ok(()) | Err(DbError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::test_support::{memory_db, stocked};
    use chrono::Utc;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use stockpad_core::InvoiceDraft;

    /// Accepts everything except the listed entity ids.
    #[derive(Default)]
    struct FakeRemote {
        refuse: HashSet<String>,
        received: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl RemoteSync for FakeRemote {
        async fn push(&self, entry: &SyncOutboxEntry) -> Result<(), RemoteError> {
            if self.refuse.contains(&entry.entity_id) {
                return Err(RemoteError::Unavailable("HTTP 503".into()));
            }
            self.received.lock().unwrap().push(entry.entity_id.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_push_marks_invoice_synced() {
        let db = memory_db().await;
        let milk = stocked(&db, "Milk", 129, 90, 10).await;
        let sale = db
            .invoices()
            .create(&InvoiceDraft::sale(Utc::now()).with_line(&milk.id, 1))
            .await
            .unwrap();

        let push = PushPendingChanges::new(db.clone(), FakeRemote::default(), 10, 3);
        let report = push.execute().await.unwrap();

        // The product insert and the sale
        assert_eq!(report, PushReport { pushed: 2, failed: 0, skipped: 0 });
        assert_eq!(db.sync_outbox().count_pending().await.unwrap(), 0);

        let invoice = db.invoices().get_by_id(&sale.invoice.id).await.unwrap().unwrap();
        assert!(invoice.is_synced);

        let received = push.remote.received.lock().unwrap().clone();
        assert_eq!(received.len(), 2);
        assert!(received.contains(&milk.id));
        assert!(received.contains(&sale.invoice.id));
    }

    #[tokio::test]
    async fn test_failures_count_until_skipped() {
        let db = memory_db().await;
        db.sync_outbox().queue_for_sync("product", "bad", "{}").await.unwrap();
        db.sync_outbox().queue_for_sync("product", "good", "{}").await.unwrap();

        let remote = FakeRemote {
            refuse: ["bad".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let push = PushPendingChanges::new(db.clone(), remote, 10, 2);

        let first = push.execute().await.unwrap();
        assert_eq!(first, PushReport { pushed: 1, failed: 1, skipped: 0 });

        let second = push.execute().await.unwrap();
        assert_eq!(second, PushReport { pushed: 0, failed: 1, skipped: 0 });

        let third = push.execute().await.unwrap();
        assert_eq!(third, PushReport { pushed: 0, failed: 0, skipped: 1 });

        let pending = db.sync_outbox().get_pending(10).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].attempts, 2);
        assert_eq!(pending[0].last_error.as_deref(), Some("Remote unreachable: HTTP 503"));
    }

    #[tokio::test]
    async fn test_deleted_invoice_still_drains() {
        let db = memory_db().await;
        let milk = stocked(&db, "Milk", 129, 90, 10).await;
        let sale = db
            .invoices()
            .create(&InvoiceDraft::sale(Utc::now()).with_line(&milk.id, 1))
            .await
            .unwrap();
        db.invoices().delete(&sale.invoice.id).await.unwrap();

        let push = PushPendingChanges::new(db.clone(), FakeRemote::default(), 10, 3);
        let report = push.execute().await.unwrap();

        assert_eq!(report.pushed, 3);
        assert_eq!(db.sync_outbox().count_pending().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_exhausted_entries_do_not_block_newer_ones() {
        let db = memory_db().await;
        db.sync_outbox().queue_for_sync("product", "bad", "{}").await.unwrap();
        db.sync_outbox().queue_for_sync("product", "good", "{}").await.unwrap();

        let remote = FakeRemote {
            refuse: ["bad".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let push = PushPendingChanges::new(db.clone(), remote, 1, 1);

        let first = push.execute().await.unwrap();
        assert_eq!(first, PushReport { pushed: 0, failed: 1, skipped: 0 });

        let second = push.execute().await.unwrap();
        assert_eq!(second, PushReport { pushed: 1, failed: 0, skipped: 1 });

        assert_eq!(*push.remote.received.lock().unwrap(), vec!["good".to_string()]);
        assert_eq!(db.sync_outbox().count_pending().await.unwrap(), 1);
    }
}
