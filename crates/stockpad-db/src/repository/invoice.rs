//! # Invoice Repository
//!
//! Sale and purchase invoices. Every write that changes stock runs in one
//! transaction together with its side effects.
//!
//! ## Create Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(draft)                                                          │
//! │       │                                                                 │
//! │       ▼  draft.validate()                 (before BEGIN)                │
//! │  BEGIN IMMEDIATE ───────────────────────────────────────────────────┐   │
//! │  │  load each product, resolve_line()     price/cost frozen        │   │
//! │  │  InvoiceTotals::compute()                                        │   │
//! │  │  INSERT invoice, number = MAX(number)+1 for its type            │   │
//! │  │  INSERT invoice_lines                                            │   │
//! │  │  UPDATE products  stock ± qty (guarded ≥ 0), last_sold_at        │   │
//! │  │  UPSERT product_sales_summary            (sales only)            │   │
//! │  │  INSERT sync_outbox                                              │   │
//! │  COMMIT ────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cancelling (or deleting a live invoice) replays the same effects in
//! reverse: stock comes back and sale quantities leave the daily summary.
//! `last_sold_at` is not rewound.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::{fetch_product, move_stock};
use crate::repository::{begin_write, commit};
use crate::repository::sales_summary::{accumulate, deduct};
use crate::repository::sync::queue_entry;
use stockpad_core::invoice::resolve_line;
use stockpad_core::{
    day_of, CoreError, Invoice, InvoiceDraft, InvoiceLine, InvoiceStatus, InvoiceTotals,
    InvoiceType, Product,
};

/// Outbox entity type for invoice changes.
pub const INVOICE_ENTITY: &str = "invoice";

const INVOICE_COLUMNS: &str = r#"
    id, number, date, invoice_type, counterparty_id,
    total_amount_cents, total_profit_cents, discount_cents,
    status, is_synced, created_at, updated_at
"#;

const LINE_COLUMNS: &str =
    "invoice_id, product_id, quantity, price_cents, cost_cents, discount_cents";

/// An invoice together with its lines, as stored and as queued for sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceWithLines {
    pub invoice: Invoice,
    pub lines: Vec<InvoiceLine>,
}

// =============================================================================
// Executor-generic reads
// =============================================================================

async fn fetch_invoice<'e, E>(executor: E, id: &str) -> DbResult<Option<Invoice>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1");

    let invoice = sqlx::query_as::<_, Invoice>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(invoice)
}

async fn fetch_lines<'e, E>(executor: E, invoice_id: &str) -> DbResult<Vec<InvoiceLine>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "SELECT {LINE_COLUMNS} FROM invoice_lines WHERE invoice_id = ?1 ORDER BY rowid"
    );

    let lines = sqlx::query_as::<_, InvoiceLine>(&sql)
        .bind(invoice_id)
        .fetch_all(executor)
        .await?;

    Ok(lines)
}

fn insufficient(product: &Product, requested: i64) -> DbError {
    CoreError::InsufficientStock {
        product: product.name.clone(),
        available: product.stock_quantity,
        requested,
    }
    .into()
}

/// Undoes the stock and summary effects of a live invoice.
async fn reverse_effects(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
    lines: &[InvoiceLine],
    now: DateTime<Utc>,
) -> DbResult<()> {
    let day = day_of(invoice.date);

    for line in lines {
        let delta = -invoice.invoice_type.stock_sign() * line.quantity;

        if !move_stock(&mut *conn, &line.product_id, delta, None, now).await? {
            // A deleted product has nothing to restore; a live one means the
            // purchased units were already sold.
            match fetch_product(&mut *conn, &line.product_id).await? {
                Some(product) if !product.is_deleted => {
                    return Err(insufficient(&product, line.quantity));
                }
                _ => {}
            }
        }

        if invoice.invoice_type == InvoiceType::Sale {
            deduct(
                &mut *conn,
                &line.product_id,
                day,
                line.quantity,
                line.total().cents(),
                line.cost_total().cents(),
                now,
            )
            .await?;
        }
    }

    Ok(())
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for invoices and their lines.
#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    /// Creates a new InvoiceRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Creates an invoice and applies all of its effects atomically.
    ///
    /// ## Errors
    /// * `DbError::Rejected` - empty or invalid draft, unknown/deleted
    ///   product, insufficient stock for a sale line. Nothing is written.
    /// * store failures propagate; the transaction rolls back
    pub async fn create(&self, draft: &InvoiceDraft) -> DbResult<InvoiceWithLines> {
        draft.validate()?;

        let now = Utc::now();
        let invoice_id = Uuid::new_v4().to_string();
        let is_sale = draft.invoice_type == InvoiceType::Sale;

        debug!(
            invoice_id = %invoice_id,
            invoice_type = draft.invoice_type.as_str(),
            lines = draft.lines.len(),
            "Creating invoice"
        );

        let mut tx = begin_write(&self.pool).await?;

        let mut products = Vec::with_capacity(draft.lines.len());
        let mut lines = Vec::with_capacity(draft.lines.len());
        for line_draft in &draft.lines {
            let product = fetch_product(&mut *tx, &line_draft.product_id)
                .await?
                .ok_or_else(|| CoreError::ProductNotFound(line_draft.product_id.clone()))?;
            lines.push(resolve_line(&invoice_id, draft.invoice_type, line_draft, &product)?);
            products.push(product);
        }

        let totals = InvoiceTotals::compute(draft.invoice_type, &lines, draft.discount_cents)?;

        let number: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO invoices (
                id, number, date, invoice_type, counterparty_id,
                total_amount_cents, total_profit_cents, discount_cents,
                status, is_synced, created_at, updated_at
            ) VALUES (
                ?1,
                (SELECT COALESCE(MAX(number), 0) + 1 FROM invoices WHERE invoice_type = ?3),
                ?2, ?3, ?4,
                ?5, ?6, ?7,
                ?8, 0, ?9, ?9
            )
            RETURNING number
            "#,
        )
        .bind(&invoice_id)
        .bind(draft.date)
        .bind(draft.invoice_type)
        .bind(&draft.counterparty_id)
        .bind(totals.amount_cents)
        .bind(totals.profit_cents)
        .bind(totals.discount_cents)
        .bind(draft.status)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let day = day_of(draft.date);
        for (line, product) in lines.iter().zip(&products) {
            sqlx::query(
                r#"
                INSERT INTO invoice_lines (
                    invoice_id, product_id, quantity, price_cents, cost_cents, discount_cents
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(&line.invoice_id)
            .bind(&line.product_id)
            .bind(line.quantity)
            .bind(line.price_cents)
            .bind(line.cost_cents)
            .bind(line.discount_cents)
            .execute(&mut *tx)
            .await?;

            let delta = draft.invoice_type.stock_sign() * line.quantity;
            let sold_at = is_sale.then_some(draft.date);
            if !move_stock(&mut *tx, &line.product_id, delta, sold_at, now).await? {
                return Err(insufficient(product, line.quantity));
            }

            if is_sale {
                accumulate(
                    &mut *tx,
                    &line.product_id,
                    day,
                    line.quantity,
                    line.total().cents(),
                    line.cost_total().cents(),
                    now,
                )
                .await?;
            }
        }

        let invoice = Invoice {
            id: invoice_id,
            number,
            date: draft.date,
            invoice_type: draft.invoice_type,
            counterparty_id: draft.counterparty_id.clone(),
            total_amount_cents: totals.amount_cents,
            total_profit_cents: totals.profit_cents,
            discount_cents: totals.discount_cents,
            status: draft.status,
            is_synced: false,
            created_at: now,
            updated_at: now,
        };
        let stored = InvoiceWithLines { invoice, lines };

        let payload = serde_json::to_string(&stored)?;
        queue_entry(&mut *tx, INVOICE_ENTITY, &stored.invoice.id, &payload, now).await?;

        commit(tx).await?;

        info!(
            invoice_id = %stored.invoice.id,
            number = stored.invoice.number,
            invoice_type = stored.invoice.invoice_type.as_str(),
            amount_cents = stored.invoice.total_amount_cents,
            "Invoice created"
        );

        Ok(stored)
    }

    /// Gets an invoice header by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Invoice>> {
        fetch_invoice(&self.pool, id).await
    }

    /// Lines of an invoice in entry order.
    pub async fn get_lines(&self, invoice_id: &str) -> DbResult<Vec<InvoiceLine>> {
        fetch_lines(&self.pool, invoice_id).await
    }

    /// Invoice header plus lines.
    pub async fn get_with_lines(&self, id: &str) -> DbResult<Option<InvoiceWithLines>> {
        let Some(invoice) = self.get_by_id(id).await? else {
            return Ok(None);
        };
        let lines = self.get_lines(id).await?;
        Ok(Some(InvoiceWithLines { invoice, lines }))
    }

    /// Invoices dated within `[start, end]`, newest first, optionally of
    /// one type.
    pub async fn list_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        invoice_type: Option<InvoiceType>,
    ) -> DbResult<Vec<Invoice>> {
        stockpad_core::validation::validate_range("date", &start, &end)?;

        let sql = format!(
            r#"
            SELECT {INVOICE_COLUMNS} FROM invoices
            WHERE date >= ?1 AND date <= ?2
              AND (?3 IS NULL OR invoice_type = ?3)
            ORDER BY date DESC, number DESC
            "#
        );

        let invoices = sqlx::query_as::<_, Invoice>(&sql)
            .bind(start)
            .bind(end)
            .bind(invoice_type)
            .fetch_all(&self.pool)
            .await?;

        Ok(invoices)
    }

    /// Cancels an invoice: stock is restored and sale quantities leave the
    /// daily summaries.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - no such invoice
    /// * `DbError::Rejected(InvalidInvoiceStatus)` - already cancelled
    /// * `DbError::Rejected(InsufficientStock)` - a purchase whose units
    ///   have since been sold
    pub async fn cancel(&self, id: &str) -> DbResult<Invoice> {
        debug!(invoice_id = %id, "Cancelling invoice");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let mut invoice = fetch_invoice(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))?;

        if invoice.status == InvoiceStatus::Cancelled {
            return Err(CoreError::InvalidInvoiceStatus {
                invoice_id: id.to_string(),
                current_status: invoice.status.as_str().to_string(),
            }
            .into());
        }

        let lines = fetch_lines(&mut *tx, id).await?;
        reverse_effects(&mut tx, &invoice, &lines, now).await?;

        sqlx::query(
            "UPDATE invoices SET status = ?2, is_synced = 0, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(InvoiceStatus::Cancelled)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        invoice.status = InvoiceStatus::Cancelled;
        invoice.is_synced = false;
        invoice.updated_at = now;

        let payload = serde_json::to_string(&InvoiceWithLines {
            invoice: invoice.clone(),
            lines,
        })?;
        queue_entry(&mut *tx, INVOICE_ENTITY, id, &payload, now).await?;

        commit(tx).await?;

        info!(invoice_id = %id, number = invoice.number, "Invoice cancelled");
        Ok(invoice)
    }

    /// Hard-deletes an invoice; its lines go with it.
    ///
    /// A live invoice has its effects reversed first, exactly as
    /// [`InvoiceRepository::cancel`] does. A cancelled one is simply removed.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(invoice_id = %id, "Deleting invoice");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let invoice = fetch_invoice(&mut *tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Invoice", id))?;

        if invoice.status != InvoiceStatus::Cancelled {
            let lines = fetch_lines(&mut *tx, id).await?;
            reverse_effects(&mut tx, &invoice, &lines, now).await?;
        }

        sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let payload = serde_json::json!({ "id": id, "deleted": true }).to_string();
        queue_entry(&mut *tx, INVOICE_ENTITY, id, &payload, now).await?;

        commit(tx).await?;

        info!(invoice_id = %id, number = invoice.number, "Invoice deleted");
        Ok(())
    }

    /// Flags an invoice as pushed to the remote API.
    pub async fn mark_synced(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE invoices SET is_synced = 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::test_support::{memory_db, seeded_product};
    use chrono::TimeZone;
    use stockpad_core::InvoiceLineDraft;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    async fn stock_of(db: &Database, id: &str) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().stock_quantity
    }

    async fn count(db: &Database, table: &str) -> i64 {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    async fn queued_invoices(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sync_outbox WHERE entity_type = ?1")
            .bind(INVOICE_ENTITY)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sale_moves_stock_and_feeds_summary() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 10).await;
        let bread = seeded_product(&db, "Bread", 4).await;

        let draft = InvoiceDraft::sale(at(5, 14))
            .with_line(&milk.id, 3)
            .with_line(&bread.id, 1);
        let created = db.invoices().create(&draft).await.unwrap();

        assert_eq!(created.invoice.number, 1);
        assert_eq!(created.lines.len(), 2);
        assert_eq!(created.invoice.total_amount_cents, 2000);
        assert_eq!(created.invoice.total_profit_cents, 800);

        assert_eq!(stock_of(&db, &milk.id).await, 7);
        assert_eq!(stock_of(&db, &bread.id).await, 3);

        let stored = db.products().get_by_id(&milk.id).await.unwrap().unwrap();
        assert_eq!(stored.last_sold_at, Some(at(5, 14)));

        let summary = db
            .sales_summaries()
            .get(&milk.id, day_of(at(5, 14)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.total_sold, 3);
        assert_eq!(summary.total_revenue_cents, 1500);
        assert_eq!(summary.total_cost_cents, 900);

        assert_eq!(queued_invoices(&db).await, 1);
    }

    #[tokio::test]
    async fn test_numbers_are_sequential_per_type() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 10).await;
        let repo = db.invoices();

        let s1 = repo.create(&InvoiceDraft::sale(at(1, 9)).with_line(&milk.id, 1)).await.unwrap();
        let p1 = repo.create(&InvoiceDraft::purchase(at(1, 10)).with_line(&milk.id, 5)).await.unwrap();
        let s2 = repo.create(&InvoiceDraft::sale(at(1, 11)).with_line(&milk.id, 1)).await.unwrap();

        assert_eq!(s1.invoice.number, 1);
        assert_eq!(p1.invoice.number, 1);
        assert_eq!(s2.invoice.number, 2);
    }

    #[tokio::test]
    async fn test_purchase_adds_stock_without_summary() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 0).await;

        let mut line = InvoiceLineDraft::new(&milk.id, 24);
        line.price_cents = Some(250);
        let mut draft = InvoiceDraft::purchase(at(2, 8));
        draft.lines.push(line);

        let created = db.invoices().create(&draft).await.unwrap();
        assert_eq!(created.invoice.total_amount_cents, 6000);
        assert_eq!(created.invoice.total_profit_cents, 0);
        assert_eq!(stock_of(&db, &milk.id).await, 24);
        assert_eq!(count(&db, "product_sales_summary").await, 0);

        let stored = db.products().get_by_id(&milk.id).await.unwrap().unwrap();
        assert!(stored.last_sold_at.is_none());
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 10).await;
        let bread = seeded_product(&db, "Bread", 1).await;

        let draft = InvoiceDraft::sale(at(5, 9))
            .with_line(&milk.id, 2)
            .with_line(&bread.id, 5);
        let err = db.invoices().create(&draft).await.unwrap_err();

        assert!(matches!(
            err,
            DbError::Rejected(CoreError::InsufficientStock { available: 1, requested: 5, .. })
        ));
        assert_eq!(stock_of(&db, &milk.id).await, 10);
        assert_eq!(count(&db, "invoices").await, 0);
        assert_eq!(count(&db, "invoice_lines").await, 0);
        assert_eq!(count(&db, "product_sales_summary").await, 0);
        assert_eq!(queued_invoices(&db).await, 0);
    }

    #[tokio::test]
    async fn test_oversized_price_override_writes_nothing() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 10).await;

        let mut line = InvoiceLineDraft::new(&milk.id, 2);
        line.price_cents = Some(i64::MAX / 2 + 1);
        let mut draft = InvoiceDraft::sale(at(5, 9));
        draft.lines.push(line);

        let err = db.invoices().create(&draft).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));
        assert_eq!(stock_of(&db, &milk.id).await, 10);
        assert_eq!(count(&db, "invoices").await, 0);
        assert_eq!(queued_invoices(&db).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_or_deleted_product_rejected() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 10).await;
        db.products().soft_delete(&milk.id).await.unwrap();

        let err = db
            .invoices()
            .create(&InvoiceDraft::sale(at(5, 9)).with_line("ghost", 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::ProductNotFound(_))));

        let err = db
            .invoices()
            .create(&InvoiceDraft::sale(at(5, 9)).with_line(&milk.id, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_draft_rejected() {
        let db = memory_db().await;
        let err = db.invoices().create(&InvoiceDraft::sale(at(5, 9))).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::EmptyInvoice)));
    }

    #[tokio::test]
    async fn test_cancel_restores_stock_and_summary() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 10).await;
        let repo = db.invoices();

        repo.create(&InvoiceDraft::sale(at(5, 9)).with_line(&milk.id, 2)).await.unwrap();
        let second = repo.create(&InvoiceDraft::sale(at(5, 10)).with_line(&milk.id, 3)).await.unwrap();

        let cancelled = repo.cancel(&second.invoice.id).await.unwrap();
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);
        assert_eq!(stock_of(&db, &milk.id).await, 8);

        let summary = db
            .sales_summaries()
            .get(&milk.id, day_of(at(5, 9)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.total_sold, 2);
        assert_eq!(summary.total_revenue_cents, 1000);

        let err = repo.cancel(&second.invoice.id).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::InvalidInvoiceStatus { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancel_purchase_after_units_sold_is_rejected() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 0).await;
        let repo = db.invoices();

        let purchase = repo
            .create(&InvoiceDraft::purchase(at(1, 9)).with_line(&milk.id, 5))
            .await
            .unwrap();
        repo.create(&InvoiceDraft::sale(at(2, 9)).with_line(&milk.id, 4)).await.unwrap();

        let err = repo.cancel(&purchase.invoice.id).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::InsufficientStock { .. })));
        assert_eq!(stock_of(&db, &milk.id).await, 1);
    }

    #[tokio::test]
    async fn test_delete_cascades_lines_and_reverses_once() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 10).await;
        let repo = db.invoices();

        let live = repo.create(&InvoiceDraft::sale(at(5, 9)).with_line(&milk.id, 2)).await.unwrap();
        let gone = repo.create(&InvoiceDraft::sale(at(5, 10)).with_line(&milk.id, 3)).await.unwrap();

        repo.delete(&live.invoice.id).await.unwrap();
        assert_eq!(stock_of(&db, &milk.id).await, 7);
        assert!(repo.get_by_id(&live.invoice.id).await.unwrap().is_none());
        assert!(repo.get_lines(&live.invoice.id).await.unwrap().is_empty());

        repo.cancel(&gone.invoice.id).await.unwrap();
        repo.delete(&gone.invoice.id).await.unwrap();
        assert_eq!(stock_of(&db, &milk.id).await, 10);
        assert_eq!(count(&db, "invoice_lines").await, 0);

        assert!(matches!(repo.delete("missing").await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_products_with_lines_cannot_be_hard_deleted() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 10).await;
        db.invoices()
            .create(&InvoiceDraft::purchase(at(1, 9)).with_line(&milk.id, 1))
            .await
            .unwrap();

        let err: DbError = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(&milk.id)
            .execute(db.pool())
            .await
            .unwrap_err()
            .into();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_list_between_filters_dates_and_type() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 10).await;
        let repo = db.invoices();

        repo.create(&InvoiceDraft::sale(at(1, 9)).with_line(&milk.id, 1)).await.unwrap();
        repo.create(&InvoiceDraft::sale(at(3, 9)).with_line(&milk.id, 1)).await.unwrap();
        repo.create(&InvoiceDraft::purchase(at(3, 12)).with_line(&milk.id, 1)).await.unwrap();
        repo.create(&InvoiceDraft::sale(at(9, 9)).with_line(&milk.id, 1)).await.unwrap();

        let all = repo.list_between(at(1, 0), at(3, 23), None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].date, at(3, 12));

        let sales = repo
            .list_between(at(1, 0), at(3, 23), Some(InvoiceType::Sale))
            .await
            .unwrap();
        assert_eq!(sales.len(), 2);
        assert!(sales.iter().all(|i| i.invoice_type == InvoiceType::Sale));

        let inclusive = repo
            .list_between(at(1, 9), at(1, 9), None)
            .await
            .unwrap();
        assert_eq!(inclusive.len(), 1);
    }

    #[tokio::test]
    async fn test_get_with_lines_and_mark_synced() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 10).await;
        let repo = db.invoices();

        let created = repo.create(&InvoiceDraft::sale(at(4, 9)).with_line(&milk.id, 2)).await.unwrap();
        let loaded = repo.get_with_lines(&created.invoice.id).await.unwrap().unwrap();
        assert_eq!(loaded, created);

        repo.mark_synced(&created.invoice.id).await.unwrap();
        assert!(repo.get_by_id(&created.invoice.id).await.unwrap().unwrap().is_synced);
        assert!(repo.get_with_lines("missing").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_of_one_product() {
        let path = std::env::temp_dir().join(format!("stockpad-{}.db", Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(5))
            .await
            .unwrap();
        let milk = seeded_product(&db, "Milk", 100).await;

        let mut handles = Vec::new();
        for hour in 0..20 {
            let repo = db.invoices();
            let draft = InvoiceDraft::sale(at(5, hour)).with_line(&milk.id, 1);
            handles.push(tokio::spawn(async move { repo.create(&draft).await }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().invoice.number);
        }
        numbers.sort_unstable();

        assert_eq!(numbers, (1..=20).collect::<Vec<i64>>());
        assert_eq!(stock_of(&db, &milk.id).await, 80);

        let summary = db
            .sales_summaries()
            .get(&milk.id, day_of(at(5, 0)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.total_sold, 20);
        assert_eq!(queued_invoices(&db).await, 20);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }
}
