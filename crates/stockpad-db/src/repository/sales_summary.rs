//! # Sales Summary Repository
//!
//! Daily per-product sales totals: the accumulator that every completed sale
//! line feeds, and the ranking queries the analytics screens read.
//!
//! ## Accumulation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                 One statement, no read-modify-write                     │
//! │                                                                         │
//! │  record_sale("milk", 2024-03-05, qty 2, rev 1000, cost 600)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT INTO product_sales_summary VALUES (...)                        │
//! │  ON CONFLICT(product_id, date) DO UPDATE SET                           │
//! │      total_sold          = total_sold + excluded.total_sold,           │
//! │      total_revenue_cents = total_revenue_cents + excluded...,          │
//! │      total_cost_cents    = total_cost_cents + excluded...,             │
//! │      updated_at          = excluded.updated_at                         │
//! │  RETURNING *                                                           │
//! │                                                                         │
//! │  Two terminals selling milk at the same moment:                        │
//! │    A: +2 ──┐                                                           │
//! │    B: +3 ──┴──► SQLite serializes the writes ──► total_sold = 5        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rankings
//! - `top_*_between` return raw (product, day) rows.
//! - `top_*_products_between` roll the range up to one row per product.
//!
//! Ties are broken by `product_id ASC` (then `date ASC` for raw rows) so the
//! same data always ranks the same way.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::sql_limit;
use stockpad_core::validation::{validate_range, validate_sale_amounts};
use stockpad_core::{
    ProductSalesRanking, ProductSalesSummary, RankingMetric, SalesTotals, ValidationError,
};

const SUMMARY_COLUMNS: &str =
    "product_id, date, total_sold, total_revenue_cents, total_cost_cents, updated_at";

// =============================================================================
// Transaction-friendly statements
// =============================================================================

/// Adds one sale into the `(product_id, date)` row, creating it if absent.
///
/// Runs against the pool or inside a caller's transaction. Amounts must
/// already be validated (non-negative).
///
/// The update only applies when none of the three totals would pass
/// `i64::MAX`; otherwise nothing is written and the call is rejected.
pub(crate) async fn accumulate<'e, E>(
    executor: E,
    product_id: &str,
    date: NaiveDate,
    quantity: i64,
    revenue_cents: i64,
    cost_cents: i64,
    now: DateTime<Utc>,
) -> DbResult<ProductSalesSummary>
where
    E: Executor<'e, Database = Sqlite>,
{
    let summary = sqlx::query_as::<_, ProductSalesSummary>(
        r#"
        INSERT INTO product_sales_summary (
            product_id, date, total_sold, total_revenue_cents, total_cost_cents, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(product_id, date) DO UPDATE SET
            total_sold = total_sold + excluded.total_sold,
            total_revenue_cents = total_revenue_cents + excluded.total_revenue_cents,
            total_cost_cents = total_cost_cents + excluded.total_cost_cents,
            updated_at = excluded.updated_at
        WHERE product_sales_summary.total_sold
                  <= 9223372036854775807 - excluded.total_sold
          AND product_sales_summary.total_revenue_cents
                  <= 9223372036854775807 - excluded.total_revenue_cents
          AND product_sales_summary.total_cost_cents
                  <= 9223372036854775807 - excluded.total_cost_cents
        RETURNING product_id, date, total_sold, total_revenue_cents, total_cost_cents, updated_at
        "#,
    )
    .bind(product_id)
    .bind(date)
    .bind(quantity)
    .bind(revenue_cents)
    .bind(cost_cents)
    .bind(now)
    .fetch_optional(executor)
    .await?;

    // No row back means the guard skipped the update
    summary.ok_or_else(|| {
        ValidationError::OutOfRange {
            field: "daily sales total".to_string(),
            min: 0,
            max: i64::MAX,
        }
        .into()
    })
}

/// Takes a cancelled sale back out of its day row. A missing row is left
/// alone.
///
/// The three totals move as a unit. When the row holds less than the
/// reversal on any of them (only possible after a manual
/// [`SalesSummaryRepository::replace`]), the whole row drops to zero instead
/// of clamping each column separately.
pub(crate) async fn deduct<'e, E>(
    executor: E,
    product_id: &str,
    date: NaiveDate,
    quantity: i64,
    revenue_cents: i64,
    cost_cents: i64,
    now: DateTime<Utc>,
) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        r#"
        UPDATE product_sales_summary SET
            total_sold = CASE
                WHEN total_sold >= ?3 AND total_revenue_cents >= ?4 AND total_cost_cents >= ?5
                THEN total_sold - ?3 ELSE 0
            END,
            total_revenue_cents = CASE
                WHEN total_sold >= ?3 AND total_revenue_cents >= ?4 AND total_cost_cents >= ?5
                THEN total_revenue_cents - ?4 ELSE 0
            END,
            total_cost_cents = CASE
                WHEN total_sold >= ?3 AND total_revenue_cents >= ?4 AND total_cost_cents >= ?5
                THEN total_cost_cents - ?5 ELSE 0
            END,
            updated_at = ?6
        WHERE product_id = ?1 AND date = ?2
        "#,
    )
    .bind(product_id)
    .bind(date)
    .bind(quantity)
    .bind(revenue_cents)
    .bind(cost_cents)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

fn metric_order(metric: RankingMetric) -> &'static str {
    match metric {
        RankingMetric::Quantity => "total_sold DESC",
        RankingMetric::Profit => "(total_revenue_cents - total_cost_cents) DESC",
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the `product_sales_summary` table.
#[derive(Debug, Clone)]
pub struct SalesSummaryRepository {
    pool: SqlitePool,
}

impl SalesSummaryRepository {
    /// Creates a new SalesSummaryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SalesSummaryRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Primitives
    // -------------------------------------------------------------------------

    /// Point lookup by composite key. A missing row is `Ok(None)`.
    pub async fn get(&self, product_id: &str, date: NaiveDate) -> DbResult<Option<ProductSalesSummary>> {
        let sql = format!(
            "SELECT {SUMMARY_COLUMNS} FROM product_sales_summary WHERE product_id = ?1 AND date = ?2"
        );

        let summary = sqlx::query_as::<_, ProductSalesSummary>(&sql)
            .bind(product_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(summary)
    }

    /// Inserts a new row.
    ///
    /// ## Returns
    /// * `Err(DbError::Conflict)` - a row for `(product_id, date)` already exists
    pub async fn insert(&self, summary: &ProductSalesSummary) -> DbResult<()> {
        debug!(product_id = %summary.product_id, date = %summary.date, "Inserting sales summary");

        let result = sqlx::query(
            r#"
            INSERT INTO product_sales_summary (
                product_id, date, total_sold, total_revenue_cents, total_cost_cents, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&summary.product_id)
        .bind(summary.date)
        .bind(summary.total_sold)
        .bind(summary.total_revenue_cents)
        .bind(summary.total_cost_cents)
        .bind(summary.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => match DbError::from(e) {
                DbError::UniqueViolation { .. } => Err(DbError::conflict(
                    "ProductSalesSummary",
                    format!("{}@{}", summary.product_id, summary.date),
                )),
                other => Err(other),
            },
        }
    }

    /// Overwrites the totals of an existing row.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no row for `(product_id, date)`
    pub async fn replace(&self, summary: &ProductSalesSummary) -> DbResult<()> {
        debug!(product_id = %summary.product_id, date = %summary.date, "Replacing sales summary");

        let result = sqlx::query(
            r#"
            UPDATE product_sales_summary SET
                total_sold = ?3,
                total_revenue_cents = ?4,
                total_cost_cents = ?5,
                updated_at = ?6
            WHERE product_id = ?1 AND date = ?2
            "#,
        )
        .bind(&summary.product_id)
        .bind(summary.date)
        .bind(summary.total_sold)
        .bind(summary.total_revenue_cents)
        .bind(summary.total_cost_cents)
        .bind(summary.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(
                "ProductSalesSummary",
                format!("{}@{}", summary.product_id, summary.date),
            ));
        }

        Ok(())
    }

    /// All rows with `start <= date <= end`, by date then product.
    pub async fn between(&self, start: NaiveDate, end: NaiveDate) -> DbResult<Vec<ProductSalesSummary>> {
        validate_range("date", &start, &end)?;

        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS} FROM product_sales_summary
            WHERE date >= ?1 AND date <= ?2
            ORDER BY date ASC, product_id ASC
            "#
        );

        let rows = sqlx::query_as::<_, ProductSalesSummary>(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Day-by-day history of one product, oldest first.
    pub async fn history(
        &self,
        product_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> DbResult<Vec<ProductSalesSummary>> {
        validate_range("date", &start, &end)?;

        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS} FROM product_sales_summary
            WHERE product_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date ASC
            "#
        );

        let rows = sqlx::query_as::<_, ProductSalesSummary>(&sql)
            .bind(product_id)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    // -------------------------------------------------------------------------
    // Accumulator
    // -------------------------------------------------------------------------

    /// Adds a sale to the product's total for `date`.
    ///
    /// ## Errors
    /// * `DbError::Rejected` - a negative quantity, revenue or cost, or a
    ///   total that would overflow; nothing is written
    /// * store failures propagate unchanged
    ///
    /// ## Example
    /// ```rust,ignore
    /// let repo = db.sales_summaries();
    /// repo.record_sale("milk", day, 2, 1000, 600).await?;
    /// let row = repo.record_sale("milk", day, 1, 500, 300).await?;
    /// assert_eq!(row.total_sold, 3);
    /// ```
    pub async fn record_sale(
        &self,
        product_id: &str,
        date: NaiveDate,
        quantity: i64,
        revenue_cents: i64,
        cost_cents: i64,
    ) -> DbResult<ProductSalesSummary> {
        validate_sale_amounts(quantity, revenue_cents, cost_cents)?;

        debug!(
            product_id = %product_id,
            date = %date,
            quantity,
            revenue_cents,
            "Recording product sale"
        );

        accumulate(
            &self.pool,
            product_id,
            date,
            quantity,
            revenue_cents,
            cost_cents,
            Utc::now(),
        )
        .await
    }

    // -------------------------------------------------------------------------
    // Rankings
    // -------------------------------------------------------------------------

    /// Per-(product, day) rows in range, most units sold first.
    pub async fn top_selling_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: Option<u32>,
    ) -> DbResult<Vec<ProductSalesSummary>> {
        self.ranked_rows(RankingMetric::Quantity, start, end, limit).await
    }

    /// Per-(product, day) rows in range, highest profit first.
    pub async fn top_profitable_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: Option<u32>,
    ) -> DbResult<Vec<ProductSalesSummary>> {
        self.ranked_rows(RankingMetric::Profit, start, end, limit).await
    }

    /// One row per product over the range, most units sold first.
    pub async fn top_selling_products_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: Option<u32>,
    ) -> DbResult<Vec<ProductSalesRanking>> {
        self.ranked_products(RankingMetric::Quantity, start, end, limit).await
    }

    /// One row per product over the range, highest profit first.
    pub async fn top_profitable_products_between(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: Option<u32>,
    ) -> DbResult<Vec<ProductSalesRanking>> {
        self.ranked_products(RankingMetric::Profit, start, end, limit).await
    }

    /// Raw rows ranked by `metric`.
    pub async fn ranked_rows(
        &self,
        metric: RankingMetric,
        start: NaiveDate,
        end: NaiveDate,
        limit: Option<u32>,
    ) -> DbResult<Vec<ProductSalesSummary>> {
        validate_range("date", &start, &end)?;
        debug!(?metric, %start, %end, ?limit, "Ranking summary rows");

        let sql = format!(
            r#"
            SELECT {SUMMARY_COLUMNS} FROM product_sales_summary
            WHERE date >= ?1 AND date <= ?2
            ORDER BY {order}, product_id ASC, date ASC
            LIMIT ?3
            "#,
            order = metric_order(metric)
        );

        let rows = sqlx::query_as::<_, ProductSalesSummary>(&sql)
            .bind(start)
            .bind(end)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Range rolled up per product, ranked by `metric`.
    pub async fn ranked_products(
        &self,
        metric: RankingMetric,
        start: NaiveDate,
        end: NaiveDate,
        limit: Option<u32>,
    ) -> DbResult<Vec<ProductSalesRanking>> {
        validate_range("date", &start, &end)?;
        debug!(?metric, %start, %end, ?limit, "Ranking products");

        let sql = format!(
            r#"
            SELECT
                product_id,
                SUM(total_sold) AS total_sold,
                SUM(total_revenue_cents) AS total_revenue_cents,
                SUM(total_cost_cents) AS total_cost_cents,
                COUNT(*) AS days
            FROM product_sales_summary
            WHERE date >= ?1 AND date <= ?2
            GROUP BY product_id
            ORDER BY {order}, product_id ASC
            LIMIT ?3
            "#,
            order = metric_order(metric)
        );

        let rows = sqlx::query_as::<_, ProductSalesRanking>(&sql)
            .bind(start)
            .bind(end)
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    /// Quantity, revenue and cost summed over the range. Empty ranges give
    /// zeroes.
    pub async fn totals_between(&self, start: NaiveDate, end: NaiveDate) -> DbResult<SalesTotals> {
        validate_range("date", &start, &end)?;

        let totals = sqlx::query_as::<_, SalesTotals>(
            r#"
            SELECT
                COALESCE(SUM(total_sold), 0) AS total_sold,
                COALESCE(SUM(total_revenue_cents), 0) AS total_revenue_cents,
                COALESCE(SUM(total_cost_cents), 0) AS total_cost_cents
            FROM product_sales_summary
            WHERE date >= ?1 AND date <= ?2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(totals)
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
    use std::collections::HashSet;
    use stockpad_core::CoreError;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    async fn row_count(db: &Database) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM product_sales_summary")
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_first_sale_creates_row() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 10).await;

        let row = db
            .sales_summaries()
            .record_sale(&milk.id, day(5), 2, 1000, 600)
            .await
            .unwrap();

        assert_eq!(row.total_sold, 2);
        assert_eq!(row.total_revenue_cents, 1000);
        assert_eq!(row.total_cost_cents, 600);
        assert_eq!(row.date, day(5));

        let stored = db.sales_summaries().get(&milk.id, day(5)).await.unwrap();
        assert_eq!(stored, Some(row));
    }

    #[tokio::test]
    async fn test_sales_accumulate_into_one_row() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let milk = seeded_product(&db, "Milk", 10).await;

        repo.record_sale(&milk.id, day(5), 2, 1000, 600).await.unwrap();
        let first_update = repo.get(&milk.id, day(5)).await.unwrap().unwrap().updated_at;
        let row = repo.record_sale(&milk.id, day(5), 3, 1500, 900).await.unwrap();

        assert_eq!(row.total_sold, 5);
        assert_eq!(row.total_revenue_cents, 2500);
        assert_eq!(row.total_cost_cents, 1500);
        assert!(row.updated_at >= first_update);
        assert_eq!(row_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_separate_days_get_separate_rows() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let milk = seeded_product(&db, "Milk", 10).await;

        repo.record_sale(&milk.id, day(5), 1, 500, 300).await.unwrap();
        repo.record_sale(&milk.id, day(6), 1, 500, 300).await.unwrap();

        assert_eq!(row_count(&db).await, 2);
    }

    #[tokio::test]
    async fn test_negative_amounts_rejected_without_writing() {
        let db = memory_db().await;
        let milk = seeded_product(&db, "Milk", 10).await;

        let err = db
            .sales_summaries()
            .record_sale(&milk.id, day(5), -1, 500, 300)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));
        assert_eq!(row_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_product_is_a_store_error() {
        let db = memory_db().await;
        let err = db
            .sales_summaries()
            .record_sale("missing", day(5), 1, 500, 300)
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let db = memory_db().await;
        assert!(db.sales_summaries().get("nope", day(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_plain_insert_conflicts_on_duplicate_key() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let milk = seeded_product(&db, "Milk", 10).await;
        let summary = ProductSalesSummary::new(&milk.id, day(5), 1, 500, 300);

        repo.insert(&summary).await.unwrap();
        let err = repo.insert(&summary).await.unwrap_err();

        assert!(matches!(err, DbError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_replace_overwrites_or_reports_missing() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let milk = seeded_product(&db, "Milk", 10).await;

        let mut summary = ProductSalesSummary::new(&milk.id, day(5), 1, 500, 300);
        assert!(matches!(
            repo.replace(&summary).await,
            Err(DbError::NotFound { .. })
        ));

        repo.insert(&summary).await.unwrap();
        summary.total_sold = 9;
        repo.replace(&summary).await.unwrap();

        let stored = repo.get(&milk.id, day(5)).await.unwrap().unwrap();
        assert_eq!(stored.total_sold, 9);
    }

    #[tokio::test]
    async fn test_range_filter_is_inclusive() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let milk = seeded_product(&db, "Milk", 10).await;

        for d in 1..=5 {
            repo.record_sale(&milk.id, day(d), 1, 100, 50).await.unwrap();
        }

        let rows = repo.between(day(2), day(4)).await.unwrap();
        let days: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        assert_eq!(days, vec![day(2), day(3), day(4)]);

        let ranked = repo.top_selling_between(day(2), day(4), None).await.unwrap();
        assert_eq!(ranked.len(), 3);
        assert!(ranked.iter().all(|r| r.date >= day(2) && r.date <= day(4)));
    }

    #[tokio::test]
    async fn test_inverted_range_rejected() {
        let db = memory_db().await;
        let err = db
            .sales_summaries()
            .top_selling_between(day(5), day(1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_top_selling_order_and_tie_break() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let a = seeded_product(&db, "A", 10).await;
        let b = seeded_product(&db, "B", 10).await;
        let c = seeded_product(&db, "C", 10).await;

        repo.record_sale(&a.id, day(1), 3, 300, 100).await.unwrap();
        repo.record_sale(&b.id, day(1), 7, 700, 600).await.unwrap();
        repo.record_sale(&c.id, day(2), 3, 900, 100).await.unwrap();
        repo.record_sale(&a.id, day(2), 3, 300, 100).await.unwrap();

        let rows = repo.top_selling_between(day(1), day(2), None).await.unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].product_id, b.id);

        // Three rows tie at 3 units: product_id ASC, then date ASC
        let mut tied: Vec<(String, NaiveDate)> = vec![
            (a.id.clone(), day(1)),
            (a.id.clone(), day(2)),
            (c.id.clone(), day(2)),
        ];
        tied.sort();
        let got: Vec<(String, NaiveDate)> = rows[1..]
            .iter()
            .map(|r| (r.product_id.clone(), r.date))
            .collect();
        assert_eq!(got, tied);

        let limited = repo.top_selling_between(day(1), day(2), Some(2)).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].product_id, b.id);
    }

    #[tokio::test]
    async fn test_top_profitable_orders_by_margin() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let a = seeded_product(&db, "A", 10).await;
        let b = seeded_product(&db, "B", 10).await;

        // b sells more units but earns less
        repo.record_sale(&a.id, day(1), 1, 1000, 200).await.unwrap();
        repo.record_sale(&b.id, day(1), 9, 900, 800).await.unwrap();

        let rows = repo.top_profitable_between(day(1), day(1), None).await.unwrap();
        let ids: Vec<&str> = rows.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), b.id.as_str()]);
        assert_eq!(rows[0].profit().cents(), 800);
    }

    #[tokio::test]
    async fn test_product_rollup_sums_across_days() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let a = seeded_product(&db, "A", 10).await;
        let b = seeded_product(&db, "B", 10).await;

        repo.record_sale(&a.id, day(1), 4, 400, 200).await.unwrap();
        repo.record_sale(&a.id, day(2), 4, 400, 200).await.unwrap();
        repo.record_sale(&b.id, day(1), 6, 600, 100).await.unwrap();

        let by_qty = repo.top_selling_products_between(day(1), day(2), None).await.unwrap();
        assert_eq!(by_qty.len(), 2);
        assert_eq!(by_qty[0].product_id, a.id);
        assert_eq!(by_qty[0].total_sold, 8);
        assert_eq!(by_qty[0].days, 2);

        let by_profit = repo.top_profitable_products_between(day(1), day(2), Some(1)).await.unwrap();
        assert_eq!(by_profit.len(), 1);
        assert_eq!(by_profit[0].product_id, b.id);
        assert_eq!(by_profit[0].profit().cents(), 500);
    }

    #[tokio::test]
    async fn test_totals_between() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let a = seeded_product(&db, "A", 10).await;

        let empty = repo.totals_between(day(1), day(31)).await.unwrap();
        assert_eq!(empty, SalesTotals::default());

        repo.record_sale(&a.id, day(1), 2, 1000, 600).await.unwrap();
        repo.record_sale(&a.id, day(9), 1, 500, 300).await.unwrap();
        repo.record_sale(&a.id, day(20), 1, 500, 300).await.unwrap();

        let totals = repo.totals_between(day(1), day(10)).await.unwrap();
        assert_eq!(totals.total_sold, 3);
        assert_eq!(totals.revenue().cents(), 1500);
        assert_eq!(totals.profit().cents(), 600);
    }

    #[tokio::test]
    async fn test_deduct_reverses_accumulation() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let a = seeded_product(&db, "A", 10).await;

        repo.record_sale(&a.id, day(3), 5, 2500, 1500).await.unwrap();
        deduct(db.pool(), &a.id, day(3), 2, 1000, 600, Utc::now()).await.unwrap();

        let row = repo.get(&a.id, day(3)).await.unwrap().unwrap();
        assert_eq!(row.total_sold, 3);
        assert_eq!(row.total_revenue_cents, 1500);
        assert_eq!(row.total_cost_cents, 900);
    }

    #[tokio::test]
    async fn test_overflowing_sale_leaves_row_intact() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let milk = seeded_product(&db, "Milk", 10).await;

        repo.record_sale(&milk.id, day(5), i64::MAX, 1, 1).await.unwrap();
        let err = repo.record_sale(&milk.id, day(5), 1, 1, 1).await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(CoreError::Validation(_))));

        let row = repo.get(&milk.id, day(5)).await.unwrap().unwrap();
        assert_eq!(row.total_sold, i64::MAX);
        assert_eq!(row.total_revenue_cents, 1);
        assert_eq!(row.total_cost_cents, 1);

        let ranked = repo.top_selling_between(day(1), day(31), None).await.unwrap();
        assert_eq!(ranked.len(), 1);
    }

    #[tokio::test]
    async fn test_deduct_clamps_the_row_as_a_unit() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let a = seeded_product(&db, "A", 10).await;

        repo.insert(&ProductSalesSummary::new(&a.id, day(3), 5, 400, 1500))
            .await
            .unwrap();
        deduct(db.pool(), &a.id, day(3), 2, 1000, 600, Utc::now()).await.unwrap();

        let row = repo.get(&a.id, day(3)).await.unwrap().unwrap();
        assert_eq!(row.total_sold, 0);
        assert_eq!(row.total_revenue_cents, 0);
        assert_eq!(row.total_cost_cents, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_sales_lose_no_updates() {
        let path = std::env::temp_dir().join(format!("stockpad-{}.db", uuid::Uuid::new_v4()));
        let db = Database::new(DbConfig::new(&path).max_connections(5))
            .await
            .unwrap();
        let milk = seeded_product(&db, "Milk", 1000).await;

        let mut handles = Vec::new();
        for _ in 0..50 {
            let repo = db.sales_summaries();
            let id = milk.id.clone();
            handles.push(tokio::spawn(async move {
                repo.record_sale(&id, day(5), 1, 100, 60).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let row = db.sales_summaries().get(&milk.id, day(5)).await.unwrap().unwrap();
        assert_eq!(row.total_sold, 50);
        assert_eq!(row.total_revenue_cents, 5000);
        assert_eq!(row.total_cost_cents, 3000);
        assert_eq!(row_count(&db).await, 1);

        db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let mut file = path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(file);
        }
    }

    #[tokio::test]
    async fn test_history_is_per_product() {
        let db = memory_db().await;
        let repo = db.sales_summaries();
        let a = seeded_product(&db, "A", 10).await;
        let b = seeded_product(&db, "B", 10).await;

        repo.record_sale(&a.id, day(2), 1, 100, 50).await.unwrap();
        repo.record_sale(&a.id, day(1), 1, 100, 50).await.unwrap();
        repo.record_sale(&b.id, day(1), 1, 100, 50).await.unwrap();

        let rows = repo.history(&a.id, day(1), day(31)).await.unwrap();
        let ids: HashSet<&str> = rows.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids.len(), 1);
        assert_eq!(rows[0].date, day(1));
        assert_eq!(rows[1].date, day(2));
    }
}
