//! # Analytics Use Cases
//!
//! Read side of the daily sales summary plus the low-stock screen.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Dashboard                                                              │
//! │  ├── GetSalesTotals            today / this week                        │
//! │  ├── GetTopSellingProducts     units, raw rows or per product           │
//! │  ├── GetTopProfitableProducts  revenue - cost                           │
//! │  └── GetLowStockProducts       active low stock, then dead stock        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use stockpad_core::stock::classify_low_stock;
use stockpad_core::validation::validate_non_negative;
use stockpad_core::{
    DeadStockPolicy, Product, ProductSalesRanking, ProductSalesSummary, SalesTotals,
};
use stockpad_db::Database;

// =============================================================================
// RecordProductSale
// =============================================================================

/// Adds a sale straight into the daily summary.
///
/// Invoices already do this for every sale line; this entry point serves
/// imports and corrections that have no invoice.
#[derive(Debug, Clone)]
pub struct RecordProductSale {
    db: Database,
}

impl RecordProductSale {
    pub fn new(db: Database) -> Self {
        RecordProductSale { db }
    }

    pub async fn execute(
        &self,
        product_id: &str,
        date: NaiveDate,
        quantity: i64,
        revenue_cents: i64,
        cost_cents: i64,
    ) -> ApiResult<ProductSalesSummary> {
        if self.db.products().get_by_id(product_id).await?.is_none() {
            return Err(ApiError::not_found("Product", product_id));
        }

        Ok(self
            .db
            .sales_summaries()
            .record_sale(product_id, date, quantity, revenue_cents, cost_cents)
            .await?)
    }
}

// =============================================================================
// Rankings
// =============================================================================

/// Best sellers by units over `start..=end`.
#[derive(Debug, Clone)]
pub struct GetTopSellingProducts {
    db: Database,
}

impl GetTopSellingProducts {
    pub fn new(db: Database) -> Self {
        GetTopSellingProducts { db }
    }

    /// Raw (product, day) rows. `limit = None` returns every row.
    pub async fn execute(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: Option<u32>,
    ) -> ApiResult<Vec<ProductSalesSummary>> {
        Ok(self
            .db
            .sales_summaries()
            .top_selling_between(start, end, limit)
            .await?)
    }

    /// One row per product, summed over the range.
    pub async fn execute_by_product(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: Option<u32>,
    ) -> ApiResult<Vec<ProductSalesRanking>> {
        Ok(self
            .db
            .sales_summaries()
            .top_selling_products_between(start, end, limit)
            .await?)
    }
}

/// Best earners by revenue minus cost over `start..=end`.
#[derive(Debug, Clone)]
pub struct GetTopProfitableProducts {
    db: Database,
}

impl GetTopProfitableProducts {
    pub fn new(db: Database) -> Self {
        GetTopProfitableProducts { db }
    }

    pub async fn execute(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: Option<u32>,
    ) -> ApiResult<Vec<ProductSalesSummary>> {
        Ok(self
            .db
            .sales_summaries()
            .top_profitable_between(start, end, limit)
            .await?)
    }

    pub async fn execute_by_product(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        limit: Option<u32>,
    ) -> ApiResult<Vec<ProductSalesRanking>> {
        Ok(self
            .db
            .sales_summaries()
            .top_profitable_products_between(start, end, limit)
            .await?)
    }
}

/// Units, revenue and cost over `start..=end`.
#[derive(Debug, Clone)]
pub struct GetSalesTotals {
    db: Database,
}

impl GetSalesTotals {
    pub fn new(db: Database) -> Self {
        GetSalesTotals { db }
    }

    pub async fn execute(&self, start: NaiveDate, end: NaiveDate) -> ApiResult<SalesTotals> {
        Ok(self.db.sales_summaries().totals_between(start, end).await?)
    }
}

// =============================================================================
// GetLowStockProducts
// =============================================================================

/// Products at or below a stock threshold, active sellers first and dead
/// stock after.
#[derive(Debug, Clone)]
pub struct GetLowStockProducts {
    db: Database,
    policy: DeadStockPolicy,
    default_threshold: i64,
}

impl GetLowStockProducts {
    pub fn new(db: Database, policy: DeadStockPolicy, default_threshold: i64) -> Self {
        GetLowStockProducts {
            db,
            policy,
            default_threshold,
        }
    }

    /// `threshold = None` uses the configured default.
    pub async fn execute(&self, threshold: Option<i64>) -> ApiResult<Vec<Product>> {
        self.execute_at(threshold, Utc::now()).await
    }

    /// Same as [`GetLowStockProducts::execute`] with an explicit clock.
    pub async fn execute_at(
        &self,
        threshold: Option<i64>,
        now: DateTime<Utc>,
    ) -> ApiResult<Vec<Product>> {
        let threshold = threshold.unwrap_or(self.default_threshold);
        validate_non_negative("threshold", threshold)?;

        let candidates = self.db.products().low_stock(threshold).await?;
        let ordered = classify_low_stock(candidates, threshold, &self.policy, now);

        debug!(threshold, count = ordered.len(), "Low stock classified");
        Ok(ordered)
    }
}
