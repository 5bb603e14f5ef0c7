//! # Sales Summaries
//!
//! Daily per-product sales accumulation records and the shapes returned by
//! the ranking and totals queries.
//!
//! ## Key Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  At most ONE ProductSalesSummary row per (product_id, date)            │
//! │                                                                         │
//! │  sale 1: milk × 2  ──┐                                                 │
//! │  sale 2: milk × 3  ──┼──► (milk, 2026-10-19) total_sold = 6            │
//! │  sale 3: milk × 1  ──┘                                                 │
//! │                                                                         │
//! │  sale 4: milk × 4  ─────► (milk, 2026-10-20) total_sold = 4            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Dates are calendar days (`NaiveDate`), so a summary key can never carry a
//! time-of-day component. Use [`day_of`] to truncate a timestamp.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

/// Truncates a timestamp to its UTC calendar day.
///
/// ```rust
/// use chrono::{NaiveDate, TimeZone, Utc};
/// use stockpad_core::day_of;
///
/// let ts = Utc.with_ymd_and_hms(2026, 10, 19, 23, 59, 59).unwrap();
/// assert_eq!(day_of(ts), NaiveDate::from_ymd_opt(2026, 10, 19).unwrap());
/// ```
#[inline]
pub fn day_of(ts: DateTime<Utc>) -> NaiveDate {
    ts.date_naive()
}

// =============================================================================
// ProductSalesSummary
// =============================================================================

/// Accumulated sales of one product on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductSalesSummary {
    pub product_id: String,
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// Units sold that day.
    pub total_sold: i64,
    pub total_revenue_cents: i64,
    pub total_cost_cents: i64,
    /// Time of the last accumulation into this row.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ProductSalesSummary {
    /// Creates the first accumulation for a day.
    pub fn new(
        product_id: impl Into<String>,
        date: NaiveDate,
        total_sold: i64,
        total_revenue_cents: i64,
        total_cost_cents: i64,
    ) -> Self {
        ProductSalesSummary {
            product_id: product_id.into(),
            date,
            total_sold,
            total_revenue_cents,
            total_cost_cents,
            updated_at: Utc::now(),
        }
    }

    /// Revenue minus cost.
    pub fn profit(&self) -> Money {
        Money::from_cents(self.total_revenue_cents - self.total_cost_cents)
    }
}

// =============================================================================
// Rankings
// =============================================================================

/// Metric a ranking query orders by (descending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    /// Units sold.
    Quantity,
    /// Revenue minus cost.
    Profit,
}

/// Sales of one product rolled up over every day of a range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductSalesRanking {
    pub product_id: String,
    pub total_sold: i64,
    pub total_revenue_cents: i64,
    pub total_cost_cents: i64,
    /// Number of day rows that contributed.
    pub days: i64,
}

impl ProductSalesRanking {
    pub fn profit(&self) -> Money {
        Money::from_cents(self.total_revenue_cents - self.total_cost_cents)
    }
}

// =============================================================================
// Totals
// =============================================================================

/// Totals over every summary row in a range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SalesTotals {
    pub total_sold: i64,
    pub total_revenue_cents: i64,
    pub total_cost_cents: i64,
}

impl SalesTotals {
    pub fn revenue(&self) -> Money {
        Money::from_cents(self.total_revenue_cents)
    }

    pub fn cost(&self) -> Money {
        Money::from_cents(self.total_cost_cents)
    }

    pub fn profit(&self) -> Money {
        self.revenue() - self.cost()
    }

    /// Margin in basis points, `None` when nothing was sold.
    pub fn margin_bps(&self) -> Option<i64> {
        self.revenue().margin_bps(self.cost())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
