//! # Stock Classification
//!
//! Low-stock filtering and the dead-stock partition used by the restock
//! screen.
//!
//! ## Classification Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Catalog                                                               │
//! │     │                                                                   │
//! │     ▼  filter: !deleted && stock_quantity <= threshold                 │
//! │  Low stock (stock ASC, name ASC, id ASC)                               │
//! │     │                                                                   │
//! │     ▼  stable partition by Product::is_dead_stock                      │
//! │  ┌──────────────────────────┬──────────────────────────┐               │
//! │  │  active low stock        │  dead stock              │               │
//! │  │  (sold within window)    │  (not sold within window)│               │
//! │  └──────────────────────────┴──────────────────────────┘               │
//! │        reorder these first      consider clearing these                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::Product;
use crate::DEFAULT_DEAD_STOCK_DAYS;

// =============================================================================
// Stock Status
// =============================================================================

/// Where a product's stock sits relative to its own thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    OutOfStock,
    /// At or below `min_stock`.
    Low,
    Normal,
    /// Above `max_stock`.
    Overstocked,
}

// =============================================================================
// Dead Stock Policy
// =============================================================================

/// Inactivity window after which a product counts as dead stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadStockPolicy {
    window: Duration,
}

impl DeadStockPolicy {
    /// Policy with a window of `days` days.
    pub fn from_days(days: i64) -> Self {
        DeadStockPolicy {
            window: Duration::days(days),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for DeadStockPolicy {
    fn default() -> Self {
        DeadStockPolicy::from_days(DEFAULT_DEAD_STOCK_DAYS)
    }
}

impl Product {
    /// Classifies stock against the product's own min/max thresholds.
    pub fn stock_status(&self) -> StockStatus {
        if self.stock_quantity <= 0 {
            StockStatus::OutOfStock
        } else if self.stock_quantity <= self.min_stock {
            StockStatus::Low
        } else if self.max_stock.is_some_and(|max| self.stock_quantity > max) {
            StockStatus::Overstocked
        } else {
            StockStatus::Normal
        }
    }

    /// Whether the product has gone unsold for longer than the policy window.
    ///
    /// A product that never sold is measured from its creation time, so a
    /// freshly added item is not flagged on its first day.
    pub fn is_dead_stock(&self, policy: &DeadStockPolicy, now: DateTime<Utc>) -> bool {
        let reference = self.last_sold_at.unwrap_or(self.created_at);
        reference < now - policy.window
    }
}

// =============================================================================
// Low Stock Classification
// =============================================================================

/// Filters `products` to low stock and orders active items before dead stock.
///
/// ## Ordering
/// - filter order: `stock_quantity ASC, name ASC, id ASC`
/// - then a stable partition: non-dead first, dead after, each keeping the
///   filter order
///
/// Soft-deleted products are always excluded.
pub fn classify_low_stock(
    products: Vec<Product>,
    threshold: i64,
    policy: &DeadStockPolicy,
    now: DateTime<Utc>,
) -> Vec<Product> {
    let mut low: Vec<Product> = products
        .into_iter()
        .filter(|p| !p.is_deleted && p.stock_quantity <= threshold)
        .collect();

    low.sort_by(|a, b| {
        a.stock_quantity
            .cmp(&b.stock_quantity)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.id.cmp(&b.id))
    });

    let (active, dead): (Vec<Product>, Vec<Product>) = low
        .into_iter()
        .partition(|p| !p.is_dead_stock(policy, now));

    active.into_iter().chain(dead).collect()
}

// =============================================================================
// Unit Tests
// =============================================================================
