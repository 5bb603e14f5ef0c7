//! # Domain Types
//!
//! Core catalog and invoice types used throughout Stockpad.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Category     │◄──│     Product     │◄──│   InvoiceLine   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id / remote_id │   │  invoice_id ─┐  │       │
//! │  │  name           │   │  barcode        │   │  product_id  │  │       │
//! │  └─────────────────┘   │  stock_quantity │   │  qty, price  │  │       │
//! │                        │  last_sold_at   │   └──────────────┼──┘       │
//! │                        └─────────────────┘                  │          │
//! │                                                   ┌─────────▼───────┐  │
//! │                                                   │     Invoice     │  │
//! │                                                   │  number, type   │  │
//! │                                                   │  totals, status │  │
//! │                                                   └─────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Ownership
//! - An invoice owns its lines (cascade delete).
//! - Products are never hard-deleted while lines reference them; they are
//!   soft-deleted through `is_deleted`.
//! - Daily sales summaries (see [`crate::summary`]) are derived data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::money::Money;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Local identifier (UUID v4).
    pub id: String,

    /// Identifier assigned by the remote API once synced.
    pub remote_id: Option<String>,

    /// Display name.
    pub name: String,

    /// Barcode (EAN-13, UPC-A, ...). Unique when present.
    pub barcode: Option<String>,

    /// Owning category, if any.
    pub category_id: Option<String>,

    /// Selling price in cents.
    pub price_cents: i64,

    /// Purchase cost in cents.
    pub cost_cents: i64,

    /// Units currently on hand.
    pub stock_quantity: i64,

    /// Reorder threshold.
    pub min_stock: i64,

    /// Upper bound before the product counts as overstocked.
    pub max_stock: Option<i64>,

    /// When the product last appeared on a sale invoice.
    #[ts(as = "Option<String>")]
    pub last_sold_at: Option<DateTime<Utc>>,

    /// Whether the product is offered for sale.
    pub is_active: bool,

    /// Soft-delete flag.
    pub is_deleted: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Bumped on every local change; the sync layer uses it to order updates.
    pub sync_version: i64,
}

impl Product {
    /// Creates a new, active product with zero stock and a fresh id.
    ///
    /// ## Example
    /// ```rust
    /// use stockpad_core::Product;
    ///
    /// let milk = Product::new("Milk 1L", 129, 90);
    /// assert_eq!(milk.stock_quantity, 0);
    /// assert!(milk.is_available());
    /// ```
    pub fn new(name: impl Into<String>, price_cents: i64, cost_cents: i64) -> Self {
        let now = Utc::now();
        Product {
            id: Uuid::new_v4().to_string(),
            remote_id: None,
            name: name.into(),
            barcode: None,
            category_id: None,
            price_cents,
            cost_cents,
            stock_quantity: 0,
            min_stock: 0,
            max_stock: None,
            last_sold_at: None,
            is_active: true,
            is_deleted: false,
            created_at: now,
            updated_at: now,
            sync_version: 0,
        }
    }

    /// Sets the barcode.
    pub fn with_barcode(mut self, barcode: impl Into<String>) -> Self {
        self.barcode = Some(barcode.into());
        self
    }

    /// Sets the stock on hand.
    pub fn with_stock(mut self, stock_quantity: i64) -> Self {
        self.stock_quantity = stock_quantity;
        self
    }

    /// Sets the category.
    pub fn with_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    /// Returns the price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the cost as Money.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Active and not deleted.
    #[inline]
    pub fn is_available(&self) -> bool {
        self.is_active && !self.is_deleted
    }

    /// Checks whether `quantity` units can be taken from stock.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.stock_quantity >= quantity
    }
}

// =============================================================================
// Category
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub is_deleted: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Category {
    /// Creates a new category with a fresh id.
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        let now = Utc::now();
        Category {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description,
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Invoice Type / Status
// =============================================================================

/// Direction of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceType {
    /// Goods leave the shop: stock goes down, sales summaries go up.
    Sale,
    /// Goods arrive from a supplier: stock goes up.
    Purchase,
}

impl InvoiceType {
    /// Stock direction for this invoice type (-1 for sales, +1 for purchases).
    pub const fn stock_sign(&self) -> i64 {
        match self {
            InvoiceType::Sale => -1,
            InvoiceType::Purchase => 1,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceType::Sale => "sale",
            InvoiceType::Purchase => "purchase",
        }
    }
}

/// Lifecycle status of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    /// Paid / received in full.
    #[default]
    Completed,
    /// Recorded but awaiting payment.
    Pending,
    /// Cancelled; its stock movement has been reversed.
    Cancelled,
}

impl InvoiceStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Completed => "completed",
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Cancelled => "cancelled",
        }
    }
}

// =============================================================================
// Invoice
// =============================================================================

/// A sale or purchase invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    /// Sequential number, unique per invoice type.
    pub number: i64,
    #[ts(as = "String")]
    pub date: DateTime<Utc>,
    pub invoice_type: InvoiceType,
    /// Customer (for sales) or supplier (for purchases).
    pub counterparty_id: Option<String>,
    /// Sum of line totals minus the invoice-level discount.
    pub total_amount_cents: i64,
    /// `total_amount` minus the cost of the goods on the invoice.
    pub total_profit_cents: i64,
    /// Invoice-level discount.
    pub discount_cents: i64,
    pub status: InvoiceStatus,
    /// Whether the remote API has acknowledged this invoice.
    pub is_synced: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    #[inline]
    pub fn total_profit(&self) -> Money {
        Money::from_cents(self.total_profit_cents)
    }
}

// =============================================================================
// Invoice Line
// =============================================================================

/// One product on an invoice (the invoice/product cross reference).
///
/// Price and cost are frozen at the time of the invoice so later catalog
/// edits never rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InvoiceLine {
    pub invoice_id: String,
    pub product_id: String,
    pub quantity: i64,
    /// Unit price at the time of the invoice.
    pub price_cents: i64,
    /// Unit cost at the time of the invoice.
    pub cost_cents: i64,
    /// Per-unit discount.
    pub discount_cents: i64,
}

impl InvoiceLine {
    /// `(price - discount) × quantity`
    ///
    /// ```rust
    /// use stockpad_core::InvoiceLine;
    ///
    /// let line = InvoiceLine {
    ///     invoice_id: "inv".into(),
    ///     product_id: "p".into(),
    ///     quantity: 3,
    ///     price_cents: 500,
    ///     cost_cents: 300,
    ///     discount_cents: 50,
    /// };
    /// assert_eq!(line.total().cents(), 1350);
    /// ```
    pub fn total(&self) -> Money {
        (Money::from_cents(self.price_cents) - Money::from_cents(self.discount_cents))
            .multiply_quantity(self.quantity)
    }

    /// `cost × quantity`
    pub fn cost_total(&self) -> Money {
        Money::from_cents(self.cost_cents).multiply_quantity(self.quantity)
    }

    /// Line total minus line cost.
    pub fn profit(&self) -> Money {
        self.total() - self.cost_total()
    }
}

// =============================================================================
// Sync Outbox
// =============================================================================

/// An entry in the sync outbox queue.
/// Uses outbox pattern for reliable upload to the remote API.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SyncOutboxEntry {
    pub id: String,
    /// Type of entity being synced: "INVOICE", "PRODUCT", "CATEGORY".
    pub entity_type: String,
    /// ID of the entity being synced.
    pub entity_id: String,
    /// The full entity data as JSON.
    pub payload: String,
    /// Number of sync attempts.
    pub attempts: i64,
    /// Last error message if sync failed.
    pub last_error: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub attempted_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub synced_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Unit Tests
// =============================================================================
