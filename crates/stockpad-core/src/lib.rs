//! # stockpad-core: Pure Business Logic for Stockpad
//!
//! Domain types and rules for the Stockpad inventory / point-of-sale engine.
//! Everything here is a pure function or a plain data type; the database
//! lives in `stockpad-db` and orchestration in the `stockpad` app crate.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockpad Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Mobile UI (out of tree)                      │   │
//! │  │   Scan ──► Catalog ──► Invoice ──► Dashboard                    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               apps/stockpad (use cases, config)                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ stockpad-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌───────────────────┐ │   │
//! │  │   │  types   │ │  money   │ │  stock   │ │ invoice / summary │ │   │
//! │  │   │ Product  │ │  Money   │ │ dead     │ │ drafts, totals,   │ │   │
//! │  │   │ Invoice  │ │          │ │ stock    │ │ daily summaries   │ │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └───────────────────┘ │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 stockpad-db (Database Layer)                    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog and invoice entities (Product, Category, Invoice, ...)
//! - [`summary`] - Daily per-product sales summaries and rankings
//! - [`invoice`] - Invoice drafts and totals
//! - [`stock`] - Low-stock / dead-stock classification
//! - [`money`] - Integer money (cents)
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use stockpad_core::money::Money;
//!
//! let price = Money::from_cents(1099);
//! let discount = Money::from_cents(99);
//! let line_total = (price - discount).multiply_quantity(3);
//! assert_eq!(line_total.cents(), 3000);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod invoice;
pub mod money;
pub mod stock;
pub mod summary;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use invoice::{InvoiceDraft, InvoiceLineDraft, InvoiceTotals};
pub use money::Money;
pub use stock::{DeadStockPolicy, StockStatus};
pub use summary::{day_of, ProductSalesRanking, ProductSalesSummary, RankingMetric, SalesTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Default inactivity window after which an unsold product counts as dead stock.
pub const DEFAULT_DEAD_STOCK_DAYS: i64 = 30;

/// Default cutoff used by the low-stock screen when the caller gives none.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

/// Maximum quantity of a single product on one invoice line.
///
/// ## Business Reason
/// Prevents accidental over-entry (e.g., scanning 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 9_999;

/// Maximum number of lines on a single invoice.
pub const MAX_INVOICE_LINES: usize = 200;

/// Largest unit price or cost accepted anywhere (one billion major units).
///
/// With [`MAX_LINE_QUANTITY`] and [`MAX_INVOICE_LINES`] this keeps every
/// invoice total well inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 100_000_000_000;
