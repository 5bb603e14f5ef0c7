//! # stockpad-db: Database Layer for Stockpad
//!
//! SQLite persistence for the Stockpad inventory engine, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockpad Data Flow                               │
//! │                                                                         │
//! │  Use case (CreateInvoice, GetTopSellingProducts, ...)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   stockpad-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌─────────────────┐   ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories   │   │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                 │   │  (embedded)  │  │   │
//! │  │   │               │    │ Product         │   │              │  │   │
//! │  │   │ SqlitePool    │◄───│ Category        │   │ 001_init.sql │  │   │
//! │  │   │ WAL, FKs on   │    │ Invoice         │   │ 002_fts.sql  │  │   │
//! │  │   │               │    │ SalesSummary    │   │              │  │   │
//! │  │   │               │    │ SyncOutbox      │   │              │  │   │
//! │  │   └───────────────┘    └─────────────────┘   └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (see AppConfig::database.path)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stockpad_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("stockpad.db")).await?;
//! db.sales_summaries().record_sale("p-1", day, 2, 1000, 600).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::category::CategoryRepository;
pub use repository::invoice::{InvoiceRepository, InvoiceWithLines, INVOICE_ENTITY};
pub use repository::product::{ProductRepository, PRODUCT_ENTITY};
pub use repository::sales_summary::SalesSummaryRepository;
pub use repository::sync::SyncOutboxRepository;
