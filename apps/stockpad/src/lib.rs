//! # Stockpad Application Library
//!
//! Application root for the Stockpad inventory / point-of-sale engine.
//! The mobile shell links this library, builds one [`App`] at startup and
//! drives every screen through the use cases in [`usecases`].
//!
//! ## Module Organization
//! ```text
//! stockpad_app/
//! ├── lib.rs          ◄─── You are here (App root, tracing setup)
//! ├── config.rs       ◄─── AppConfig (toml + STOCKPAD_* env + defaults)
//! ├── error.rs        ◄─── ApiError / ErrorCode for the UI
//! ├── resource.rs     ◄─── Resource<T>, Observed<T>
//! └── usecases/
//!     ├── product.rs  ◄─── Catalog: add, update, delete, scan, search, stock
//!     ├── category.rs ◄─── Categories
//!     ├── invoice.rs  ◄─── Sales / purchases
//!     ├── analytics.rs◄─── Daily summaries, rankings, low stock
//!     └── sync.rs     ◄─── Outbox push
//! ```
//!
//! ## Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  App                                                                    │
//! │  ├── config: AppConfig   (read-only after startup)                      │
//! │  └── db: Database        (pool; cloned into each use case)              │
//! │                                                                         │
//! │  app.create_invoice().execute(draft)                                    │
//! │  app.low_stock().execute(None)                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod error;
pub mod resource;
pub mod usecases;

use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use stockpad_db::Database;

pub use config::{AppConfig, ConfigError};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use resource::{Observed, ObservedStream, Resource};
pub use usecases::*;

/// Application root. Owns the configuration and the database handle.
#[derive(Debug, Clone)]
pub struct App {
    config: AppConfig,
    db: Database,
}

impl App {
    /// Opens the configured database (running migrations) and builds the app.
    ///
    /// ## Startup Sequence
    /// 1. Resolve database path (`[database].path` or platform data dir)
    /// 2. Connect, WAL mode, migrations
    pub async fn new(config: AppConfig) -> ApiResult<Self> {
        let db_config = config.db_config()?;
        info!(path = ?db_config.database_path, "Opening database");

        let db = Database::new(db_config).await?;
        info!(store = %config.store.name, "Stockpad ready");

        Ok(App { config, db })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Closes the pool. Use cases created earlier fail afterwards.
    pub async fn shutdown(&self) {
        self.db.close().await;
    }

    // =========================================================================
    // Use Cases
    // =========================================================================

    pub fn add_product(&self) -> AddProduct {
        AddProduct::new(self.db.clone())
    }

    pub fn update_product(&self) -> UpdateProduct {
        UpdateProduct::new(self.db.clone())
    }

    pub fn delete_product(&self) -> DeleteProduct {
        DeleteProduct::new(self.db.clone())
    }

    pub fn find_product_by_barcode(&self) -> FindProductByBarcode {
        FindProductByBarcode::new(self.db.clone())
    }

    pub fn search_products(&self) -> SearchProducts {
        SearchProducts::new(self.db.clone())
    }

    pub fn adjust_stock(&self) -> AdjustStock {
        AdjustStock::new(self.db.clone())
    }

    pub fn add_category(&self) -> AddCategory {
        AddCategory::new(self.db.clone())
    }

    pub fn list_categories(&self) -> ListCategories {
        ListCategories::new(self.db.clone())
    }

    pub fn create_invoice(&self) -> CreateInvoice {
        CreateInvoice::new(self.db.clone())
    }

    pub fn invoice_details(&self) -> GetInvoiceDetails {
        GetInvoiceDetails::new(self.db.clone())
    }

    pub fn list_invoices(&self) -> ListInvoices {
        ListInvoices::new(self.db.clone())
    }

    pub fn cancel_invoice(&self) -> CancelInvoice {
        CancelInvoice::new(self.db.clone())
    }

    pub fn delete_invoice(&self) -> DeleteInvoice {
        DeleteInvoice::new(self.db.clone())
    }

    pub fn record_product_sale(&self) -> RecordProductSale {
        RecordProductSale::new(self.db.clone())
    }

    pub fn top_selling(&self) -> GetTopSellingProducts {
        GetTopSellingProducts::new(self.db.clone())
    }

    pub fn top_profitable(&self) -> GetTopProfitableProducts {
        GetTopProfitableProducts::new(self.db.clone())
    }

    pub fn sales_totals(&self) -> GetSalesTotals {
        GetSalesTotals::new(self.db.clone())
    }

    pub fn low_stock(&self) -> GetLowStockProducts {
        GetLowStockProducts::new(
            self.db.clone(),
            self.config.dead_stock_policy(),
            self.config.inventory.low_stock_threshold,
        )
    }

    pub fn push_pending_changes<R: RemoteSync>(&self, remote: R) -> PushPendingChanges<R> {
        PushPendingChanges::new(
            self.db.clone(),
            remote,
            self.config.sync.batch_size,
            self.config.sync.max_attempts,
        )
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stockpad=trace` - Show trace for stockpad crates only
/// - Default: INFO, debug for stockpad, warn for sqlx
///
/// Calling it twice is harmless; the second call keeps the first subscriber.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stockpad=debug,sqlx=warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::TRACE)
        .try_init();
}
