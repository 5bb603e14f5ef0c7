//! # Product Use Cases
//!
//! Catalog maintenance, barcode scans and search.
//!
//! ## Search Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  User types or scans "4006381333931"                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌───────────────────────────────────────────┐                         │
//! │  │  Is query a barcode? (8-13 digits)        │                         │
//! │  │  YES: Try exact barcode lookup first      │──► Found? Return [1]    │
//! │  │  NO:  Use FTS5 prefix search              │                         │
//! │  └───────────────────────────────────────────┘                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Vec<Product>, best match first                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::time::Instant;
use tracing::{debug, info};

use crate::error::{ApiError, ApiResult};
use stockpad_core::validation::{validate_barcode, validate_product, validate_search_query};
use stockpad_core::Product;
use stockpad_db::Database;

const DEFAULT_SEARCH_LIMIT: u32 = 20;
const MAX_SEARCH_LIMIT: u32 = 100;

/// Checks if a query looks like a barcode (8-13 numeric digits).
///
/// EAN-8, UPC-A and EAN-13 all fall in this range. Scanners type the whole
/// code at once, so an exact lookup answers before FTS would.
fn is_barcode_query(query: &str) -> bool {
    (8..=13).contains(&query.len()) && query.chars().all(|c| c.is_ascii_digit())
}

async fn ensure_category(db: &Database, category_id: Option<&str>) -> ApiResult<()> {
    if let Some(id) = category_id {
        if db.categories().get_by_id(id).await?.is_none() {
            return Err(ApiError::not_found("Category", id));
        }
    }
    Ok(())
}

// =============================================================================
// AddProduct
// =============================================================================

/// Adds a product to the catalog.
#[derive(Debug, Clone)]
pub struct AddProduct {
    db: Database,
}

impl AddProduct {
    pub fn new(db: Database) -> Self {
        AddProduct { db }
    }

    pub async fn execute(&self, mut product: Product) -> ApiResult<Product> {
        product.name = product.name.trim().to_string();
        validate_product(&product)?;
        ensure_category(&self.db, product.category_id.as_deref()).await?;

        let stored = self.db.products().insert(&product).await?;
        info!(id = %stored.id, name = %stored.name, "Product added");

        Ok(stored)
    }
}

// =============================================================================
// UpdateProduct
// =============================================================================

/// Saves edited catalog fields. Stock is changed through [`AdjustStock`] or
/// invoices, never here.
#[derive(Debug, Clone)]
pub struct UpdateProduct {
    db: Database,
}

impl UpdateProduct {
    pub fn new(db: Database) -> Self {
        UpdateProduct { db }
    }

    pub async fn execute(&self, mut product: Product) -> ApiResult<Product> {
        product.name = product.name.trim().to_string();
        validate_product(&product)?;
        ensure_category(&self.db, product.category_id.as_deref()).await?;

        let stored = self.db.products().update(&product).await?;

        debug!(id = %stored.id, version = stored.sync_version, "Product updated");
        Ok(stored)
    }
}

// =============================================================================
// DeleteProduct
// =============================================================================

/// Soft-deletes a product. History that references it is kept.
#[derive(Debug, Clone)]
pub struct DeleteProduct {
    db: Database,
}

impl DeleteProduct {
    pub fn new(db: Database) -> Self {
        DeleteProduct { db }
    }

    pub async fn execute(&self, id: &str) -> ApiResult<()> {
        self.db.products().soft_delete(id).await?;
        info!(id = %id, "Product deleted");

        Ok(())
    }
}

// =============================================================================
// FindProductByBarcode
// =============================================================================

/// Scanner lookup. `Ok(None)` when nothing carries the code.
#[derive(Debug, Clone)]
pub struct FindProductByBarcode {
    db: Database,
}

impl FindProductByBarcode {
    pub fn new(db: Database) -> Self {
        FindProductByBarcode { db }
    }

    pub async fn execute(&self, barcode: &str) -> ApiResult<Option<Product>> {
        let barcode = barcode.trim();
        validate_barcode(barcode)?;

        Ok(self.db.products().get_by_barcode(barcode).await?)
    }
}

// =============================================================================
// SearchProducts
// =============================================================================

/// Catalog search by name or barcode prefix.
#[derive(Debug, Clone)]
pub struct SearchProducts {
    db: Database,
}

impl SearchProducts {
    pub fn new(db: Database) -> Self {
        SearchProducts { db }
    }

    /// ## Arguments
    /// * `query` - Search term; empty lists active products by name
    /// * `limit` - Maximum results (default: 20, max: 100)
    pub async fn execute(&self, query: &str, limit: Option<u32>) -> ApiResult<Vec<Product>> {
        let start = Instant::now();
        let query = validate_search_query(query)?;
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).clamp(1, MAX_SEARCH_LIMIT);

        if is_barcode_query(&query) {
            debug!(barcode = %query, "Detected barcode pattern, trying exact lookup");
            if let Some(product) = self.db.products().get_by_barcode(&query).await? {
                return Ok(vec![product]);
            }
        }

        let products = self.db.products().search(&query, limit).await?;

        info!(
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            count = products.len(),
            query = %query,
            "Product search complete"
        );

        Ok(products)
    }
}

// =============================================================================
// AdjustStock
// =============================================================================

/// Manual stock correction (count, breakage, shrinkage).
#[derive(Debug, Clone)]
pub struct AdjustStock {
    db: Database,
}

impl AdjustStock {
    pub fn new(db: Database) -> Self {
        AdjustStock { db }
    }

    /// Adds `delta` (negative removes). Stock never goes below zero.
    pub async fn execute(&self, product_id: &str, delta: i64) -> ApiResult<Product> {
        let product = self.db.products().update_stock(product_id, delta).await?;
        info!(id = %product_id, delta, stock = product.stock_quantity, "Stock adjusted");

        Ok(product)
    }
}
