//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - Full-text search using FTS5
//! - Barcode lookup for the scanner
//! - CRUD with soft delete
//! - Guarded stock movements
//!
//! Every catalog write queues its new state to the sync outbox in the same
//! transaction.
//!
//! ## FTS5 Search
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How FTS5 Search Works                                │
//! │                                                                         │
//! │  User types: "choc mil"                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  MATCH query: "choc"* "mil"*     (every token, prefix match)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │ products_fts (name, barcode)            │                           │
//! │  │                                         │                           │
//! │  │ Chocolate Milk 1L   | 4006381333931    │ ← MATCH                   │
//! │  │ Milk Chocolate Bar  | 7622210449283    │ ← MATCH                   │
//! │  │ Whole Milk 1L       | 5449000000996    │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Joined back to products, deleted/inactive rows dropped, by rank       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, commit};
use crate::repository::sync::queue_entry;
use stockpad_core::{CoreError, Product};

/// Outbox entity type for catalog changes.
pub const PRODUCT_ENTITY: &str = "product";

const PRODUCT_COLUMNS: &str = r#"
    id, remote_id, name, barcode, category_id,
    price_cents, cost_cents, stock_quantity, min_stock, max_stock,
    last_sold_at, is_active, is_deleted, created_at, updated_at, sync_version
"#;

// =============================================================================
// Transaction-friendly statements
// =============================================================================

/// Loads one product through any executor (pool or open transaction).
pub(crate) async fn fetch_product<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");

    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    Ok(product)
}

/// Applies a stock delta, refusing to take stock below zero.
///
/// `sold_at` moves `last_sold_at` forward (never backward) for sale lines.
/// Returns `false` when the guard rejected the movement or the product is
/// missing/deleted.
pub(crate) async fn move_stock<'e, E>(
    executor: E,
    id: &str,
    delta: i64,
    sold_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE products SET
            stock_quantity = stock_quantity + ?2,
            last_sold_at = CASE
                WHEN ?3 IS NOT NULL AND (last_sold_at IS NULL OR last_sold_at < ?3) THEN ?3
                ELSE last_sold_at
            END,
            updated_at = ?4,
            sync_version = sync_version + 1
        WHERE id = ?1
          AND is_deleted = 0
          AND stock_quantity + ?2 >= 0
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(sold_at)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Turns the "all tokens, prefix match" rule into an FTS5 MATCH expression.
/// Double quotes are dropped so user input can't break out of the phrase.
fn fts_query(query: &str) -> Option<String> {
    let tokens: Vec<String> = query
        .split_whitespace()
        .map(|t| t.replace('"', ""))
        .filter(|t| !t.is_empty())
        .map(|t| format!("\"{t}\"*"))
        .collect();

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let hits = repo.search("milk", 20).await?;
/// let scanned = repo.get_by_barcode("4006381333931").await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Searches active products by name or barcode prefix.
    ///
    /// An empty query lists active products by name.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        debug!(query = %query, limit = %limit, "Searching products");

        let Some(fts) = fts_query(query) else {
            return self.list_active(limit).await;
        };

        let sql = format!(
            r#"
            SELECT {cols}
            FROM products p
            INNER JOIN products_fts fts ON p.rowid = fts.rowid
            WHERE products_fts MATCH ?1
              AND p.is_active = 1
              AND p.is_deleted = 0
            ORDER BY rank, p.name
            LIMIT ?2
            "#,
            cols = PRODUCT_COLUMNS
                .split(',')
                .map(|c| format!("p.{}", c.trim()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(fts)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Lists active products by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE is_active = 1 AND is_deleted = 0
            ORDER BY name, id
            LIMIT ?1
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Lists non-deleted products of a category by name.
    pub async fn list_by_category(&self, category_id: &str) -> DbResult<Vec<Product>> {
        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE category_id = ?1 AND is_deleted = 0
            ORDER BY name, id
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Gets a product by its ID, deleted or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        fetch_product(&self.pool, id).await
    }

    /// Gets a non-deleted product by barcode.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        debug!(barcode = %barcode, "Looking up barcode");

        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE barcode = ?1 AND is_deleted = 0"
        );

        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(barcode)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Non-deleted products with `stock_quantity <= threshold`, ordered by
    /// stock, name, then id.
    pub async fn low_stock(&self, threshold: i64) -> DbResult<Vec<Product>> {
        debug!(threshold, "Loading low-stock products");

        let sql = format!(
            r#"
            SELECT {PRODUCT_COLUMNS} FROM products
            WHERE is_deleted = 0 AND stock_quantity <= ?1
            ORDER BY stock_quantity ASC, name ASC, id ASC
            "#
        );

        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(threshold)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Inserts a new product and queues it for sync.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The stored product
    /// * `Err(DbError::UniqueViolation)` - Barcode already in use
    pub async fn insert(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        let payload = serde_json::to_string(product)?;
        let mut tx = begin_write(&self.pool).await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, remote_id, name, barcode, category_id,
                price_cents, cost_cents, stock_quantity, min_stock, max_stock,
                last_sold_at, is_active, is_deleted, created_at, updated_at, sync_version
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9, ?10,
                ?11, ?12, ?13, ?14, ?15, ?16
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.remote_id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(&product.category_id)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock_quantity)
        .bind(product.min_stock)
        .bind(product.max_stock)
        .bind(product.last_sold_at)
        .bind(product.is_active)
        .bind(product.is_deleted)
        .bind(product.created_at)
        .bind(product.updated_at)
        .bind(product.sync_version)
        .execute(&mut *tx)
        .await
        .map_err(|e| barcode_conflict(e, product.barcode.as_deref()))?;

        queue_entry(&mut *tx, PRODUCT_ENTITY, &product.id, &payload, Utc::now()).await?;
        commit(tx).await?;

        Ok(product.clone())
    }

    /// Updates the editable catalog fields of a product.
    ///
    /// Stock is not touched here: it moves only through invoices and
    /// [`ProductRepository::update_stock`].
    ///
    /// ## Returns
    /// * `Ok(Product)` - The row as stored, new `sync_version` included
    /// * `Err(DbError::NotFound)` - Product doesn't exist or is deleted
    pub async fn update(&self, product: &Product) -> DbResult<Product> {
        debug!(id = %product.id, "Updating product");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                remote_id = ?2,
                name = ?3,
                barcode = ?4,
                category_id = ?5,
                price_cents = ?6,
                cost_cents = ?7,
                min_stock = ?8,
                max_stock = ?9,
                is_active = ?10,
                updated_at = ?11,
                sync_version = sync_version + 1
            WHERE id = ?1 AND is_deleted = 0
            "#,
        )
        .bind(&product.id)
        .bind(&product.remote_id)
        .bind(&product.name)
        .bind(&product.barcode)
        .bind(&product.category_id)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.min_stock)
        .bind(product.max_stock)
        .bind(product.is_active)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| barcode_conflict(e, product.barcode.as_deref()))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        let stored = fetch_product(&mut *tx, &product.id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))?;

        let payload = serde_json::to_string(&stored)?;
        queue_entry(&mut *tx, PRODUCT_ENTITY, &stored.id, &payload, now).await?;
        commit(tx).await?;

        Ok(stored)
    }

    /// Adds `delta` to the stock level (negative to remove).
    ///
    /// Stock is a running delta, never overwritten, so concurrent movements
    /// compose: `-3` and `-2` always land as `-5`.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist or is deleted
    /// * `Err(DbError::Rejected(InsufficientStock))` - would go below zero
    pub async fn update_stock(&self, id: &str, delta: i64) -> DbResult<Product> {
        debug!(id = %id, delta = %delta, "Updating stock");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let moved = move_stock(&mut *tx, id, delta, None, now).await?;

        let product = fetch_product(&mut *tx, id)
            .await?
            .filter(|p| !p.is_deleted)
            .ok_or_else(|| DbError::not_found("Product", id))?;

        if !moved {
            return Err(CoreError::InsufficientStock {
                product: product.name,
                available: product.stock_quantity,
                requested: -delta,
            }
            .into());
        }

        let payload = serde_json::to_string(&product)?;
        queue_entry(&mut *tx, PRODUCT_ENTITY, id, &payload, now).await?;
        commit(tx).await?;

        Ok(product)
    }

    /// Soft-deletes a product.
    ///
    /// Invoice lines and sales summaries keep referencing the row, so it is
    /// only flagged. Its barcode is released for reuse.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                is_deleted = 1,
                is_active = 0,
                barcode = NULL,
                updated_at = ?2,
                sync_version = sync_version + 1
            WHERE id = ?1 AND is_deleted = 0
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        let payload = serde_json::json!({ "id": id, "deleted": true }).to_string();
        queue_entry(&mut *tx, PRODUCT_ENTITY, id, &payload, now).await?;
        commit(tx).await?;

        Ok(())
    }

    /// Counts non-deleted products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_deleted = 0")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

fn barcode_conflict(err: sqlx::Error, barcode: Option<&str>) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { field, .. } if field.contains("barcode") => {
            DbError::duplicate("barcode", barcode.unwrap_or_default())
        }
        other => other,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::memory_db;
    use chrono::Duration;

    fn product(name: &str, barcode: &str, stock: i64) -> Product {
        Product::new(name, 500, 300)
            .with_barcode(barcode)
            .with_stock(stock)
    }

    #[test]
    fn test_fts_query_building() {
        assert_eq!(fts_query("  "), None);
        assert_eq!(fts_query("milk").as_deref(), Some("\"milk\"*"));
        assert_eq!(fts_query("choc  mil").as_deref(), Some("\"choc\"* \"mil\"*"));
        assert_eq!(fts_query("a\"b").as_deref(), Some("\"ab\"*"));
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = memory_db().await;
        let repo = db.products();
        let milk = repo.insert(&product("Whole Milk", "5449000000996", 10)).await.unwrap();

        let found = repo.get_by_id(&milk.id).await.unwrap().unwrap();
        assert_eq!(found.name, "Whole Milk");
        assert_eq!(found.stock_quantity, 10);
        assert_eq!(found.created_at, milk.created_at);

        let scanned = repo.get_by_barcode("5449000000996").await.unwrap().unwrap();
        assert_eq!(scanned.id, milk.id);
        assert!(repo.get_by_barcode("000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_barcode_rejected() {
        let db = memory_db().await;
        let repo = db.products();
        repo.insert(&product("Milk", "123", 1)).await.unwrap();

        let err = repo.insert(&product("Other", "123", 1)).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "barcode"));
    }

    #[tokio::test]
    async fn test_search_prefix_and_empty_query() {
        let db = memory_db().await;
        let repo = db.products();
        repo.insert(&product("Chocolate Milk", "111", 1)).await.unwrap();
        repo.insert(&product("Milk Chocolate Bar", "222", 1)).await.unwrap();
        repo.insert(&product("Orange Juice", "333", 1)).await.unwrap();

        let hits = repo.search("choc mil", 20).await.unwrap();
        assert_eq!(hits.len(), 2);

        let by_barcode = repo.search("33", 20).await.unwrap();
        assert_eq!(by_barcode.len(), 1);
        assert_eq!(by_barcode[0].name, "Orange Juice");

        let all = repo.search("", 20).await.unwrap();
        let names: Vec<&str> = all.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Chocolate Milk", "Milk Chocolate Bar", "Orange Juice"]);
    }

    #[tokio::test]
    async fn test_search_follows_renames_and_skips_deleted() {
        let db = memory_db().await;
        let repo = db.products();
        let mut tea = repo.insert(&product("Green Tea", "444", 1)).await.unwrap();

        tea.name = "Jasmine Tea".to_string();
        repo.update(&tea).await.unwrap();
        assert!(repo.search("green", 20).await.unwrap().is_empty());
        assert_eq!(repo.search("jasm", 20).await.unwrap().len(), 1);

        repo.soft_delete(&tea.id).await.unwrap();
        assert!(repo.search("jasm", 20).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let db = memory_db().await;
        let err = db.products().update(&product("Ghost", "999", 0)).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_update_stock_guards_negative() {
        let db = memory_db().await;
        let repo = db.products();
        let milk = repo.insert(&product("Milk", "1", 3)).await.unwrap();

        let after = repo.update_stock(&milk.id, 5).await.unwrap();
        assert_eq!(after.stock_quantity, 8);
        assert!(after.sync_version > milk.sync_version);

        let err = repo.update_stock(&milk.id, -9).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Rejected(CoreError::InsufficientStock { available: 8, requested: 9, .. })
        ));

        let err = repo.update_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_move_stock_only_advances_last_sold_at() {
        let db = memory_db().await;
        let repo = db.products();
        let milk = repo.insert(&product("Milk", "1", 10)).await.unwrap();
        let now = Utc::now();
        let earlier = now - Duration::days(3);

        assert!(move_stock(db.pool(), &milk.id, -1, Some(now), now).await.unwrap());
        assert!(move_stock(db.pool(), &milk.id, -1, Some(earlier), now).await.unwrap());

        let stored = repo.get_by_id(&milk.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 8);
        assert_eq!(stored.last_sold_at, Some(now));
    }

    #[tokio::test]
    async fn test_soft_delete_releases_barcode() {
        let db = memory_db().await;
        let repo = db.products();
        let milk = repo.insert(&product("Milk", "555", 1)).await.unwrap();

        repo.soft_delete(&milk.id).await.unwrap();
        assert!(repo.get_by_barcode("555").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);

        let deleted = repo.get_by_id(&milk.id).await.unwrap().unwrap();
        assert!(deleted.is_deleted);

        repo.insert(&product("New Milk", "555", 1)).await.unwrap();
        assert!(matches!(
            repo.soft_delete(&milk.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_catalog_writes_queue_with_their_change() {
        let db = memory_db().await;
        let repo = db.products();
        let outbox = db.sync_outbox();

        let mut milk = repo.insert(&product("Milk", "1", 3)).await.unwrap();
        milk.price_cents = 650;
        let updated = repo.update(&milk).await.unwrap();
        assert_eq!(updated.price_cents, 650);
        assert!(updated.sync_version > milk.sync_version);

        repo.update_stock(&milk.id, 2).await.unwrap();
        repo.soft_delete(&milk.id).await.unwrap();

        let queued = outbox.get_pending(10).await.unwrap();
        assert_eq!(queued.len(), 4);
        assert!(queued
            .iter()
            .all(|e| e.entity_type == PRODUCT_ENTITY && e.entity_id == milk.id));

        let prices: Vec<i64> = queued
            .iter()
            .filter_map(|e| serde_json::from_str::<Product>(&e.payload).ok())
            .map(|p| p.price_cents)
            .collect();
        assert_eq!(prices.len(), 3);
        assert!(prices.contains(&500));
        assert!(prices.contains(&650));
    }

    #[tokio::test]
    async fn test_rejected_catalog_writes_queue_nothing() {
        let db = memory_db().await;
        let repo = db.products();
        let milk = repo.insert(&product("Milk", "1", 3)).await.unwrap();

        assert!(repo.insert(&product("Other Milk", "1", 1)).await.is_err());
        assert!(repo.update_stock(&milk.id, -10).await.is_err());
        assert!(repo.soft_delete("missing").await.is_err());

        assert_eq!(db.sync_outbox().count_pending().await.unwrap(), 1);
        assert_eq!(repo.get_by_id(&milk.id).await.unwrap().unwrap().stock_quantity, 3);
    }

    #[tokio::test]
    async fn test_low_stock_order() {
        let db = memory_db().await;
        let repo = db.products();
        repo.insert(&product("Bread", "1", 2)).await.unwrap();
        repo.insert(&product("Apples", "2", 2)).await.unwrap();
        repo.insert(&product("Cheese", "3", 0)).await.unwrap();
        repo.insert(&product("Rice", "4", 9)).await.unwrap();
        let gone = repo.insert(&product("Eggs", "5", 1)).await.unwrap();
        repo.soft_delete(&gone.id).await.unwrap();

        let low = repo.low_stock(2).await.unwrap();
        let names: Vec<&str> = low.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Cheese", "Apples", "Bread"]);
    }

    #[tokio::test]
    async fn test_list_by_category() {
        let db = memory_db().await;
        let dairy = stockpad_core::Category::new("Dairy", None);
        db.categories().insert(&dairy).await.unwrap();

        let repo = db.products();
        repo.insert(&product("Milk", "1", 1).with_category(&dairy.id)).await.unwrap();
        repo.insert(&product("Rice", "2", 1)).await.unwrap();

        let listed = repo.list_by_category(&dairy.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Milk");
    }
}
