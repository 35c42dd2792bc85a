//! # Product Repository
//!
//! Database operations for the product catalog.
//!
//! ## Key Operations
//! - CRUD with soft delete
//! - Name/SKU search
//! - Low-stock listing for reordering
//!
//! Stock *changes* never happen here. All inventory movement goes through
//! the stock ledger ([`crate::repository::stock`]) or the transaction scopes
//! in the sale and return repositories, so every movement is audited.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::debug;

use creamline_core::validation::{validate_name, validate_price_cents, validate_sku};
use creamline_core::{Product, ProductCategory, StockTransactionType};

use crate::error::{DbError, DbResult};
use crate::repository::{insert_stock_audit, new_id};

const COLUMNS: &str = "id, sku, name, category, price_cents, wholesale_price_cents, \
     stock, reorder_level, is_active, created_at, updated_at";

/// Input for creating a product.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    #[serde(default)]
    pub category: ProductCategory,
    pub price_cents: i64,
    pub wholesale_price_cents: Option<i64>,
    /// Opening stock. Non-zero values write an AddStockInventory ledger row.
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub reorder_level: i64,
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = ProductRepository::new(pool);
/// let results = repo.search("yogurt", 20).await?;
/// let product = repo.get_by_id("uuid-here").await?;
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

    /// Creates a product, recording opening stock in the ledger.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product
    /// * `Err(DbError::UniqueViolation)` - SKU already exists
    pub async fn create(&self, input: NewProduct, staff_id: &str) -> DbResult<Product> {
        validate_sku(&input.sku).map_err(creamline_core::CoreError::from)?;
        validate_name("name", &input.name).map_err(creamline_core::CoreError::from)?;
        validate_price_cents(input.price_cents).map_err(creamline_core::CoreError::from)?;
        if input.stock < 0 {
            return Err(DbError::Domain(creamline_core::CoreError::InvalidRequest(
                "opening stock must not be negative".into(),
            )));
        }

        debug!(sku = %input.sku, "Creating product");

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            sku: input.sku.trim().to_string(),
            name: input.name.trim().to_string(),
            category: input.category,
            price_cents: input.price_cents,
            wholesale_price_cents: input.wholesale_price_cents,
            stock: input.stock,
            reorder_level: input.reorder_level,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, sku, name, category, price_cents, wholesale_price_cents,
                stock, reorder_level, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.category)
        .bind(product.price_cents)
        .bind(product.wholesale_price_cents)
        .bind(product.stock)
        .bind(product.reorder_level)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *tx)
        .await?;

        if product.stock > 0 {
            insert_stock_audit(
                &mut *tx,
                &product,
                StockTransactionType::AddStockInventory,
                product.stock,
                0,
                product.stock,
                None,
                staff_id,
                Some("Opening stock"),
                now,
            )
            .await?;
        }

        tx.commit().await?;
        Ok(product)
    }

    /// Gets a product by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Gets a product by its SKU.
    pub async fn get_by_sku(&self, sku: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE sku = ?1", COLUMNS);
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Lists active products sorted by name.
    pub async fn list_active(&self, limit: u32) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE is_active = 1 ORDER BY name LIMIT ?1",
            COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Searches active products by name or SKU substring.
    ///
    /// Empty query falls back to the active listing.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = query.trim();

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            return self.list_active(limit).await;
        }

        let pattern = format!("%{}%", query);
        let sql = format!(
            "SELECT {} FROM products \
             WHERE is_active = 1 AND (name LIKE ?1 OR sku LIKE ?1) \
             ORDER BY name LIMIT ?2",
            COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Updates catalog fields (prices, name, category, reorder level).
    ///
    /// Stock is deliberately not updatable here.
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, "Updating product");

        validate_name("name", &product.name).map_err(creamline_core::CoreError::from)?;
        validate_price_cents(product.price_cents).map_err(creamline_core::CoreError::from)?;

        let now = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                category = ?3,
                price_cents = ?4,
                wholesale_price_cents = ?5,
                reorder_level = ?6,
                is_active = ?7,
                updated_at = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(product.category)
        .bind(product.price_cents)
        .bind(product.wholesale_price_cents)
        .bind(product.reorder_level)
        .bind(product.is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", &product.id));
        }

        Ok(())
    }

    /// Soft-deletes a product by setting is_active = false.
    ///
    /// Historical sales and returns still reference it; it can be restored.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Soft-deleting product");

        let now = Utc::now();

        let result = sqlx::query("UPDATE products SET is_active = 0, updated_at = ?2 WHERE id = ?1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Lists active products at or below their reorder level.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products \
             WHERE is_active = 1 AND stock <= reorder_level \
             ORDER BY stock ASC",
            COLUMNS
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts active products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn yogurt() -> NewProduct {
        NewProduct {
            sku: "YOG-500".into(),
            name: "Set Yogurt 500ml".into(),
            category: ProductCategory::Yogurt,
            price_cents: 150,
            wholesale_price_cents: Some(120),
            stock: 20,
            reorder_level: 5,
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo.create(yogurt(), "staff-1").await.unwrap();
        assert_eq!(created.stock, 20);

        let fetched = repo.get_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.sku, "YOG-500");
        assert_eq!(fetched.category, ProductCategory::Yogurt);
        assert_eq!(fetched.wholesale_price_cents, Some(120));

        let by_sku = repo.get_by_sku("YOG-500").await.unwrap().unwrap();
        assert_eq!(by_sku.id, created.id);
    }

    #[tokio::test]
    async fn test_opening_stock_writes_ledger_row() {
        let db = test_db().await;
        let created = db.products().create(yogurt(), "staff-1").await.unwrap();

        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_transactions WHERE product_id = ?1 AND tx_type = 'add_stock_inventory'",
        )
        .bind(&created.id)
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_duplicate_sku_rejected() {
        let db = test_db().await;
        let repo = db.products();

        repo.create(yogurt(), "staff-1").await.unwrap();
        let err = repo.create(yogurt(), "staff-1").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_search_and_low_stock() {
        let db = test_db().await;
        let repo = db.products();

        repo.create(yogurt(), "staff-1").await.unwrap();
        let mut drink = yogurt();
        drink.sku = "MILK-1L".into();
        drink.name = "Fresh Milk 1L".into();
        drink.category = ProductCategory::Drink;
        drink.stock = 3;
        drink.reorder_level = 5;
        repo.create(drink, "staff-1").await.unwrap();

        let hits = repo.search("milk", 10).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sku, "MILK-1L");

        let low = repo.low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].sku, "MILK-1L");
    }

    #[tokio::test]
    async fn test_soft_delete_hides_from_listing() {
        let db = test_db().await;
        let repo = db.products();

        let created = repo.create(yogurt(), "staff-1").await.unwrap();
        repo.soft_delete(&created.id).await.unwrap();

        assert_eq!(repo.list_active(10).await.unwrap().len(), 0);
        // Still fetchable by id for history
        assert!(repo.get_by_id(&created.id).await.unwrap().is_some());
    }
}
