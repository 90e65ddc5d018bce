//! Product repository.

use sqlx::PgPool;

use bazaar_core::{ProductId, UserId};

use super::RepositoryError;
use crate::models::{NewProduct, Product, ProductSearch};

const PRODUCT_COLUMNS: &str = "p.id, p.name, p.description, p.price, p.stock_quantity, \
     p.active, p.category_id, p.seller_id, p.created_at, p.updated_at";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn insert(&self, new_product: &NewProduct) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            "INSERT INTO products (name, description, price, stock_quantity, category_id, seller_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, name, description, price, stock_quantity, active, category_id, \
                       seller_id, created_at, updated_at",
        )
        .bind(&new_product.name)
        .bind(&new_product.description)
        .bind(new_product.price)
        .bind(new_product.stock_quantity)
        .bind(new_product.category_id)
        .bind(new_product.seller_id)
        .fetch_one(self.pool)
        .await?;
        Ok(product)
    }

    /// Get a product by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(product)
    }

    /// List products ordered by category name then product name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, page: u32, size: u32) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             JOIN categories c ON c.id = p.category_id \
             ORDER BY c.name, p.name LIMIT $1 OFFSET $2"
        ))
        .bind(i64::from(size))
        .bind(i64::from(page) * i64::from(size))
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Persist updated product fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update(&self, product: &Product) -> Result<Product, RepositoryError> {
        let updated = sqlx::query_as::<_, Product>(
            "UPDATE products SET name = $2, description = $3, price = $4, stock_quantity = $5, \
             active = $6, category_id = $7, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, name, description, price, stock_quantity, active, category_id, \
                       seller_id, created_at, updated_at",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(product.stock_quantity)
        .bind(product.active)
        .bind(product.category_id)
        .fetch_one(self.pool)
        .await?;
        Ok(updated)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Search by name substring, category, and price window.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn search(
        &self,
        filters: &ProductSearch,
        page: u32,
        size: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p \
             JOIN categories c ON c.id = p.category_id \
             WHERE p.name ILIKE $1 \
               AND ($2::BIGINT IS NULL OR p.category_id = $2) \
               AND ($3::NUMERIC IS NULL OR p.price >= $3) \
               AND ($4::NUMERIC IS NULL OR p.price <= $4) \
             ORDER BY c.name, p.name LIMIT $5 OFFSET $6"
        ))
        .bind(format!("%{}%", filters.name.as_deref().unwrap_or("")))
        .bind(filters.category_id)
        .bind(filters.min_price)
        .bind(filters.max_price)
        .bind(i64::from(size))
        .bind(i64::from(page) * i64::from(size))
        .fetch_all(self.pool)
        .await?;
        Ok(products)
    }

    /// Deactivate every product listed by the given seller. Returns the
    /// number of affected rows.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn deactivate_by_seller(&self, seller: UserId) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE products SET active = FALSE, updated_at = now() WHERE seller_id = $1",
        )
        .bind(seller)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
