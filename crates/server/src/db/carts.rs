//! Cart and cart-item repository.

use rust_decimal::Decimal;
use sqlx::PgPool;

use bazaar_core::{CartId, CartItemId, CategoryId, ProductId, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{Cart, CartItem, CartItemView, ProductView};

/// Joined cart-item + product row, flattened with aliased columns.
#[derive(sqlx::FromRow)]
struct CartItemProductRow {
    id: CartItemId,
    quantity: i32,
    cart_user_id: UserId,
    product_id: ProductId,
    product_name: String,
    product_description: String,
    product_price: Decimal,
    product_stock_quantity: i32,
    product_active: bool,
    product_category_id: CategoryId,
    product_seller_id: UserId,
}

impl CartItemProductRow {
    fn into_view(self) -> (CartItemView, UserId) {
        let owner = self.cart_user_id;
        let view = CartItemView {
            id: self.id,
            quantity: self.quantity,
            product: ProductView {
                id: self.product_id,
                name: self.product_name,
                description: self.product_description,
                price: self.product_price,
                stock_quantity: self.product_stock_quantity,
                active: self.product_active,
                category_id: self.product_category_id,
                seller_id: self.product_seller_id,
            },
        };
        (view, owner)
    }
}

const ITEM_SELECT: &str = "SELECT ci.id, ci.quantity, c.user_id AS cart_user_id, \
     p.id AS product_id, p.name AS product_name, p.description AS product_description, \
     p.price AS product_price, p.stock_quantity AS product_stock_quantity, \
     p.active AS product_active, p.category_id AS product_category_id, \
     p.seller_id AS product_seller_id \
     FROM cart_items ci \
     JOIN carts c ON c.id = ci.cart_id \
     JOIN products p ON p.id = ci.product_id";

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Create a cart for the user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the user already has one.
    pub async fn create(&self, user: UserId) -> Result<Cart, RepositoryError> {
        sqlx::query_as::<_, Cart>(
            "INSERT INTO carts (user_id) VALUES ($1) RETURNING id, user_id, created_at",
        )
        .bind(user)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "cart"))
    }

    /// Get the user's cart, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_user(&self, user: UserId) -> Result<Option<Cart>, RepositoryError> {
        let cart = sqlx::query_as::<_, Cart>(
            "SELECT id, user_id, created_at FROM carts WHERE user_id = $1",
        )
        .bind(user)
        .fetch_optional(self.pool)
        .await?;
        Ok(cart)
    }

    /// Delete a cart (its items cascade).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM carts WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// List the items in a cart, with their products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_items(&self, cart: CartId) -> Result<Vec<CartItemView>, RepositoryError> {
        let rows = sqlx::query_as::<_, CartItemProductRow>(&format!(
            "{ITEM_SELECT} WHERE ci.cart_id = $1 ORDER BY ci.id"
        ))
        .bind(cart)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|row| row.into_view().0).collect())
    }

    /// Look up an item by id, returning its view and the cart owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_item(
        &self,
        item: CartItemId,
    ) -> Result<Option<(CartItemView, UserId)>, RepositoryError> {
        let row = sqlx::query_as::<_, CartItemProductRow>(&format!(
            "{ITEM_SELECT} WHERE ci.id = $1"
        ))
        .bind(item)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(CartItemProductRow::into_view))
    }

    /// Add a product to a cart.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the product is already in the
    /// cart.
    pub async fn insert_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError> {
        sqlx::query_as::<_, CartItem>(
            "INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3) \
             RETURNING id, cart_id, product_id, quantity, created_at, updated_at",
        )
        .bind(cart)
        .bind(product)
        .bind(quantity)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "cart item"))
    }

    /// Change an item's quantity.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_item_quantity(
        &self,
        item: CartItemId,
        quantity: i32,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE cart_items SET quantity = $2, updated_at = now() WHERE id = $1")
            .bind(item)
            .bind(quantity)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Remove an item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_item(&self, item: CartItemId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
