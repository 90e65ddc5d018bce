//! Cart management.

use sqlx::PgPool;

use bazaar_core::CartItemId;

use crate::cache::{CacheRegistry, Mutation};
use crate::db::carts::CartRepository;
use crate::db::products::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::{AddCartItemRequest, CartItemView, User};

/// Service for cart operations. Every operation is scoped to the
/// authenticated user's own cart.
pub struct CartService<'a> {
    carts: CartRepository<'a>,
    products: ProductRepository<'a>,
    cache: &'a CacheRegistry,
}

impl<'a> CartService<'a> {
    /// Create a new cart service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CacheRegistry) -> Self {
        Self {
            carts: CartRepository::new(pool),
            products: ProductRepository::new(pool),
            cache,
        }
    }

    /// Create the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AlreadyExists` if the user already has one.
    pub async fn create(&self, user: &User) -> Result<()> {
        self.carts.create(user.id).await.map_err(|e| match e {
            crate::db::RepositoryError::Conflict(_) => AppError::AlreadyExists("Cart"),
            other => AppError::Repository(other),
        })?;
        Ok(())
    }

    /// List the items in the user's cart, cached in the `cart-items`
    /// namespace under the user's id. A user without a cart sees an empty
    /// list.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Repository` if the query fails.
    pub async fn items(&self, user: &User) -> Result<Vec<CartItemView>> {
        if let Some(views) = self.cache.cart_items().get(&user.id).await {
            return Ok(views);
        }

        let Some(cart) = self.carts.get_by_user(user.id).await? else {
            return Ok(Vec::new());
        };

        let views = self.carts.list_items(cart.id).await?;
        self.cache.cart_items().insert(user.id, views.clone()).await;
        Ok(views)
    }

    /// Delete the user's cart and all of its items.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no cart.
    pub async fn delete(&self, user: &User) -> Result<()> {
        let cart = self
            .carts
            .get_by_user(user.id)
            .await?
            .ok_or(AppError::NotFound("Cart"))?;

        self.carts.delete(cart.id).await?;
        self.cache.apply(Mutation::CartCleared { user: user.id }).await;
        Ok(())
    }

    /// Add a product to the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no cart or the product
    /// does not exist, and `AppError::AlreadyExists` if the product is
    /// already in the cart.
    pub async fn add_item(
        &self,
        user: &User,
        request: AddCartItemRequest,
    ) -> Result<CartItemView> {
        request.validate().map_err(AppError::InvalidRequest)?;

        let cart = self
            .carts
            .get_by_user(user.id)
            .await?
            .ok_or(AppError::NotFound("Cart"))?;

        let product = self
            .products
            .get_by_id(request.product_id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;

        let item = self
            .carts
            .insert_item(cart.id, product.id, request.quantity)
            .await
            .map_err(|e| match e {
                crate::db::RepositoryError::Conflict(_) => AppError::AlreadyExists("Cart item"),
                other => AppError::Repository(other),
            })?;

        self.cache
            .apply(Mutation::CartItemAdded { user: user.id })
            .await;

        Ok(CartItemView {
            id: item.id,
            quantity: item.quantity,
            product: (&product).into(),
        })
    }

    /// Fetch one item from the user's cart, cached in the `cart-item`
    /// namespace.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the user has no cart, the item does
    /// not exist, or it belongs to someone else's cart (deliberately
    /// indistinguishable).
    pub async fn get_item(&self, user: &User, id: CartItemId) -> Result<CartItemView> {
        self.carts
            .get_by_user(user.id)
            .await?
            .ok_or(AppError::NotFound("Cart"))?;

        if let Some((view, owner)) = self.cache.cart_item().get(&id).await {
            if owner != user.id {
                return Err(AppError::NotFound("Cart item"));
            }
            return Ok(view);
        }

        let (view, owner) = self
            .carts
            .get_item(id)
            .await?
            .ok_or(AppError::NotFound("Cart item"))?;
        if owner != user.id {
            return Err(AppError::NotFound("Cart item"));
        }

        self.cache.cart_item().insert(id, (view.clone(), owner)).await;
        Ok(view)
    }

    /// Change the quantity of an item in the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for missing or foreign items.
    pub async fn update_item(
        &self,
        user: &User,
        id: CartItemId,
        quantity: i32,
    ) -> Result<CartItemView> {
        if quantity <= 0 {
            return Err(AppError::InvalidRequest(
                "Quantity must be positive".to_owned(),
            ));
        }

        self.carts
            .get_by_user(user.id)
            .await?
            .ok_or(AppError::NotFound("Cart"))?;

        let (mut view, owner) = self
            .carts
            .get_item(id)
            .await?
            .ok_or(AppError::NotFound("Cart item"))?;
        if owner != user.id {
            return Err(AppError::NotFound("Cart item"));
        }

        self.carts.update_item_quantity(id, quantity).await?;
        view.quantity = quantity;

        self.cache
            .apply(Mutation::CartItemUpdated {
                user: user.id,
                item: id,
            })
            .await;
        self.cache.cart_item().insert(id, (view.clone(), owner)).await;

        Ok(view)
    }

    /// Remove an item from the user's cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for missing or foreign items.
    pub async fn delete_item(&self, user: &User, id: CartItemId) -> Result<()> {
        self.carts
            .get_by_user(user.id)
            .await?
            .ok_or(AppError::NotFound("Cart"))?;

        let (_, owner) = self
            .carts
            .get_item(id)
            .await?
            .ok_or(AppError::NotFound("Cart item"))?;
        if owner != user.id {
            return Err(AppError::NotFound("Cart item"));
        }

        self.carts.delete_item(id).await?;
        self.cache
            .apply(Mutation::CartItemDeleted {
                user: user.id,
                item: id,
            })
            .await;
        Ok(())
    }
}
