//! Product catalog management.

use sqlx::PgPool;

use bazaar_core::ProductId;

use crate::cache::{CacheRegistry, Mutation};
use crate::db::categories::CategoryRepository;
use crate::db::products::ProductRepository;
use crate::error::{AppError, Result};
use crate::models::{
    AddProductRequest, NewProduct, ProductSearch, ProductUpdate, ProductView, User,
};

/// Service for product operations.
pub struct ProductService<'a> {
    products: ProductRepository<'a>,
    categories: CategoryRepository<'a>,
    cache: &'a CacheRegistry,
}

impl<'a> ProductService<'a> {
    /// Create a new product service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CacheRegistry) -> Self {
        Self {
            products: ProductRepository::new(pool),
            categories: CategoryRepository::new(pool),
            cache,
        }
    }

    /// List a new product for the given seller.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRequest` on validation failure and
    /// `AppError::NotFound` for an unknown category.
    pub async fn add(&self, request: AddProductRequest, seller: &User) -> Result<ProductView> {
        request.validate().map_err(AppError::InvalidRequest)?;

        self.categories
            .get_by_id(request.category_id)
            .await?
            .ok_or(AppError::NotFound("Category"))?;

        let product = self
            .products
            .insert(&NewProduct {
                name: request.name,
                description: request.description,
                price: request.price,
                stock_quantity: request.stock_quantity,
                category_id: request.category_id,
                seller_id: seller.id,
            })
            .await?;

        self.cache.apply(Mutation::ProductAdded).await;
        Ok(ProductView::from(&product))
    }

    /// List products, cached in the `products` namespace under `page-size`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRequest` for out-of-range pagination.
    pub async fn list(&self, page: i64, size: i64) -> Result<Vec<ProductView>> {
        let (page, size) = validated_page(page, size)?;
        let key = CacheRegistry::page_key(page, size);
        if let Some(views) = self.cache.products().get(&key).await {
            return Ok(views);
        }

        let products = self.products.list(page, size).await?;
        let views: Vec<ProductView> = products.iter().map(ProductView::from).collect();
        self.cache.products().insert(key, views.clone()).await;
        Ok(views)
    }

    /// Fetch one product, cached in the `product` namespace.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for unknown ids.
    pub async fn get(&self, id: ProductId) -> Result<ProductView> {
        if let Some(view) = self.cache.product().get(&id).await {
            return Ok(view);
        }

        let product = self
            .products
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;

        let view = ProductView::from(&product);
        self.cache.product().insert(id, view.clone()).await;
        Ok(view)
    }

    /// Apply a typed partial update to a product the user owns.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the user is not the seller and
    /// `AppError::NotFound` for unknown products or categories.
    pub async fn update(
        &self,
        user: &User,
        id: ProductId,
        update: ProductUpdate,
    ) -> Result<ProductView> {
        update.validate().map_err(AppError::InvalidRequest)?;

        let mut product = self
            .products
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;

        if product.seller_id != user.id {
            return Err(AppError::Forbidden);
        }

        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if let Some(stock_quantity) = update.stock_quantity {
            product.stock_quantity = stock_quantity;
        }
        if let Some(active) = update.active {
            product.active = active;
        }
        if let Some(category_id) = update.category_id {
            self.categories
                .get_by_id(category_id)
                .await?
                .ok_or(AppError::NotFound("Category"))?;
            product.category_id = category_id;
        }

        let updated = self.products.update(&product).await?;
        let view = ProductView::from(&updated);

        self.cache.apply(Mutation::ProductUpdated(id)).await;
        self.cache.product().insert(id, view.clone()).await;

        Ok(view)
    }

    /// Delete a product the user owns.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` when the user is not the seller.
    pub async fn delete(&self, user: &User, id: ProductId) -> Result<()> {
        let product = self
            .products
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Product"))?;

        if product.seller_id != user.id {
            return Err(AppError::Forbidden);
        }

        self.products.delete(id).await?;
        self.cache.apply(Mutation::ProductDeleted(id)).await;
        Ok(())
    }

    /// Search products, cached in the `searched-products` namespace under the
    /// page, size, and filter combination.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRequest` for invalid filters or pagination.
    pub async fn search(
        &self,
        filters: ProductSearch,
        page: i64,
        size: i64,
    ) -> Result<Vec<ProductView>> {
        filters.validate().map_err(AppError::InvalidRequest)?;
        let (page, size) = validated_page(page, size)?;

        let key = CacheRegistry::search_key(page, size, &filters.cache_key_part());
        if let Some(views) = self.cache.searched_products().get(&key).await {
            return Ok(views);
        }

        let products = self.products.search(&filters, page, size).await?;
        let views: Vec<ProductView> = products.iter().map(ProductView::from).collect();
        self.cache.searched_products().insert(key, views.clone()).await;
        Ok(views)
    }
}

fn validated_page(page: i64, size: i64) -> Result<(u32, u32)> {
    if page < 0 {
        return Err(AppError::InvalidRequest(
            "Page number cannot be negative".to_owned(),
        ));
    }
    if size <= 0 || size > 100 {
        return Err(AppError::InvalidRequest(
            "Page size must be between 1 and 100".to_owned(),
        ));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // bounds checked above
    let bounded = (page as u32, size as u32);
    Ok(bounded)
}
