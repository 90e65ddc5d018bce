//! Category management.

use sqlx::PgPool;

use bazaar_core::CategoryId;

use crate::cache::{CacheRegistry, Mutation};
use crate::db::categories::CategoryRepository;
use crate::error::{AppError, Result};
use crate::models::CategoryView;

/// Cache key for the full category listing.
const ALL_CATEGORIES_KEY: &str = "all";

/// Service for category operations.
pub struct CategoryService<'a> {
    categories: CategoryRepository<'a>,
    cache: &'a CacheRegistry,
}

impl<'a> CategoryService<'a> {
    /// Create a new category service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CacheRegistry) -> Self {
        Self {
            categories: CategoryRepository::new(pool),
            cache,
        }
    }

    /// Create a category with a unique name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::AlreadyExists` when the name is taken.
    pub async fn add(&self, name: &str) -> Result<CategoryView> {
        let name = validated_name(name)?;

        if self.categories.get_by_name(name).await?.is_some() {
            return Err(AppError::AlreadyExists("Category"));
        }

        let category = self.categories.insert(name).await?;
        self.cache.apply(Mutation::CategoryAdded).await;

        Ok(CategoryView::from(&category))
    }

    /// List every category, cached in the `categories` namespace.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<CategoryView>> {
        let key = ALL_CATEGORIES_KEY.to_owned();
        if let Some(views) = self.cache.categories().get(&key).await {
            return Ok(views);
        }

        let categories = self.categories.list_all().await?;
        let views: Vec<CategoryView> = categories.iter().map(CategoryView::from).collect();
        self.cache.categories().insert(key, views.clone()).await;
        Ok(views)
    }

    /// Fetch one category, cached in the `category` namespace.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for unknown ids.
    pub async fn get(&self, id: CategoryId) -> Result<CategoryView> {
        if let Some(view) = self.cache.category().get(&id).await {
            return Ok(view);
        }

        let category = self
            .categories
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Category"))?;

        let view = CategoryView::from(&category);
        self.cache.category().insert(id, view.clone()).await;
        Ok(view)
    }

    /// Rename a category.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for unknown ids and
    /// `AppError::AlreadyExists` when the new name is taken.
    pub async fn update(&self, id: CategoryId, name: &str) -> Result<CategoryView> {
        let name = validated_name(name)?;

        self.categories
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Category"))?;
        if self.categories.get_by_name(name).await?.is_some() {
            return Err(AppError::AlreadyExists("Category"));
        }

        let category = self.categories.update_name(id, name).await?;
        let view = CategoryView::from(&category);

        self.cache.apply(Mutation::CategoryUpdated(id)).await;
        self.cache.category().insert(id, view.clone()).await;

        Ok(view)
    }

    /// Delete a category.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for unknown ids.
    pub async fn delete(&self, id: CategoryId) -> Result<()> {
        self.categories
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Category"))?;

        self.categories.delete(id).await?;
        self.cache.apply(Mutation::CategoryDeleted(id)).await;
        Ok(())
    }
}

fn validated_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidRequest(
            "Category name must not be blank".to_owned(),
        ));
    }
    Ok(trimmed)
}
