//! Administrative user management.

use chrono::Utc;
use sqlx::PgPool;

use bazaar_core::{Role, UserId};

use crate::cache::{CacheRegistry, Mutation};
use crate::db::products::ProductRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::models::UserView;

/// Largest allowed page size for user listings.
const MAX_PAGE_SIZE: i64 = 100;

/// Service for admin-only user management.
pub struct AdminService<'a> {
    users: UserRepository<'a>,
    products: ProductRepository<'a>,
    cache: &'a CacheRegistry,
}

impl<'a> AdminService<'a> {
    /// Create a new admin service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CacheRegistry) -> Self {
        Self {
            users: UserRepository::new(pool),
            products: ProductRepository::new(pool),
            cache,
        }
    }

    /// List sellers and buyers (admins excluded), one page at a time.
    ///
    /// Results are cached in the `users` namespace under `page-size`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRequest` for out-of-range pagination.
    pub async fn list_users(&self, page: i64, size: i64) -> Result<Vec<UserView>> {
        if page < 0 {
            return Err(AppError::InvalidRequest(
                "Page number cannot be negative".to_owned(),
            ));
        }
        if size <= 0 {
            return Err(AppError::InvalidRequest(
                "Page size must be greater than 0".to_owned(),
            ));
        }
        if size > MAX_PAGE_SIZE {
            return Err(AppError::InvalidRequest(
                "Page size cannot exceed 100".to_owned(),
            ));
        }

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // bounds checked above
        let (page, size) = (page as u32, size as u32);
        let key = CacheRegistry::page_key(page, size);
        if let Some(views) = self.cache.users().get(&key).await {
            return Ok(views);
        }

        let users = self.users.list_non_admin(page, size).await?;
        let views: Vec<UserView> = users.iter().map(UserView::from).collect();
        self.cache.users().insert(key, views.clone()).await;
        Ok(views)
    }

    /// Fetch one non-admin user's details, cached in the `user` namespace.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` for missing or soft-deleted users and
    /// `AppError::Forbidden` when the target is an admin.
    pub async fn user_details(&self, id: i64) -> Result<UserView> {
        if id <= 0 {
            return Err(AppError::InvalidRequest(
                "User ID must be a positive number".to_owned(),
            ));
        }
        let id = UserId::new(id);

        if let Some(view) = self.cache.user().get(&id).await {
            return Ok(view);
        }

        let user = self
            .users
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        if user.role == Role::Admin {
            return Err(AppError::Forbidden);
        }
        if user.is_deleted {
            return Err(AppError::NotFound("User"));
        }

        let view = UserView::from(&user);
        self.cache.user().insert(id, view.clone()).await;
        Ok(view)
    }

    /// Soft-delete a user by id.
    ///
    /// Admin accounts cannot be deleted through this path. A seller's
    /// products are deactivated alongside.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Forbidden` for admin targets,
    /// `AppError::NotFound` for unknown ids, and `AppError::InvalidRequest`
    /// if the user is already deleted.
    pub async fn delete_user(&self, id: i64) -> Result<()> {
        if id <= 0 {
            return Err(AppError::InvalidRequest(
                "User ID must be a positive number".to_owned(),
            ));
        }
        let id = UserId::new(id);

        let user = self
            .users
            .get_by_id(id)
            .await?
            .ok_or(AppError::NotFound("User"))?;

        if user.role == Role::Admin {
            return Err(AppError::Forbidden);
        }
        if user.is_deleted {
            return Err(AppError::InvalidRequest("User already deleted".to_owned()));
        }

        self.users
            .soft_delete(user.id, Utc::now().date_naive())
            .await?;

        if user.role == Role::Seller {
            let deactivated = self.products.deactivate_by_seller(user.id).await?;
            tracing::info!(user_id = %user.id, deactivated, "seller products deactivated");
        }

        self.cache.apply(Mutation::UserDeleted(user.id)).await;

        tracing::info!(user_id = %user.id, "account soft-deleted by admin");
        Ok(())
    }
}
