//! Self-service user operations.

use chrono::Utc;
use sqlx::PgPool;

use bazaar_core::Role;

use crate::cache::{CacheRegistry, Mutation};
use crate::db::products::ProductRepository;
use crate::db::users::UserRepository;
use crate::error::{AppError, Result};
use crate::models::{User, UserUpdate, UserView};
use crate::services::auth::hash_password;

/// Service for the authenticated user's own account.
pub struct UserService<'a> {
    users: UserRepository<'a>,
    products: ProductRepository<'a>,
    cache: &'a CacheRegistry,
}

impl<'a> UserService<'a> {
    /// Create a new user service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, cache: &'a CacheRegistry) -> Self {
        Self {
            users: UserRepository::new(pool),
            products: ProductRepository::new(pool),
            cache,
        }
    }

    /// Apply a typed partial update to the user's own profile.
    ///
    /// A supplied password is re-hashed before persisting.
    ///
    /// # Errors
    ///
    /// Returns `AppError::InvalidRequest` on validation failure.
    pub async fn update_profile(&self, user: &User, update: UserUpdate) -> Result<UserView> {
        update.validate().map_err(AppError::InvalidRequest)?;

        let mut changed = user.clone();
        if let Some(full_name) = update.full_name {
            changed.full_name = full_name;
        }
        if let Some(date_of_birth) = update.date_of_birth {
            changed.date_of_birth = date_of_birth;
        }
        if let Some(password) = update.password {
            changed.password_hash = hash_password(&password).map_err(AppError::Auth)?;
        }

        let updated = self.users.update_profile(&changed).await?;
        let view = UserView::from(&updated);

        self.cache.apply(Mutation::UserUpdated(updated.id)).await;
        self.cache.user().insert(updated.id, view.clone()).await;

        Ok(view)
    }

    /// Soft-delete the user's own account.
    ///
    /// A seller's products are deactivated alongside. The row is purged for
    /// good by the scheduled sweep once the retention window passes.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Repository` if a write fails.
    pub async fn delete_self(&self, user: &User) -> Result<()> {
        self.users
            .soft_delete(user.id, Utc::now().date_naive())
            .await?;

        if user.role == Role::Seller {
            let deactivated = self.products.deactivate_by_seller(user.id).await?;
            tracing::info!(user_id = %user.id, deactivated, "seller products deactivated");
        }

        self.cache.apply(Mutation::UserDeleted(user.id)).await;

        tracing::info!(user_id = %user.id, "account soft-deleted");
        Ok(())
    }
}
