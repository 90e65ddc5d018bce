//! User repository.

use chrono::NaiveDate;
use sqlx::PgPool;

use bazaar_core::{Email, Role, UserId};

use super::{RepositoryError, conflict_on_unique};
use crate::models::{NewUser, User};

const USER_COLUMNS: &str = "id, full_name, email, password_hash, date_of_birth, \
     role, is_deleted, deleted_date, created_at, updated_at";

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a live (non-deleted) user by email.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_live_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND is_deleted = FALSE"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user by id, regardless of soft-delete state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Insert a new user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(&self, new_user: &NewUser) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (full_name, email, password_hash, date_of_birth, role) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&new_user.full_name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.date_of_birth)
        .bind(new_user.role)
        .fetch_one(self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "user"))
    }

    /// Persist profile fields (name, date of birth, password hash).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_profile(&self, user: &User) -> Result<User, RepositoryError> {
        let updated = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET full_name = $2, date_of_birth = $3, password_hash = $4, \
             updated_at = now() \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.full_name)
        .bind(user.date_of_birth)
        .bind(&user.password_hash)
        .fetch_one(self.pool)
        .await?;
        Ok(updated)
    }

    /// Replace the password hash only.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Mark a user as deleted, stamping the deletion date.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn soft_delete(&self, id: UserId, date: NaiveDate) -> Result<(), RepositoryError> {
        sqlx::query(
            "UPDATE users SET is_deleted = TRUE, deleted_date = $2, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(date)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// List non-admin users ordered by name, one page at a time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_non_admin(
        &self,
        page: u32,
        size: u32,
    ) -> Result<Vec<User>, RepositoryError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE role <> $1 \
             ORDER BY full_name LIMIT $2 OFFSET $3"
        ))
        .bind(Role::Admin)
        .bind(i64::from(size))
        .bind(i64::from(page) * i64::from(size))
        .fetch_all(self.pool)
        .await?;
        Ok(users)
    }

    /// Hard-delete soft-deleted accounts whose deletion date is before
    /// `cutoff`. Returns how many rows were removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purge_deleted_before(&self, cutoff: NaiveDate) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM users WHERE is_deleted = TRUE AND deleted_date < $1")
                .bind(cutoff)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}
