//! User domain types.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use bazaar_core::{Email, Role, UserId};

/// An account row.
///
/// `password_hash` never leaves the server; clients see [`UserView`].
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name.
    pub full_name: String,
    /// Email address (immutable, unique).
    pub email: Email,
    /// Argon2 hash of the password.
    pub password_hash: String,
    /// Date of birth; `age` in views derives from it.
    pub date_of_birth: NaiveDate,
    /// Account role.
    pub role: Role,
    /// Soft-delete flag. Deleted users cannot authenticate.
    pub is_deleted: bool,
    /// When the account was soft-deleted, if it was.
    pub deleted_date: Option<NaiveDate>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Age in whole years as of `today`.
    #[must_use]
    pub fn age_at(&self, today: NaiveDate) -> i32 {
        let mut age = today.year() - self.date_of_birth.year();
        if today.ordinal() < self.date_of_birth.ordinal() {
            age -= 1;
        }
        age
    }
}

/// Fields for inserting a new user row.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub email: Email,
    pub password_hash: String,
    pub date_of_birth: NaiveDate,
    pub role: Role,
}

/// Client-facing projection of a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub full_name: String,
    pub email: Email,
    pub age: i32,
    pub role: Role,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
            age: user.age_at(Utc::now().date_naive()),
            role: user.role,
        }
    }
}

/// Typed partial update for the authenticated user.
///
/// Absent fields are left untouched. The email and role are immutable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub password: Option<String>,
}

impl UserUpdate {
    /// Minimum full-name length, matching registration validation.
    pub const MIN_FULL_NAME: usize = 3;
    /// Minimum password length, matching registration validation.
    pub const MIN_PASSWORD: usize = 6;

    /// Validate the populated fields.
    ///
    /// # Errors
    ///
    /// Returns a human-readable message describing the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.full_name
            && name.trim().len() < Self::MIN_FULL_NAME
        {
            return Err("Full name is too short".to_owned());
        }
        if let Some(password) = &self.password
            && password.len() < Self::MIN_PASSWORD
        {
            return Err("Password must be more than 5 characters".to_owned());
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_user(dob: NaiveDate) -> User {
        User {
            id: UserId::new(1),
            full_name: "Ada Lovelace".to_owned(),
            email: Email::parse("ada@example.com").unwrap(),
            password_hash: "hash".to_owned(),
            date_of_birth: dob,
            role: Role::Buyer,
            is_deleted: false,
            deleted_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_age_before_birthday() {
        let user = sample_user(NaiveDate::from_ymd_opt(1990, 12, 31).unwrap());
        let today = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(user.age_at(today), 29);
    }

    #[test]
    fn test_age_after_birthday() {
        let user = sample_user(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap());
        let today = NaiveDate::from_ymd_opt(2020, 6, 1).unwrap();
        assert_eq!(user.age_at(today), 30);
    }

    #[test]
    fn test_update_validation() {
        let update = UserUpdate {
            full_name: Some("Al".to_owned()),
            ..UserUpdate::default()
        };
        assert!(update.validate().is_err());

        let update = UserUpdate {
            password: Some("short".to_owned()),
            ..UserUpdate::default()
        };
        assert!(update.validate().is_err());

        let update = UserUpdate {
            full_name: Some("Alan Turing".to_owned()),
            password: Some("longenough".to_owned()),
            date_of_birth: None,
        };
        assert!(update.validate().is_ok());
    }

    #[test]
    fn test_update_rejects_unknown_fields() {
        // The email is immutable; sending it must fail deserialization.
        let err = serde_json::from_str::<UserUpdate>(r#"{"email":"x@y.z"}"#);
        assert!(err.is_err());
    }
}
