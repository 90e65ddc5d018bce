//! Authentication flows.
//!
//! Drives registration, email verification, login, password reset, and
//! logout by composing the user repository, the verification store, the
//! token service, and the mailer. No user row exists until email
//! verification completes; an abandoned registration leaves only expiring
//! verification entries behind.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use bazaar_core::{Email, Role};

use crate::cache::{CacheRegistry, Mutation};
use crate::db::users::UserRepository;
use crate::models::{NewUser, User};
use crate::services::email::{EmailService, generate_verification_code};
use crate::services::token::TokenService;
use crate::services::verification::{VERIFICATION_TTL, VerificationKey, VerificationStore};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Minimum full-name length.
const MIN_FULL_NAME_LENGTH: usize = 3;

// =============================================================================
// Flow request types
// =============================================================================

/// Registration payload. Also the pending-registration payload staged in the
/// verification store until the email is verified.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub date_of_birth: NaiveDate,
    pub role: Role,
}

impl RegisterRequest {
    /// Validate structural constraints, surfacing the first violation.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` with a client-facing message.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.full_name.trim().len() < MIN_FULL_NAME_LENGTH {
            return Err(AuthError::Validation("Full name is too short".to_owned()));
        }
        if self.password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(
                "Password must be more than 5 characters".to_owned(),
            ));
        }
        if self.password != self.confirm_password {
            return Err(AuthError::Validation("Passwords do not match".to_owned()));
        }
        Ok(())
    }
}

/// Email verification payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyEmailRequest {
    pub email: String,
    pub verification_code: String,
}

/// Login payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Password reset payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub verification_code: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl ResetPasswordRequest {
    /// Validate structural constraints, surfacing the first violation.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` with a client-facing message.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.password.len() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::Validation(
                "Password must be more than 5 characters".to_owned(),
            ));
        }
        if self.password != self.confirm_password {
            return Err(AuthError::Validation("Passwords do not match".to_owned()));
        }
        Ok(())
    }
}

// =============================================================================
// AuthService
// =============================================================================

/// Authentication service.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    tokens: &'a TokenService,
    store: &'a VerificationStore,
    mailer: &'a EmailService,
    cache: &'a CacheRegistry,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        tokens: &'a TokenService,
        store: &'a VerificationStore,
        mailer: &'a EmailService,
        cache: &'a CacheRegistry,
    ) -> Self {
        Self {
            users: UserRepository::new(pool),
            tokens,
            store,
            mailer,
            cache,
        }
    }

    /// Start a registration: stage the pending user and email the code.
    ///
    /// Stores two entries, both with a one-hour TTL: the code under
    /// `verifyEmail:<email>` and the full payload under
    /// `userInfo:<email>:<code>`. A repeated registration for the same email
    /// overwrites the previous code, so only the newest one is ever valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserAlreadyExists` if a live user owns the email,
    /// `AuthError::Validation` on structural failures, `AuthError::Mail` if
    /// the code could not be sent (already-stored entries are not rolled
    /// back, so a retried request simply overwrites them).
    pub async fn register(&self, request: RegisterRequest) -> Result<(), AuthError> {
        request.validate()?;
        let email = Email::parse(&request.email)?;

        if self.users.get_live_by_email(&email).await?.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let code = generate_verification_code();
        self.store
            .put(VerificationKey::EmailCode(&email), &code, VERIFICATION_TTL)
            .await;
        let payload = serde_json::to_string(&request)?;
        self.store
            .put(
                VerificationKey::PendingRegistration(&email, &code),
                &payload,
                VERIFICATION_TTL,
            )
            .await;

        self.mailer
            .send_verification_code(email.as_str(), &code)
            .await?;

        tracing::info!(email = %email, "registration started, verification code sent");
        Ok(())
    }

    /// Complete a registration: consume the code and create the user.
    ///
    /// Both verification entries are deleted on success; replaying the same
    /// code afterwards fails as absent. When verifications race on one code,
    /// the atomic take of the pending payload lets exactly one succeed.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRequest` for an absent, expired, or
    /// mismatched code (indistinguishably).
    pub async fn verify_email(&self, request: VerifyEmailRequest) -> Result<User, AuthError> {
        let email = Email::parse(&request.email)?;

        let stored_code = self.store.get(VerificationKey::EmailCode(&email)).await;
        if stored_code.as_deref() != Some(request.verification_code.as_str()) {
            return Err(AuthError::InvalidRequest);
        }

        // The consumption gate: of N concurrent verifications with the same
        // code, exactly one gets the payload.
        let payload = self
            .store
            .take(VerificationKey::PendingRegistration(
                &email,
                &request.verification_code,
            ))
            .await
            .ok_or(AuthError::InvalidRequest)?;
        let pending: RegisterRequest =
            serde_json::from_str(&payload).map_err(|_| AuthError::InvalidRequest)?;

        let password_hash = hash_password(&pending.password)?;
        let user = self
            .users
            .insert(&NewUser {
                full_name: pending.full_name,
                email: email.clone(),
                password_hash,
                date_of_birth: pending.date_of_birth,
                role: pending.role,
            })
            .await
            .map_err(|e| match e {
                crate::db::RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        self.store.delete(VerificationKey::EmailCode(&email)).await;
        self.cache.apply(Mutation::UserCreated).await;

        tracing::info!(user_id = %user.id, "email verified, user created");
        Ok(user)
    }

    /// Check credentials and issue a session token.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown or deleted
    /// email, or a wrong password; the cases are indistinguishable.
    pub async fn login(&self, request: LoginRequest) -> Result<(User, String), AuthError> {
        let email =
            Email::parse(&request.email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .users
            .get_live_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(&request.password, &user.password_hash)?;

        let token = self.tokens.issue(&user)?;
        Ok((user, token))
    }

    /// Start a password reset: store a code and email it.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no live user owns the email.
    pub async fn forget_password(&self, email: &str) -> Result<(), AuthError> {
        let email = Email::parse(email)?;

        if self.users.get_live_by_email(&email).await?.is_none() {
            return Err(AuthError::UserNotFound);
        }

        let code = generate_verification_code();
        self.store
            .put(VerificationKey::ResetCode(&email), &code, VERIFICATION_TTL)
            .await;

        self.mailer
            .send_password_reset_code(email.as_str(), &code)
            .await?;

        tracing::info!(email = %email, "password reset code sent");
        Ok(())
    }

    /// Complete a password reset: consume the code and store the new hash.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRequest` for an absent, expired, or
    /// mismatched code (indistinguishably).
    pub async fn reset_password(&self, request: ResetPasswordRequest) -> Result<(), AuthError> {
        request.validate()?;
        let email = Email::parse(&request.email)?;

        let stored_code = self.store.get(VerificationKey::ResetCode(&email)).await;
        if stored_code.as_deref() != Some(request.verification_code.as_str()) {
            return Err(AuthError::InvalidRequest);
        }

        let user = self
            .users
            .get_live_by_email(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        // Consume the code before writing; of N concurrent resets with the
        // same code, exactly one proceeds.
        if self
            .store
            .take(VerificationKey::ResetCode(&email))
            .await
            .as_deref()
            != Some(request.verification_code.as_str())
        {
            return Err(AuthError::InvalidRequest);
        }

        let password_hash = hash_password(&request.password)?;
        self.users.update_password(user.id, &password_hash).await?;

        tracing::info!(user_id = %user.id, "password reset");
        Ok(())
    }
}

// =============================================================================
// Password hashing
// =============================================================================

/// Hash a password using Argon2id.
pub(crate) fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
pub(crate) fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn register_request() -> RegisterRequest {
        RegisterRequest {
            full_name: "Ada Lovelace".to_owned(),
            email: "ada@example.com".to_owned(),
            password: "correct-horse".to_owned(),
            confirm_password: "correct-horse".to_owned(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
            role: Role::Buyer,
        }
    }

    #[test]
    fn test_register_request_valid() {
        assert!(register_request().validate().is_ok());
    }

    #[test]
    fn test_register_request_short_name() {
        let mut request = register_request();
        request.full_name = "Al".to_owned();
        assert!(matches!(
            request.validate(),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn test_register_request_short_password() {
        let mut request = register_request();
        request.password = "abc".to_owned();
        request.confirm_password = "abc".to_owned();
        assert!(matches!(
            request.validate(),
            Err(AuthError::Validation(_))
        ));
    }

    #[test]
    fn test_register_request_password_mismatch() {
        let mut request = register_request();
        request.confirm_password = "different-pw".to_owned();
        let err = request.validate().unwrap_err();
        assert!(matches!(err, AuthError::Validation(ref msg) if msg == "Passwords do not match"));
    }

    #[test]
    fn test_reset_request_password_mismatch() {
        let request = ResetPasswordRequest {
            verification_code: "abc123XYZ0".to_owned(),
            email: "ada@example.com".to_owned(),
            password: "newpassword".to_owned(),
            confirm_password: "otherpassword".to_owned(),
        };
        assert!(matches!(request.validate(), Err(AuthError::Validation(_))));
    }

    #[test]
    fn test_hash_and_verify_password() {
        let hash = hash_password("correct-horse").unwrap();
        assert!(verify_password("correct-horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong-horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("correct-horse").unwrap();
        let second = hash_password("correct-horse").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_register_request_roundtrips_through_store_payload() {
        let request = register_request();
        let payload = serde_json::to_string(&request).unwrap();
        let back: RegisterRequest = serde_json::from_str(&payload).unwrap();
        assert_eq!(back.email, request.email);
        assert_eq!(back.role, request.role);
        assert_eq!(back.date_of_birth, request.date_of_birth);
    }
}
