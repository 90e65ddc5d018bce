//! Stateless session tokens.
//!
//! Tokens are self-contained HS256 JWTs carrying the holder's identity and
//! role. There is no server-side session table and no revocation list:
//! a token is only honored while its embedded id and role still match the
//! live user row, so deleting a user or changing their role invalidates
//! every token issued to them on the next check.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bazaar_core::Role;

use crate::models::User;

/// Errors from token issue or validation.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The token's expiry is in the past.
    #[error("token expired")]
    Expired,
    /// Bad signature, malformed token, or claims that do not decode.
    #[error("invalid token")]
    Invalid,
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid,
        }
    }
}

/// Claims embedded in every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Holder's email address.
    pub sub: String,
    /// Holder's numeric user id.
    pub id: i64,
    /// Holder's role at issue time.
    pub role: Role,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

/// Issues and validates session tokens.
///
/// Pure: a function of the token bytes, the signing secret, and the user
/// snapshot handed in. Resolving that snapshot (and rejecting deleted users)
/// is the caller's job.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: Duration,
}

impl TokenService {
    /// Create a token service from the shared signing secret.
    ///
    /// Secret strength is enforced at configuration load, not here.
    #[must_use]
    pub fn new(secret: &SecretString, lifetime: Duration) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            lifetime,
        }
    }

    /// How long issued tokens stay valid.
    #[must_use]
    pub const fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Issue a token for the given user snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Invalid`] if signing fails.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, Utc::now().timestamp())
    }

    fn issue_at(&self, user: &User, iat: i64) -> Result<String, TokenError> {
        #[allow(clippy::cast_possible_wrap)] // lifetimes are far below i64::MAX seconds
        let exp = iat + self.lifetime.as_secs() as i64;
        let claims = Claims {
            sub: user.email.to_string(),
            id: user.id.as_i64(),
            role: user.role,
            iat,
            exp,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(TokenError::from)
    }

    /// Verify the signature and expiry, returning the claims.
    ///
    /// Decoding alone does not prove the holder still exists: callers must
    /// re-resolve the user and check the claims with [`Self::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Expired`] past the expiry, [`TokenError::Invalid`]
    /// for anything else.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        Ok(data.claims)
    }

    /// True iff the token decodes, is unexpired, and its id and role both
    /// match the given (current) user row.
    #[must_use]
    pub fn validate(&self, token: &str, user: &User) -> bool {
        self.decode(token).is_ok_and(|claims| {
            claims.id == user.id.as_i64() && claims.role == user.role
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::{Email, UserId};
    use chrono::NaiveDate;

    fn service() -> TokenService {
        TokenService::new(
            &SecretString::from("mY$uP3r$tr0nG_s1gn1nG_k3Y_f0r_t3sting!@#"),
            Duration::from_secs(3600),
        )
    }

    fn user(id: i64, role: Role) -> User {
        User {
            id: UserId::new(id),
            full_name: "Test User".to_owned(),
            email: Email::parse("test@example.com").unwrap(),
            password_hash: "hash".to_owned(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            role,
            is_deleted: false,
            deleted_date: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_issue_and_decode_roundtrip() {
        let service = service();
        let user = user(7, Role::Seller);

        let token = service.issue(&user).unwrap();
        let claims = service.decode(&token).unwrap();

        assert_eq!(claims.sub, "test@example.com");
        assert_eq!(claims.id, 7);
        assert_eq!(claims.role, Role::Seller);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_validate_matching_user() {
        let service = service();
        let user = user(7, Role::Buyer);
        let token = service.issue(&user).unwrap();

        assert!(service.validate(&token, &user));
    }

    #[test]
    fn test_role_change_invalidates_token() {
        let service = service();
        let before = user(7, Role::Buyer);
        let token = service.issue(&before).unwrap();

        let after = user(7, Role::Seller);
        assert!(!service.validate(&token, &after));
    }

    #[test]
    fn test_id_mismatch_invalidates_token() {
        let service = service();
        let token = service.issue(&user(7, Role::Buyer)).unwrap();

        assert!(!service.validate(&token, &user(8, Role::Buyer)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = service();
        let user = user(7, Role::Buyer);
        // Issued so long ago that the expiry is already in the past.
        let iat = Utc::now().timestamp() - 7200;
        let token = service.issue_at(&user, iat).unwrap();

        assert!(matches!(service.decode(&token), Err(TokenError::Expired)));
        assert!(!service.validate(&token, &user));
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = service();
        assert!(matches!(
            service.decode("not-a-token"),
            Err(TokenError::Invalid)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let service = service();
        let token = service.issue(&user(7, Role::Buyer)).unwrap();

        let other = TokenService::new(
            &SecretString::from("a_c0mpl3tely_d1ff3rent_s1gn1nG_k3Y!!"),
            Duration::from_secs(3600),
        );
        assert!(matches!(other.decode(&token), Err(TokenError::Invalid)));
    }
}
