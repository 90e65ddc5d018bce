//! Authentication extractors.
//!
//! Identity is resolved once per request from the `token` cookie or a
//! `Authorization: Bearer` header: the token is decoded, the live user row
//! is fetched, and the embedded id and role are compared against it. Tokens
//! cannot be individually revoked, so that comparison is the revocation
//! mechanism: a deleted account or a changed role fails it immediately.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use bazaar_core::{Email, Role};

use crate::db::users::UserRepository;
use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// Extractor that requires an authenticated user.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(CurrentUser(user): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_token(parts).ok_or(AppError::Unauthorized)?;

        // Signature and expiry first; this alone does not prove the holder
        // still exists.
        let claims = state.tokens().decode(&token)?;
        let email = Email::parse(&claims.sub).map_err(|_| AppError::Unauthorized)?;

        let user = UserRepository::new(state.pool())
            .get_live_by_email(&email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !state.tokens().validate(&token, &user) {
            return Err(AppError::Unauthorized);
        }

        Ok(Self(user))
    }
}

/// Extractor that requires an authenticated admin.
pub struct RequireAdmin(pub User);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != Role::Admin {
            return Err(AppError::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Extractor that requires an authenticated seller.
pub struct RequireSeller(pub User);

impl FromRequestParts<AppState> for RequireSeller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.role != Role::Seller {
            return Err(AppError::Forbidden);
        }
        Ok(Self(user))
    }
}

/// Pull the token from the `token` cookie, falling back to the
/// `Authorization: Bearer` header.
fn extract_token(parts: &Parts) -> Option<String> {
    if let Some(token) = token_from_cookies(parts) {
        return Some(token);
    }

    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned)
}

fn token_from_cookies(parts: &Parts) -> Option<String> {
    let cookies = parts.headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_owned())
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with(header_name: header::HeaderName, value: &str) -> Parts {
        let request = Request::builder()
            .header(header_name, value)
            .body(())
            .unwrap();
        request.into_parts().0
    }

    #[test]
    fn test_token_from_cookie() {
        let parts = parts_with(header::COOKIE, "theme=dark; token=abc.def.ghi");
        assert_eq!(extract_token(&parts).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_token_from_bearer_header() {
        let parts = parts_with(header::AUTHORIZATION, "Bearer abc.def.ghi");
        assert_eq!(extract_token(&parts).as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_cookie_takes_precedence() {
        let request = Request::builder()
            .header(header::COOKIE, "token=from-cookie")
            .header(header::AUTHORIZATION, "Bearer from-header")
            .body(())
            .unwrap();
        let (parts, ()) = request.into_parts();
        assert_eq!(extract_token(&parts).as_deref(), Some("from-cookie"));
    }

    #[test]
    fn test_no_token_is_none() {
        let request = Request::builder().body(()).unwrap();
        let (parts, ()) = request.into_parts();
        assert!(extract_token(&parts).is_none());
    }

    #[test]
    fn test_non_bearer_authorization_ignored() {
        let parts = parts_with(header::AUTHORIZATION, "Basic dXNlcjpwdw==");
        assert!(extract_token(&parts).is_none());
    }
}
