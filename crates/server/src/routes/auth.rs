//! Authentication route handlers.
//!
//! Handles registration, email verification, login, logout, and password
//! reset. Successful logins set the session token both in the response body
//! and as an `HttpOnly` cookie whose lifetime matches the token's.

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{AppendHeaders, IntoResponse},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::middleware::{SESSION_COOKIE, auth_rate_limiter};
use crate::services::auth::{
    AuthService, LoginRequest, RegisterRequest, ResetPasswordRequest, VerifyEmailRequest,
};
use crate::state::AppState;

/// Forgot-password payload.
#[derive(Debug, Deserialize)]
pub struct ForgetPasswordRequest {
    pub email: String,
}

/// Login response body.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Auth routes, behind the strict per-IP rate limiter.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/verify-email", post(verify_email))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/forget-password", post(forget_password))
        .route("/reset-password", post(reset_password))
        .layer(auth_rate_limiter())
}

fn auth_service(state: &AppState) -> AuthService<'_> {
    AuthService::new(
        state.pool(),
        state.tokens(),
        state.verification(),
        state.mailer(),
        state.cache(),
    )
}

/// `POST /register` - start a registration; emails a verification code.
async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<StatusCode> {
    auth_service(&state).register(request).await?;
    Ok(StatusCode::OK)
}

/// `POST /verify-email` - consume the code and create the account.
async fn verify_email(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<StatusCode> {
    auth_service(&state).verify_email(request).await?;
    Ok(StatusCode::OK)
}

/// `POST /login` - check credentials, return the token, set the cookie.
async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    let (_, token) = auth_service(&state).login(request).await?;

    let cookie = session_cookie(&state, &token);
    Ok((
        AppendHeaders([(header::SET_COOKIE, cookie)]),
        Json(LoginResponse { token }),
    ))
}

/// `GET /logout` - clear the cookie. Tokens cannot be revoked server-side;
/// an already-issued token stays valid until expiry or a user-row mismatch.
async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        AppendHeaders([(header::SET_COOKIE, clear_session_cookie(&state))]),
        StatusCode::OK,
    )
}

/// `POST /forget-password` - email a reset code to a live user.
async fn forget_password(
    State(state): State<AppState>,
    Json(request): Json<ForgetPasswordRequest>,
) -> Result<StatusCode> {
    auth_service(&state).forget_password(&request.email).await?;
    Ok(StatusCode::OK)
}

/// `POST /reset-password` - consume the reset code, store the new password.
async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<StatusCode> {
    auth_service(&state).reset_password(request).await?;
    Ok(StatusCode::OK)
}

/// Session cookie with Max-Age matching the token lifetime.
fn session_cookie(state: &AppState, token: &str) -> String {
    format!(
        "{SESSION_COOKIE}={token}; HttpOnly; Path={}; Max-Age={}; SameSite=Lax",
        state.config().cookie_path,
        state.config().token_lifetime.as_secs(),
    )
}

/// Same attributes as the session cookie, but expired immediately.
fn clear_session_cookie(state: &AppState) -> String {
    format!(
        "{SESSION_COOKIE}=; HttpOnly; Path={}; Max-Age=0; SameSite=Lax",
        state.config().cookie_path,
    )
}
