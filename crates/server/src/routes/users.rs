//! Self-service user route handlers.

use axum::{Json, Router, extract::State, http::StatusCode, routing::get};

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{UserUpdate, UserView};
use crate::services::users::UserService;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/user", get(get_user).patch(update_user).delete(delete_user))
}

/// `GET /user` - the authenticated user's own profile.
async fn get_user(CurrentUser(user): CurrentUser) -> Json<UserView> {
    Json(UserView::from(&user))
}

/// `PATCH /user` - typed partial update of the user's own profile.
async fn update_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<UserUpdate>,
) -> Result<Json<UserView>> {
    let view = UserService::new(state.pool(), state.cache())
        .update_profile(&user, update)
        .await?;
    Ok(Json(view))
}

/// `DELETE /user` - soft-delete the user's own account. Already-issued
/// tokens fail validation from here on because the live row is gone.
async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode> {
    UserService::new(state.pool(), state.cache())
        .delete_self(&user)
        .await?;
    Ok(StatusCode::OK)
}
