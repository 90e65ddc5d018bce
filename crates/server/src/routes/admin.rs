//! Admin route handlers. Every endpoint requires the admin role.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get},
};
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::UserView;
use crate::services::admin::AdminService;
use crate::state::AppState;

/// Pagination query parameters.
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: i64,
    #[serde(default = "default_page_size")]
    pub size: i64,
}

const fn default_page_size() -> i64 {
    10
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/all-sellers-buyers", get(list_users))
        .route("/admin/user-details/{id}", get(user_details))
        .route("/admin/delete-user/{id}", delete(delete_user))
}

/// `GET /admin/all-sellers-buyers` - page through non-admin users.
async fn list_users(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<UserView>>> {
    let views = AdminService::new(state.pool(), state.cache())
        .list_users(query.page, query.size)
        .await?;
    Ok(Json(views))
}

/// `GET /admin/user-details/{id}` - one non-admin user's details.
async fn user_details(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<UserView>> {
    let view = AdminService::new(state.pool(), state.cache())
        .user_details(id)
        .await?;
    Ok(Json(view))
}

/// `DELETE /admin/delete-user/{id}` - soft-delete a non-admin user.
async fn delete_user(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    AdminService::new(state.pool(), state.cache())
        .delete_user(id)
        .await?;
    Ok(StatusCode::OK)
}
