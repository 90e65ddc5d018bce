//! Category route handlers. Mutations are admin-only.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use bazaar_core::CategoryId;

use crate::error::Result;
use crate::middleware::{CurrentUser, RequireAdmin};
use crate::models::CategoryView;
use crate::services::categories::CategoryService;
use crate::state::AppState;

/// Category name query parameter.
#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/category", post(add_category).get(list_categories))
        .route(
            "/category/{id}",
            get(get_category).patch(update_category).delete(delete_category),
        )
}

/// `POST /category?name=` - create a category (admin only).
async fn add_category(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Query(query): Query<NameQuery>,
) -> Result<Json<CategoryView>> {
    let view = CategoryService::new(state.pool(), state.cache())
        .add(&query.name)
        .await?;
    Ok(Json(view))
}

/// `GET /category` - all categories.
async fn list_categories(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
) -> Result<Json<Vec<CategoryView>>> {
    let views = CategoryService::new(state.pool(), state.cache())
        .list()
        .await?;
    Ok(Json(views))
}

/// `GET /category/{id}` - one category.
async fn get_category(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<CategoryView>> {
    let view = CategoryService::new(state.pool(), state.cache())
        .get(CategoryId::new(id))
        .await?;
    Ok(Json(view))
}

/// `PATCH /category/{id}?name=` - rename a category (admin only).
async fn update_category(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<i64>,
    Query(query): Query<NameQuery>,
) -> Result<Json<CategoryView>> {
    let view = CategoryService::new(state.pool(), state.cache())
        .update(CategoryId::new(id), &query.name)
        .await?;
    Ok(Json(view))
}

/// `DELETE /category/{id}` - remove a category (admin only).
async fn delete_category(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    CategoryService::new(state.pool(), state.cache())
        .delete(CategoryId::new(id))
        .await?;
    Ok(StatusCode::OK)
}
