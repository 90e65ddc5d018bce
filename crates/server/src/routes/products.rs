//! Product route handlers.
//!
//! Reads are open to any authenticated user; listing requires the seller
//! role, and updates/deletes are restricted to the owning seller.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
};

use bazaar_core::ProductId;

use crate::error::Result;
use crate::middleware::{CurrentUser, RequireSeller};
use crate::models::{AddProductRequest, ProductSearch, ProductUpdate, ProductView};
use crate::routes::admin::PageQuery;
use crate::services::products::ProductService;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/product", post(add_product).get(list_products))
        .route(
            "/product/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/product/search", post(search_products))
}

/// `POST /product` - list a new product (sellers only).
async fn add_product(
    State(state): State<AppState>,
    RequireSeller(seller): RequireSeller,
    Json(request): Json<AddProductRequest>,
) -> Result<Json<ProductView>> {
    let view = ProductService::new(state.pool(), state.cache())
        .add(request, &seller)
        .await?;
    Ok(Json(view))
}

/// `GET /product` - page through the catalog.
async fn list_products(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<ProductView>>> {
    let views = ProductService::new(state.pool(), state.cache())
        .list(query.page, query.size)
        .await?;
    Ok(Json(views))
}

/// `GET /product/{id}` - one product.
async fn get_product(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<ProductView>> {
    let view = ProductService::new(state.pool(), state.cache())
        .get(ProductId::new(id))
        .await?;
    Ok(Json(view))
}

/// `PATCH /product/{id}` - typed partial update by the owning seller.
async fn update_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(update): Json<ProductUpdate>,
) -> Result<Json<ProductView>> {
    let view = ProductService::new(state.pool(), state.cache())
        .update(&user, ProductId::new(id), update)
        .await?;
    Ok(Json(view))
}

/// `DELETE /product/{id}` - remove a product (owning seller only).
async fn delete_product(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    ProductService::new(state.pool(), state.cache())
        .delete(&user, ProductId::new(id))
        .await?;
    Ok(StatusCode::OK)
}

/// `POST /product/search` - typed name/category/price filters.
async fn search_products(
    State(state): State<AppState>,
    CurrentUser(_): CurrentUser,
    Query(query): Query<PageQuery>,
    Json(filters): Json<ProductSearch>,
) -> Result<Json<Vec<ProductView>>> {
    let views = ProductService::new(state.pool(), state.cache())
        .search(filters, query.page, query.size)
        .await?;
    Ok(Json(views))
}
