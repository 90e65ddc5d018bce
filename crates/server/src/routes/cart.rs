//! Cart route handlers. Every endpoint operates on the authenticated user's
//! own cart.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde::Deserialize;

use bazaar_core::CartItemId;

use crate::error::Result;
use crate::middleware::CurrentUser;
use crate::models::{AddCartItemRequest, CartItemView};
use crate::services::cart::CartService;
use crate::state::AppState;

/// Quantity update payload.
#[derive(Debug, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/cart", post(create_cart).delete(delete_cart))
        .route("/cart/items", get(list_items))
        .route("/cart-item", post(add_item))
        .route(
            "/cart-item/{id}",
            get(get_item).patch(update_item).delete(delete_item),
        )
}

/// `POST /cart` - create the user's cart.
async fn create_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode> {
    CartService::new(state.pool(), state.cache())
        .create(&user)
        .await?;
    Ok(StatusCode::OK)
}

/// `GET /cart/items` - the user's cart contents.
async fn list_items(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<CartItemView>>> {
    let views = CartService::new(state.pool(), state.cache())
        .items(&user)
        .await?;
    Ok(Json(views))
}

/// `DELETE /cart` - drop the user's cart and all its items.
async fn delete_cart(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<StatusCode> {
    CartService::new(state.pool(), state.cache())
        .delete(&user)
        .await?;
    Ok(StatusCode::OK)
}

/// `POST /cart-item` - add a product to the cart.
async fn add_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(request): Json<AddCartItemRequest>,
) -> Result<Json<CartItemView>> {
    let view = CartService::new(state.pool(), state.cache())
        .add_item(&user, request)
        .await?;
    Ok(Json(view))
}

/// `GET /cart-item/{id}` - one item from the user's cart.
async fn get_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<CartItemView>> {
    let view = CartService::new(state.pool(), state.cache())
        .get_item(&user, CartItemId::new(id))
        .await?;
    Ok(Json(view))
}

/// `PATCH /cart-item/{id}` - change an item's quantity.
async fn update_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
    Json(request): Json<UpdateCartItemRequest>,
) -> Result<Json<CartItemView>> {
    let view = CartService::new(state.pool(), state.cache())
        .update_item(&user, CartItemId::new(id), request.quantity)
        .await?;
    Ok(Json(view))
}

/// `DELETE /cart-item/{id}` - remove an item from the cart.
async fn delete_item(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<i64>,
) -> Result<StatusCode> {
    CartService::new(state.pool(), state.cache())
        .delete_item(&user, CartItemId::new(id))
        .await?;
    Ok(StatusCode::OK)
}
