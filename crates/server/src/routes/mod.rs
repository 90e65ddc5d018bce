//! Route composition.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod products;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Compose every route group into one router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(admin::routes())
        .merge(products::routes())
        .merge(categories::routes())
        .merge(cart::routes())
}
