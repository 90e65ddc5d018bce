//! Business services.
//!
//! Each service borrows the connection pool and the shared infrastructure
//! (token service, verification store, cache registry, mailer) from
//! [`crate::state::AppState`] and is constructed per request.

pub mod admin;
pub mod auth;
pub mod cart;
pub mod categories;
pub mod email;
pub mod products;
pub mod purge;
pub mod token;
pub mod users;
pub mod verification;
