//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and a mail catcher (e.g. MailHog)
//! docker compose up -d postgres mailhog
//!
//! # Start the server
//! cargo run -p bazaar-server
//!
//! # Run integration tests
//! cargo test -p bazaar-integration-tests -- --ignored
//! ```
//!
//! The tests talk to a running server over HTTP. Verification and reset
//! codes are delivered by email, so the flows read them back out of the mail
//! catcher's API.
//!
//! # Environment
//!
//! - `BAZAAR_BASE_URL` - server under test (default: <http://localhost:8080>)
//! - `MAILHOG_URL` - mail catcher API (default: <http://localhost:8025>)
//! - `ADMIN_EMAIL` / `ADMIN_PASSWORD` - credentials of a seeded admin

use reqwest::Client;
use serde_json::Value;

/// Base URL for the server under test (configurable via environment).
#[must_use]
pub fn base_url() -> String {
    std::env::var("BAZAAR_BASE_URL").unwrap_or_else(|_| "http://localhost:8080".to_owned())
}

/// Base URL for the mail catcher API (configurable via environment).
#[must_use]
pub fn mailhog_url() -> String {
    std::env::var("MAILHOG_URL").unwrap_or_else(|_| "http://localhost:8025".to_owned())
}

/// Create an HTTP client with a cookie store, so the `token` cookie set by
/// login is replayed on subsequent requests.
///
/// # Panics
///
/// Panics if the client cannot be built.
#[must_use]
pub fn client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// A unique email address per test run.
#[must_use]
pub fn unique_email(prefix: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("clock before unix epoch")
        .as_nanos();
    format!("{prefix}-{nanos}@example.com")
}

/// Read the most recent code mailed to `email` out of the mail catcher.
///
/// Codes are 10 alphanumeric characters following a "code is: " marker in
/// the plain-text body.
///
/// # Panics
///
/// Panics if the mail catcher is unreachable or no matching message exists.
pub async fn fetch_latest_code(client: &Client, email: &str) -> String {
    let response: Value = client
        .get(format!("{}/api/v2/search", mailhog_url()))
        .query(&[("kind", "to"), ("query", email)])
        .send()
        .await
        .expect("mail catcher unreachable")
        .json()
        .await
        .expect("mail catcher returned invalid JSON");

    let body = response["items"][0]["Content"]["Body"]
        .as_str()
        .expect("no message for recipient");

    let marker = "code is: ";
    let start = body.find(marker).expect("no code marker in body") + marker.len();
    body[start..start + 10].to_owned()
}
