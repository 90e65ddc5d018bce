//! End-to-end tests for the authentication flows.
//!
//! These tests require:
//! - A running `PostgreSQL` database
//! - The server running (cargo run -p bazaar-server)
//! - A mail catcher (e.g. MailHog) receiving the server's SMTP traffic
//!
//! Run with: cargo test -p bazaar-integration-tests -- --ignored

use reqwest::{Client, StatusCode};
use serde_json::{Value, json};

use bazaar_integration_tests::{base_url, client, fetch_latest_code, unique_email};

/// Register an account and return its email.
async fn register(client: &Client, email: &str, role: &str) {
    let resp = client
        .post(format!("{}/register", base_url()))
        .json(&json!({
            "fullName": "Integration Tester",
            "email": email,
            "password": "hunter2-pw",
            "confirmPassword": "hunter2-pw",
            "dateOfBirth": "1990-04-01",
            "role": role,
        }))
        .send()
        .await
        .expect("register request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

/// Complete email verification using the mailed code.
async fn verify(client: &Client, email: &str) {
    let code = fetch_latest_code(client, email).await;
    let resp = client
        .post(format!("{}/verify-email", base_url()))
        .json(&json!({"email": email, "verificationCode": code}))
        .send()
        .await
        .expect("verify request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

/// Log in and return the token from the response body.
async fn login(client: &Client, email: &str, password: &str) -> String {
    let resp = client
        .post(format!("{}/login", base_url()))
        .json(&json!({"email": email, "password": password}))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("login response not JSON");
    body["token"].as_str().expect("no token in body").to_owned()
}

#[tokio::test]
#[ignore = "Requires running server, database, and mail catcher"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health", base_url()))
        .send()
        .await
        .expect("health request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server, database, and mail catcher"]
async fn test_register_verify_login_delete_chain() {
    let client = client();
    let email = unique_email("chain");

    register(&client, &email, "BUYER").await;

    // No account exists until verification completes.
    let resp = client
        .post(format!("{}/login", base_url()))
        .json(&json!({"email": email, "password": "hunter2-pw"}))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    verify(&client, &email).await;
    let token = login(&client, &email, "hunter2-pw").await;

    // Token works via Authorization header (fresh client, no cookie).
    let bare = bazaar_integration_tests::client();
    let resp = bare
        .get(format!("{}/user", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("profile request failed");
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: Value = resp.json().await.expect("profile not JSON");
    assert_eq!(profile["email"], email.as_str());
    assert_eq!(profile["role"], "BUYER");

    // Soft-delete self; the same token must now fail validation because the
    // live user row is gone.
    let resp = bare
        .delete(format!("{}/user", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("delete request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = bare
        .get(format!("{}/user", base_url()))
        .bearer_auth(&token)
        .send()
        .await
        .expect("profile request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server, database, and mail catcher"]
async fn test_verification_code_cannot_be_replayed() {
    let client = client();
    let email = unique_email("replay");

    register(&client, &email, "BUYER").await;
    let code = fetch_latest_code(&client, &email).await;

    let resp = client
        .post(format!("{}/verify-email", base_url()))
        .json(&json!({"email": email, "verificationCode": code}))
        .send()
        .await
        .expect("verify request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    // The entries were consumed; an identical replay fails as absent.
    let resp = client
        .post(format!("{}/verify-email", base_url()))
        .json(&json!({"email": email, "verificationCode": code}))
        .send()
        .await
        .expect("verify request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server, database, and mail catcher"]
async fn test_second_registration_invalidates_first_code() {
    let client = client();
    let email = unique_email("overwrite");

    register(&client, &email, "BUYER").await;
    let first_code = fetch_latest_code(&client, &email).await;

    register(&client, &email, "BUYER").await;
    let second_code = fetch_latest_code(&client, &email).await;
    assert_ne!(first_code, second_code);

    // The second put overwrote the first entry; only the newest code works.
    let resp = client
        .post(format!("{}/verify-email", base_url()))
        .json(&json!({"email": email, "verificationCode": first_code}))
        .send()
        .await
        .expect("verify request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .post(format!("{}/verify-email", base_url()))
        .json(&json!({"email": email, "verificationCode": second_code}))
        .send()
        .await
        .expect("verify request failed");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running server, database, and mail catcher"]
async fn test_password_reset_flow() {
    let client = client();
    let email = unique_email("reset");

    register(&client, &email, "BUYER").await;
    verify(&client, &email).await;

    let resp = client
        .post(format!("{}/forget-password", base_url()))
        .json(&json!({"email": email}))
        .send()
        .await
        .expect("forget-password request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let code = fetch_latest_code(&client, &email).await;
    let resp = client
        .post(format!("{}/reset-password", base_url()))
        .json(&json!({
            "verificationCode": code,
            "email": email,
            "password": "a-new-password",
            "confirmPassword": "a-new-password",
        }))
        .send()
        .await
        .expect("reset request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    // Old password no longer works; the new one does.
    let resp = client
        .post(format!("{}/login", base_url()))
        .json(&json!({"email": email, "password": "hunter2-pw"}))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    login(&client, &email, "a-new-password").await;

    // The reset code was consumed; replaying it fails.
    let resp = client
        .post(format!("{}/reset-password", base_url()))
        .json(&json!({
            "verificationCode": code,
            "email": email,
            "password": "another-password",
            "confirmPassword": "another-password",
        }))
        .send()
        .await
        .expect("reset request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running server, database, and mail catcher"]
async fn test_mismatched_passwords_rejected() {
    let client = client();
    let email = unique_email("mismatch");

    let resp = client
        .post(format!("{}/register", base_url()))
        .json(&json!({
            "fullName": "Integration Tester",
            "email": email,
            "password": "hunter2-pw",
            "confirmPassword": "different-pw",
            "dateOfBirth": "1990-04-01",
            "role": "BUYER",
        }))
        .send()
        .await
        .expect("register request failed");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.expect("error body not JSON");
    assert_eq!(body["message"], "Passwords do not match");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
#[ignore = "Requires running server, database, and mail catcher"]
async fn test_unauthenticated_request_rejected() {
    let resp = client()
        .get(format!("{}/user", base_url()))
        .send()
        .await
        .expect("profile request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running server, database, and mail catcher"]
async fn test_login_sets_cookie_used_for_auth() {
    let client = client();
    let email = unique_email("cookie");

    register(&client, &email, "BUYER").await;
    verify(&client, &email).await;
    login(&client, &email, "hunter2-pw").await;

    // The cookie store carries the session cookie; no header needed.
    let resp = client
        .get(format!("{}/user", base_url()))
        .send()
        .await
        .expect("profile request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    // Logout clears the cookie.
    let resp = client
        .get(format!("{}/logout", base_url()))
        .send()
        .await
        .expect("logout request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .get(format!("{}/user", base_url()))
        .send()
        .await
        .expect("profile request failed");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
