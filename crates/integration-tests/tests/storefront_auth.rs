//! Sign-in, sign-out, registration and guest mode through the HTTP surface.

use axum::http::StatusCode;
use serde_json::json;

use motostore_core::UserRole;
use motostore_integration_tests::{PASSWORD, TestApp};

#[tokio::test]
async fn test_health() {
    let mut app = TestApp::new();

    let response = app.get("/health").await;
    assert_eq!(response.status, StatusCode::OK);

    let response = app.get("/health/ready").await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_login_and_logout() {
    let mut app = TestApp::new();
    app.seed_user("ana@ejemplo.mx", "Ana López", UserRole::User);
    let (_subscription, events) = app.record_session_events();

    let response = app.login("ana@ejemplo.mx").await;
    assert_eq!(response.body["viewer"]["display_name"], "Ana López");
    assert_eq!(response.body["viewer"]["is_admin"], false);
    assert_eq!(response.body["guest"], false);

    let response = app.get("/auth/session").await;
    assert_eq!(response.body["viewer"]["email"], "ana@ejemplo.mx");

    let response = app.post("/auth/logout", json!({})).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.get("/auth/session").await;
    assert!(response.body["viewer"].is_null());

    let response = app.get("/cart").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    assert_eq!(*events.lock().unwrap(), vec![true, false]);
}

#[tokio::test]
async fn test_wrong_password() {
    let mut app = TestApp::new();
    app.seed_user("ana@ejemplo.mx", "Ana López", UserRole::User);

    let response = app
        .post(
            "/auth/login",
            json!({ "email": "ana@ejemplo.mx", "password": "incorrecta" }),
        )
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error(), "Invalid credentials");
}

#[tokio::test]
async fn test_register_requires_confirmation() {
    let mut app = TestApp::new();

    let response = app
        .post(
            "/auth/register",
            json!({
                "email": "nuevo@ejemplo.mx",
                "password": PASSWORD,
                "full_name": "Nuevo Cliente"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.body["confirmation_required"], true);

    // Not signed in until the account is confirmed
    let response = app.get("/auth/session").await;
    assert!(response.body["viewer"].is_null());

    let response = app
        .post(
            "/auth/register",
            json!({
                "email": "nuevo@ejemplo.mx",
                "password": PASSWORD,
                "full_name": "Otra Vez"
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_validation() {
    let mut app = TestApp::new();

    let response = app
        .post(
            "/auth/register",
            json!({ "email": "nuevo@ejemplo.mx", "password": PASSWORD, "full_name": "  " }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "full name is required");

    let response = app
        .post(
            "/auth/register",
            json!({ "email": "no-es-correo", "password": PASSWORD, "full_name": "Ana" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "Invalid email address");
}

#[tokio::test]
async fn test_guest_can_browse_but_not_buy() {
    let mut app = TestApp::new();
    let category = app.store.seed_category("Cascos");
    let casco = app
        .store
        .seed_product(category.id, "Casco", rust_decimal::Decimal::new(1000, 2), 3);

    let response = app.post("/auth/guest", json!({})).await;
    assert_eq!(response.body["guest"], true);

    let response = app.get("/catalog").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["guest"], true);
    assert_eq!(response.body["product_count"], 1);

    let response = app
        .post("/cart/items", json!({ "product_id": casco.id }))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.error(), "sign in to buy");
}

#[tokio::test]
async fn test_sign_in_leaves_guest_mode() {
    let mut app = TestApp::new();
    app.seed_user("ana@ejemplo.mx", "Ana López", UserRole::User);

    app.post("/auth/guest", json!({})).await;
    app.login("ana@ejemplo.mx").await;

    let response = app.get("/catalog").await;
    assert_eq!(response.body["guest"], false);
    assert_eq!(response.body["viewer"]["display_name"], "Ana López");
}

#[tokio::test]
async fn test_sessions_are_per_browser() {
    let mut app = TestApp::new();
    app.seed_user("ana@ejemplo.mx", "Ana López", UserRole::User);
    app.login("ana@ejemplo.mx").await;

    let mut other = app.new_browser();
    let response = other.get("/cart/count").await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);

    let response = app.get("/cart/count").await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["count"], 0);
}
