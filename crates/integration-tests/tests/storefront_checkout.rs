//! Cart, checkout and payment, end to end.

use axum::http::StatusCode;
use rust_decimal::Decimal;
use serde_json::{Value, json};

use motostore_core::{UserId, UserRole};
use motostore_integration_tests::{TestApp, amount};
use motostore_storefront::db::memory::Operation;
use motostore_storefront::models::Product;

struct Shop {
    app: TestApp,
    user: UserId,
    casco: Product,
    guantes: Product,
}

/// Casco 10.00 (stock 5) and Guantes 5.00 (stock 2), with Ana signed in.
async fn shop() -> Shop {
    let mut app = TestApp::new();
    let user = app.seed_user("ana@ejemplo.mx", "Ana López", UserRole::User);
    let category = app.store.seed_category("Equipo");
    let casco = app
        .store
        .seed_product(category.id, "Casco", Decimal::new(1000, 2), 5);
    let guantes = app
        .store
        .seed_product(category.id, "Guantes", Decimal::new(500, 2), 2);
    app.login("ana@ejemplo.mx").await;

    Shop {
        app,
        user,
        casco,
        guantes,
    }
}

fn address(line1: &str, is_default: bool) -> Value {
    json!({
        "line1": line1,
        "city": "Guadalajara",
        "state": "Jalisco",
        "postal_code": "44100",
        "is_default": is_default
    })
}

fn card() -> Value {
    json!({
        "card_type": "credit",
        "number": "1234 5678 9012 3456",
        "cardholder_name": "Ana López",
        "expiry": "12/29",
        "cvv": "123"
    })
}

/// Fill the cart with two Cascos and one pair of Guantes.
async fn fill_cart(shop: &mut Shop) {
    for product in [&shop.casco, &shop.casco, &shop.guantes] {
        let response = shop
            .app
            .post("/cart/items", json!({ "product_id": product.id }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    }
}

/// Save a default address and hand it off to payment.
async fn proceed_to_payment(shop: &mut Shop) -> Value {
    let response = shop
        .app
        .post("/checkout/addresses", address("Av. Juárez 10", true))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let address_id = response.body["id"].clone();

    let response = shop
        .app
        .post("/checkout/proceed", json!({ "address_id": address_id }))
        .await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    address_id
}

#[tokio::test]
async fn test_cart_badge_and_total() {
    let mut shop = shop().await;
    fill_cart(&mut shop).await;

    let response = shop.app.get("/cart/count").await;
    assert_eq!(response.body["count"], 3);

    let response = shop.app.get("/cart").await;
    assert_eq!(response.body["item_count"], 3);
    assert_eq!(amount(&response.body["total"]), Decimal::new(2500, 2));
    assert_eq!(response.body["cart"]["lines"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_add_refuses_to_exceed_stock() {
    let mut shop = shop().await;
    let id = shop.guantes.id;

    shop.app.post("/cart/items", json!({ "product_id": id })).await;
    shop.app.post("/cart/items", json!({ "product_id": id })).await;
    let response = shop.app.post("/cart/items", json!({ "product_id": id })).await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error(), "only 2 units available");
    assert_eq!(shop.app.store.cart_items(shop.user)[0].quantity, 2);
}

#[tokio::test]
async fn test_quantity_bounds() {
    let mut shop = shop().await;
    fill_cart(&mut shop).await;
    let cart = shop.app.get("/cart").await;
    let line = cart.body["cart"]["lines"]
        .as_array()
        .unwrap()
        .iter()
        .find(|line| line["product"]["name"] == "Casco")
        .unwrap()
        .clone();
    let uri = format!("/cart/items/{}", line["id"].as_str().unwrap());

    let response = shop.app.patch(&uri, json!({ "quantity": 6 })).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error(), "only 5 units available");

    let response = shop.app.patch(&uri, json!({ "quantity": 0 })).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = shop.app.patch(&uri, json!({ "quantity": 5 })).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(amount(&response.body["total"]), Decimal::new(5500, 2));

    let response = shop.app.delete(&uri).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["item_count"], 1);
}

#[tokio::test]
async fn test_checkout_preconditions() {
    let mut shop = shop().await;

    let response = shop.app.post("/cart/checkout", json!({})).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error(), "the cart is empty");

    let response = shop.app.post("/checkout/proceed", json!({})).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "select or add a shipping address");

    let response = shop.app.get("/payment").await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error(), "select a shipping address first");
}

#[tokio::test]
async fn test_single_default_address() {
    let mut shop = shop().await;

    shop.app
        .post("/checkout/addresses", address("Calle 1", true))
        .await;
    shop.app
        .post("/checkout/addresses", address("Calle 2", false))
        .await;
    let third = shop
        .app
        .post("/checkout/addresses", address("Calle 3", true))
        .await;

    let page = shop.app.get("/checkout").await;
    let addresses = page.body["addresses"].as_array().unwrap();
    assert_eq!(addresses.len(), 3);
    assert_eq!(
        addresses.iter().filter(|a| a["is_default"] == true).count(),
        1
    );
    assert_eq!(page.body["selected"], third.body["id"]);
    assert_eq!(addresses[0]["country"], "México");
}

#[tokio::test]
async fn test_place_order() {
    let mut shop = shop().await;
    fill_cart(&mut shop).await;
    proceed_to_payment(&mut shop).await;

    let page = shop.app.get("/payment").await;
    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.body["cardholder_name"], "Ana López");
    assert_eq!(amount(&page.body["total"]), Decimal::new(2500, 2));

    let response = shop.app.post("/payment", card()).await;
    assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);

    let confirmation = &response.body["confirmation"];
    assert_eq!(confirmation["order_number"], "PED-000001");
    assert_eq!(confirmation["masked_card"], "****3456");
    assert!(
        confirmation["tracking_number"]
            .as_str()
            .unwrap()
            .starts_with("MX")
    );
    let message = response.body["message"].as_str().unwrap();
    assert!(message.starts_with("Thank you for your purchase, Ana López!"));
    assert!(message.contains("Total paid: $25.00 MXN"));

    let store = &shop.app.store;
    assert_eq!(store.product(shop.casco.id).unwrap().stock, 3);
    assert_eq!(store.product(shop.guantes.id).unwrap().stock, 1);
    assert!(store.cart_items(shop.user).is_empty());
    assert_eq!(store.orders().len(), 1);
    assert_eq!(store.order_items().len(), 2);

    // The hand-off is spent
    let response = shop.app.post("/payment", card()).await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_invalid_card_writes_nothing() {
    let mut shop = shop().await;
    fill_cart(&mut shop).await;
    proceed_to_payment(&mut shop).await;

    let mut bad = card();
    bad["number"] = json!("1234 5678");
    let response = shop.app.post("/payment", bad).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.error(), "invalid card number");

    let mut bad = card();
    bad["expiry"] = json!("13/29");
    let response = shop.app.post("/payment", bad).await;
    assert_eq!(response.error(), "invalid expiration month");

    assert!(shop.app.store.payments().is_empty());

    // The hand-off survives a rejected card
    let response = shop.app.post("/payment", card()).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_failed_order_insert_keeps_payment_and_cart() {
    let mut shop = shop().await;
    fill_cart(&mut shop).await;
    proceed_to_payment(&mut shop).await;
    shop.app.store.fail_on(Operation::InsertOrder);

    let response = shop.app.post("/payment", card()).await;
    assert_eq!(response.status, StatusCode::BAD_GATEWAY);
    assert_eq!(
        response.error(),
        "Could not complete the order (order failed)"
    );

    let store = &shop.app.store;
    assert_eq!(store.payments().len(), 1);
    assert!(store.orders().is_empty());
    assert_eq!(store.product(shop.casco.id).unwrap().stock, 5);
    assert_eq!(store.cart_items(shop.user).len(), 2);
}

#[tokio::test]
async fn test_order_number_fallback() {
    let mut shop = shop().await;
    fill_cart(&mut shop).await;
    proceed_to_payment(&mut shop).await;
    shop.app.store.fail_on(Operation::GenerateOrderNumber);

    let response = shop.app.post("/payment", card()).await;
    assert_eq!(response.status, StatusCode::OK);
    let number = response.body["confirmation"]["order_number"]
        .as_str()
        .unwrap();
    assert!(number.starts_with("ORD"));
    assert!(number.len() > 3);
}

#[tokio::test]
async fn test_cart_is_private() {
    let mut shop = shop().await;
    fill_cart(&mut shop).await;
    let cart = shop.app.get("/cart").await;
    let line_id = cart.body["cart"]["lines"][0]["id"].as_str().unwrap().to_string();

    let mut other = shop.app.new_browser();
    shop.app.seed_user("luis@ejemplo.mx", "Luis", UserRole::User);
    other.login("luis@ejemplo.mx").await;

    let response = other
        .patch(&format!("/cart/items/{line_id}"), json!({ "quantity": 1 }))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(shop.app.store.cart_items(shop.user).len(), 2);
}
