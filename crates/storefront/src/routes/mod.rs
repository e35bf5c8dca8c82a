//! HTTP route handlers for storefront.
//!
//! Every handler speaks JSON. Errors come back as `{"error": "<message>"}`.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                  - Liveness
//! GET    /health/ready            - Backend reachability
//!
//! # Auth
//! POST   /auth/login              - Sign in (rate limited)
//! POST   /auth/register           - Create account (rate limited)
//! POST   /auth/logout             - Sign out
//! POST   /auth/guest              - Browse without an account
//! GET    /auth/session            - Current viewer and guest flag
//!
//! # Catalog
//! GET    /catalog?q=&categories=  - Filtered catalog page
//!
//! # Cart (requires auth)
//! GET    /cart                    - Cart lines and total
//! GET    /cart/count              - Badge count
//! POST   /cart/items              - Add one unit of a product
//! PATCH  /cart/items/{id}         - Set quantity
//! DELETE /cart/items/{id}         - Remove line
//! POST   /cart/checkout           - Check the cart is ready for checkout
//!
//! # Checkout (requires auth)
//! GET    /checkout                - Addresses and cart
//! POST   /checkout/addresses      - Save address
//! POST   /checkout/proceed        - Hand off to payment
//!
//! # Payment (requires auth and a hand-off)
//! GET    /payment                 - Payment page
//! POST   /payment                 - Pay and place the order
//!
//! # Admin (requires the admin role)
//! GET|POST        /admin/products
//! PUT|DELETE      /admin/products/{id}
//! GET|POST        /admin/categories
//! PUT|DELETE      /admin/categories/{id}
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod health;
pub mod payment;

use axum::{
    Router,
    routing::{get, patch, post, put},
};

use crate::db::Store;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// Sign-in and registration sit behind the auth rate limiter.
pub fn auth_routes<S: Store>(rate_limit: bool) -> Router<AppState<S>> {
    let mut credentials = Router::new()
        .route("/login", post(auth::login::<S>))
        .route("/register", post(auth::register::<S>));
    if rate_limit {
        credentials = credentials.layer(auth_rate_limiter());
    }

    Router::new()
        .merge(credentials)
        .route("/logout", post(auth::logout::<S>))
        .route("/guest", post(auth::guest))
        .route("/session", get(auth::current::<S>))
}

/// Create the cart routes router.
pub fn cart_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(cart::show::<S>))
        .route("/count", get(cart::count::<S>))
        .route("/items", post(cart::add::<S>))
        .route(
            "/items/{id}",
            patch(cart::update::<S>).delete(cart::remove::<S>),
        )
        .route("/checkout", post(cart::checkout::<S>))
}

/// Create the checkout routes router.
pub fn checkout_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route("/", get(checkout::show::<S>))
        .route("/addresses", post(checkout::save_address::<S>))
        .route("/proceed", post(checkout::proceed::<S>))
}

/// Create the admin routes router.
pub fn admin_routes<S: Store>() -> Router<AppState<S>> {
    Router::new()
        .route(
            "/products",
            get(admin::list_products::<S>).post(admin::create_product::<S>),
        )
        .route(
            "/products/{id}",
            put(admin::update_product::<S>).delete(admin::delete_product::<S>),
        )
        .route(
            "/categories",
            get(admin::list_categories::<S>).post(admin::create_category::<S>),
        )
        .route(
            "/categories/{id}",
            put(admin::update_category::<S>).delete(admin::delete_category::<S>),
        )
}

/// Create all routes for the storefront.
pub fn routes<S: Store>(rate_limit: bool) -> Router<AppState<S>> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness::<S>))
        .nest("/auth", auth_routes(rate_limit))
        .route("/catalog", get(catalog::index::<S>))
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .route("/payment", get(payment::show::<S>).post(payment::pay::<S>))
        .nest("/admin", admin_routes())
}
