//! Cart route handlers.
//!
//! Adding goes through the catalog so guests get a "sign in to buy" answer
//! instead of a bare 401. Every other cart route requires a signed-in user.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use motostore_core::{CartItemId, Price, ProductId};

use crate::db::Store;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::Cart;
use crate::services::{AddedToCart, CartService, CatalogService};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct AddItem {
    pub product_id: ProductId,
}

#[derive(Deserialize)]
pub struct UpdateQuantity {
    pub quantity: i32,
}

/// Cart page data.
#[derive(Debug, Serialize)]
pub struct CartView {
    pub cart: Cart,
    pub total: Price,
    pub item_count: i64,
}

impl From<Cart> for CartView {
    fn from(cart: Cart) -> Self {
        Self {
            total: cart.total(),
            item_count: cart.item_count(),
            cart,
        }
    }
}

/// `POST /cart/items`
pub async fn add<S: Store>(
    State(state): State<AppState<S>>,
    OptionalAuth(ctx): OptionalAuth,
    Json(form): Json<AddItem>,
) -> Result<Json<AddedToCart>> {
    let added = CatalogService::new(state.store(), state.events())
        .add_to_cart(&ctx, form.product_id)
        .await?;

    add_breadcrumb(
        "cart",
        "Added product",
        Some(&[("product_id", form.product_id.to_string().as_str())]),
    );
    Ok(Json(added))
}

/// `GET /cart`
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
) -> Result<Json<CartView>> {
    let store = state.store().scoped(&auth);
    let cart = CartService::new(&store, auth.user_id()).load().await?;
    Ok(Json(cart.into()))
}

/// `GET /cart/count`
pub async fn count<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
) -> Result<Json<Value>> {
    let store = state.store().scoped(&auth);
    let count = CartService::new(&store, auth.user_id()).count().await?;
    Ok(Json(json!({ "count": count })))
}

/// `PATCH /cart/items/{id}`
pub async fn update<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
    Path(item): Path<CartItemId>,
    Json(form): Json<UpdateQuantity>,
) -> Result<Json<CartView>> {
    let store = state.store().scoped(&auth);
    let cart = CartService::new(&store, auth.user_id())
        .set_quantity(item, form.quantity)
        .await?;
    Ok(Json(cart.into()))
}

/// `DELETE /cart/items/{id}`
pub async fn remove<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
    Path(item): Path<CartItemId>,
) -> Result<Json<CartView>> {
    let store = state.store().scoped(&auth);
    let cart = CartService::new(&store, auth.user_id()).remove(item).await?;
    Ok(Json(cart.into()))
}

/// `POST /cart/checkout`
///
/// Confirms the cart is not empty before the client moves on to checkout.
pub async fn checkout<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
) -> Result<Json<CartView>> {
    let store = state.store().scoped(&auth);
    let cart = CartService::new(&store, auth.user_id())
        .proceed_to_checkout()
        .await?;
    Ok(Json(cart.into()))
}
