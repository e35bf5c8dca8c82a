//! Checkout route handlers.
//!
//! `POST /checkout/proceed` stores the hand-off (address and total) in the
//! session, where the payment routes pick it up.

use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use tower_sessions::Session;

use motostore_core::AddressId;

use crate::db::Store;
use crate::error::Result;
use crate::middleware::{RequireAuth, set_payment_handoff};
use crate::models::{Address, PaymentHandoff};
use crate::services::{AddressForm, CheckoutPage, CheckoutService};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct Proceed {
    #[serde(default)]
    pub address_id: Option<AddressId>,
}

/// `GET /checkout`
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
) -> Result<Json<CheckoutPage>> {
    let store = state.store().scoped(&auth);
    let page = CheckoutService::new(&store, auth.user_id()).load().await?;
    Ok(Json(page))
}

/// `POST /checkout/addresses`
pub async fn save_address<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
    Json(form): Json<AddressForm>,
) -> Result<(StatusCode, Json<Address>)> {
    let store = state.store().scoped(&auth);
    let address = CheckoutService::new(&store, auth.user_id())
        .save_address(&form)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// `POST /checkout/proceed`
pub async fn proceed<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
    session: Session,
    Json(form): Json<Proceed>,
) -> Result<Json<PaymentHandoff>> {
    let store = state.store().scoped(&auth);
    let handoff = CheckoutService::new(&store, auth.user_id())
        .proceed(form.address_id)
        .await?;

    set_payment_handoff(&session, &handoff).await?;
    Ok(Json(handoff))
}
