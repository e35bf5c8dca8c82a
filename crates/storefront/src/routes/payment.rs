//! Payment route handlers.
//!
//! Both routes need the hand-off left by `POST /checkout/proceed`. A placed
//! order consumes it; a failed attempt keeps it so the user can retry.

use axum::{Json, extract::State};
use serde::Serialize;
use tower_sessions::Session;

use motostore_core::CardInput;

use crate::db::Store;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::{RequireAuth, clear_payment_handoff, payment_handoff};
use crate::services::{OrderConfirmation, PaymentPage, PaymentService};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Placed {
    /// Receipt text for the customer.
    pub message: String,
    pub confirmation: OrderConfirmation,
}

/// `GET /payment`
pub async fn show<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
    session: Session,
) -> Result<Json<PaymentPage>> {
    let handoff = payment_handoff(&session).await?;
    let store = state.store().scoped(&auth);
    let page = PaymentService::new(&store, &auth).prepare(handoff).await?;
    Ok(Json(page))
}

/// `POST /payment`
pub async fn pay<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
    session: Session,
    Json(card): Json<CardInput>,
) -> Result<Json<Placed>> {
    let handoff = payment_handoff(&session).await?;
    let store = state.store().scoped(&auth);
    let confirmation = PaymentService::new(&store, &auth)
        .place_order(handoff, &card)
        .await?;

    clear_payment_handoff(&session).await?;
    add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", confirmation.order_number.as_str())]),
    );

    Ok(Json(Placed {
        message: confirmation.message(),
        confirmation,
    }))
}
