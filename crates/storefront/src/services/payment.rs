//! Payment service.
//!
//! Loads what the payment page needs and places the order. Payments are
//! simulated: card input is checked for shape only and no payment network
//! is contacted.
//!
//! # Order placement
//!
//! Placement is a fixed sequence of backend writes with no transaction and
//! no rollback:
//!
//! 1. Insert the payment record (completed, simulated)
//! 2. Get an order number from the backend, or fall back to `ORD<millis>`;
//!    the tracking number is always `MX<last 8 digits of millis>`
//! 3. Insert the order
//! 4. Insert one order line per cart line
//! 5. Write each product's new stock (snapshot stock minus quantity)
//! 6. Delete the cart lines
//! 7. Return the confirmation
//!
//! The first failing step stops the sequence and is reported as a
//! [`PaymentError::Step`]. Earlier writes stay in place, so a failed order
//! insert leaves a payment without an order.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use motostore_core::{
    CardError, CardInput, CardType, CartId, OrderStatus, PaymentStatus, Price, ProcessingMethod,
    ValidatedCard,
};

use crate::db::{OrderRepository, RepositoryError, Store};
use crate::models::{
    Address, AuthSession, Cart, NewOrder, NewPayment, Order, OrderItem, Payment, PaymentHandoff,
};

/// Steps of order placement that write to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStep {
    Payment,
    Order,
    OrderItems,
    Stock,
    ClearCart,
}

impl std::fmt::Display for OrderStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Payment => write!(f, "payment"),
            Self::Order => write!(f, "order"),
            Self::OrderItems => write!(f, "order items"),
            Self::Stock => write!(f, "stock update"),
            Self::ClearCart => write!(f, "cart cleanup"),
        }
    }
}

/// Errors from the payment page and order placement.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Payment was opened without going through checkout.
    #[error("select a shipping address first")]
    MissingHandoff,

    #[error("shipping address not found")]
    AddressNotFound,

    #[error("the cart is empty")]
    EmptyCart,

    /// Card input failed format validation.
    #[error(transparent)]
    Card(#[from] CardError),

    /// A placement step failed; the steps before it were committed.
    #[error("{step} failed: {source}")]
    Step {
        step: OrderStep,
        #[source]
        source: RepositoryError,
    },

    #[error("backend error: {0}")]
    Repository(#[from] RepositoryError),
}

impl PaymentError {
    /// The placement step that failed, if any.
    #[must_use]
    pub const fn step(&self) -> Option<OrderStep> {
        match self {
            Self::Step { step, .. } => Some(*step),
            _ => None,
        }
    }
}

fn at(step: OrderStep) -> impl FnOnce(RepositoryError) -> PaymentError {
    move |source| PaymentError::Step { step, source }
}

/// Order number used when the backend generator fails or returns nothing.
#[must_use]
pub fn fallback_order_number(now: DateTime<Utc>) -> String {
    format!("ORD{}", now.timestamp_millis())
}

/// Shipment tracking number: `MX` and the last 8 digits of the unix millis.
#[must_use]
pub fn tracking_number(now: DateTime<Utc>) -> String {
    format!("MX{:08}", now.timestamp_millis().rem_euclid(100_000_000))
}

/// Everything the payment page shows.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentPage {
    pub address: Address,
    pub cart: Cart,
    /// Recomputed from the cart, not taken from the hand-off.
    pub total: Price,
    /// Suggested cardholder: the profile's full name.
    pub cardholder_name: String,
}

/// Summary of a placed order.
#[derive(Debug, Clone, Serialize)]
pub struct OrderConfirmation {
    pub cardholder_name: String,
    pub order_number: String,
    pub tracking_number: String,
    pub total: Price,
    pub card_type: CardType,
    /// `****1234`
    pub masked_card: String,
    pub address: Address,
    pub order: Order,
    pub payment: Payment,
}

impl OrderConfirmation {
    /// Receipt text shown to the customer.
    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Thank you for your purchase, {}!\n\
             Order number: {}\n\
             Tracking number: {}\n\
             Total paid: {} {}\n\
             Paid with: {} {}\n\
             Shipping to:\n{}",
            self.cardholder_name,
            self.order_number,
            self.tracking_number,
            self.total,
            self.total.currency_code.code(),
            self.card_type,
            self.masked_card,
            self.address.label(),
        )
    }
}

/// Payment for one signed-in user.
pub struct PaymentService<'a, S> {
    store: &'a S,
    session: &'a AuthSession,
}

impl<'a, S: Store> PaymentService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, session: &'a AuthSession) -> Self {
        Self { store, session }
    }

    /// Load the address from the hand-off, the cart and the suggested
    /// cardholder name.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::MissingHandoff`, `PaymentError::AddressNotFound`
    /// or `PaymentError::EmptyCart` when a precondition does not hold.
    #[instrument(skip(self, handoff), fields(user_id = %self.session.user_id()))]
    pub async fn prepare(&self, handoff: Option<PaymentHandoff>) -> Result<PaymentPage, PaymentError> {
        let handoff = handoff.ok_or(PaymentError::MissingHandoff)?;
        let user = self.session.user_id();

        let (address, cart) = tokio::try_join!(
            self.store.find_address(user, handoff.address_id),
            self.store.load_cart(CartId::for_user(user))
        )?;
        let address = address.ok_or(PaymentError::AddressNotFound)?;
        if cart.is_empty() {
            return Err(PaymentError::EmptyCart);
        }

        let cardholder_name = match self.store.find_profile(user).await {
            Ok(profile) => profile.and_then(|p| p.full_name),
            Err(e) => {
                warn!(error = %e, "Failed to load profile");
                None
            }
        }
        .or_else(|| self.session.user.full_name.clone())
        .unwrap_or_default();

        if cart.total() != handoff.total {
            info!(
                handoff_total = %handoff.total,
                cart_total = %cart.total(),
                "Cart changed since checkout"
            );
        }

        Ok(PaymentPage {
            address,
            total: cart.total(),
            cart,
            cardholder_name,
        })
    }

    /// Validate the card and place the order.
    ///
    /// Preconditions are checked again against fresh data before anything
    /// is written.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::Card` for malformed card input, a precondition
    /// error from [`PaymentService::prepare`], or `PaymentError::Step` naming
    /// the placement step that failed.
    #[instrument(skip(self, handoff, card), fields(user_id = %self.session.user_id()))]
    pub async fn place_order(
        &self,
        handoff: Option<PaymentHandoff>,
        card: &CardInput,
    ) -> Result<OrderConfirmation, PaymentError> {
        let card = card.validate()?;
        let page = self.prepare(handoff).await?;

        let confirmation = self.run_sequence(&card, page).await.inspect_err(|e| {
            error!(error = %e, step = ?e.step(), "Order placement stopped");
        })?;

        info!(
            order_number = %confirmation.order_number,
            total = %confirmation.total,
            "Order placed"
        );
        Ok(confirmation)
    }

    async fn run_sequence(
        &self,
        card: &ValidatedCard,
        page: PaymentPage,
    ) -> Result<OrderConfirmation, PaymentError> {
        let user = self.session.user_id();
        let PaymentPage {
            address,
            cart,
            total,
            ..
        } = page;

        // 1
        let payment = self
            .store
            .insert_payment(&NewPayment {
                user_id: user,
                total,
                card_type: card.card_type,
                last_four: card.last_four.clone(),
                cardholder_name: card.cardholder_name.clone(),
                status: PaymentStatus::Completed,
                method: ProcessingMethod::Simulated,
            })
            .await
            .map_err(at(OrderStep::Payment))?;

        // 2
        let now = Utc::now();
        let order_number = next_order_number(self.store, now).await;
        let tracking_number = tracking_number(now);

        // 3
        let order = self
            .store
            .insert_order(&NewOrder {
                payment_id: payment.id,
                user_id: user,
                address_id: address.id,
                status: OrderStatus::Confirmed,
                order_number,
                tracking_number,
                confirmed_at: now,
            })
            .await
            .map_err(at(OrderStep::Order))?;

        // 4
        let items: Vec<OrderItem> = cart
            .lines
            .iter()
            .map(|line| OrderItem {
                order_id: order.id,
                product_id: line.product.id,
                quantity: line.quantity,
                unit_price: line.product.price,
                subtotal: line.line_total(),
                product_name: line.product.name.clone(),
                product_description: line.product.description.clone(),
            })
            .collect();
        self.store
            .insert_order_items(&items)
            .await
            .map_err(at(OrderStep::OrderItems))?;

        // 5
        for line in &cart.lines {
            self.store
                .set_product_stock(line.product.id, line.product.stock - line.quantity)
                .await
                .map_err(at(OrderStep::Stock))?;
        }

        // 6
        self.store
            .clear_cart(CartId::for_user(user))
            .await
            .map_err(at(OrderStep::ClearCart))?;

        Ok(OrderConfirmation {
            cardholder_name: card.cardholder_name.clone(),
            order_number: order.order_number.clone(),
            tracking_number: order.tracking_number.clone(),
            total,
            card_type: card.card_type,
            masked_card: card.masked(),
            address,
            order,
            payment,
        })
    }
}

async fn next_order_number<R: OrderRepository>(store: &R, now: DateTime<Utc>) -> String {
    match store.generate_order_number().await {
        Ok(Some(number)) => number,
        Ok(None) => fallback_order_number(now),
        Err(e) => {
            warn!(error = %e, "Order number generator failed, using fallback");
            fallback_order_number(now)
        }
    }
}
