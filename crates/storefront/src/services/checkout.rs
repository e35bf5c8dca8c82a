//! Checkout service.
//!
//! Lists and saves shipping addresses, and hands the selected address and
//! cart total to the payment step.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

use motostore_core::{AddressId, CartId, Price, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::{Address, Cart, DEFAULT_COUNTRY, NewAddress, PaymentHandoff};

/// Errors from checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// A required address field is blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("select or add a shipping address")]
    NoAddressSelected,

    #[error("shipping address not found")]
    AddressNotFound,

    #[error("the cart is empty")]
    EmptyCart,

    #[error("backend error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Address form as submitted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressForm {
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

fn required(value: &str, field: &'static str) -> Result<String, CheckoutError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CheckoutError::MissingField(field));
    }
    Ok(value.to_string())
}

impl AddressForm {
    /// Trim and check the form.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingField` for the first blank required field.
    pub fn validate(&self, user: UserId) -> Result<NewAddress, CheckoutError> {
        let country = match self.country.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_COUNTRY.to_string(),
            Some(country) => country.to_string(),
        };

        Ok(NewAddress {
            user_id: user,
            line1: required(&self.line1, "line1")?,
            line2: self
                .line2
                .as_deref()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(str::to_string),
            city: required(&self.city, "city")?,
            state: required(&self.state, "state")?,
            postal_code: required(&self.postal_code, "postal_code")?,
            country,
            is_default: self.is_default,
        })
    }
}

/// Everything the checkout page shows.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutPage {
    /// Default address first.
    pub addresses: Vec<Address>,
    /// Pre-selected address: the default, if any.
    pub selected: Option<AddressId>,
    pub cart: Cart,
    pub total: Price,
}

/// Checkout for one user.
pub struct CheckoutService<'a, S> {
    store: &'a S,
    user: UserId,
}

impl<'a, S: Store> CheckoutService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, user: UserId) -> Self {
        Self { store, user }
    }

    /// Load addresses and cart concurrently.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::Repository` if either load fails.
    #[instrument(skip(self), fields(user_id = %self.user))]
    pub async fn load(&self) -> Result<CheckoutPage, CheckoutError> {
        let (addresses, cart) = tokio::try_join!(
            self.store.list_addresses(self.user),
            self.store.load_cart(CartId::for_user(self.user))
        )?;

        let selected = addresses.iter().find(|a| a.is_default).map(|a| a.id);
        Ok(CheckoutPage {
            addresses,
            selected,
            total: cart.total(),
            cart,
        })
    }

    /// Save a new address. The saved address becomes the selection.
    ///
    /// With `is_default` set, the user's other addresses lose their default
    /// flag first. The two writes are not atomic: if the insert fails after
    /// the flags were cleared, the user is left with no default address.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingField` for invalid forms, or
    /// `CheckoutError::Repository` if a write fails.
    #[instrument(skip(self, form), fields(user_id = %self.user, is_default = form.is_default))]
    pub async fn save_address(&self, form: &AddressForm) -> Result<Address, CheckoutError> {
        let address = form.validate(self.user)?;

        if address.is_default {
            self.store.clear_default_addresses(self.user).await?;
        }
        let saved = self.store.insert_address(&address).await?;

        info!(address_id = %saved.id, "Shipping address saved");
        Ok(saved)
    }

    /// Hand the selected address and the cart total to payment.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::NoAddressSelected` without a selection,
    /// `CheckoutError::AddressNotFound` if it is not one of the user's, and
    /// `CheckoutError::EmptyCart` if there is nothing to pay for.
    #[instrument(skip(self), fields(user_id = %self.user))]
    pub async fn proceed(&self, address: Option<AddressId>) -> Result<PaymentHandoff, CheckoutError> {
        let address_id = address.ok_or(CheckoutError::NoAddressSelected)?;

        let (address, cart) = tokio::try_join!(
            self.store.find_address(self.user, address_id),
            self.store.load_cart(CartId::for_user(self.user))
        )?;
        if address.is_none() {
            return Err(CheckoutError::AddressNotFound);
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        Ok(PaymentHandoff {
            address_id,
            total: cart.total(),
        })
    }
}
