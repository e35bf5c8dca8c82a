//! Core types for MotoStore.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod card;
pub mod email;
pub mod id;
pub mod price;
pub mod status;

pub use card::{CardError, CardInput, Expiry, ValidatedCard, format_card_number, format_expiry};
pub use email::{Email, EmailError};
pub use id::*;
pub use price::{CurrencyCode, Price};
pub use status::*;
