//! MotoStore Core - Shared types library.
//!
//! This crate provides common types used across all MotoStore components:
//! - `storefront` - Customer-facing storefront service (catalog, cart, checkout, payment)
//! - `cli` - Command-line tools for catalog management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no backend
//! access, no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, statuses,
//!   and card input

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
