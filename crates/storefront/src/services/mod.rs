//! Business logic services for storefront.
//!
//! Each service borrows a [`Store`](crate::db::Store) (already scoped to the
//! signed-in user where one is needed) and returns structured results or
//! structured errors. Route handlers decide how to present them.
//!
//! # Services
//!
//! - `auth` - Sign-in, sign-up, sign-out, session-change subscriptions
//! - `catalog` - Catalog page, filtering, add-to-cart
//! - `cart` - Cart lines and quantities
//! - `checkout` - Shipping addresses and the hand-off to payment
//! - `payment` - Simulated payment and order placement
//! - `admin` - Product and category management

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod payment;

pub use admin::{AdminError, AdminService};
pub use auth::{AuthError, AuthService, SessionEvents, Subscription, Viewer};
pub use cart::{AddedToCart, CartError, CartService};
pub use catalog::{CatalogFilter, CatalogPage, CatalogService};
pub use checkout::{AddressForm, CheckoutError, CheckoutPage, CheckoutService};
pub use payment::{OrderConfirmation, OrderStep, PaymentError, PaymentPage, PaymentService};
