//! Domain models for the storefront.
//!
//! These are separate from the backend's row types, which keep the
//! backend's column names and live next to the queries in `db::supabase`.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;
pub mod profile;
pub mod session;

pub use address::{Address, DEFAULT_COUNTRY, NewAddress};
pub use cart::{Cart, CartItem, CartLine, CartProduct};
pub use order::{NewOrder, NewPayment, Order, OrderItem, Payment};
pub use product::{Category, CategoryDraft, Product, ProductDraft};
pub use profile::Profile;
pub use session::{AccountUser, AuthContext, AuthSession, PaymentHandoff, keys as session_keys};
