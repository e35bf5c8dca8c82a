//! Data access for the storefront.
//!
//! Every entity lives in the hosted backend. Each one gets a repository
//! trait with typed operations so services never build queries themselves.
//! Two stores implement all of them:
//!
//! - [`SupabaseClient`](crate::backend::SupabaseClient) (see [`supabase`]):
//!   PostgREST tables and GoTrue auth
//! - [`MemoryStore`]: process-local state for tests and local development
//!
//! ## Tables
//!
//! - `productos`, `categorias` - Catalog
//! - `carritos`, `items_carrito` - One cart per user, keyed by user ID
//! - `direcciones_envio` - Shipping addresses
//! - `pagos`, `pedidos`, `items_pedido` - Simulated payments and orders
//! - `perfiles` - Display name and role

pub mod memory;
pub mod supabase;

use std::future::Future;

use thiserror::Error;

use motostore_core::{AddressId, CartId, CartItemId, CategoryId, Email, ProductId, UserId};

use crate::backend::BackendError;
use crate::models::{
    AccountUser, Address, AuthSession, Cart, CartItem, Category, CategoryDraft, NewAddress,
    NewOrder, NewPayment, Order, OrderItem, Payment, Product, ProductDraft, Profile,
};

pub use memory::MemoryStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Backend request failed.
    #[error("backend error: {0}")]
    Backend(BackendError),

    /// The targeted row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Unique constraint violation (e.g., duplicate key).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Credentials or token rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The backend refused the input (constraint or validation failure).
    #[error("rejected: {0}")]
    Rejected(String),

    /// Data in the backend is invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

impl From<BackendError> for RepositoryError {
    fn from(err: BackendError) -> Self {
        match &err {
            BackendError::NotFound(what) => Self::NotFound(what.clone()),
            BackendError::Api(api) if api.status == 409 || api.code.as_deref() == Some("23505") => {
                Self::Conflict(api.message.clone())
            }
            BackendError::Api(api) if api.status == 401 => Self::Unauthorized(api.message.clone()),
            BackendError::Api(api) if matches!(api.status, 400 | 422) => {
                Self::Rejected(api.to_string())
            }
            _ => Self::Backend(err),
        }
    }
}

/// Result alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

// =============================================================================
// Repository traits
// =============================================================================

/// Products (`productos`).
pub trait ProductRepository {
    /// Active products ordered by name.
    fn find_active_products(&self) -> impl Future<Output = Result<Vec<Product>>> + Send;

    fn find_product(&self, id: ProductId) -> impl Future<Output = Result<Option<Product>>> + Send;

    /// Every product, active or not, ordered by name.
    fn list_all_products(&self) -> impl Future<Output = Result<Vec<Product>>> + Send;

    fn create_product(&self, draft: &ProductDraft) -> impl Future<Output = Result<Product>> + Send;

    /// Returns `None` if no product has `id`.
    fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> impl Future<Output = Result<Option<Product>>> + Send;

    fn delete_product(&self, id: ProductId) -> impl Future<Output = Result<()>> + Send;

    /// Overwrite the stock level.
    fn set_product_stock(&self, id: ProductId, stock: i32)
    -> impl Future<Output = Result<()>> + Send;
}

/// Categories (`categorias`).
pub trait CategoryRepository {
    /// Active categories ordered by name.
    fn find_active_categories(&self) -> impl Future<Output = Result<Vec<Category>>> + Send;

    fn list_all_categories(&self) -> impl Future<Output = Result<Vec<Category>>> + Send;

    fn create_category(
        &self,
        draft: &CategoryDraft,
    ) -> impl Future<Output = Result<Category>> + Send;

    /// Returns `None` if no category has `id`.
    fn update_category(
        &self,
        id: CategoryId,
        draft: &CategoryDraft,
    ) -> impl Future<Output = Result<Option<Category>>> + Send;

    fn delete_category(&self, id: CategoryId) -> impl Future<Output = Result<()>> + Send;
}

/// Carts (`carritos`) and their lines (`items_carrito`).
pub trait CartRepository {
    /// Create the user's cart row if it does not exist yet.
    fn ensure_cart(&self, user: UserId) -> impl Future<Output = Result<CartId>> + Send;

    fn find_cart_item(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> impl Future<Output = Result<Option<CartItem>>> + Send;

    fn insert_cart_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: i32,
    ) -> impl Future<Output = Result<CartItem>> + Send;

    fn update_cart_item_quantity(
        &self,
        item: CartItemId,
        quantity: i32,
    ) -> impl Future<Output = Result<()>> + Send;

    fn delete_cart_item(&self, item: CartItemId) -> impl Future<Output = Result<()>> + Send;

    /// Lines joined with their products.
    fn load_cart(&self, cart: CartId) -> impl Future<Output = Result<Cart>> + Send;

    /// Sum of line quantities.
    fn count_cart_items(&self, cart: CartId) -> impl Future<Output = Result<i64>> + Send;

    /// Delete every line of the cart.
    fn clear_cart(&self, cart: CartId) -> impl Future<Output = Result<()>> + Send;
}

/// Shipping addresses (`direcciones_envio`).
pub trait AddressRepository {
    /// The user's addresses, default first.
    fn list_addresses(&self, user: UserId) -> impl Future<Output = Result<Vec<Address>>> + Send;

    fn find_address(
        &self,
        user: UserId,
        id: AddressId,
    ) -> impl Future<Output = Result<Option<Address>>> + Send;

    /// Unset the default flag on all of the user's addresses.
    fn clear_default_addresses(&self, user: UserId) -> impl Future<Output = Result<()>> + Send;

    fn insert_address(&self, address: &NewAddress) -> impl Future<Output = Result<Address>> + Send;
}

/// Payments (`pagos`).
pub trait PaymentRepository {
    fn insert_payment(&self, payment: &NewPayment) -> impl Future<Output = Result<Payment>> + Send;
}

/// Orders (`pedidos`, `items_pedido`).
pub trait OrderRepository {
    /// Ask the backend for the next order number. `None` when the
    /// generator returns nothing.
    fn generate_order_number(&self) -> impl Future<Output = Result<Option<String>>> + Send;

    fn insert_order(&self, order: &NewOrder) -> impl Future<Output = Result<Order>> + Send;

    fn insert_order_items(&self, items: &[OrderItem]) -> impl Future<Output = Result<()>> + Send;
}

/// Profiles (`perfiles`).
pub trait ProfileRepository {
    fn find_profile(&self, user: UserId) -> impl Future<Output = Result<Option<Profile>>> + Send;
}

/// Sign-up form data.
#[derive(Clone)]
pub struct SignUp {
    pub email: Email,
    pub password: String,
    pub full_name: String,
    /// Where the confirmation email sends the user.
    pub redirect_to: String,
}

impl std::fmt::Debug for SignUp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignUp")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("full_name", &self.full_name)
            .field("redirect_to", &self.redirect_to)
            .finish()
    }
}

/// Result of a sign-up. `session` is set when the account needs no email
/// confirmation.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub user: AccountUser,
    pub session: Option<AuthSession>,
}

/// Password authentication against the auth server.
pub trait AuthProvider {
    /// # Errors
    ///
    /// `RepositoryError::Unauthorized` for wrong credentials.
    fn sign_in(
        &self,
        email: &Email,
        password: &str,
    ) -> impl Future<Output = Result<AuthSession>> + Send;

    /// # Errors
    ///
    /// `RepositoryError::Conflict` if the email is already registered.
    fn sign_up(&self, request: &SignUp) -> impl Future<Output = Result<SignUpOutcome>> + Send;

    fn sign_out(&self, session: &AuthSession) -> impl Future<Output = Result<()>> + Send;

    /// The user behind a session, or `None` if the token is no longer valid.
    fn current_user(
        &self,
        session: &AuthSession,
    ) -> impl Future<Output = Result<Option<AccountUser>>> + Send;
}

/// Everything a storefront backend provides.
pub trait Store:
    ProductRepository
    + CategoryRepository
    + CartRepository
    + AddressRepository
    + PaymentRepository
    + OrderRepository
    + ProfileRepository
    + AuthProvider
    + Clone
    + Send
    + Sync
    + 'static
{
    /// A handle that acts on behalf of the session's user.
    #[must_use]
    fn scoped(&self, session: &AuthSession) -> Self;

    /// Check that the backend is reachable.
    fn health_check(&self) -> impl Future<Output = Result<()>> + Send;
}
