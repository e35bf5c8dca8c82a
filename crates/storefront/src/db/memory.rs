//! In-memory store.
//!
//! Implements every repository trait over process-local state. Used by the
//! test suites and for running the storefront without a backend project.
//! Individual operations can be made to fail so partial-failure paths can be
//! exercised.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;

use motostore_core::{
    AddressId, CartId, CartItemId, CategoryId, Email, OrderId, PaymentId, Price, ProductId,
    UserId, UserRole,
};

use super::{
    AddressRepository, AuthProvider, CartRepository, CategoryRepository, OrderRepository,
    PaymentRepository, ProductRepository, ProfileRepository, RepositoryError, Result, SignUp,
    SignUpOutcome, Store,
};
use crate::backend::{ApiError, BackendError};
use crate::models::{
    AccountUser, Address, AuthSession, Cart, CartItem, CartLine, CartProduct, Category,
    CategoryDraft, NewAddress, NewOrder, NewPayment, Order, OrderItem, Payment, Product,
    ProductDraft, Profile,
};

/// Store operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    FindProducts,
    FindCategories,
    WriteCatalog,
    EnsureCart,
    WriteCartItem,
    LoadCart,
    ClearCart,
    ListAddresses,
    ClearDefaultAddresses,
    InsertAddress,
    InsertPayment,
    GenerateOrderNumber,
    InsertOrder,
    InsertOrderItems,
    SetProductStock,
    FindProfile,
    Auth,
}

/// Process-local store. Clones share state.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    products: Vec<Product>,
    categories: Vec<Category>,
    carts: HashSet<UserId>,
    cart_items: Vec<CartItem>,
    addresses: Vec<Address>,
    payments: Vec<Payment>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    profiles: HashMap<UserId, Profile>,
    accounts: HashMap<Email, Account>,
    tokens: HashMap<String, UserId>,
    failures: HashSet<Operation>,
    order_numbers_disabled: bool,
    last_order_number: u32,
}

struct Account {
    id: UserId,
    password: String,
    full_name: Option<String>,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("MemoryStore")
            .field("products", &state.products.len())
            .field("categories", &state.categories.len())
            .field("cart_items", &state.cart_items.len())
            .field("orders", &state.orders.len())
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Lock the state, failing if `op` has been made to fail.
    fn guarded(&self, op: Operation) -> Result<MutexGuard<'_, MemoryState>> {
        let state = self.lock();
        if state.failures.contains(&op) {
            return Err(RepositoryError::Backend(BackendError::Api(ApiError {
                status: 503,
                message: format!("{op:?} unavailable"),
                ..ApiError::default()
            })));
        }
        Ok(state)
    }

    // =========================================================================
    // Test controls
    // =========================================================================

    /// Make every later call of `op` fail with a backend error.
    pub fn fail_on(&self, op: Operation) {
        self.lock().failures.insert(op);
    }

    /// Undo [`MemoryStore::fail_on`].
    pub fn recover(&self, op: Operation) {
        self.lock().failures.remove(&op);
    }

    /// Make the order-number generator return nothing.
    pub fn disable_order_numbers(&self) {
        self.lock().order_numbers_disabled = true;
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Add a category.
    pub fn seed_category(&self, name: &str) -> Category {
        let category = Category {
            id: CategoryId::random(),
            name: name.to_string(),
            description: None,
            is_active: true,
        };
        self.lock().categories.push(category.clone());
        category
    }

    /// Add an active product.
    pub fn seed_product(&self, category: CategoryId, name: &str, price: Decimal, stock: i32) -> Product {
        let product = Product {
            id: ProductId::random(),
            category_id: category,
            name: name.to_string(),
            description: None,
            price: Price::store(price),
            stock,
            image_url: None,
            is_active: true,
        };
        self.lock().products.push(product.clone());
        product
    }

    /// Replace a stored product wholesale.
    pub fn put_product(&self, product: Product) {
        let mut state = self.lock();
        state.products.retain(|p| p.id != product.id);
        state.products.push(product);
    }

    /// Register a confirmed account with a profile.
    pub fn seed_user(&self, email: &Email, password: &str, full_name: Option<&str>, role: UserRole) -> UserId {
        let id = UserId::random();
        let mut state = self.lock();
        state.accounts.insert(
            email.clone(),
            Account {
                id,
                password: password.to_string(),
                full_name: full_name.map(str::to_string),
            },
        );
        state.profiles.insert(
            id,
            Profile {
                id,
                full_name: full_name.map(str::to_string),
                role,
            },
        );
        id
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<Product> {
        self.lock().products.iter().find(|p| p.id == id).cloned()
    }

    #[must_use]
    pub fn cart_items(&self, user: UserId) -> Vec<CartItem> {
        let cart = CartId::for_user(user);
        self.lock()
            .cart_items
            .iter()
            .filter(|item| item.cart_id == cart)
            .copied()
            .collect()
    }

    #[must_use]
    pub fn has_cart(&self, user: UserId) -> bool {
        self.lock().carts.contains(&user)
    }

    #[must_use]
    pub fn addresses(&self, user: UserId) -> Vec<Address> {
        self.lock()
            .addresses
            .iter()
            .filter(|a| a.user_id == user)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn payments(&self) -> Vec<Payment> {
        self.lock().payments.clone()
    }

    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        self.lock().orders.clone()
    }

    #[must_use]
    pub fn order_items(&self) -> Vec<OrderItem> {
        self.lock().order_items.clone()
    }
}

fn sorted_by_name<T>(items: impl Iterator<Item = T>, name: impl Fn(&T) -> String) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(name);
    items
}

fn product_from_draft(id: ProductId, draft: &ProductDraft) -> Product {
    Product {
        id,
        category_id: draft.category_id,
        name: draft.name.clone(),
        description: draft.description.clone(),
        price: Price::store(draft.price),
        stock: draft.stock,
        image_url: draft.image_url.clone(),
        is_active: draft.is_active,
    }
}

fn category_from_draft(id: CategoryId, draft: &CategoryDraft) -> Category {
    Category {
        id,
        name: draft.name.clone(),
        description: draft.description.clone(),
        is_active: draft.is_active,
    }
}

impl ProductRepository for MemoryStore {
    async fn find_active_products(&self) -> Result<Vec<Product>> {
        let state = self.guarded(Operation::FindProducts)?;
        Ok(sorted_by_name(
            state.products.iter().filter(|p| p.is_active).cloned(),
            |p| p.name.clone(),
        ))
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let state = self.guarded(Operation::FindProducts)?;
        Ok(state.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_all_products(&self) -> Result<Vec<Product>> {
        let state = self.guarded(Operation::FindProducts)?;
        Ok(sorted_by_name(state.products.iter().cloned(), |p| p.name.clone()))
    }

    async fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
        let mut state = self.guarded(Operation::WriteCatalog)?;
        let product = product_from_draft(ProductId::random(), draft);
        state.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: ProductId, draft: &ProductDraft) -> Result<Option<Product>> {
        let mut state = self.guarded(Operation::WriteCatalog)?;
        Ok(state.products.iter_mut().find(|p| p.id == id).map(|p| {
            *p = product_from_draft(id, draft);
            p.clone()
        }))
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        let mut state = self.guarded(Operation::WriteCatalog)?;
        state.products.retain(|p| p.id != id);
        Ok(())
    }

    async fn set_product_stock(&self, id: ProductId, stock: i32) -> Result<()> {
        let mut state = self.guarded(Operation::SetProductStock)?;
        if let Some(product) = state.products.iter_mut().find(|p| p.id == id) {
            product.stock = stock;
        }
        Ok(())
    }
}

impl CategoryRepository for MemoryStore {
    async fn find_active_categories(&self) -> Result<Vec<Category>> {
        let state = self.guarded(Operation::FindCategories)?;
        Ok(sorted_by_name(
            state.categories.iter().filter(|c| c.is_active).cloned(),
            |c| c.name.clone(),
        ))
    }

    async fn list_all_categories(&self) -> Result<Vec<Category>> {
        let state = self.guarded(Operation::FindCategories)?;
        Ok(sorted_by_name(state.categories.iter().cloned(), |c| c.name.clone()))
    }

    async fn create_category(&self, draft: &CategoryDraft) -> Result<Category> {
        let mut state = self.guarded(Operation::WriteCatalog)?;
        let category = category_from_draft(CategoryId::random(), draft);
        state.categories.push(category.clone());
        Ok(category)
    }

    async fn update_category(&self, id: CategoryId, draft: &CategoryDraft) -> Result<Option<Category>> {
        let mut state = self.guarded(Operation::WriteCatalog)?;
        Ok(state.categories.iter_mut().find(|c| c.id == id).map(|c| {
            *c = category_from_draft(id, draft);
            c.clone()
        }))
    }

    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        let mut state = self.guarded(Operation::WriteCatalog)?;
        if state.products.iter().any(|p| p.category_id == id) {
            return Err(RepositoryError::Conflict(
                "category still has products".to_string(),
            ));
        }
        state.categories.retain(|c| c.id != id);
        Ok(())
    }
}

impl CartRepository for MemoryStore {
    async fn ensure_cart(&self, user: UserId) -> Result<CartId> {
        let mut state = self.guarded(Operation::EnsureCart)?;
        state.carts.insert(user);
        Ok(CartId::for_user(user))
    }

    async fn find_cart_item(&self, cart: CartId, product: ProductId) -> Result<Option<CartItem>> {
        let state = self.guarded(Operation::LoadCart)?;
        Ok(state
            .cart_items
            .iter()
            .find(|item| item.cart_id == cart && item.product_id == product)
            .copied())
    }

    async fn insert_cart_item(&self, cart: CartId, product: ProductId, quantity: i32) -> Result<CartItem> {
        let mut state = self.guarded(Operation::WriteCartItem)?;
        if !state.carts.contains(&cart.owner()) {
            return Err(RepositoryError::NotFound(format!("cart {cart}")));
        }
        let item = CartItem {
            id: CartItemId::random(),
            cart_id: cart,
            product_id: product,
            quantity,
        };
        state.cart_items.push(item);
        Ok(item)
    }

    async fn update_cart_item_quantity(&self, item: CartItemId, quantity: i32) -> Result<()> {
        let mut state = self.guarded(Operation::WriteCartItem)?;
        if let Some(row) = state.cart_items.iter_mut().find(|row| row.id == item) {
            row.quantity = quantity;
        }
        Ok(())
    }

    async fn delete_cart_item(&self, item: CartItemId) -> Result<()> {
        let mut state = self.guarded(Operation::WriteCartItem)?;
        state.cart_items.retain(|row| row.id != item);
        Ok(())
    }

    async fn load_cart(&self, cart: CartId) -> Result<Cart> {
        let state = self.guarded(Operation::LoadCart)?;
        let lines = state
            .cart_items
            .iter()
            .filter(|item| item.cart_id == cart)
            .filter_map(|item| {
                let product = state.products.iter().find(|p| p.id == item.product_id)?;
                Some(CartLine {
                    id: item.id,
                    quantity: item.quantity,
                    product: CartProduct {
                        id: product.id,
                        name: product.name.clone(),
                        description: product.description.clone(),
                        price: product.price,
                        stock: product.stock,
                        image_url: product.image_url.clone(),
                    },
                })
            })
            .collect();
        Ok(Cart { lines })
    }

    async fn count_cart_items(&self, cart: CartId) -> Result<i64> {
        let state = self.guarded(Operation::LoadCart)?;
        Ok(state
            .cart_items
            .iter()
            .filter(|item| item.cart_id == cart)
            .map(|item| i64::from(item.quantity))
            .sum())
    }

    async fn clear_cart(&self, cart: CartId) -> Result<()> {
        let mut state = self.guarded(Operation::ClearCart)?;
        state.cart_items.retain(|item| item.cart_id != cart);
        Ok(())
    }
}

impl AddressRepository for MemoryStore {
    async fn list_addresses(&self, user: UserId) -> Result<Vec<Address>> {
        let state = self.guarded(Operation::ListAddresses)?;
        let mut addresses: Vec<Address> = state
            .addresses
            .iter()
            .filter(|a| a.user_id == user)
            .cloned()
            .collect();
        addresses.sort_by_key(|a| !a.is_default);
        Ok(addresses)
    }

    async fn find_address(&self, user: UserId, id: AddressId) -> Result<Option<Address>> {
        let state = self.guarded(Operation::ListAddresses)?;
        Ok(state
            .addresses
            .iter()
            .find(|a| a.id == id && a.user_id == user)
            .cloned())
    }

    async fn clear_default_addresses(&self, user: UserId) -> Result<()> {
        let mut state = self.guarded(Operation::ClearDefaultAddresses)?;
        for address in state.addresses.iter_mut().filter(|a| a.user_id == user) {
            address.is_default = false;
        }
        Ok(())
    }

    async fn insert_address(&self, address: &NewAddress) -> Result<Address> {
        let mut state = self.guarded(Operation::InsertAddress)?;
        let stored = Address {
            id: AddressId::random(),
            user_id: address.user_id,
            line1: address.line1.clone(),
            line2: address.line2.clone(),
            city: address.city.clone(),
            state: address.state.clone(),
            postal_code: address.postal_code.clone(),
            country: address.country.clone(),
            is_default: address.is_default,
        };
        state.addresses.push(stored.clone());
        Ok(stored)
    }
}

impl PaymentRepository for MemoryStore {
    async fn insert_payment(&self, payment: &NewPayment) -> Result<Payment> {
        let mut state = self.guarded(Operation::InsertPayment)?;
        let stored = Payment {
            id: PaymentId::random(),
            user_id: payment.user_id,
            total: payment.total,
            card_type: payment.card_type,
            last_four: payment.last_four.clone(),
            cardholder_name: payment.cardholder_name.clone(),
            status: payment.status,
            method: payment.method,
        };
        state.payments.push(stored.clone());
        Ok(stored)
    }
}

impl OrderRepository for MemoryStore {
    async fn generate_order_number(&self) -> Result<Option<String>> {
        let mut state = self.guarded(Operation::GenerateOrderNumber)?;
        if state.order_numbers_disabled {
            return Ok(None);
        }
        state.last_order_number += 1;
        Ok(Some(format!("PED-{:06}", state.last_order_number)))
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<Order> {
        let mut state = self.guarded(Operation::InsertOrder)?;
        let stored = Order {
            id: OrderId::random(),
            payment_id: order.payment_id,
            user_id: order.user_id,
            address_id: order.address_id,
            status: order.status,
            order_number: order.order_number.clone(),
            tracking_number: order.tracking_number.clone(),
            confirmed_at: Some(order.confirmed_at),
        };
        state.orders.push(stored.clone());
        Ok(stored)
    }

    async fn insert_order_items(&self, items: &[OrderItem]) -> Result<()> {
        let mut state = self.guarded(Operation::InsertOrderItems)?;
        state.order_items.extend_from_slice(items);
        Ok(())
    }
}

impl ProfileRepository for MemoryStore {
    async fn find_profile(&self, user: UserId) -> Result<Option<Profile>> {
        let state = self.guarded(Operation::FindProfile)?;
        Ok(state.profiles.get(&user).cloned())
    }
}

/// Accounts registered through [`AuthProvider::sign_up`] can sign in right
/// away, but sign-up itself never returns a session, matching a backend that
/// confirms accounts by email.
impl AuthProvider for MemoryStore {
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession> {
        let mut state = self.guarded(Operation::Auth)?;
        let (id, full_name) = match state.accounts.get(email) {
            Some(account) if account.password == password => (account.id, account.full_name.clone()),
            _ => {
                return Err(RepositoryError::Unauthorized(
                    "Invalid login credentials".to_string(),
                ));
            }
        };

        let access_token = uuid::Uuid::new_v4().to_string();
        state.tokens.insert(access_token.clone(), id);

        Ok(AuthSession {
            user: AccountUser {
                id,
                email: Some(email.clone()),
                full_name,
            },
            access_token,
            refresh_token: uuid::Uuid::new_v4().to_string(),
            expires_at: None,
        })
    }

    async fn sign_up(&self, request: &SignUp) -> Result<SignUpOutcome> {
        let mut state = self.guarded(Operation::Auth)?;
        if state.accounts.contains_key(&request.email) {
            return Err(RepositoryError::Conflict("User already registered".to_string()));
        }

        let id = UserId::random();
        state.accounts.insert(
            request.email.clone(),
            Account {
                id,
                password: request.password.clone(),
                full_name: Some(request.full_name.clone()),
            },
        );
        state.profiles.insert(
            id,
            Profile {
                id,
                full_name: Some(request.full_name.clone()),
                role: UserRole::User,
            },
        );

        Ok(SignUpOutcome {
            user: AccountUser {
                id,
                email: Some(request.email.clone()),
                full_name: Some(request.full_name.clone()),
            },
            session: None,
        })
    }

    async fn sign_out(&self, session: &AuthSession) -> Result<()> {
        let mut state = self.guarded(Operation::Auth)?;
        state.tokens.remove(&session.access_token);
        Ok(())
    }

    async fn current_user(&self, session: &AuthSession) -> Result<Option<AccountUser>> {
        let state = self.guarded(Operation::Auth)?;
        let Some(id) = state.tokens.get(&session.access_token).copied() else {
            return Ok(None);
        };
        Ok(state
            .accounts
            .iter()
            .find(|(_, account)| account.id == id)
            .map(|(email, account)| AccountUser {
                id,
                email: Some(email.clone()),
                full_name: account.full_name.clone(),
            }))
    }
}

impl Store for MemoryStore {
    fn scoped(&self, _session: &AuthSession) -> Self {
        self.clone()
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_active_products_sorted_by_name() {
        let store = MemoryStore::new();
        let cat = store.seed_category("Cascos");
        store.seed_product(cat.id, "Zeta", Decimal::ONE, 1);
        let mut hidden = store.seed_product(cat.id, "Beta", Decimal::ONE, 1);
        store.seed_product(cat.id, "Alfa", Decimal::ONE, 1);
        hidden.is_active = false;
        store.put_product(hidden);

        let names: Vec<String> = store
            .find_active_products()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();

        assert_eq!(names, vec!["Alfa", "Zeta"]);
        assert_eq!(store.list_all_products().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_cart_lines_join_products() {
        let store = MemoryStore::new();
        let cat = store.seed_category("Cascos");
        let product = store.seed_product(cat.id, "Casco", Decimal::new(1000, 2), 5);
        let user = UserId::random();

        let cart = store.ensure_cart(user).await.unwrap();
        store.insert_cart_item(cart, product.id, 2).await.unwrap();

        let loaded = store.load_cart(cart).await.unwrap();
        assert_eq!(loaded.lines.len(), 1);
        assert_eq!(loaded.lines[0].product.name, "Casco");
        assert_eq!(store.count_cart_items(cart).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_insert_into_missing_cart_fails() {
        let store = MemoryStore::new();
        let cart = CartId::for_user(UserId::random());

        let err = store
            .insert_cart_item(cart, ProductId::random(), 1)
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let store = MemoryStore::new();
        store.fail_on(Operation::InsertOrder);

        let err = store
            .insert_order(&NewOrder {
                payment_id: PaymentId::random(),
                user_id: UserId::random(),
                address_id: AddressId::random(),
                status: motostore_core::OrderStatus::Confirmed,
                order_number: "X".to_string(),
                tracking_number: "Y".to_string(),
                confirmed_at: chrono::Utc::now(),
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("InsertOrder unavailable"));

        store.recover(Operation::InsertOrder);
        assert!(store.orders().is_empty());
    }

    #[tokio::test]
    async fn test_order_numbers() {
        let store = MemoryStore::new();
        assert_eq!(
            store.generate_order_number().await.unwrap().as_deref(),
            Some("PED-000001")
        );
        store.disable_order_numbers();
        assert_eq!(store.generate_order_number().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_addresses_default_first() {
        let store = MemoryStore::new();
        let user = UserId::random();
        let new = |is_default| NewAddress {
            user_id: user,
            line1: "Calle 1".to_string(),
            line2: None,
            city: "Puebla".to_string(),
            state: "Puebla".to_string(),
            postal_code: "72000".to_string(),
            country: "México".to_string(),
            is_default,
        };
        store.insert_address(&new(false)).await.unwrap();
        let default = store.insert_address(&new(true)).await.unwrap();

        let listed = store.list_addresses(user).await.unwrap();
        assert_eq!(listed[0].id, default.id);
        assert!(store.find_address(UserId::random(), default.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let store = MemoryStore::new();
        let addr = email("ana@ejemplo.mx");
        let id = store.seed_user(&addr, "secreto123", Some("Ana"), UserRole::User);

        assert!(matches!(
            store.sign_in(&addr, "otra").await.unwrap_err(),
            RepositoryError::Unauthorized(_)
        ));

        let session = store.sign_in(&addr, "secreto123").await.unwrap();
        assert_eq!(session.user_id(), id);
        assert!(store.current_user(&session).await.unwrap().is_some());

        store.sign_out(&session).await.unwrap();
        assert!(store.current_user(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_conflict() {
        let store = MemoryStore::new();
        let request = SignUp {
            email: email("luis@ejemplo.mx"),
            password: "secreto123".to_string(),
            full_name: "Luis".to_string(),
            redirect_to: "http://localhost/catalogo".to_string(),
        };

        let outcome = store.sign_up(&request).await.unwrap();
        assert!(outcome.session.is_none());
        let profile = store.find_profile(outcome.user.id).await.unwrap().unwrap();
        assert_eq!(profile.full_name.as_deref(), Some("Luis"));

        assert!(matches!(
            store.sign_up(&request).await.unwrap_err(),
            RepositoryError::Conflict(_)
        ));
    }
}
