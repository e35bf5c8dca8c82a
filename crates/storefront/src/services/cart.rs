//! Cart service.
//!
//! Adding products (with the stock check), changing quantities, removing
//! lines, and the hand-off to checkout. The cart belongs to the signed-in
//! user; its ID is the user's ID.

use thiserror::Error;
use tracing::{debug, instrument};

use motostore_core::{CartId, CartItemId, ProductId, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::Cart;

/// Errors from cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Guests and anonymous visitors cannot buy.
    #[error("sign in to buy")]
    SignInRequired,

    #[error("product not found")]
    ProductNotFound,

    /// The product is inactive or out of stock.
    #[error("{0} is not available")]
    ProductUnavailable(String),

    /// The requested quantity exceeds the product's stock.
    #[error("only {0} units available")]
    StockLimit(i32),

    #[error("quantity must be at least 1")]
    QuantityTooLow,

    #[error("cart line not found")]
    LineNotFound,

    #[error("the cart is empty")]
    EmptyCart,

    #[error("backend error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Check a requested quantity against the line's stock.
///
/// # Errors
///
/// Returns `CartError::QuantityTooLow` below 1 and `CartError::StockLimit`
/// above `stock`.
pub const fn check_quantity(quantity: i32, stock: i32) -> Result<(), CartError> {
    if quantity < 1 {
        return Err(CartError::QuantityTooLow);
    }
    if quantity > stock {
        return Err(CartError::StockLimit(stock));
    }
    Ok(())
}

/// Result of adding a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct AddedToCart {
    pub product_id: ProductId,
    /// Quantity of the product now in the cart.
    pub quantity: i32,
    /// New cart badge count.
    pub cart_count: i64,
}

/// Cart operations for one user.
pub struct CartService<'a, S> {
    store: &'a S,
    user: UserId,
}

impl<'a, S: Store> CartService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, user: UserId) -> Self {
        Self { store, user }
    }

    const fn cart(&self) -> CartId {
        CartId::for_user(self.user)
    }

    /// Lines with their products.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the cart cannot be loaded.
    pub async fn load(&self) -> Result<Cart, CartError> {
        Ok(self.store.load_cart(self.cart()).await?)
    }

    /// Sum of quantities in the cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Repository` if the lines cannot be read.
    pub async fn count(&self) -> Result<i64, CartError> {
        Ok(self.store.count_cart_items(self.cart()).await?)
    }

    /// Add one unit of `product`.
    ///
    /// Inserts a line with quantity 1, or increments the existing line. The
    /// stock check and the write are separate calls, so two concurrent adds
    /// can both pass the check.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` or `CartError::ProductUnavailable`
    /// if the product cannot be bought, and `CartError::StockLimit` if the
    /// cart already holds the whole stock.
    #[instrument(skip(self), fields(user_id = %self.user))]
    pub async fn add(&self, product: ProductId) -> Result<AddedToCart, CartError> {
        let product = self
            .store
            .find_product(product)
            .await?
            .ok_or(CartError::ProductNotFound)?;
        if !product.is_purchasable() {
            return Err(CartError::ProductUnavailable(product.name));
        }

        let cart = self.store.ensure_cart(self.user).await?;

        let quantity = match self.store.find_cart_item(cart, product.id).await? {
            Some(item) => {
                if item.quantity >= product.stock {
                    return Err(CartError::StockLimit(product.stock));
                }
                let quantity = item.quantity + 1;
                self.store.update_cart_item_quantity(item.id, quantity).await?;
                quantity
            }
            None => self.store.insert_cart_item(cart, product.id, 1).await?.quantity,
        };

        let cart_count = self.store.count_cart_items(cart).await?;
        debug!(product_id = %product.id, quantity, cart_count, "Added to cart");

        Ok(AddedToCart {
            product_id: product.id,
            quantity,
            cart_count,
        })
    }

    /// Set a line's quantity, bounded by the stock of its product.
    ///
    /// A rejected quantity leaves the line unchanged.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the line is not in this cart, or
    /// the error from [`check_quantity`].
    #[instrument(skip(self), fields(user_id = %self.user))]
    pub async fn set_quantity(&self, item: CartItemId, quantity: i32) -> Result<Cart, CartError> {
        let cart = self.load().await?;
        let line = cart.line(item).ok_or(CartError::LineNotFound)?;
        check_quantity(quantity, line.product.stock)?;

        self.store.update_cart_item_quantity(item, quantity).await?;
        self.load().await
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::LineNotFound` if the line is not in this cart.
    #[instrument(skip(self), fields(user_id = %self.user))]
    pub async fn remove(&self, item: CartItemId) -> Result<Cart, CartError> {
        let cart = self.load().await?;
        if cart.line(item).is_none() {
            return Err(CartError::LineNotFound);
        }

        self.store.delete_cart_item(item).await?;
        self.load().await
    }

    /// The cart, if it can go to checkout.
    ///
    /// # Errors
    ///
    /// Returns `CartError::EmptyCart` if there is nothing to buy.
    pub async fn proceed_to_checkout(&self) -> Result<Cart, CartError> {
        let cart = self.load().await?;
        if cart.is_empty() {
            return Err(CartError::EmptyCart);
        }
        Ok(cart)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::Product;

    fn setup(stock: i32) -> (MemoryStore, UserId, Product) {
        let store = MemoryStore::new();
        let category = store.seed_category("Cascos");
        let product = store.seed_product(category.id, "Casco Integral", Decimal::new(1000, 2), stock);
        (store, UserId::random(), product)
    }

    #[test]
    fn test_check_quantity_bounds() {
        assert!(check_quantity(1, 3).is_ok());
        assert!(check_quantity(3, 3).is_ok());
        assert!(matches!(check_quantity(0, 3), Err(CartError::QuantityTooLow)));
        assert!(matches!(check_quantity(4, 3), Err(CartError::StockLimit(3))));
    }

    #[tokio::test]
    async fn test_add_inserts_then_increments() {
        let (store, user, product) = setup(5);
        let cart = CartService::new(&store, user);

        let first = cart.add(product.id).await.unwrap();
        assert_eq!(first.quantity, 1);
        assert!(store.has_cart(user));

        let second = cart.add(product.id).await.unwrap();
        assert_eq!(second.quantity, 2);
        assert_eq!(second.cart_count, 2);
        assert_eq!(store.cart_items(user).len(), 1);
    }

    #[tokio::test]
    async fn test_add_stops_at_stock() {
        let (store, user, product) = setup(2);
        let cart = CartService::new(&store, user);

        cart.add(product.id).await.unwrap();
        cart.add(product.id).await.unwrap();
        let err = cart.add(product.id).await.unwrap_err();

        assert!(matches!(err, CartError::StockLimit(2)));
        assert_eq!(err.to_string(), "only 2 units available");
        assert_eq!(store.cart_items(user)[0].quantity, 2);
    }

    #[tokio::test]
    async fn test_add_rejects_unavailable_products() {
        let (store, user, product) = setup(0);
        let cart = CartService::new(&store, user);

        let err = cart.add(product.id).await.unwrap_err();
        assert!(matches!(err, CartError::ProductUnavailable(_)));
        assert!(!store.has_cart(user));

        let err = cart.add(ProductId::random()).await.unwrap_err();
        assert!(matches!(err, CartError::ProductNotFound));
    }

    #[tokio::test]
    async fn test_set_quantity_within_stock() {
        let (store, user, product) = setup(3);
        let cart = CartService::new(&store, user);
        cart.add(product.id).await.unwrap();
        let line = cart.load().await.unwrap().lines[0].id;

        let updated = cart.set_quantity(line, 3).await.unwrap();
        assert_eq!(updated.lines[0].quantity, 3);
        assert_eq!(updated.total().to_fixed(), "30.00");
    }

    #[tokio::test]
    async fn test_set_quantity_out_of_range_is_noop() {
        let (store, user, product) = setup(3);
        let cart = CartService::new(&store, user);
        cart.add(product.id).await.unwrap();
        let line = cart.load().await.unwrap().lines[0].id;

        assert!(matches!(
            cart.set_quantity(line, 0).await,
            Err(CartError::QuantityTooLow)
        ));
        assert!(matches!(
            cart.set_quantity(line, 4).await,
            Err(CartError::StockLimit(3))
        ));
        assert_eq!(cart.load().await.unwrap().lines[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_lines_of_other_carts_are_not_found() {
        let (store, user, product) = setup(3);
        CartService::new(&store, user).add(product.id).await.unwrap();
        let line = store.cart_items(user)[0].id;

        let other = CartService::new(&store, UserId::random());
        assert!(matches!(other.remove(line).await, Err(CartError::LineNotFound)));
        assert!(matches!(
            other.set_quantity(line, 1).await,
            Err(CartError::LineNotFound)
        ));
        assert_eq!(store.cart_items(user).len(), 1);
    }

    #[tokio::test]
    async fn test_remove_and_empty_cart() {
        let (store, user, product) = setup(3);
        let cart = CartService::new(&store, user);
        cart.add(product.id).await.unwrap();
        assert!(cart.proceed_to_checkout().await.is_ok());

        let line = cart.load().await.unwrap().lines[0].id;
        let after = cart.remove(line).await.unwrap();
        assert!(after.is_empty());
        assert!(matches!(
            cart.proceed_to_checkout().await,
            Err(CartError::EmptyCart)
        ));
    }
}
