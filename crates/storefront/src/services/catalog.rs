//! Catalog service.
//!
//! Loads active categories and products, filters them by text and
//! category, and resolves who is looking (viewer, guest flag, cart badge).

use std::collections::HashSet;

use serde::Serialize;
use tracing::{instrument, warn};

use motostore_core::{CartId, CategoryId, ProductId};

use crate::db::{RepositoryError, Store};
use crate::models::{AuthContext, AuthSession, Category, Product};
use crate::services::auth::{AuthService, SessionEvents, Viewer};
use crate::services::cart::{AddedToCart, CartError, CartService};

/// Text and category filter for the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    /// Free text, matched case-insensitively against name and description.
    pub query: String,
    /// Selected categories. Empty means all.
    pub categories: Vec<CategoryId>,
}

/// Products passing `filter`, in their original order.
#[must_use]
pub fn filter_products(products: &[Product], filter: &CatalogFilter) -> Vec<Product> {
    let needle = filter.query.to_lowercase();
    let categories: HashSet<CategoryId> = filter.categories.iter().copied().collect();

    products
        .iter()
        .filter(|p| p.matches_text(&needle))
        .filter(|p| categories.is_empty() || categories.contains(&p.category_id))
        .cloned()
        .collect()
}

/// Everything the catalog page shows.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub viewer: Option<Viewer>,
    pub guest: bool,
    pub categories: Vec<Category>,
    pub products: Vec<Product>,
    /// Number of products after filtering.
    pub product_count: usize,
    /// Sum of quantities in the viewer's cart. 0 without a session.
    pub cart_count: i64,
}

/// Catalog browsing.
pub struct CatalogService<'a, S> {
    store: &'a S,
    events: &'a SessionEvents,
}

impl<'a, S: Store> CatalogService<'a, S> {
    #[must_use]
    pub const fn new(store: &'a S, events: &'a SessionEvents) -> Self {
        Self { store, events }
    }

    /// Load the catalog page for `ctx`.
    ///
    /// Categories and products are fetched concurrently. Viewer and cart
    /// badge failures are logged and leave those parts empty.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if categories or products cannot be loaded.
    #[instrument(skip(self, ctx), fields(signed_in = ctx.is_signed_in(), guest = ctx.guest))]
    pub async fn load(
        &self,
        ctx: &AuthContext,
        filter: &CatalogFilter,
    ) -> Result<CatalogPage, RepositoryError> {
        let (categories, products) = tokio::try_join!(
            self.store.find_active_categories(),
            self.store.find_active_products()
        )?;

        let (viewer, cart_count) = match &ctx.session {
            Some(session) => self.viewer_and_badge(session).await,
            None => (None, 0),
        };

        let products = filter_products(&products, filter);
        Ok(CatalogPage {
            viewer,
            guest: ctx.guest,
            categories,
            product_count: products.len(),
            products,
            cart_count,
        })
    }

    /// Add one unit of `product` to the viewer's cart.
    ///
    /// # Errors
    ///
    /// Returns `CartError::SignInRequired` for guests and anonymous
    /// visitors, otherwise see [`CartService::add`].
    pub async fn add_to_cart(
        &self,
        ctx: &AuthContext,
        product: ProductId,
    ) -> Result<AddedToCart, CartError> {
        let Some(session) = &ctx.session else {
            return Err(CartError::SignInRequired);
        };
        let store = self.store.scoped(session);
        CartService::new(&store, session.user_id()).add(product).await
    }

    async fn viewer_and_badge(&self, session: &AuthSession) -> (Option<Viewer>, i64) {
        let viewer = match AuthService::new(self.store, self.events).viewer(session).await {
            Ok(viewer) => Some(viewer),
            Err(e) => {
                warn!(error = %e, "Failed to resolve viewer");
                None
            }
        };

        let store = self.store.scoped(session);
        let cart_count = match store
            .count_cart_items(CartId::for_user(session.user_id()))
            .await
        {
            Ok(count) => count,
            Err(e) => {
                warn!(error = %e, "Failed to count cart items");
                0
            }
        };

        (viewer, cart_count)
    }
}
