//! Carts and cart lines over PostgREST.

use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use motostore_core::{CartId, CartItemId, Price, ProductId, UserId};

use crate::backend::{Query, SupabaseClient};
use crate::db::{CartRepository, Result};
use crate::models::{Cart, CartItem, CartLine, CartProduct};

const CARTS: &str = "carritos";
const CART_ITEMS: &str = "items_carrito";

const ITEM_COLUMNS: &str = "id,carrito_id,producto_id,cantidad";
const LINE_COLUMNS: &str = "id,cantidad,productos(id,nombre,descripcion,precio,stock,url_imagen)";

#[derive(Debug, Serialize)]
struct CartWrite {
    id: CartId,
    #[serde(rename = "usuario_id")]
    user_id: UserId,
}

#[derive(Debug, Deserialize)]
struct CartItemRow {
    id: CartItemId,
    #[serde(rename = "carrito_id")]
    cart_id: CartId,
    #[serde(rename = "producto_id")]
    product_id: ProductId,
    #[serde(rename = "cantidad")]
    quantity: i32,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        Self {
            id: row.id,
            cart_id: row.cart_id,
            product_id: row.product_id,
            quantity: row.quantity,
        }
    }
}

#[derive(Debug, Serialize)]
struct CartItemWrite {
    #[serde(rename = "carrito_id")]
    cart_id: CartId,
    #[serde(rename = "producto_id")]
    product_id: ProductId,
    #[serde(rename = "cantidad")]
    quantity: i32,
}

#[derive(Debug, Serialize)]
struct QuantityWrite {
    #[serde(rename = "cantidad")]
    quantity: i32,
}

/// A line with its product embedded by PostgREST.
#[derive(Debug, Deserialize)]
struct CartLineRow {
    id: CartItemId,
    #[serde(rename = "cantidad")]
    quantity: i32,
    #[serde(rename = "productos")]
    product: Option<CartProductRow>,
}

#[derive(Debug, Deserialize)]
struct CartProductRow {
    id: ProductId,
    #[serde(rename = "nombre")]
    name: String,
    #[serde(rename = "descripcion", default)]
    description: Option<String>,
    #[serde(rename = "precio")]
    price: Decimal,
    stock: i32,
    #[serde(rename = "url_imagen", default)]
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuantityRow {
    #[serde(rename = "cantidad")]
    quantity: i32,
}

fn into_cart(rows: Vec<CartLineRow>) -> Cart {
    let lines = rows
        .into_iter()
        .filter_map(|row| {
            let Some(product) = row.product else {
                // Product hidden by row-level security or deleted
                warn!(item_id = %row.id, "Cart line without product, skipping");
                return None;
            };
            Some(CartLine {
                id: row.id,
                quantity: row.quantity,
                product: CartProduct {
                    id: product.id,
                    name: product.name,
                    description: product.description,
                    price: Price::store(product.price),
                    stock: product.stock,
                    image_url: product.image_url,
                },
            })
        })
        .collect();
    Cart { lines }
}

impl CartRepository for SupabaseClient {
    #[instrument(skip(self))]
    async fn ensure_cart(&self, user: UserId) -> Result<CartId> {
        let cart = CartId::for_user(user);
        self.upsert(CARTS, &CartWrite { id: cart, user_id: user }, "usuario_id")
            .await?;
        Ok(cart)
    }

    async fn find_cart_item(&self, cart: CartId, product: ProductId) -> Result<Option<CartItem>> {
        let row: Option<CartItemRow> = self
            .select_first(
                Query::table(CART_ITEMS)
                    .select(ITEM_COLUMNS)
                    .eq("carrito_id", cart)
                    .eq("producto_id", product),
            )
            .await?;
        Ok(row.map(CartItem::from))
    }

    #[instrument(skip(self))]
    async fn insert_cart_item(&self, cart: CartId, product: ProductId, quantity: i32) -> Result<CartItem> {
        let row: CartItemRow = self
            .insert_one(
                CART_ITEMS,
                &CartItemWrite {
                    cart_id: cart,
                    product_id: product,
                    quantity,
                },
            )
            .await?;
        Ok(row.into())
    }

    #[instrument(skip(self))]
    async fn update_cart_item_quantity(&self, item: CartItemId, quantity: i32) -> Result<()> {
        let _: Vec<IgnoredAny> = self
            .update(
                &Query::table(CART_ITEMS).select("id").eq("id", item),
                &QuantityWrite { quantity },
            )
            .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete_cart_item(&self, item: CartItemId) -> Result<()> {
        self.delete(&Query::table(CART_ITEMS).eq("id", item)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn load_cart(&self, cart: CartId) -> Result<Cart> {
        let rows: Vec<CartLineRow> = self
            .select(
                &Query::table(CART_ITEMS)
                    .select(LINE_COLUMNS)
                    .eq("carrito_id", cart)
                    .order_asc("id"),
            )
            .await?;
        Ok(into_cart(rows))
    }

    async fn count_cart_items(&self, cart: CartId) -> Result<i64> {
        let rows: Vec<QuantityRow> = self
            .select(&Query::table(CART_ITEMS).select("cantidad").eq("carrito_id", cart))
            .await?;
        Ok(rows.iter().map(|row| i64::from(row.quantity)).sum())
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self, cart: CartId) -> Result<()> {
        self.delete(&Query::table(CART_ITEMS).eq("carrito_id", cart)).await?;
        Ok(())
    }
}
