//! Products and categories over PostgREST.

use rust_decimal::Decimal;
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use motostore_core::{CategoryId, Price, ProductId};

use crate::backend::{Query, SupabaseClient};
use crate::db::{CategoryRepository, ProductRepository, Result};
use crate::models::{Category, CategoryDraft, Product, ProductDraft};

const PRODUCTS: &str = "productos";
const CATEGORIES: &str = "categorias";

const PRODUCT_COLUMNS: &str = "id,categoria_id,nombre,descripcion,precio,stock,url_imagen,esta_activo";
const CATEGORY_COLUMNS: &str = "id,nombre,descripcion,esta_activa";

#[derive(Debug, Deserialize)]
struct ProductRow {
    id: ProductId,
    #[serde(rename = "categoria_id")]
    category_id: CategoryId,
    #[serde(rename = "nombre")]
    name: String,
    #[serde(rename = "descripcion", default)]
    description: Option<String>,
    #[serde(rename = "precio")]
    price: Decimal,
    stock: i32,
    #[serde(rename = "url_imagen", default)]
    image_url: Option<String>,
    #[serde(rename = "esta_activo", default = "active")]
    is_active: bool,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            name: row.name,
            description: row.description,
            price: Price::store(row.price),
            stock: row.stock,
            image_url: row.image_url,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
struct ProductWrite<'a> {
    #[serde(rename = "categoria_id")]
    category_id: CategoryId,
    #[serde(rename = "nombre")]
    name: &'a str,
    #[serde(rename = "descripcion")]
    description: Option<&'a str>,
    #[serde(rename = "precio")]
    price: Decimal,
    stock: i32,
    #[serde(rename = "url_imagen")]
    image_url: Option<&'a str>,
    #[serde(rename = "esta_activo")]
    is_active: bool,
}

impl<'a> From<&'a ProductDraft> for ProductWrite<'a> {
    fn from(draft: &'a ProductDraft) -> Self {
        Self {
            category_id: draft.category_id,
            name: &draft.name,
            description: draft.description.as_deref(),
            price: draft.price,
            stock: draft.stock,
            image_url: draft.image_url.as_deref(),
            is_active: draft.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
struct StockWrite {
    stock: i32,
}

#[derive(Debug, Deserialize)]
struct CategoryRow {
    id: CategoryId,
    #[serde(rename = "nombre")]
    name: String,
    #[serde(rename = "descripcion", default)]
    description: Option<String>,
    #[serde(rename = "esta_activa", default = "active")]
    is_active: bool,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            is_active: row.is_active,
        }
    }
}

#[derive(Debug, Serialize)]
struct CategoryWrite<'a> {
    #[serde(rename = "nombre")]
    name: &'a str,
    #[serde(rename = "descripcion")]
    description: Option<&'a str>,
    #[serde(rename = "esta_activa")]
    is_active: bool,
}

impl<'a> From<&'a CategoryDraft> for CategoryWrite<'a> {
    fn from(draft: &'a CategoryDraft) -> Self {
        Self {
            name: &draft.name,
            description: draft.description.as_deref(),
            is_active: draft.is_active,
        }
    }
}

const fn active() -> bool {
    true
}

fn into_models<R, M: From<R>>(rows: Vec<R>) -> Vec<M> {
    rows.into_iter().map(M::from).collect()
}

impl ProductRepository for SupabaseClient {
    #[instrument(skip(self))]
    async fn find_active_products(&self) -> Result<Vec<Product>> {
        let rows: Vec<ProductRow> = self
            .select(
                &Query::table(PRODUCTS)
                    .select(PRODUCT_COLUMNS)
                    .eq("esta_activo", true)
                    .order_asc("nombre"),
            )
            .await?;
        Ok(into_models(rows))
    }

    async fn find_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row: Option<ProductRow> = self
            .select_first(Query::table(PRODUCTS).select(PRODUCT_COLUMNS).eq("id", id))
            .await?;
        Ok(row.map(Product::from))
    }

    async fn list_all_products(&self) -> Result<Vec<Product>> {
        let rows: Vec<ProductRow> = self
            .select(&Query::table(PRODUCTS).select(PRODUCT_COLUMNS).order_asc("nombre"))
            .await?;
        Ok(into_models(rows))
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn create_product(&self, draft: &ProductDraft) -> Result<Product> {
        let row: ProductRow = self.insert_one(PRODUCTS, &ProductWrite::from(draft)).await?;
        Ok(row.into())
    }

    #[instrument(skip(self, draft))]
    async fn update_product(&self, id: ProductId, draft: &ProductDraft) -> Result<Option<Product>> {
        let rows: Vec<ProductRow> = self
            .update(
                &Query::table(PRODUCTS).select(PRODUCT_COLUMNS).eq("id", id),
                &ProductWrite::from(draft),
            )
            .await?;
        Ok(rows.into_iter().next().map(Product::from))
    }

    #[instrument(skip(self))]
    async fn delete_product(&self, id: ProductId) -> Result<()> {
        self.delete(&Query::table(PRODUCTS).eq("id", id)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_product_stock(&self, id: ProductId, stock: i32) -> Result<()> {
        let _: Vec<IgnoredAny> = self
            .update(&Query::table(PRODUCTS).select("id").eq("id", id), &StockWrite { stock })
            .await?;
        Ok(())
    }
}

impl CategoryRepository for SupabaseClient {
    #[instrument(skip(self))]
    async fn find_active_categories(&self) -> Result<Vec<Category>> {
        let rows: Vec<CategoryRow> = self
            .select(
                &Query::table(CATEGORIES)
                    .select(CATEGORY_COLUMNS)
                    .eq("esta_activa", true)
                    .order_asc("nombre"),
            )
            .await?;
        Ok(into_models(rows))
    }

    async fn list_all_categories(&self) -> Result<Vec<Category>> {
        let rows: Vec<CategoryRow> = self
            .select(&Query::table(CATEGORIES).select(CATEGORY_COLUMNS).order_asc("nombre"))
            .await?;
        Ok(into_models(rows))
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn create_category(&self, draft: &CategoryDraft) -> Result<Category> {
        let row: CategoryRow = self.insert_one(CATEGORIES, &CategoryWrite::from(draft)).await?;
        Ok(row.into())
    }

    #[instrument(skip(self, draft))]
    async fn update_category(&self, id: CategoryId, draft: &CategoryDraft) -> Result<Option<Category>> {
        let rows: Vec<CategoryRow> = self
            .update(
                &Query::table(CATEGORIES).select(CATEGORY_COLUMNS).eq("id", id),
                &CategoryWrite::from(draft),
            )
            .await?;
        Ok(rows.into_iter().next().map(Category::from))
    }

    #[instrument(skip(self))]
    async fn delete_category(&self, id: CategoryId) -> Result<()> {
        self.delete(&Query::table(CATEGORIES).eq("id", id)).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_row_from_postgrest_numbers() {
        let row: ProductRow = serde_json::from_str(
            r#"{
                "id": "5b0f6a55-98a4-4d7c-9d93-64a4f0d1c1aa",
                "categoria_id": "a3c1e4f2-1b2c-4d5e-8f90-0a1b2c3d4e5f",
                "nombre": "Casco Integral",
                "descripcion": null,
                "precio": 1299.5,
                "stock": 4,
                "url_imagen": "https://cdn.example/casco.png",
                "esta_activo": true
            }"#,
        )
        .unwrap();

        let product = Product::from(row);
        assert_eq!(product.price.to_fixed(), "1299.50");
        assert_eq!(product.description, None);
        assert!(product.is_active);
    }

    #[test]
    fn test_product_write_uses_backend_columns() {
        let draft = ProductDraft {
            category_id: CategoryId::random(),
            name: "Guantes".to_string(),
            description: Some("Piel".to_string()),
            price: Decimal::new(45000, 2),
            stock: 10,
            image_url: None,
            is_active: false,
        };

        let json = serde_json::to_value(ProductWrite::from(&draft)).unwrap();
        assert_eq!(json["nombre"], "Guantes");
        assert_eq!(json["descripcion"], "Piel");
        assert_eq!(json["stock"], 10);
        assert_eq!(json["esta_activo"], false);
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_category_row_defaults_active() {
        let row: CategoryRow = serde_json::from_str(
            r#"{"id":"a3c1e4f2-1b2c-4d5e-8f90-0a1b2c3d4e5f","nombre":"Cascos"}"#,
        )
        .unwrap();
        assert!(Category::from(row).is_active);
    }
}
