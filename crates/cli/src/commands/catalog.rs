//! Catalog management commands.
//!
//! # Usage
//!
//! ```bash
//! # Create or update categories and products from a YAML file
//! motostore-cli catalog import catalog.yaml
//!
//! # Check the file without writing anything
//! motostore-cli catalog import catalog.yaml --dry-run
//!
//! # Show the catalog as the backend has it
//! motostore-cli catalog list
//! ```
//!
//! # File format
//!
//! ```yaml
//! categories:
//!   - name: Cascos
//!     description: Cascos certificados
//!     products:
//!       - name: Casco Integral
//!         price: "1299.00"
//!         stock: 10
//!         image_url: https://cdn.example.com/casco.jpg
//! ```
//!
//! Categories are matched by name (case-insensitive), products by name
//! within their category. Matches are updated, everything else is created.
//! Nothing is deleted.
//!
//! # Environment Variables
//!
//! - `SUPABASE_URL` - Backend project URL
//! - `SUPABASE_ANON_KEY` - Public key (validated, not used for writes)
//! - `SUPABASE_SERVICE_ROLE_KEY` - Key used for all catalog writes

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use motostore_core::CategoryId;
use motostore_storefront::backend::{BackendError, SupabaseClient};
use motostore_storefront::config::{BackendConfig, ConfigError};
use motostore_storefront::db::{CategoryRepository, ProductRepository, RepositoryError};
use motostore_storefront::models::{Category, CategoryDraft, Product, ProductDraft};

/// Errors that can occur during catalog commands.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Backend client error: {0}")]
    Client(#[from] BackendError),

    #[error("Could not read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The file parsed but its contents are unusable.
    #[error("{0} validation errors found")]
    Invalid(usize),

    #[error("Backend error: {0}")]
    Repository(#[from] RepositoryError),
}

// =============================================================================
// File format
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub categories: Vec<CategoryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryEntry {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
    #[serde(default)]
    pub products: Vec<ProductEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ProductEntry {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "active")]
    pub is_active: bool,
}

const fn active() -> bool {
    true
}

impl ProductEntry {
    fn draft(&self, category_id: CategoryId) -> ProductDraft {
        ProductDraft {
            category_id,
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            price: self.price,
            stock: self.stock,
            image_url: self.image_url.clone(),
            is_active: self.is_active,
        }
    }
}

/// Every problem in the file, one message each.
#[must_use]
pub fn validate(file: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for category in &file.categories {
        let name = category.name.trim();
        if name.is_empty() {
            errors.push("category with a blank name".to_string());
            continue;
        }
        if !seen.insert(name.to_lowercase()) {
            errors.push(format!("category '{name}' appears twice"));
        }

        for product in &category.products {
            let product_name = product.name.trim();
            if product_name.is_empty() {
                errors.push(format!("product with a blank name in '{name}'"));
            }
            if product.price < Decimal::ZERO {
                errors.push(format!("'{product_name}' has a negative price"));
            }
            if product.stock < 0 {
                errors.push(format!("'{product_name}' has negative stock"));
            }
        }
    }

    errors
}

// =============================================================================
// Import
// =============================================================================

/// Outcome of an import.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub categories_created: usize,
    pub categories_updated: usize,
    pub products_created: usize,
    pub products_updated: usize,
}

/// Create or update every category and product in `file`.
///
/// The file must already have passed [`validate`].
///
/// # Errors
///
/// Returns `CatalogError::Repository` on the first failed write. Writes made
/// before it stay in place; re-running the import is safe.
pub async fn import<S>(store: &S, file: &CatalogFile) -> Result<ImportSummary, CatalogError>
where
    S: CategoryRepository + ProductRepository + Sync,
{
    let mut summary = ImportSummary::default();
    let mut categories = store.list_all_categories().await?;
    let products = store.list_all_products().await?;

    for entry in &file.categories {
        let draft = CategoryDraft {
            name: entry.name.trim().to_string(),
            description: entry.description.clone(),
            is_active: entry.is_active,
        };

        let existing = categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(&draft.name))
            .map(|c| c.id);
        let category_id = if let Some(id) = existing {
            store
                .update_category(id, &draft)
                .await?
                .ok_or_else(|| RepositoryError::NotFound(format!("category {id}")))?;
            summary.categories_updated += 1;
            id
        } else {
            let created = store.create_category(&draft).await?;
            summary.categories_created += 1;
            let id = created.id;
            categories.push(created);
            id
        };

        for product in &entry.products {
            let draft = product.draft(category_id);
            let existing = products
                .iter()
                .find(|p| p.category_id == category_id && p.name.eq_ignore_ascii_case(&draft.name));

            if let Some(found) = existing {
                store.update_product(found.id, &draft).await?;
                summary.products_updated += 1;
            } else {
                store.create_product(&draft).await?;
                summary.products_created += 1;
            }
        }
    }

    Ok(summary)
}

fn service_client() -> Result<SupabaseClient, CatalogError> {
    dotenvy::dotenv().ok();
    let config = BackendConfig::from_env()?.with_service_role()?;
    Ok(SupabaseClient::new(&config)?)
}

async fn read_file(path: &Path) -> Result<CatalogFile, CatalogError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
    Ok(serde_yaml::from_str(&content)?)
}

/// `catalog import <file>`
///
/// # Errors
///
/// Returns an error if the file is unreadable or invalid, the environment is
/// incomplete, or a backend write fails.
pub async fn import_file(path: &Path, dry_run: bool) -> Result<(), CatalogError> {
    info!(path = %path.display(), "Loading catalog file");
    let file = read_file(path).await?;

    let errors = validate(&file);
    if !errors.is_empty() {
        tracing::error!("Catalog validation failed:");
        for err in &errors {
            tracing::error!("  - {err}");
        }
        return Err(CatalogError::Invalid(errors.len()));
    }

    let product_count: usize = file.categories.iter().map(|c| c.products.len()).sum();
    info!(
        categories = file.categories.len(),
        products = product_count,
        "Catalog file is valid"
    );
    if dry_run {
        info!("Dry run, nothing written");
        return Ok(());
    }

    let client = service_client()?;
    let summary = import(&client, &file).await?;

    info!("Import complete!");
    info!(
        "  Categories: {} created, {} updated",
        summary.categories_created, summary.categories_updated
    );
    info!(
        "  Products: {} created, {} updated",
        summary.products_created, summary.products_updated
    );
    Ok(())
}

fn log_catalog(categories: &[Category], products: &[Product]) {
    for category in categories {
        let state = if category.is_active { "" } else { " (inactive)" };
        info!("{}{state}", category.name);
        for product in products.iter().filter(|p| p.category_id == category.id) {
            let state = if product.is_active { "" } else { " (inactive)" };
            info!(
                "  - {} | {} | stock {}{state}",
                product.name, product.price, product.stock
            );
        }
    }
}

/// `catalog list`
///
/// # Errors
///
/// Returns an error if the environment is incomplete or the backend fails.
pub async fn list() -> Result<(), CatalogError> {
    let client = service_client()?;
    let (categories, products) = tokio::try_join!(
        client.list_all_categories(),
        client.list_all_products()
    )?;

    info!(
        categories = categories.len(),
        products = products.len(),
        "Catalog"
    );
    log_catalog(&categories, &products);
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use motostore_storefront::db::MemoryStore;

    use super::*;

    const FILE: &str = r#"
categories:
  - name: Cascos
    description: Cascos certificados
    products:
      - name: Casco Integral
        price: "1299.00"
        stock: 10
      - name: Casco Abierto
        price: "899.50"
        stock: 4
        is_active: false
  - name: Guantes
    products:
      - name: Guantes de Piel
        price: "450.00"
        stock: 20
"#;

    #[test]
    fn test_parse_and_validate() {
        let file: CatalogFile = serde_yaml::from_str(FILE).unwrap();
        assert_eq!(file.categories.len(), 2);
        assert!(file.categories[0].is_active);
        assert!(!file.categories[0].products[1].is_active);
        assert!(validate(&file).is_empty());
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let file: CatalogFile = serde_yaml::from_str(
            r#"
categories:
  - name: Cascos
    products:
      - name: " "
        price: "-1"
        stock: -2
  - name: cascos
"#,
        )
        .unwrap();

        let errors = validate(&file);
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("appears twice")));
    }

    #[tokio::test]
    async fn test_import_creates_then_updates() {
        let store = MemoryStore::new();
        let file: CatalogFile = serde_yaml::from_str(FILE).unwrap();

        let first = import(&store, &file).await.unwrap();
        assert_eq!(
            first,
            ImportSummary {
                categories_created: 2,
                categories_updated: 0,
                products_created: 3,
                products_updated: 0,
            }
        );

        let second = import(&store, &file).await.unwrap();
        assert_eq!(second.categories_updated, 2);
        assert_eq!(second.products_updated, 3);
        assert_eq!(second.products_created, 0);

        let products = store.list_all_products().await.unwrap();
        assert_eq!(products.len(), 3);
        // Inactive products are imported but not shown in the storefront
        assert_eq!(store.find_active_products().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_existing_category_is_matched_by_name() {
        let store = MemoryStore::new();
        let existing = store.seed_category("CASCOS");
        let file: CatalogFile = serde_yaml::from_str(FILE).unwrap();

        let summary = import(&store, &file).await.unwrap();
        assert_eq!(summary.categories_created, 1);
        assert_eq!(summary.categories_updated, 1);

        let categories = store.list_all_categories().await.unwrap();
        let cascos = categories.iter().find(|c| c.id == existing.id).unwrap();
        assert_eq!(cascos.name, "Cascos");
    }
}
