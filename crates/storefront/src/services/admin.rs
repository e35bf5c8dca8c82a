//! Catalog management for administrators.
//!
//! Access is decided by the `rol` on the user's profile. Everything else is
//! plain create/update/delete over products and categories.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, instrument};

use motostore_core::{CategoryId, ProductId, UserId};

use crate::db::{RepositoryError, Store};
use crate::models::{Category, CategoryDraft, Product, ProductDraft};

/// Errors from catalog management.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The user is not an administrator.
    #[error("admin access required")]
    Forbidden,

    /// The draft failed validation.
    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("backend error: {0}")]
    Repository(#[from] RepositoryError),
}

fn trimmed(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn validate_product(draft: &ProductDraft) -> Result<ProductDraft, AdminError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(AdminError::Invalid("product name is required".to_string()));
    }
    if draft.price < Decimal::ZERO {
        return Err(AdminError::Invalid("price cannot be negative".to_string()));
    }
    if draft.stock < 0 {
        return Err(AdminError::Invalid("stock cannot be negative".to_string()));
    }

    Ok(ProductDraft {
        category_id: draft.category_id,
        name: name.to_string(),
        description: trimmed(draft.description.as_ref()),
        price: draft.price,
        stock: draft.stock,
        image_url: trimmed(draft.image_url.as_ref()),
        is_active: draft.is_active,
    })
}

fn validate_category(draft: &CategoryDraft) -> Result<CategoryDraft, AdminError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(AdminError::Invalid("category name is required".to_string()));
    }

    Ok(CategoryDraft {
        name: name.to_string(),
        description: trimmed(draft.description.as_ref()),
        is_active: draft.is_active,
    })
}

/// Catalog management, available once [`AdminService::authorize`] succeeds.
pub struct AdminService<'a, S> {
    store: &'a S,
}

impl<'a, S: Store> AdminService<'a, S> {
    /// Check that `user` is an administrator.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Forbidden` if the user has no profile or a
    /// non-admin role.
    pub async fn authorize(store: &'a S, user: UserId) -> Result<Self, AdminError> {
        let profile = store.find_profile(user).await?;
        match profile {
            Some(profile) if profile.role.is_admin() => Ok(Self { store }),
            _ => Err(AdminError::Forbidden),
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Every product, active or not, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Repository` if the backend fails.
    pub async fn list_products(&self) -> Result<Vec<Product>, AdminError> {
        Ok(self.store.list_all_products().await?)
    }

    /// # Errors
    ///
    /// Returns `AdminError::Invalid` for a blank name or negative price/stock.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_product(&self, draft: &ProductDraft) -> Result<Product, AdminError> {
        let draft = validate_product(draft)?;
        let product = self.store.create_product(&draft).await?;
        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    /// # Errors
    ///
    /// Returns `AdminError::NotFound` if no product has `id`.
    #[instrument(skip(self, draft))]
    pub async fn update_product(
        &self,
        id: ProductId,
        draft: &ProductDraft,
    ) -> Result<Product, AdminError> {
        let draft = validate_product(draft)?;
        self.store
            .update_product(id, &draft)
            .await?
            .ok_or(AdminError::NotFound("product"))
    }

    /// # Errors
    ///
    /// Returns `AdminError::Repository` if the backend refuses the delete.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), AdminError> {
        self.store.delete_product(id).await?;
        info!("Product deleted");
        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    /// Every category, active or not, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Repository` if the backend fails.
    pub async fn list_categories(&self) -> Result<Vec<Category>, AdminError> {
        Ok(self.store.list_all_categories().await?)
    }

    /// # Errors
    ///
    /// Returns `AdminError::Invalid` for a blank name.
    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub async fn create_category(&self, draft: &CategoryDraft) -> Result<Category, AdminError> {
        let draft = validate_category(draft)?;
        let category = self.store.create_category(&draft).await?;
        info!(category_id = %category.id, "Category created");
        Ok(category)
    }

    /// # Errors
    ///
    /// Returns `AdminError::NotFound` if no category has `id`.
    #[instrument(skip(self, draft))]
    pub async fn update_category(
        &self,
        id: CategoryId,
        draft: &CategoryDraft,
    ) -> Result<Category, AdminError> {
        let draft = validate_category(draft)?;
        self.store
            .update_category(id, &draft)
            .await?
            .ok_or(AdminError::NotFound("category"))
    }

    /// # Errors
    ///
    /// Returns `AdminError::Repository` with a conflict if products still
    /// belong to the category.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: CategoryId) -> Result<(), AdminError> {
        self.store.delete_category(id).await?;
        info!("Category deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use motostore_core::{Email, UserRole};

    use super::*;
    use crate::db::MemoryStore;

    fn admin(store: &MemoryStore) -> UserId {
        store.seed_user(
            &Email::parse("admin@ejemplo.mx").unwrap(),
            "secreto1",
            Some("Admin"),
            UserRole::Admin,
        )
    }

    fn draft(category: CategoryId, name: &str) -> ProductDraft {
        ProductDraft {
            category_id: category,
            name: name.to_string(),
            description: Some("  ".to_string()),
            price: Decimal::new(129_900, 2),
            stock: 5,
            image_url: None,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn test_non_admins_are_forbidden() {
        let store = MemoryStore::new();
        let user = store.seed_user(
            &Email::parse("ana@ejemplo.mx").unwrap(),
            "secreto1",
            None,
            UserRole::User,
        );

        assert!(matches!(
            AdminService::authorize(&store, user).await,
            Err(AdminError::Forbidden)
        ));
        assert!(matches!(
            AdminService::authorize(&store, UserId::random()).await,
            Err(AdminError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn test_product_lifecycle() {
        let store = MemoryStore::new();
        let user = admin(&store);
        let service = AdminService::authorize(&store, user).await.unwrap();
        let category = service
            .create_category(&CategoryDraft {
                name: " Cascos ".to_string(),
                description: None,
                is_active: true,
            })
            .await
            .unwrap();
        assert_eq!(category.name, "Cascos");

        let product = service.create_product(&draft(category.id, "Casco")).await.unwrap();
        assert_eq!(product.description, None);

        let mut changed = draft(category.id, "Casco Pro");
        changed.is_active = false;
        let updated = service.update_product(product.id, &changed).await.unwrap();
        assert_eq!(updated.name, "Casco Pro");
        assert!(!updated.is_active);

        // Inactive products are still listed for administrators
        assert_eq!(service.list_products().await.unwrap().len(), 1);

        service.delete_product(product.id).await.unwrap();
        assert!(service.list_products().await.unwrap().is_empty());
        assert!(matches!(
            service.update_product(product.id, &changed).await,
            Err(AdminError::NotFound("product"))
        ));
    }

    #[tokio::test]
    async fn test_invalid_drafts() {
        let store = MemoryStore::new();
        let user = admin(&store);
        let service = AdminService::authorize(&store, user).await.unwrap();
        let category = CategoryId::random();

        let mut negative = draft(category, "Casco");
        negative.stock = -1;
        assert!(matches!(
            service.create_product(&negative).await,
            Err(AdminError::Invalid(_))
        ));
        assert!(matches!(
            service.create_product(&draft(category, "  ")).await,
            Err(AdminError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_category_in_use_cannot_be_deleted() {
        let store = MemoryStore::new();
        let user = admin(&store);
        let category = store.seed_category("Cascos");
        store.seed_product(category.id, "Casco", Decimal::new(100, 0), 1);
        let service = AdminService::authorize(&store, user).await.unwrap();

        assert!(matches!(
            service.delete_category(category.id).await,
            Err(AdminError::Repository(RepositoryError::Conflict(_)))
        ));
    }
}
