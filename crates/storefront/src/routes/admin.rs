//! Admin route handlers.
//!
//! Every handler checks the caller's role through
//! [`AdminService::authorize`]; non-admins get 403.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use motostore_core::{CategoryId, ProductId};

use crate::db::Store;
use crate::error::Result;
use crate::middleware::RequireAuth;
use crate::models::{Category, CategoryDraft, Product, ProductDraft};
use crate::services::AdminService;
use crate::state::AppState;

// =============================================================================
// Products
// =============================================================================

/// `GET /admin/products`
pub async fn list_products<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
) -> Result<Json<Vec<Product>>> {
    let store = state.store().scoped(&auth);
    let admin = AdminService::authorize(&store, auth.user_id()).await?;
    Ok(Json(admin.list_products().await?))
}

/// `POST /admin/products`
pub async fn create_product<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
    Json(draft): Json<ProductDraft>,
) -> Result<(StatusCode, Json<Product>)> {
    let store = state.store().scoped(&auth);
    let admin = AdminService::authorize(&store, auth.user_id()).await?;
    let product = admin.create_product(&draft).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// `PUT /admin/products/{id}`
pub async fn update_product<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<ProductId>,
    Json(draft): Json<ProductDraft>,
) -> Result<Json<Product>> {
    let store = state.store().scoped(&auth);
    let admin = AdminService::authorize(&store, auth.user_id()).await?;
    Ok(Json(admin.update_product(id, &draft).await?))
}

/// `DELETE /admin/products/{id}`
pub async fn delete_product<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<ProductId>,
) -> Result<StatusCode> {
    let store = state.store().scoped(&auth);
    let admin = AdminService::authorize(&store, auth.user_id()).await?;
    admin.delete_product(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Categories
// =============================================================================

/// `GET /admin/categories`
pub async fn list_categories<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
) -> Result<Json<Vec<Category>>> {
    let store = state.store().scoped(&auth);
    let admin = AdminService::authorize(&store, auth.user_id()).await?;
    Ok(Json(admin.list_categories().await?))
}

/// `POST /admin/categories`
pub async fn create_category<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
    Json(draft): Json<CategoryDraft>,
) -> Result<(StatusCode, Json<Category>)> {
    let store = state.store().scoped(&auth);
    let admin = AdminService::authorize(&store, auth.user_id()).await?;
    let category = admin.create_category(&draft).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /admin/categories/{id}`
pub async fn update_category<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<CategoryId>,
    Json(draft): Json<CategoryDraft>,
) -> Result<Json<Category>> {
    let store = state.store().scoped(&auth);
    let admin = AdminService::authorize(&store, auth.user_id()).await?;
    Ok(Json(admin.update_category(id, &draft).await?))
}

/// `DELETE /admin/categories/{id}`
pub async fn delete_category<S: Store>(
    State(state): State<AppState<S>>,
    RequireAuth(auth): RequireAuth,
    Path(id): Path<CategoryId>,
) -> Result<StatusCode> {
    let store = state.store().scoped(&auth);
    let admin = AdminService::authorize(&store, auth.user_id()).await?;
    admin.delete_category(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
