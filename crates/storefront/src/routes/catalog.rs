//! Catalog route handlers.

use axum::{
    Json,
    extract::{Query, State},
};
use serde::Deserialize;

use motostore_core::CategoryId;

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::services::{CatalogFilter, CatalogPage, CatalogService};
use crate::state::AppState;

/// `?q=casco&categories=<id>,<id>`
#[derive(Debug, Default, Deserialize)]
pub struct CatalogQuery {
    #[serde(default)]
    pub q: Option<String>,
    /// Comma-separated category IDs.
    #[serde(default)]
    pub categories: Option<String>,
}

impl CatalogQuery {
    /// # Errors
    ///
    /// Returns `AppError::BadRequest` for a malformed category ID.
    pub fn into_filter(self) -> Result<CatalogFilter> {
        let categories = self
            .categories
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(|id| {
                id.parse::<CategoryId>()
                    .map_err(|_| AppError::BadRequest(format!("invalid category id: {id}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(CatalogFilter {
            query: self.q.unwrap_or_default(),
            categories,
        })
    }
}

/// `GET /catalog`
pub async fn index<S: Store>(
    State(state): State<AppState<S>>,
    OptionalAuth(ctx): OptionalAuth,
    Query(query): Query<CatalogQuery>,
) -> Result<Json<CatalogPage>> {
    let filter = query.into_filter()?;
    let page = CatalogService::new(state.store(), state.events())
        .load(&ctx, &filter)
        .await?;
    Ok(Json(page))
}
