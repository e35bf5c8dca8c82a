//! MotoStore Storefront library.
//!
//! This crate provides the storefront as a library so the server binary, the
//! CLI and the integration tests share one router and one set of services.
//!
//! # Layout
//!
//! - [`backend`] - HTTP client for the hosted backend (PostgREST + GoTrue)
//! - [`db`] - Repository traits, the backend-backed store, the in-memory store
//! - [`services`] - Catalog, cart, checkout, payment, auth, admin
//! - [`routes`] / [`middleware`] - JSON HTTP surface

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request, middleware::from_fn, middleware::from_fn_with_state};
use tower_http::trace::TraceLayer;

use crate::db::Store;
use crate::middleware::{
    SecurityHeaders, create_session_layer, request_id_middleware, security_headers_middleware,
};
use crate::state::AppState;

/// Router construction options.
#[derive(Debug, Clone, Copy)]
pub struct RouterOptions {
    /// Rate-limit sign-in and registration per client IP.
    pub rate_limit: bool,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self { rate_limit: true }
    }
}

/// Build the full storefront router with its middleware stack.
///
/// Sentry's tower layers are added by the binary, outside this stack.
pub fn build_router<S: Store>(state: AppState<S>, options: RouterOptions) -> Router {
    let session_layer = create_session_layer(state.config());
    let headers = SecurityHeaders {
        hsts: state.config().is_secure(),
    };

    routes::routes(options.rate_limit)
        .layer(session_layer)
        .layer(from_fn_with_state(headers, security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
