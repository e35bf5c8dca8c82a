//! Hosted backend client (Supabase).
//!
//! # Architecture
//!
//! - Tables are reached through PostgREST at `<project>/rest/v1/<table>`
//! - Authentication goes through GoTrue at `<project>/auth/v1`
//! - The backend is the source of truth. NO local copies, every call goes
//!   over the wire
//! - Row-level security decides what a caller may see. Requests carry the
//!   signed-in user's access token when there is one, otherwise the anon key
//!
//! # Example
//!
//! ```rust,ignore
//! use motostore_storefront::backend::{Query, SupabaseClient};
//!
//! let client = SupabaseClient::new(&config.backend)?;
//!
//! let rows: Vec<ProductRow> = client
//!     .select(&Query::table("productos").eq("esta_activo", true).order_asc("nombre"))
//!     .await?;
//! ```

mod auth;
mod client;
mod query;

pub use auth::{AuthUser, SignUpRequest, TokenSession};
pub use client::SupabaseClient;
pub use query::{Direction, Query};

use thiserror::Error;

/// Errors that can occur when talking to the hosted backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("{0}")]
    Api(ApiError),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// A single-row read matched nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The request was refused before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl BackendError {
    /// HTTP status of an API error, if this is one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api(api) => Some(api.status),
            _ => None,
        }
    }

    /// Backend error code (`23505`, `invalid_credentials`, ...), if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api(api) => api.code.as_deref(),
            _ => None,
        }
    }
}

/// An error body returned by PostgREST or GoTrue.
///
/// PostgREST sends `{message, code, details, hint}`; GoTrue sends either
/// `{error, error_description}` or `{msg, code, error_code}`. Both are folded
/// into this shape.
#[derive(Debug, Clone, Default)]
pub struct ApiError {
    /// HTTP status code.
    pub status: u16,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable code.
    pub code: Option<String>,
    /// Extra detail (PostgREST only).
    pub details: Option<String>,
    /// Suggested fix (PostgREST only).
    pub hint: Option<String>,
}

impl ApiError {
    /// Build from a raw error body, falling back to the body text itself.
    #[must_use]
    pub fn from_body(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let field = |names: &[&str]| -> Option<String> {
            let value = parsed.as_ref()?;
            names.iter().find_map(|name| match value.get(*name)? {
                serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        };

        let message = field(&["message", "msg", "error_description", "error"])
            .unwrap_or_else(|| body.chars().take(200).collect());

        Self {
            status,
            message,
            code: field(&["error_code", "code"]),
            details: field(&["details"]),
            hint: field(&["hint"]),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();

        if self.message.is_empty() {
            parts.push(format!("HTTP {}", self.status));
        } else {
            parts.push(self.message.clone());
        }

        if let Some(code) = &self.code {
            parts.push(format!("(code {code})"));
        }
        if let Some(details) = &self.details {
            parts.push(format!("details: {details}"));
        }
        if let Some(hint) = &self.hint {
            parts.push(format!("hint: {hint}"));
        }

        write!(f, "{}", parts.join(" "))
    }
}
