//! Integration tests for MotoStore.
//!
//! The tests drive the full storefront router (middleware, sessions, JSON
//! handlers) over the in-memory store, one request at a time with
//! `tower::ServiceExt::oneshot`. No network and no backend are needed.
//!
//! ```bash
//! cargo test -p motostore-integration-tests
//! ```
//!
//! [`TestApp`] plays a single browser: it keeps the session cookie between
//! requests the way a browser would.

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use secrecy::SecretString;
use serde_json::Value;
use tower::ServiceExt;

use motostore_core::{Email, UserId, UserRole};
use motostore_storefront::config::{BackendConfig, StorefrontConfig};
use motostore_storefront::db::MemoryStore;
use motostore_storefront::middleware::session::SESSION_COOKIE_NAME;
use motostore_storefront::models::AuthSession;
use motostore_storefront::services::{SessionEvents, Subscription};
use motostore_storefront::state::AppState;
use motostore_storefront::{RouterOptions, build_router};

/// Password used for every seeded account.
pub const PASSWORD: &str = "secreto123";

/// Configuration pointing at nothing; the in-memory store never calls out.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        backend: BackendConfig {
            url: "http://localhost:54321".to_string(),
            anon_key: SecretString::from("test-anon-key"),
            service_role_key: None,
            timeout: Duration::from_secs(5),
        },
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A response with its body parsed as JSON (`Value::Null` when empty).
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestResponse {
    /// The `{"error": ...}` message.
    #[must_use]
    pub fn error(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}

/// One browser talking to a storefront backed by a [`MemoryStore`].
pub struct TestApp {
    pub store: MemoryStore,
    pub events: SessionEvents,
    router: Router,
    cookie: Option<String>,
}

impl TestApp {
    #[must_use]
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let events = SessionEvents::new();
        let state = AppState::new(test_config(), store.clone(), events.clone());
        let router = build_router(state, RouterOptions { rate_limit: false });

        Self {
            store,
            events,
            router,
            cookie: None,
        }
    }

    /// Another browser on the same storefront, with no cookie.
    #[must_use]
    pub fn new_browser(&self) -> Self {
        Self {
            store: self.store.clone(),
            events: self.events.clone(),
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// Register a confirmed account directly in the store.
    pub fn seed_user(&self, email: &str, full_name: &str, role: UserRole) -> UserId {
        self.store.seed_user(
            &Email::parse(email).unwrap(),
            PASSWORD,
            Some(full_name),
            role,
        )
    }

    /// Count session events (`true` for sign-in) for as long as the
    /// returned subscription lives.
    #[must_use]
    pub fn record_session_events(&self) -> (Subscription, Arc<Mutex<Vec<bool>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let subscription = self.events.subscribe(move |session: Option<&AuthSession>| {
            sink.lock().unwrap().push(session.is_some());
        });
        (subscription, seen)
    }

    pub async fn request(&mut self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .filter(|pair| pair.starts_with(SESSION_COOKIE_NAME))
        {
            self.cookie = Some(set_cookie.to_string());
        }

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        TestResponse { status, body }
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&mut self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(body)).await
    }

    pub async fn put(&mut self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None).await
    }

    /// Sign in with [`PASSWORD`], asserting success.
    pub async fn login(&mut self, email: &str) -> TestResponse {
        let response = self
            .post(
                "/auth/login",
                serde_json::json!({ "email": email, "password": PASSWORD }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);
        response
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a serialized price amount.
#[must_use]
pub fn amount(price: &Value) -> rust_decimal::Decimal {
    price["amount"].as_str().unwrap().parse().unwrap()
}
