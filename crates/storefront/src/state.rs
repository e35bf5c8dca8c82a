//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::services::SessionEvents;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// backend store, the session-change registry, and configuration.
pub struct AppState<S> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    config: StorefrontConfig,
    store: S,
    events: SessionEvents,
}

// Manual impl: deriving would require `S: Clone` for an `Arc` clone.
impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S> AppState<S> {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `store` - Backend store, unscoped (acts with the anon key)
    /// * `events` - Registry notified on every sign-in and sign-out
    #[must_use]
    pub fn new(config: StorefrontConfig, store: S, events: SessionEvents) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                events,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the unscoped backend store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Get a reference to the session-change registry.
    #[must_use]
    pub fn events(&self) -> &SessionEvents {
        &self.inner.events
    }
}
