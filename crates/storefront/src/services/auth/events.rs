//! Session-change subscriptions.
//!
//! Sign-in and sign-out publish the new session (or `None`) to every
//! registered callback. A [`Subscription`] unregisters its callback when
//! [`Subscription::unsubscribe`] is called or when it is dropped.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::models::AuthSession;

type Callback = Arc<dyn Fn(Option<&AuthSession>) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    subscribers: BTreeMap<u64, Callback>,
}

/// Registry of session-change subscribers.
///
/// Cheap to clone; clones share the same subscribers.
#[derive(Clone, Default)]
pub struct SessionEvents {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for SessionEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionEvents")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for every future session change.
    #[must_use = "dropping the subscription unregisters the callback"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Option<&AuthSession>) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.insert(id, Arc::new(callback));

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `session` to every subscriber, in subscription order.
    pub fn publish(&self, session: Option<&AuthSession>) {
        // Callbacks run outside the lock so they may subscribe or unsubscribe
        let callbacks: Vec<Callback> = lock(&self.registry).subscribers.values().cloned().collect();
        for callback in callbacks {
            callback(session);
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).subscribers.len()
    }
}

/// Handle for a registered callback.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Stop receiving session changes.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).subscribers.remove(&self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use motostore_core::UserId;

    use super::*;
    use crate::models::AccountUser;

    fn session() -> AuthSession {
        AuthSession {
            user: AccountUser {
                id: UserId::random(),
                email: None,
                full_name: None,
            },
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_at: None,
        }
    }

    #[test]
    fn test_subscribers_see_sign_in_and_sign_out() {
        let events = SessionEvents::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        let _subscription = events.subscribe(move |s| {
            sink.lock().unwrap_or_else(PoisonError::into_inner).push(s.map(AuthSession::user_id));
        });

        let s = session();
        events.publish(Some(&s));
        events.publish(None);

        let seen = seen.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(*seen, vec![Some(s.user_id()), None]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let events = SessionEvents::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        let subscription = events.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        events.publish(None);
        subscription.unsubscribe();
        events.publish(None);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(events.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_unregisters() {
        let events = SessionEvents::new();
        {
            let _a = events.subscribe(|_| {});
            let _b = events.clone().subscribe(|_| {});
            assert_eq!(events.subscriber_count(), 2);
        }
        assert_eq!(events.subscriber_count(), 0);
    }

    #[test]
    fn test_subscription_outlives_registry() {
        let subscription = SessionEvents::new().subscribe(|_| {});
        drop(subscription);
    }
}
