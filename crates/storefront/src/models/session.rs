//! Session-related types.
//!
//! Types stored in the per-browser session: the signed-in user's auth
//! session, the guest-mode flag, and the checkout to payment hand-off.

use serde::{Deserialize, Serialize};

use motostore_core::{AddressId, Email, Price, UserId};

/// A user account as known to the auth server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountUser {
    pub id: UserId,
    pub email: Option<Email>,
    /// Full name recorded at sign-up.
    pub full_name: Option<String>,
}

/// A signed-in session.
///
/// The access token is forwarded to the backend so row-level security sees
/// the user. Implements `Debug` manually to redact the tokens.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub user: AccountUser,
    pub access_token: String,
    pub refresh_token: String,
    /// Unix time the access token expires, if known.
    pub expires_at: Option<i64>,
}

impl AuthSession {
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        self.user.id
    }

    /// Whether the access token has expired at `now` (unix seconds).
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("user", &self.user)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// What checkout hands to the payment step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentHandoff {
    pub address_id: AddressId,
    /// Cart total when the user left checkout.
    pub total: Price,
}

/// Who is making a request.
#[derive(Debug, Clone, Default)]
pub struct AuthContext {
    pub session: Option<AuthSession>,
    /// Browsing without an account.
    pub guest: bool,
}

impl AuthContext {
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.session.as_ref().map(AuthSession::user_id)
    }

    #[must_use]
    pub const fn is_signed_in(&self) -> bool {
        self.session.is_some()
    }
}

/// Session keys.
pub mod keys {
    /// Key for the signed-in user's auth session.
    pub const AUTH_SESSION: &str = "auth_session";

    /// Key for the guest-mode flag.
    pub const GUEST_MODE: &str = "guest_mode";

    /// Key for the checkout to payment hand-off.
    pub const PAYMENT_HANDOFF: &str = "payment_handoff";
}
