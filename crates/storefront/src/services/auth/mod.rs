//! Authentication service.
//!
//! Password sign-in and sign-up against the backend's auth server, sign-out,
//! and resolving who is behind a session. Every sign-in and sign-out is
//! published through [`SessionEvents`].

mod error;
mod events;

pub use error::AuthError;
pub use events::{SessionEvents, Subscription};

use serde::Serialize;
use tracing::{instrument, warn};

use motostore_core::{Email, UserId, UserRole};

use crate::db::{RepositoryError, SignUp, SignUpOutcome, Store};
use crate::models::{AccountUser, AuthSession, Profile};

/// Minimum password length accepted by the auth server.
const MIN_PASSWORD_LENGTH: usize = 6;

/// The signed-in user as shown by the storefront.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Viewer {
    pub user_id: UserId,
    pub email: Option<Email>,
    /// Profile full name, falling back to the email.
    pub display_name: String,
    pub role: UserRole,
    pub is_admin: bool,
}

impl Viewer {
    #[must_use]
    pub fn new(user: &AccountUser, profile: Option<&Profile>) -> Self {
        let role = profile.map(|p| p.role).unwrap_or_default();
        let display_name = profile
            .and_then(|p| p.full_name.clone())
            .or_else(|| user.email.as_ref().map(ToString::to_string))
            .unwrap_or_default();

        Self {
            user_id: user.id,
            email: user.email.clone(),
            display_name,
            role,
            is_admin: role.is_admin(),
        }
    }
}

/// Authentication service.
pub struct AuthService<'a, S> {
    store: &'a S,
    events: &'a SessionEvents,
}

impl<'a, S: Store> AuthService<'a, S> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a S, events: &'a SessionEvents) -> Self {
        Self { store, events }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let email = Email::parse(email)?;
        if password.is_empty() {
            return Err(AuthError::InvalidCredentials);
        }

        let session = self
            .store
            .sign_in(&email, password)
            .await
            .map_err(|e| match e {
                RepositoryError::Unauthorized(_) => AuthError::InvalidCredentials,
                other => AuthError::Repository(other),
            })?;

        self.events.publish(Some(&session));
        Ok(session)
    }

    /// Register a new account.
    ///
    /// The backend sends a confirmation email that links back to
    /// `redirect_to`. When the backend confirms accounts immediately the
    /// outcome carries a session, which is published like a sign-in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingFullName` if `full_name` is blank.
    /// Returns `AuthError::WeakPassword` if the password is too short.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        full_name: &str,
        redirect_to: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let full_name = full_name.trim();
        if full_name.is_empty() {
            return Err(AuthError::MissingFullName);
        }
        let email = Email::parse(email)?;
        validate_password(password)?;

        let outcome = self
            .store
            .sign_up(&SignUp {
                email,
                password: password.to_string(),
                full_name: full_name.to_string(),
                redirect_to: redirect_to.to_string(),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;

        if let Some(session) = &outcome.session {
            self.events.publish(Some(session));
        }
        Ok(outcome)
    }

    /// End the session on the auth server and notify subscribers.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the auth server fails.
    #[instrument(skip_all, fields(user_id = %session.user_id()))]
    pub async fn sign_out(&self, session: &AuthSession) -> Result<(), AuthError> {
        self.store.scoped(session).sign_out(session).await?;
        self.events.publish(None);
        Ok(())
    }

    /// Resolve the viewer behind `session`.
    ///
    /// A missing or unreadable profile is not an error: the viewer falls back
    /// to a regular user named by email.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::SessionExpired` if the auth server no longer
    /// accepts the session's token.
    #[instrument(skip_all, fields(user_id = %session.user_id()))]
    pub async fn viewer(&self, session: &AuthSession) -> Result<Viewer, AuthError> {
        let store = self.store.scoped(session);
        let user = store
            .current_user(session)
            .await?
            .ok_or(AuthError::SessionExpired)?;

        let profile = match store.find_profile(user.id).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "Failed to load profile");
                None
            }
        };

        Ok(Viewer::new(&user, profile.as_ref()))
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}
