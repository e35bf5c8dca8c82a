//! Authentication extractors and session helpers.
//!
//! The per-browser session (tower-sessions) holds the signed-in user's
//! [`AuthSession`], the guest-mode flag, and the checkout hand-off. These
//! extractors turn it into the explicit context the services take.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::{AuthContext, AuthSession, PaymentHandoff, session_keys};

type SessionResult<T> = Result<T, tower_sessions::session::Error>;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn session_from(parts: &Parts) -> Result<&Session, AppError> {
    parts
        .extensions
        .get::<Session>()
        .ok_or_else(|| AppError::Internal("session layer missing".to_string()))
}

/// Read the auth session, dropping it if the access token has expired.
async fn live_auth_session(session: &Session) -> Result<Option<AuthSession>, AppError> {
    let Some(auth) = session
        .get::<AuthSession>(session_keys::AUTH_SESSION)
        .await?
    else {
        return Ok(None);
    };

    if auth.is_expired(now()) {
        tracing::debug!(user_id = %auth.user_id(), "Auth session expired");
        clear_auth_session(session).await?;
        return Ok(None);
    }

    Ok(Some(auth))
}

/// Extractor that requires a signed-in user.
///
/// Responds 401 with a JSON error if there is no session or its token has
/// expired.
///
/// ```rust,ignore
/// async fn protected_handler(RequireAuth(session): RequireAuth) -> String {
///     session.user_id().to_string()
/// }
/// ```
pub struct RequireAuth(pub AuthSession);

impl<S> FromRequestParts<S> for RequireAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from(parts)?;
        live_auth_session(session)
            .await?
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Sign in required".to_string()))
    }
}

/// Extractor for who is asking: an optional session plus the guest flag.
///
/// Never rejects for a missing sign-in.
pub struct OptionalAuth(pub AuthContext);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let session = session_from(parts)?;
        let auth = live_auth_session(session).await?;
        let guest = session
            .get::<bool>(session_keys::GUEST_MODE)
            .await?
            .unwrap_or(false);

        Ok(Self(AuthContext {
            session: auth,
            guest,
        }))
    }
}

/// Store the auth session after sign-in. Leaves guest mode.
///
/// The session ID is cycled to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_auth_session(session: &Session, auth: &AuthSession) -> SessionResult<()> {
    session.cycle_id().await?;
    session.remove::<bool>(session_keys::GUEST_MODE).await?;
    session.insert(session_keys::AUTH_SESSION, auth).await
}

/// Forget the signed-in user, the guest flag, and any pending hand-off.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_auth_session(session: &Session) -> SessionResult<()> {
    session
        .remove::<AuthSession>(session_keys::AUTH_SESSION)
        .await?;
    session.remove::<bool>(session_keys::GUEST_MODE).await?;
    clear_payment_handoff(session).await
}

/// Enter guest mode.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_guest_mode(session: &Session) -> SessionResult<()> {
    session.insert(session_keys::GUEST_MODE, true).await
}

/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_payment_handoff(session: &Session, handoff: &PaymentHandoff) -> SessionResult<()> {
    session.insert(session_keys::PAYMENT_HANDOFF, handoff).await
}

/// # Errors
///
/// Returns an error if the session store fails.
pub async fn payment_handoff(session: &Session) -> SessionResult<Option<PaymentHandoff>> {
    session.get(session_keys::PAYMENT_HANDOFF).await
}

/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_payment_handoff(session: &Session) -> SessionResult<()> {
    session
        .remove::<PaymentHandoff>(session_keys::PAYMENT_HANDOFF)
        .await?;
    Ok(())
}
