//! Authentication route handlers.
//!
//! Sign-in, registration, sign-out and guest mode. The auth session is kept
//! in the per-browser session; the backend's tokens never reach the client.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use tracing::{instrument, warn};

use motostore_core::Email;

use crate::db::Store;
use crate::error::{Result, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalAuth, clear_auth_session, set_auth_session, set_guest_mode};
use crate::models::{AccountUser, AuthSession};
use crate::services::{AuthError, AuthService, Viewer};
use crate::state::AppState;

// =============================================================================
// Request and response types
// =============================================================================

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub full_name: String,
}

/// Who the browser is, as far as the storefront knows.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub viewer: Option<Viewer>,
    pub guest: bool,
}

#[derive(Debug, Serialize)]
pub struct Registered {
    pub user: AccountUser,
    /// The account must be confirmed by email before signing in.
    pub confirmation_required: bool,
}

/// Resolve the viewer, falling back to the session's own user data.
async fn viewer_or_fallback<S: Store>(state: &AppState<S>, auth: &AuthSession) -> Viewer {
    match AuthService::new(state.store(), state.events()).viewer(auth).await {
        Ok(viewer) => viewer,
        Err(e) => {
            warn!(error = %e, "Failed to resolve viewer after sign-in");
            Viewer::new(&auth.user, None)
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// `POST /auth/login`
#[instrument(skip_all)]
pub async fn login<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    Json(form): Json<LoginForm>,
) -> Result<Json<SessionView>> {
    let auth = AuthService::new(state.store(), state.events())
        .sign_in(&form.email, &form.password)
        .await?;

    set_auth_session(&session, &auth).await?;
    set_sentry_user(&auth.user_id(), auth.user.email.as_ref().map(Email::as_str));

    let viewer = viewer_or_fallback(&state, &auth).await;
    Ok(Json(SessionView {
        viewer: Some(viewer),
        guest: false,
    }))
}

/// `POST /auth/register`
///
/// Responds 201. Unless the backend signs the user in straight away, the
/// account has to be confirmed through the emailed link first.
#[instrument(skip_all)]
pub async fn register<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    Json(form): Json<RegisterForm>,
) -> Result<(StatusCode, Json<Registered>)> {
    let outcome = AuthService::new(state.store(), state.events())
        .sign_up(
            &form.email,
            &form.password,
            &form.full_name,
            &state.config().signup_redirect_url(),
        )
        .await?;

    if let Some(auth) = &outcome.session {
        set_auth_session(&session, auth).await?;
    }
    add_breadcrumb("auth", "Account registered", None);

    Ok((
        StatusCode::CREATED,
        Json(Registered {
            confirmation_required: outcome.session.is_none(),
            user: outcome.user,
        }),
    ))
}

/// `POST /auth/logout`
///
/// The local session is cleared even if the auth server cannot be reached.
#[instrument(skip_all)]
pub async fn logout<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    OptionalAuth(ctx): OptionalAuth,
) -> Result<StatusCode> {
    if let Some(auth) = &ctx.session {
        if let Err(e) = AuthService::new(state.store(), state.events())
            .sign_out(auth)
            .await
        {
            warn!(error = %e, "Sign-out failed on the auth server");
        }
    }

    clear_auth_session(&session).await?;
    clear_sentry_user();
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /auth/guest`
///
/// Signed-in users stay signed in; the flag only applies to anonymous
/// browsers.
pub async fn guest(
    session: Session,
    OptionalAuth(ctx): OptionalAuth,
) -> Result<Json<SessionView>> {
    if ctx.is_signed_in() {
        return Ok(Json(SessionView {
            viewer: None,
            guest: false,
        }));
    }

    set_guest_mode(&session).await?;
    add_breadcrumb("auth", "Entered guest mode", None);
    Ok(Json(SessionView {
        viewer: None,
        guest: true,
    }))
}

/// `GET /auth/session`
///
/// A session whose token the auth server no longer accepts is cleared.
pub async fn current<S: Store>(
    State(state): State<AppState<S>>,
    session: Session,
    OptionalAuth(ctx): OptionalAuth,
) -> Result<Json<SessionView>> {
    let Some(auth) = &ctx.session else {
        return Ok(Json(SessionView {
            viewer: None,
            guest: ctx.guest,
        }));
    };

    match AuthService::new(state.store(), state.events()).viewer(auth).await {
        Ok(viewer) => Ok(Json(SessionView {
            viewer: Some(viewer),
            guest: false,
        })),
        Err(AuthError::SessionExpired) => {
            clear_auth_session(&session).await?;
            Ok(Json(SessionView {
                viewer: None,
                guest: false,
            }))
        }
        Err(e) => Err(e.into()),
    }
}
