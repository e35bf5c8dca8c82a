//! [`AuthProvider`] over GoTrue.

use chrono::Utc;
use tracing::{debug, instrument};

use motostore_core::Email;

use crate::backend::{AuthUser, BackendError, SignUpRequest, SupabaseClient, TokenSession};
use crate::db::{AuthProvider, RepositoryError, Result, SignUp, SignUpOutcome};
use crate::models::{AccountUser, AuthSession};

fn account_user(user: &AuthUser) -> AccountUser {
    AccountUser {
        id: user.id,
        // GoTrue has already validated the address; a parse failure here
        // only means an unusual format we should not reject the user over.
        email: user.email.as_deref().and_then(|e| Email::parse(e).ok()),
        full_name: user.full_name().map(str::to_string),
    }
}

fn auth_session(tokens: TokenSession) -> AuthSession {
    let expires_at = tokens
        .expires_at
        .unwrap_or_else(|| Utc::now().timestamp() + tokens.expires_in);
    AuthSession {
        user: account_user(&tokens.user),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_at: Some(expires_at),
    }
}

fn is_status(err: &BackendError, statuses: &[u16]) -> bool {
    err.status().is_some_and(|s| statuses.contains(&s))
}

impl AuthProvider for SupabaseClient {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &str) -> Result<AuthSession> {
        match self.sign_in_with_password(email.as_str(), password).await {
            Ok(tokens) => Ok(auth_session(tokens)),
            // GoTrue answers wrong credentials with 400 invalid_grant
            Err(BackendError::Api(api)) if matches!(api.status, 400 | 401) => {
                Err(RepositoryError::Unauthorized(api.message))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn sign_up(&self, request: &SignUp) -> Result<SignUpOutcome> {
        let body = SignUpRequest {
            email: request.email.as_str(),
            password: &request.password,
            full_name: &request.full_name,
            redirect_to: &request.redirect_to,
        };
        match self.create_account(&body).await {
            Ok((user, tokens)) => Ok(SignUpOutcome {
                user: account_user(&user),
                session: tokens.map(auth_session),
            }),
            Err(BackendError::Api(api))
                if api.status == 422 && api.code.as_deref() == Some("user_already_exists") =>
            {
                Err(RepositoryError::Conflict(api.message))
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, fields(user_id = %session.user_id()))]
    async fn sign_out(&self, session: &AuthSession) -> Result<()> {
        match self.revoke_session(&session.access_token).await {
            Ok(()) => Ok(()),
            // Token already expired or revoked; nothing left to sign out
            Err(e) if is_status(&e, &[401, 403, 404]) => {
                debug!(error = %e, "Session was already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip_all, fields(user_id = %session.user_id()))]
    async fn current_user(&self, session: &AuthSession) -> Result<Option<AccountUser>> {
        match self.get_user(&session.access_token).await {
            Ok(user) => Ok(Some(account_user(&user))),
            Err(e) if is_status(&e, &[401, 403]) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
