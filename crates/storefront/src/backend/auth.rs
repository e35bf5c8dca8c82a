//! GoTrue (auth server) endpoints.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use motostore_core::UserId;

use super::client::parse;
use super::{BackendError, SupabaseClient};

/// A user as reported by the auth server.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    /// Metadata given at sign-up (`nombre_completo`).
    #[serde(default)]
    pub user_metadata: serde_json::Value,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

impl AuthUser {
    /// Full name recorded at sign-up, if any.
    #[must_use]
    pub fn full_name(&self) -> Option<&str> {
        self.user_metadata
            .get("nombre_completo")
            .and_then(serde_json::Value::as_str)
            .filter(|name| !name.trim().is_empty())
    }
}

/// Tokens issued by a successful sign-in.
#[derive(Clone, Deserialize)]
pub struct TokenSession {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds.
    pub expires_in: i64,
    /// Unix time the access token expires.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

impl std::fmt::Debug for TokenSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

/// Sign-up form data.
pub struct SignUpRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub full_name: &'a str,
    /// Where the confirmation email sends the user.
    pub redirect_to: &'a str,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: SignUpMetadata<'a>,
}

#[derive(Serialize)]
struct SignUpMetadata<'a> {
    nombre_completo: &'a str,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

/// With email confirmation enabled the server answers with the bare user;
/// with auto-confirm it signs the user in right away.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenSession),
    User(AuthUser),
}

impl SupabaseClient {
    /// Exchange email and password for a session.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` with status 400 for wrong credentials.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<TokenSession, BackendError> {
        let request = self
            .auth(Method::POST, "token")
            .query(&[("grant_type", "password")])
            .json(&PasswordGrant { email, password });
        let body = self.execute(request).await?;
        parse(&body, "token")
    }

    /// Register a new account. Returns the session when the server
    /// confirms the account immediately.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` if the server rejects the sign-up.
    #[instrument(skip(self, request), fields(email = request.email))]
    pub async fn create_account(
        &self,
        request: &SignUpRequest<'_>,
    ) -> Result<(AuthUser, Option<TokenSession>), BackendError> {
        let http = self
            .auth(Method::POST, "signup")
            .query(&[("redirect_to", request.redirect_to)])
            .json(&SignUpBody {
                email: request.email,
                password: request.password,
                data: SignUpMetadata {
                    nombre_completo: request.full_name,
                },
            });
        let body = self.execute(http).await?;

        Ok(match parse::<SignUpResponse>(&body, "signup")? {
            SignUpResponse::Session(session) => (session.user.clone(), Some(session)),
            SignUpResponse::User(user) => (user, None),
        })
    }

    /// Revoke the session behind `access_token`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the server rejects the token.
    #[instrument(skip_all)]
    pub async fn revoke_session(&self, access_token: &str) -> Result<(), BackendError> {
        let request = self.with_access_token(access_token).auth(Method::POST, "logout");
        self.execute(request).await?;
        Ok(())
    }

    /// Look up the user that owns `access_token`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Api` with status 401 for expired tokens.
    #[instrument(skip_all)]
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let request = self.with_access_token(access_token).auth(Method::GET, "user");
        let body = self.execute(request).await?;
        parse(&body, "user")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const USER_ID: &str = "0b6c7f4e-2f42-4a7e-9c2e-8d1f5a3b9c10";

    #[test]
    fn test_sign_up_response_without_session() {
        let body = format!(
            r#"{{"id":"{USER_ID}","email":"ana@ejemplo.mx","user_metadata":{{"nombre_completo":"Ana López"}}}}"#
        );
        let response: SignUpResponse = serde_json::from_str(&body).unwrap();

        let SignUpResponse::User(user) = response else {
            panic!("expected bare user");
        };
        assert_eq!(user.id.to_string(), USER_ID);
        assert_eq!(user.full_name(), Some("Ana López"));
    }

    #[test]
    fn test_sign_up_response_with_session() {
        let body = format!(
            r#"{{"access_token":"a","refresh_token":"r","expires_in":3600,"token_type":"bearer","user":{{"id":"{USER_ID}","email":"ana@ejemplo.mx"}}}}"#
        );
        let response: SignUpResponse = serde_json::from_str(&body).unwrap();

        assert!(matches!(response, SignUpResponse::Session(_)));
    }

    #[test]
    fn test_full_name_ignores_blank_metadata() {
        let user: AuthUser = serde_json::from_str(&format!(
            r#"{{"id":"{USER_ID}","user_metadata":{{"nombre_completo":"  "}}}}"#
        ))
        .unwrap();
        assert_eq!(user.full_name(), None);
        assert_eq!(user.email, None);
    }

    #[test]
    fn test_token_session_debug_redacts_tokens() {
        let session: TokenSession = serde_json::from_str(&format!(
            r#"{{"access_token":"secret-access","refresh_token":"secret-refresh","expires_in":3600,"user":{{"id":"{USER_ID}"}}}}"#
        ))
        .unwrap();
        let debug = format!("{session:?}");
        assert!(!debug.contains("secret-access"));
        assert!(!debug.contains("secret-refresh"));
    }
}
