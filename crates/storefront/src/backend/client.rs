//! PostgREST/GoTrue HTTP client.

use std::sync::Arc;

use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use super::{ApiError, BackendError, Query};
use crate::config::BackendConfig;

/// Client for a Supabase project.
///
/// Cheap to clone. [`SupabaseClient::with_access_token`] returns a copy that
/// acts on behalf of a signed-in user so row-level security applies.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
    access_token: Option<Arc<str>>,
}

struct SupabaseClientInner {
    client: reqwest::Client,
    rest_url: String,
    auth_url: String,
    api_key: String,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_url", &self.inner.rest_url)
            .field("auth_url", &self.inner.auth_url)
            .field("user_token", &self.access_token.is_some())
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    /// Create a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Http` if the HTTP client cannot be built.
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("motostore/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                client,
                rest_url: format!("{}/rest/v1", config.url),
                auth_url: format!("{}/auth/v1", config.url),
                api_key: config.anon_key.expose_secret().to_string(),
            }),
            access_token: None,
        })
    }

    /// A copy of this client that sends `token` as the bearer.
    #[must_use]
    pub fn with_access_token(&self, token: &str) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            access_token: Some(Arc::from(token)),
        }
    }

    /// Whether requests run as a signed-in user.
    #[must_use]
    pub const fn has_user_token(&self) -> bool {
        self.access_token.is_some()
    }

    // =========================================================================
    // Tables
    // =========================================================================

    /// Read rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or rows do not parse.
    #[instrument(skip(self, query), fields(table = query.table_name()))]
    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>, BackendError> {
        let request = self
            .rest(Method::GET, query.table_name())
            .query(&query.to_params());
        let body = self.execute(request).await?;
        parse(&body, query.table_name())
    }

    /// Read the first row matching `query`, if any.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the row does not parse.
    pub async fn select_first<T: DeserializeOwned>(
        &self,
        query: Query,
    ) -> Result<Option<T>, BackendError> {
        let rows: Vec<T> = self.select(&query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Insert one or more rows and return them as stored.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails or the response does not parse.
    #[instrument(skip(self, rows))]
    pub async fn insert<B, T>(&self, table: &'static str, rows: &B) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self
            .rest(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(rows);
        let body = self.execute(request).await?;
        parse(&body, table)
    }

    /// Insert a single row and return it as stored.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::NotFound` if the backend returns no row.
    pub async fn insert_one<B, T>(&self, table: &'static str, row: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let rows: Vec<T> = self.insert(table, row).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("{table}: insert returned no row")))
    }

    /// Apply `patch` to the rows matching `query` and return them.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidRequest` if `query` has no filters.
    #[instrument(skip(self, query, patch), fields(table = query.table_name()))]
    pub async fn update<B, T>(&self, query: &Query, patch: &B) -> Result<Vec<T>, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        require_filters(query)?;
        let request = self
            .rest(Method::PATCH, query.table_name())
            .query(&query.to_params())
            .header("Prefer", "return=representation")
            .json(patch);
        let body = self.execute(request).await?;
        parse(&body, query.table_name())
    }

    /// Delete the rows matching `query`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError::InvalidRequest` if `query` has no filters.
    #[instrument(skip(self, query), fields(table = query.table_name()))]
    pub async fn delete(&self, query: &Query) -> Result<(), BackendError> {
        require_filters(query)?;
        let request = self
            .rest(Method::DELETE, query.table_name())
            .query(&query.to_params())
            .header("Prefer", "return=minimal");
        self.execute(request).await?;
        Ok(())
    }

    /// Insert `rows`, merging into existing rows that collide on `on_conflict`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the request fails.
    #[instrument(skip(self, rows))]
    pub async fn upsert<B>(
        &self,
        table: &'static str,
        rows: &B,
        on_conflict: &str,
    ) -> Result<(), BackendError>
    where
        B: Serialize + ?Sized,
    {
        let request = self
            .rest(Method::POST, table)
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(rows);
        self.execute(request).await?;
        Ok(())
    }

    /// Call a database function through `/rpc/<function>`.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the call fails or the result does not parse.
    #[instrument(skip(self, args))]
    pub async fn rpc<B, T>(&self, function: &str, args: &B) -> Result<T, BackendError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}/rpc/{function}", self.inner.rest_url);
        let request = self.authorize(self.inner.client.post(url)).json(args);
        let body = self.execute(request).await?;
        parse(&body, function)
    }

    /// Check that the auth server answers.
    ///
    /// # Errors
    ///
    /// Returns `BackendError` if the project is unreachable.
    pub async fn health_check(&self) -> Result<(), BackendError> {
        let request = self.auth(Method::GET, "health");
        self.execute(request).await?;
        Ok(())
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    fn rest(&self, method: Method, table: &str) -> RequestBuilder {
        let url = format!("{}/{table}", self.inner.rest_url);
        self.authorize(self.inner.client.request(method, url))
    }

    /// Request against the auth server, e.g. `auth(Method::POST, "logout")`.
    pub(super) fn auth(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/{path}", self.inner.auth_url);
        self.authorize(self.inner.client.request(method, url))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let bearer = self.access_token.as_deref().unwrap_or(&self.inner.api_key);
        request
            .header("apikey", &self.inner.api_key)
            .bearer_auth(bearer)
    }

    /// Send a request and return the body of a successful response.
    pub(super) async fn execute(&self, request: RequestBuilder) -> Result<String, BackendError> {
        let response = request.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        let body = response.text().await?;

        if !status.is_success() {
            let error = ApiError::from_body(status.as_u16(), &body);
            if status.is_server_error() {
                tracing::error!(
                    status = %status,
                    body = %body.chars().take(500).collect::<String>(),
                    "Backend returned server error"
                );
            } else {
                debug!(status = %status, error = %error, "Backend rejected request");
            }
            return Err(BackendError::Api(error));
        }

        Ok(body)
    }
}

fn require_filters(query: &Query) -> Result<(), BackendError> {
    if query.has_filters() {
        Ok(())
    } else {
        Err(BackendError::InvalidRequest(format!(
            "refusing to modify every row of {}",
            query.table_name()
        )))
    }
}

/// Parse a response body, logging the payload when it does not match.
pub(super) fn parse<T: DeserializeOwned>(body: &str, context: &str) -> Result<T, BackendError> {
    // `return=minimal` and void functions answer with an empty body
    let body = if body.trim().is_empty() { "null" } else { body };
    serde_json::from_str(body).map_err(|e| {
        tracing::error!(
            error = %e,
            context = context,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse backend response"
        );
        BackendError::Parse(e)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use axum::extract::Query as QueryParams;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use secrecy::SecretString;
    use serde::Deserialize;
    use serde_json::{Value, json};

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Row {
        id: u32,
        nombre: String,
    }

    async fn serve(router: Router) -> SupabaseClient {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        SupabaseClient::new(&BackendConfig {
            url: format!("http://{addr}"),
            anon_key: SecretString::from("anon-key"),
            service_role_key: None,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    async fn echo_request(
        headers: HeaderMap,
        QueryParams(params): QueryParams<HashMap<String, String>>,
    ) -> Json<Value> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        Json(json!([{
            "id": 1,
            "nombre": format!(
                "{}|{}|{}|{}",
                header("apikey"),
                header("authorization"),
                params.get("esta_activo").cloned().unwrap_or_default(),
                params.get("order").cloned().unwrap_or_default(),
            ),
        }]))
    }

    #[tokio::test]
    async fn test_select_sends_key_filters_and_order() {
        let client = serve(Router::new().route("/rest/v1/productos", get(echo_request))).await;

        let rows: Vec<Row> = client
            .select(&Query::table("productos").eq("esta_activo", true).order_asc("nombre"))
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, 1);
        assert_eq!(rows[0].nombre, "anon-key|Bearer anon-key|eq.true|nombre.asc");
    }

    #[tokio::test]
    async fn test_user_token_replaces_bearer() {
        let client = serve(Router::new().route("/rest/v1/productos", get(echo_request))).await;
        let user_client = client.with_access_token("user-jwt");

        let row: Option<Row> = user_client
            .select_first(Query::table("productos"))
            .await
            .unwrap();

        assert!(user_client.has_user_token());
        assert!(!client.has_user_token());
        assert!(row.unwrap().nombre.starts_with("anon-key|Bearer user-jwt|"));
    }

    #[tokio::test]
    async fn test_api_error_is_structured() {
        let router = Router::new().route(
            "/rest/v1/pedidos",
            post(|| async {
                (
                    AxumStatus::BAD_REQUEST,
                    Json(json!({
                        "code": "23503",
                        "details": "Key is not present in table \"pagos\".",
                        "hint": null,
                        "message": "insert or update on table \"pedidos\" violates foreign key constraint"
                    })),
                )
            }),
        );
        let client = serve(router).await;

        let err = client
            .insert::<_, Value>("pedidos", &json!({"estado": "confirmado"}))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(400));
        assert_eq!(err.code(), Some("23503"));
        assert!(err.to_string().contains("violates foreign key constraint"));
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let router = Router::new().route(
            "/rest/v1/categorias",
            get(|| async { (AxumStatus::TOO_MANY_REQUESTS, [("Retry-After", "7")], "slow down") }),
        );
        let client = serve(router).await;

        let err = client
            .select::<Value>(&Query::table("categorias"))
            .await
            .unwrap_err();

        assert!(matches!(err, BackendError::RateLimited(7)));
    }

    #[tokio::test]
    async fn test_rpc_null_result() {
        let router = Router::new().route(
            "/rest/v1/rpc/generar_numero_pedido",
            post(|| async { Json(Value::Null) }),
        );
        let client = serve(router).await;

        let number: Option<String> = client
            .rpc("generar_numero_pedido", &json!({}))
            .await
            .unwrap();

        assert_eq!(number, None);
    }

    #[tokio::test]
    async fn test_unfiltered_delete_is_refused() {
        let client = serve(Router::new()).await;

        let err = client.delete(&Query::table("items_carrito")).await.unwrap_err();

        assert!(matches!(err, BackendError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_upsert_sends_conflict_key() {
        let router = Router::new().route(
            "/rest/v1/carritos",
            post(
                |headers: HeaderMap, QueryParams(params): QueryParams<HashMap<String, String>>| async move {
                    let prefer = headers.get("prefer").and_then(|v| v.to_str().ok()).unwrap_or_default();
                    if params.get("on_conflict").map(String::as_str) == Some("usuario_id")
                        && prefer.contains("merge-duplicates")
                    {
                        AxumStatus::CREATED
                    } else {
                        AxumStatus::BAD_REQUEST
                    }
                },
            ),
        );
        let client = serve(router).await;

        client
            .upsert("carritos", &json!({"id": "u", "usuario_id": "u"}), "usuario_id")
            .await
            .unwrap();
    }
}
