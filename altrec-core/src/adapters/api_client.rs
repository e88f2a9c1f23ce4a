//! Backend API client
//!
//! Two instances talk to the same backend: the authenticated client attaches
//! the persisted access token as a bearer credential, the public client never
//! does. Both memoize successful GET responses in the shared
//! [`ResponseCache`] and serve identical reads from it for the TTL window.
//!
//! Failures are returned unmodified: no retries, no rewriting of backend
//! error bodies.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::domain::result::{Error, Result};
use crate::ports::TokenStore;
use crate::services::cache::{CacheScope, ResponseCache};

/// Default request timeout for both clients
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the recommendation backend
pub struct ApiClient {
    client: Client,
    base_url: String,
    scope: CacheScope,
    tokens: Option<Arc<dyn TokenStore>>,
    cache: Arc<ResponseCache>,
}

impl ApiClient {
    /// Client that attaches the persisted access token to every request
    pub fn authenticated(
        base_url: &str,
        timeout: Duration,
        tokens: Arc<dyn TokenStore>,
        cache: Arc<ResponseCache>,
    ) -> Result<Self> {
        Self::build(base_url, timeout, CacheScope::Authenticated, Some(tokens), cache)
    }

    /// Client that never sends credentials
    pub fn public(base_url: &str, timeout: Duration, cache: Arc<ResponseCache>) -> Result<Self> {
        Self::build(base_url, timeout, CacheScope::Public, None, cache)
    }

    fn build(
        base_url: &str,
        timeout: Duration,
        scope: CacheScope,
        tokens: Option<Arc<dyn TokenStore>>,
        cache: Arc<ResponseCache>,
    ) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(Error::Config("API base URL cannot be empty".to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            scope,
            tokens,
            cache,
        })
    }

    pub fn scope(&self) -> CacheScope {
        self.scope
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET with read-through caching
    pub async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, &str)]) -> Result<T> {
        let key = ResponseCache::key(self.scope, path, params);

        if let Some(payload) = self.cache.get(&key) {
            debug!(key = %key, "cache hit");
            return Ok(serde_json::from_value(payload)?);
        }
        debug!(key = %key, "cache miss");

        let mut request = self.request(Method::GET, path)?;
        if !params.is_empty() {
            request = request.query(params);
        }

        let payload = self.send(request).await?;
        self.cache.insert(key, payload.clone());
        Ok(serde_json::from_value(payload)?)
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path)?.json(body);
        Self::decode(self.send(request).await?)
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PUT, path)?.json(body);
        Self::decode(self.send(request).await?)
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.request(Method::DELETE, path)?;
        Self::decode(self.send(request).await?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start a request, attaching the bearer token when this client has one
    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder> {
        let mut request = self.client.request(method, self.url(path));

        if let Some(tokens) = &self.tokens {
            match tokens.load()? {
                Some(token) if !token.is_empty() => {
                    request = request.bearer_auth(token.as_str());
                }
                _ => debug!(path, "no access token stored, sending without credentials"),
            }
        }

        Ok(request)
    }

    async fn send(&self, request: RequestBuilder) -> Result<JsonValue> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "backend returned error status");
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(JsonValue::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }

    /// Decode a write response; an empty body reads as an empty object
    fn decode<T: DeserializeOwned>(payload: JsonValue) -> Result<T> {
        if payload.is_null() {
            if let Ok(value) = serde_json::from_value(JsonValue::Null) {
                return Ok(value);
            }
            return Ok(serde_json::from_value(JsonValue::Object(Default::default()))?);
        }
        Ok(serde_json::from_value(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock_server::{MockBackend, MockResponse, MockServer};
    use crate::adapters::token_store::MemoryTokenStore;
    use crate::domain::{AccessToken, Query, WriteAck};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn clients(base_url: &str, tokens: Arc<MemoryTokenStore>) -> (ApiClient, ApiClient) {
        let cache = Arc::new(ResponseCache::new());
        let auth = ApiClient::authenticated(base_url, DEFAULT_TIMEOUT, tokens, cache.clone()).unwrap();
        let public = ApiClient::public(base_url, DEFAULT_TIMEOUT, cache).unwrap();
        (auth, public)
    }

    #[tokio::test]
    async fn test_authenticated_client_sends_bearer_token() {
        let server = MockBackend::default().start();
        let tokens = Arc::new(MemoryTokenStore::with_token(AccessToken::new("jwt-1")));
        let (auth, _) = clients(&server.base_url(), tokens);

        let _: JsonValue = auth.get("/recommendations/my", &[]).await.unwrap();

        let requests = server.requests_to("GET", "/recommendations/my");
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].authorization.as_deref(), Some("Bearer jwt-1"));
    }

    #[tokio::test]
    async fn test_missing_token_omits_authorization_header() {
        let server = MockBackend::default().start();
        let (auth, _) = clients(&server.base_url(), Arc::new(MemoryTokenStore::new()));

        let err = auth.get::<JsonValue>("/recommendations/my", &[]).await.unwrap_err();

        assert_eq!(err.status(), Some(401));
        let requests = server.requests_to("GET", "/recommendations/my");
        assert_eq!(requests.len(), 1);
        assert!(requests[0].authorization.is_none());
    }

    #[tokio::test]
    async fn test_empty_token_omits_authorization_header() {
        let server = MockBackend::default().start();
        let tokens = Arc::new(MemoryTokenStore::with_token(AccessToken::new("")));
        let (auth, _) = clients(&server.base_url(), tokens);

        let _ = auth.get::<JsonValue>("/recommendations/my", &[]).await;

        assert!(server.requests_to("GET", "/recommendations/my")[0].authorization.is_none());
    }

    #[tokio::test]
    async fn test_public_client_never_sends_token() {
        let server = MockBackend::default().start();
        let tokens = Arc::new(MemoryTokenStore::with_token(AccessToken::new("jwt-1")));
        let (_, public) = clients(&server.base_url(), tokens);

        let _: Vec<Query> = public.get("/queries", &[]).await.unwrap();

        assert!(server.requests_to("GET", "/queries")[0].authorization.is_none());
    }

    #[tokio::test]
    async fn test_repeated_public_search_hits_network_once() {
        let server = MockBackend::default().start();
        let (_, public) = clients(&server.base_url(), Arc::new(MemoryTokenStore::new()));

        let first: Vec<Query> = public.get("/queries", &[("search", "soap")]).await.unwrap();
        let second: Vec<Query> = public.get("/queries", &[("search", "soap")]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.len(), 1);
        assert_eq!(server.requests_to("GET", "/queries").len(), 1);
    }

    #[tokio::test]
    async fn test_different_params_do_not_share_entries() {
        let server = MockBackend::default().start();
        let (_, public) = clients(&server.base_url(), Arc::new(MemoryTokenStore::new()));

        let soap: Vec<Query> = public.get("/queries", &[("search", "soap")]).await.unwrap();
        let cola: Vec<Query> = public.get("/queries", &[("search", "cola")]).await.unwrap();

        assert_eq!(soap[0].id, "q1");
        assert_eq!(cola[0].id, "q2");
        assert_eq!(server.requests_to("GET", "/queries").len(), 2);
    }

    #[tokio::test]
    async fn test_public_and_authenticated_reads_cached_separately() {
        let server = MockBackend::default().start();
        let tokens = Arc::new(MemoryTokenStore::with_token(AccessToken::new("jwt-1")));
        let (auth, public) = clients(&server.base_url(), tokens);

        let _: Vec<Query> = public.get("/queries", &[]).await.unwrap();
        let _: Vec<Query> = auth.get("/queries", &[]).await.unwrap();

        assert_eq!(server.requests_to("GET", "/queries").len(), 2);
    }

    #[tokio::test]
    async fn test_error_status_is_passed_through_and_not_cached() {
        let server = MockBackend::default().start();
        let (_, public) = clients(&server.base_url(), Arc::new(MemoryTokenStore::new()));

        for _ in 0..2 {
            let err = public.get::<Query>("/queries/missing", &[]).await.unwrap_err();
            match err {
                Error::HttpStatus { status, body } => {
                    assert_eq!(status, 404);
                    assert!(body.contains("query not found"));
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
        assert_eq!(server.requests_to("GET", "/queries/missing").len(), 2);
    }

    #[tokio::test]
    async fn test_writes_are_never_cached() {
        let server = MockBackend::default().start();
        let tokens = Arc::new(MemoryTokenStore::with_token(AccessToken::new("jwt-1")));
        let (auth, _) = clients(&server.base_url(), tokens);

        for _ in 0..2 {
            let ack: WriteAck = auth.delete("/queries/q1").await.unwrap();
            assert_eq!(ack.deleted_count, Some(1));
        }
        assert_eq!(server.requests_to("DELETE", "/queries/q1").len(), 2);
    }

    #[tokio::test]
    async fn test_empty_write_body_decodes_as_ack() {
        let server = MockServer::start(|_| MockResponse { status: 200, body: String::new() }).unwrap();
        let (auth, _) = clients(&server.base_url(), Arc::new(MemoryTokenStore::new()));

        let ack: WriteAck = auth.post("/queries", &json!({})).await.unwrap();
        assert_eq!(ack, WriteAck::default());
    }

    #[tokio::test]
    async fn test_schema_mismatch_is_rejected() {
        let server = MockServer::start(|_| MockResponse::ok(json!([{ "unexpected": true }]))).unwrap();
        let (_, public) = clients(&server.base_url(), Arc::new(MemoryTokenStore::new()));

        let err = public.get::<Vec<Query>>("/queries", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_network_error() {
        let base_url = {
            let server = MockServer::start(|_| MockResponse::ok(json!(null))).unwrap();
            server.base_url()
        };
        let (_, public) = clients(&base_url, Arc::new(MemoryTokenStore::new()));

        let err = public.get::<JsonValue>("/queries", &[]).await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_trailing_slash_in_base_url() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let server = MockServer::start(move |request| {
            counter.fetch_add(1, Ordering::SeqCst);
            MockResponse::ok(json!({ "path": request.path }))
        })
        .unwrap();
        let base_url = format!("{}/", server.base_url());
        let (_, public) = clients(&base_url, Arc::new(MemoryTokenStore::new()));

        let body: JsonValue = public.get("/queries", &[]).await.unwrap();
        assert_eq!(body["path"], "/queries");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let result = ApiClient::public("", DEFAULT_TIMEOUT, Arc::new(ResponseCache::new()));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
