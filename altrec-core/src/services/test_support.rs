//! Shared fixtures for service tests

use std::sync::Arc;

use crate::adapters::api_client::DEFAULT_TIMEOUT;
use crate::adapters::mock_server::{MockBackend, MockServer};
use crate::adapters::{ApiClient, LocalIdentityProvider, MemoryErrorSink, MemoryTokenStore};
use crate::services::cache::ResponseCache;
use crate::services::SessionManager;

pub struct Fixture {
    pub server: MockServer,
    pub api: Arc<ApiClient>,
    pub public_api: Arc<ApiClient>,
    pub session: Arc<SessionManager>,
    pub tokens: Arc<MemoryTokenStore>,
    pub errors: Arc<MemoryErrorSink>,
}

pub const PASSWORD: &str = "secret1";

/// Backend plus a signed-out session whose provider knows `owner@example.com`
/// ("Owen") and `a@example.com` ("Ann Lee")
pub fn fixture(backend: MockBackend) -> Fixture {
    let server = backend.start();
    let cache = Arc::new(ResponseCache::new());
    let tokens = Arc::new(MemoryTokenStore::new());
    let errors = Arc::new(MemoryErrorSink::new());

    let api = Arc::new(
        ApiClient::authenticated(&server.base_url(), DEFAULT_TIMEOUT, tokens.clone(), cache.clone())
            .unwrap(),
    );
    let public_api = Arc::new(ApiClient::public(&server.base_url(), DEFAULT_TIMEOUT, cache).unwrap());

    let provider = LocalIdentityProvider::new()
        .with_account("owner@example.com", PASSWORD, "Owen")
        .unwrap()
        .with_account("a@example.com", PASSWORD, "Ann Lee")
        .unwrap();
    let session = Arc::new(SessionManager::new(
        Arc::new(provider),
        tokens.clone(),
        api.clone(),
        errors.clone(),
    ));

    Fixture {
        server,
        api,
        public_api,
        session,
        tokens,
        errors,
    }
}

/// Fixture with `email` already signed in
pub async fn signed_in_fixture(backend: MockBackend, email: &str) -> Fixture {
    let fixture = fixture(backend);
    fixture.session.login_with_password(email, PASSWORD).await.unwrap();
    fixture
}
