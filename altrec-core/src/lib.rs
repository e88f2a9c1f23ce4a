//! Altrec Core - session and API logic for the Altrec recommendation platform
//!
//! This crate implements the core domain logic following hexagonal architecture:
//!
//! - **domain**: Core entities (Identity, Query, Recommendation, etc.)
//! - **ports**: Trait definitions for external dependencies (IdentityProvider, TokenStore, ErrorSink)
//! - **services**: Business logic orchestration (session, response cache, routing, page data)
//! - **adapters**: Concrete implementations (reqwest API client, Firebase, file storage)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use adapters::{
    ApiClient, FileTokenStore, FirebaseIdentityProvider, LocalIdentityProvider, ProviderStateFile,
    TracingErrorSink,
};
use config::{Config, IdentityProviderKind};
use ports::{ErrorSink, IdentityProvider, TokenStore};
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result};
pub use domain::{
    AccessToken, Identity, NewQuery, NewRecommendation, ProfileUpdate, ProviderUser, Query,
    QueryUpdate, Recommendation, WriteAck,
};
pub use services::{Route, RouteDecision, RouteGuard, SessionState, SessionSubscription};

/// Main context for Altrec operations
///
/// The single owner of the token store, the response cache and both API
/// clients. Front ends build one of these at startup and pass it around
/// instead of reaching for globals.
pub struct AltrecContext {
    pub config: Config,
    pub data_dir: PathBuf,
    pub cache: Arc<ResponseCache>,
    pub api: Arc<ApiClient>,
    pub public_api: Arc<ApiClient>,
    pub session: Arc<SessionManager>,
    pub queries: Arc<QueryService>,
    pub recommendations: Arc<RecommendationService>,
    pub pages: PageLoader,
}

impl AltrecContext {
    /// Create a context from the settings and state in `data_dir`
    pub fn new(data_dir: &Path) -> Result<Self> {
        let config = Config::load(data_dir)?;
        let provider = build_provider(&config, data_dir)?;
        let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(data_dir));
        let mut context = Self::with_parts(config, provider, tokens, Arc::new(TracingErrorSink))?;
        context.data_dir = data_dir.to_path_buf();
        Ok(context)
    }

    /// Create a context around explicitly supplied collaborators
    pub fn with_parts(
        config: Config,
        provider: Arc<dyn IdentityProvider>,
        tokens: Arc<dyn TokenStore>,
        errors: Arc<dyn ErrorSink>,
    ) -> Result<Self> {
        let cache = Arc::new(ResponseCache::new());
        let api = Arc::new(ApiClient::authenticated(
            &config.api_base_url,
            config.request_timeout,
            tokens.clone(),
            Arc::clone(&cache),
        )?);
        let public_api = Arc::new(ApiClient::public(
            &config.api_base_url,
            config.request_timeout,
            Arc::clone(&cache),
        )?);

        let session = Arc::new(
            SessionManager::new(provider, tokens, Arc::clone(&api), errors)
                .with_default_photo_url(config.default_photo_url.clone()),
        );
        let queries = Arc::new(QueryService::new(
            Arc::clone(&api),
            Arc::clone(&public_api),
            Arc::clone(&session),
        ));
        let recommendations = Arc::new(RecommendationService::new(
            Arc::clone(&api),
            Arc::clone(&public_api),
            Arc::clone(&session),
        ));
        let pages = PageLoader::new(Arc::clone(&queries), Arc::clone(&recommendations));

        Ok(Self {
            config,
            data_dir: PathBuf::new(),
            cache,
            api,
            public_api,
            session,
            queries,
            recommendations,
            pages,
        })
    }

    /// Start following provider session changes and wait for the first
    /// restore to settle
    pub async fn restore_session(&self) -> SessionSubscription {
        let subscription = self.session.observe_session_changes();
        let mut state = self.session.watch();
        let _ = state.wait_for(|s| !s.initializing).await;
        subscription
    }

    /// Decide whether `route` may render for the current session
    pub fn evaluate_route(&self, route: &Route) -> RouteDecision {
        RouteGuard::evaluate(route, &self.session.state())
    }
}

fn build_provider(config: &Config, data_dir: &Path) -> Result<Arc<dyn IdentityProvider>> {
    let state = ProviderStateFile::new(data_dir);
    match config.identity_provider {
        IdentityProviderKind::Firebase => {
            let api_key = config.firebase_api_key.as_deref().ok_or_else(|| {
                Error::Config(format!(
                    "firebaseApiKey (or {}) is required for the firebase provider",
                    config::ENV_FIREBASE_API_KEY
                ))
            })?;
            Ok(Arc::new(FirebaseIdentityProvider::new(api_key)?.with_state_file(state)?))
        }
        IdentityProviderKind::Local => Ok(Arc::new(LocalIdentityProvider::open(state)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock_server::MockBackend;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_context_restores_session_from_disk() {
        let server = MockBackend::default().start();
        let dir = TempDir::new().unwrap();
        let config = Config {
            api_base_url: server.base_url(),
            ..Config::default()
        };
        config.save(dir.path()).unwrap();

        {
            let context = AltrecContext::new(dir.path()).unwrap();
            let _subscription = context.restore_session().await;
            context
                .session
                .register_with_password("a@example.com", "secret1", "Ann", None)
                .await
                .unwrap();
        }

        let context = AltrecContext::new(dir.path()).unwrap();
        assert_eq!(
            context.evaluate_route(&Route::MyQueries),
            RouteDecision::Loading
        );
        let _subscription = context.restore_session().await;

        let identity = context.session.current_identity().unwrap();
        assert_eq!(identity.email, "a@example.com");
        assert_eq!(identity.display_name, "Ann");
        assert_eq!(identity.photo_url.as_deref(), Some(config::DEFAULT_PHOTO_URL));
        assert_eq!(context.evaluate_route(&Route::MyQueries), RouteDecision::Allow);
    }

    #[tokio::test]
    async fn test_corrupt_session_file_does_not_lock_out_account() {
        let server = MockBackend::default().start();
        let dir = TempDir::new().unwrap();
        let config = Config {
            api_base_url: server.base_url(),
            ..Config::default()
        };
        config.save(dir.path()).unwrap();
        let session_path = dir.path().join(adapters::token_store::SESSION_FILE);
        std::fs::write(&session_path, "{not json").unwrap();

        let context = AltrecContext::new(dir.path()).unwrap();
        let _subscription = context.restore_session().await;
        assert!(context.session.current_identity().is_none());

        context
            .session
            .register_with_password("a@example.com", "secret1", "Ann", None)
            .await
            .unwrap();
        assert!(context.session.current_identity().unwrap().is_backend_authenticated());

        context.session.logout().await.unwrap();
        let tokens = FileTokenStore::new(dir.path());
        assert_eq!(tokens.load().unwrap(), None);
    }

    #[tokio::test]
    async fn test_logout_succeeds_over_corrupt_session_file() {
        let dir = TempDir::new().unwrap();
        let session_path = dir.path().join(adapters::token_store::SESSION_FILE);
        std::fs::write(&session_path, "{not json").unwrap();

        let context = AltrecContext::new(dir.path()).unwrap();
        context.session.logout().await.unwrap();

        let tokens = FileTokenStore::new(dir.path());
        assert_eq!(tokens.load().unwrap(), None);
        assert!(!session_path.exists());
    }

    #[test]
    fn test_firebase_without_key_is_config_error() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            identity_provider: IdentityProviderKind::Firebase,
            ..Config::default()
        };
        assert!(matches!(build_provider(&config, dir.path()), Err(Error::Config(_))));
    }
}
