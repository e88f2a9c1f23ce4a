//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest HTTP client for the backend API (authenticated and public)
//! - JSON file and in-memory storage for the TokenStore port
//! - Firebase REST and in-memory providers for the IdentityProvider port
//! - tracing and in-memory sinks for the ErrorSink port
//! - a JSON state file so provider sessions survive restarts

pub mod api_client;
pub mod error_sink;
pub mod firebase;
pub mod local_identity;
pub mod provider_state;
pub mod token_store;

#[cfg(test)]
pub mod mock_server;

pub use api_client::ApiClient;
pub use error_sink::{MemoryErrorSink, TracingErrorSink};
pub use firebase::FirebaseIdentityProvider;
pub use local_identity::LocalIdentityProvider;
pub use provider_state::ProviderStateFile;
pub use token_store::{FileTokenStore, MemoryTokenStore};
