//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core domain
//! depends only on these traits, not on concrete implementations.

mod error_sink;
mod identity_provider;
mod token_store;

pub use error_sink::ErrorSink;
pub use identity_provider::{IdentityProvider, SessionEvents, SessionNotifier};
pub use token_store::TokenStore;
