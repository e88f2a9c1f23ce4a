//! Core domain entities
//!
//! All business entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod identity;
mod query;
mod recommendation;
pub mod result;

pub use identity::{AccessToken, Identity, ProfileUpdate, ProviderUser};
pub use query::{NewQuery, Query, QueryUpdate, WriteAck};
pub use recommendation::{NewRecommendation, Recommendation};
