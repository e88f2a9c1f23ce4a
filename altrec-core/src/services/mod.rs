//! Service layer - business logic orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific use case or feature area.

pub mod cache;
mod loaders;
mod queries;
mod recommendations;
pub mod route_guard;
mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheScope, ResponseCache, CACHE_TTL};
pub use loaders::{PageLoader, QueryDetails};
pub use queries::{QueryService, RECENT_QUERY_LIMIT};
pub use recommendations::{PendingAdd, RecommendationService, RecommendationThread};
pub use route_guard::{Route, RouteDecision, RouteGuard};
pub use session::{SessionManager, SessionState, SessionSubscription, TOKEN_ENDPOINT};
