//! Page loaders
//!
//! Data for the public pages. Loaders never fail: a backend error is logged
//! and the page renders empty.

use std::sync::Arc;

use tracing::warn;

use crate::domain::{Query, Recommendation};
use crate::services::{QueryService, RecommendationService, RecommendationThread};

/// Data behind the query details view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDetails {
    /// `None` when the query could not be loaded
    pub query: Option<Query>,
    pub recommendations: Vec<Recommendation>,
}

impl QueryDetails {
    pub fn into_thread(self) -> Option<RecommendationThread> {
        self.query
            .map(|query| RecommendationThread::new(query, self.recommendations))
    }
}

pub struct PageLoader {
    queries: Arc<QueryService>,
    recommendations: Arc<RecommendationService>,
}

impl PageLoader {
    pub fn new(queries: Arc<QueryService>, recommendations: Arc<RecommendationService>) -> Self {
        Self {
            queries,
            recommendations,
        }
    }

    /// Recent queries for the home page
    pub async fn home(&self) -> Vec<Query> {
        self.queries.recent().await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to load recent queries");
            Vec::new()
        })
    }

    pub async fn queries(&self, search: Option<&str>) -> Vec<Query> {
        self.queries.search(search).await.unwrap_or_else(|e| {
            warn!(error = %e, "failed to load queries");
            Vec::new()
        })
    }

    /// Query and its recommendations, fetched concurrently
    pub async fn details(&self, id: &str) -> QueryDetails {
        let (query, recommendations) =
            tokio::join!(self.queries.get(id), self.recommendations.for_query(id));

        match (query, recommendations) {
            (Ok(query), Ok(recommendations)) => QueryDetails {
                query: Some(query),
                recommendations,
            },
            (Err(e), _) | (_, Err(e)) => {
                warn!(id, error = %e, "failed to load query details");
                QueryDetails::default()
            }
        }
    }
}
