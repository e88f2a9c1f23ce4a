//! Recommendation service and the optimistic recommendation thread

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use crate::adapters::ApiClient;
use crate::domain::result::{Error, Result};
use crate::domain::{NewRecommendation, Query, Recommendation, WriteAck};
use crate::services::SessionManager;

pub struct RecommendationService {
    api: Arc<ApiClient>,
    public_api: Arc<ApiClient>,
    session: Arc<SessionManager>,
}

impl RecommendationService {
    pub fn new(api: Arc<ApiClient>, public_api: Arc<ApiClient>, session: Arc<SessionManager>) -> Self {
        Self {
            api,
            public_api,
            session,
        }
    }

    /// Recommendations posted on a query, readable without signing in
    pub async fn for_query(&self, query_id: &str) -> Result<Vec<Recommendation>> {
        self.public_api
            .get(&format!("/recommendations/by-query/{}", query_id), &[])
            .await
    }

    /// Recommendations written by the current identity
    pub async fn mine(&self) -> Result<Vec<Recommendation>> {
        self.session.current_identity().ok_or(Error::NotAuthenticated)?;
        self.api.get("/recommendations/my", &[]).await
    }

    /// Recommendations on queries owned by the current identity
    pub async fn for_me(&self) -> Result<Vec<Recommendation>> {
        self.session.current_identity().ok_or(Error::NotAuthenticated)?;
        self.api.get("/recommendations/for-me", &[]).await
    }

    /// Fill in the parent query context and recommender, then validate
    pub fn prepare(&self, query: &Query, mut form: NewRecommendation) -> Result<NewRecommendation> {
        let identity = self.session.current_identity().ok_or(Error::NotAuthenticated)?;

        form.query_id = query.id.clone();
        form.query_title = query.query_title.clone();
        form.product_name = query.product_name.clone();
        form.user_email = query.user_email.clone();
        form.user_name = query.user_name.clone();
        form.recommender_name = Some(identity.display_name);

        form.validate()?;
        Ok(form)
    }

    /// Send a prepared recommendation, returning the stored record
    pub async fn submit(&self, prepared: &NewRecommendation) -> Result<Recommendation> {
        let record: Recommendation = self.api.post("/recommendations", prepared).await?;
        debug!(id = %record.id, query_id = %record.query_id, "recommendation created");
        Ok(record)
    }

    pub async fn create(&self, query: &Query, form: NewRecommendation) -> Result<Recommendation> {
        let prepared = self.prepare(query, form)?;
        self.submit(&prepared).await
    }

    pub async fn delete(&self, id: &str) -> Result<WriteAck> {
        self.session.current_identity().ok_or(Error::NotAuthenticated)?;
        self.api
            .delete(&format!("/recommendations/{}", id))
            .await
            .map_err(|e| match e.status() {
                Some(404) => Error::not_found(format!("recommendation {}", id)),
                _ => e,
            })
    }
}

/// Ticket for an add that has been shown but not yet confirmed
#[derive(Debug)]
#[must_use = "a pending add must be confirmed or reverted"]
pub struct PendingAdd {
    placeholder_id: String,
    previous_count: u32,
}

impl PendingAdd {
    pub fn placeholder_id(&self) -> &str {
        &self.placeholder_id
    }
}

/// A query and its recommendations as shown on the details view
///
/// New recommendations appear at the head of the list before the backend
/// confirms them. A failed write restores the list and the count exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct RecommendationThread {
    query: Query,
    recommendations: Vec<Recommendation>,
}

impl RecommendationThread {
    pub fn new(query: Query, recommendations: Vec<Recommendation>) -> Self {
        Self {
            query,
            recommendations,
        }
    }

    pub fn query(&self) -> &Query {
        &self.query
    }

    pub fn recommendations(&self) -> &[Recommendation] {
        &self.recommendations
    }

    /// Show `prepared` immediately and bump the query's count
    pub fn begin_add(&mut self, prepared: &NewRecommendation) -> PendingAdd {
        let pending = PendingAdd {
            placeholder_id: format!("pending-{}", Uuid::new_v4()),
            previous_count: self.query.recommendation_count,
        };
        self.recommendations
            .insert(0, prepared.to_pending(pending.placeholder_id.clone()));
        self.query.recommendation_count += 1;
        pending
    }

    /// Swap the placeholder for the stored record
    pub fn confirm(&mut self, pending: PendingAdd, record: Recommendation) {
        match self
            .recommendations
            .iter_mut()
            .find(|r| r.id == pending.placeholder_id)
        {
            Some(slot) => *slot = record,
            None => self.recommendations.insert(0, record),
        }
    }

    /// Undo a pending add
    pub fn revert(&mut self, pending: PendingAdd) {
        self.recommendations.retain(|r| r.id != pending.placeholder_id);
        self.query.recommendation_count = pending.previous_count;
    }

    /// Optimistically add a recommendation and settle it against the backend
    pub async fn add(
        &mut self,
        service: &RecommendationService,
        form: NewRecommendation,
    ) -> Result<&Recommendation> {
        let prepared = service.prepare(&self.query, form)?;
        let pending = self.begin_add(&prepared);

        match service.submit(&prepared).await {
            Ok(record) => {
                self.confirm(pending, record);
                Ok(&self.recommendations[0])
            }
            Err(e) => {
                warn!(query_id = %self.query.id, "recommendation write failed, reverting");
                self.revert(pending);
                Err(e)
            }
        }
    }
}
