//! Query service - product queries on the backend

use std::sync::Arc;

use tracing::debug;

use crate::adapters::ApiClient;
use crate::domain::result::{Error, Result};
use crate::domain::{Identity, NewQuery, Query, QueryUpdate, WriteAck};
use crate::services::SessionManager;

/// Number of queries shown on the home page
pub const RECENT_QUERY_LIMIT: usize = 6;

/// Query reads and writes
///
/// Browsing goes through the public client; anything tied to the current
/// identity goes through the authenticated one.
pub struct QueryService {
    api: Arc<ApiClient>,
    public_api: Arc<ApiClient>,
    session: Arc<SessionManager>,
}

impl QueryService {
    pub fn new(api: Arc<ApiClient>, public_api: Arc<ApiClient>, session: Arc<SessionManager>) -> Self {
        Self {
            api,
            public_api,
            session,
        }
    }

    fn require_identity(&self) -> Result<Identity> {
        self.session.current_identity().ok_or(Error::NotAuthenticated)
    }

    /// Most recent queries for the home page
    pub async fn recent(&self) -> Result<Vec<Query>> {
        let mut queries: Vec<Query> = self.public_api.get("/queries", &[]).await?;
        queries.truncate(RECENT_QUERY_LIMIT);
        Ok(queries)
    }

    /// All queries, optionally filtered by product name
    pub async fn search(&self, term: Option<&str>) -> Result<Vec<Query>> {
        match term.map(str::trim).filter(|t| !t.is_empty()) {
            Some(term) => self.public_api.get("/queries", &[("search", term)]).await,
            None => self.public_api.get("/queries", &[]).await,
        }
    }

    pub async fn get(&self, id: &str) -> Result<Query> {
        self.public_api
            .get(&query_path(id), &[])
            .await
            .map_err(|e| not_found_as(e, id))
    }

    /// Queries owned by the current identity
    pub async fn mine(&self) -> Result<Vec<Query>> {
        let identity = self.require_identity()?;
        let queries: Vec<Query> = self.api.get("/queries", &[]).await?;
        Ok(queries
            .into_iter()
            .filter(|q| q.is_owned_by(&identity.email))
            .collect())
    }

    /// Post a new query owned by the current identity
    pub async fn create(&self, mut query: NewQuery) -> Result<WriteAck> {
        let identity = self.require_identity()?;
        query.validate()?;

        query.user_email = Some(identity.email.clone());
        query.user_name = Some(identity.display_name.clone());
        query.user_photo = identity.photo_url.clone();

        let ack: WriteAck = self.api.post("/queries", &query).await?;
        debug!(id = ?ack.inserted_id, "query created");
        Ok(ack)
    }

    /// Fetch a query for editing, refusing queries owned by someone else
    pub async fn load_for_update(&self, id: &str) -> Result<Query> {
        let identity = self.require_identity()?;
        let query: Query = self
            .api
            .get(&query_path(id), &[])
            .await
            .map_err(|e| not_found_as(e, id))?;

        if !query.is_owned_by(&identity.email) {
            return Err(Error::Forbidden("you can only update your own queries".to_string()));
        }
        Ok(query)
    }

    pub async fn update(&self, id: &str, update: &QueryUpdate) -> Result<WriteAck> {
        self.load_for_update(id).await?;
        if update.query_title.trim().is_empty() || update.product_name.trim().is_empty() {
            return Err(Error::validation("queryTitle and productName are required"));
        }
        self.api
            .put(&query_path(id), update)
            .await
            .map_err(|e| not_found_as(e, id))
    }

    pub async fn delete(&self, id: &str) -> Result<WriteAck> {
        self.require_identity()?;
        self.api
            .delete(&query_path(id))
            .await
            .map_err(|e| not_found_as(e, id))
    }
}

fn query_path(id: &str) -> String {
    format!("/queries/{}", id)
}

fn not_found_as(error: Error, id: &str) -> Error {
    match error.status() {
        Some(404) => Error::not_found(format!("query {}", id)),
        _ => error,
    }
}
