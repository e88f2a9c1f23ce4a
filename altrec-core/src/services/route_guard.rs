//! Route guard - protected view gating
//!
//! Front ends render views by path. Protected views need a current identity;
//! while the first session restore is still running the guard answers
//! `Loading` instead of redirecting, so a restorable session is never sent
//! to the login page.

use std::fmt;

use super::session::SessionState;

pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";

/// A front-end view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Queries,
    QueryDetails(String),
    Login,
    Register,
    MyQueries,
    AddQuery,
    UpdateQuery(String),
    MyRecommendations,
    RecommendationsForMe,
    NotFound(String),
}

impl Route {
    /// Parse a path, ignoring any query string, fragment and trailing slash
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["queries"] => Route::Queries,
            ["queries", id] => Route::QueryDetails(id.to_string()),
            ["login"] => Route::Login,
            ["register"] => Route::Register,
            ["my-queries"] => Route::MyQueries,
            ["add-query"] => Route::AddQuery,
            ["update-query", id] => Route::UpdateQuery(id.to_string()),
            ["my-recommendations"] => Route::MyRecommendations,
            ["recommendations-for-me"] => Route::RecommendationsForMe,
            _ => Route::NotFound(path.to_string()),
        }
    }

    /// Canonical path of the route
    pub fn path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Queries => "/queries".to_string(),
            Route::QueryDetails(id) => format!("/queries/{}", id),
            Route::Login => LOGIN_PATH.to_string(),
            Route::Register => REGISTER_PATH.to_string(),
            Route::MyQueries => "/my-queries".to_string(),
            Route::AddQuery => "/add-query".to_string(),
            Route::UpdateQuery(id) => format!("/update-query/{}", id),
            Route::MyRecommendations => "/my-recommendations".to_string(),
            Route::RecommendationsForMe => "/recommendations-for-me".to_string(),
            Route::NotFound(path) => path.clone(),
        }
    }

    /// Whether the view requires a current identity
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Route::MyQueries
                | Route::AddQuery
                | Route::UpdateQuery(_)
                | Route::MyRecommendations
                | Route::RecommendationsForMe
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Outcome of evaluating a route against the session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session restore still running; render a neutral loading state
    Loading,
    Allow,
    /// Send the user to `to`, remembering where they came from
    Redirect { to: String, from: String },
}

impl RouteDecision {
    /// Redirect for a write attempted without a current identity
    pub fn for_unauthenticated_write(from: &Route) -> Self {
        RouteDecision::Redirect {
            to: REGISTER_PATH.to_string(),
            from: from.path(),
        }
    }
}

/// Decides whether a view may render
#[derive(Debug, Default, Clone, Copy)]
pub struct RouteGuard;

impl RouteGuard {
    pub fn evaluate(route: &Route, session: &SessionState) -> RouteDecision {
        if !route.is_protected() {
            return RouteDecision::Allow;
        }
        if session.initializing {
            return RouteDecision::Loading;
        }
        if session.identity.is_some() {
            RouteDecision::Allow
        } else {
            RouteDecision::Redirect {
                to: LOGIN_PATH.to_string(),
                from: route.path(),
            }
        }
    }
}
