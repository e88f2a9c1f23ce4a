//! Recommendation domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An alternative product suggested in response to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "_id")]
    pub id: String,
    pub query_id: String,
    #[serde(default)]
    pub query_title: Option<String>,
    /// Product the query is about
    #[serde(default)]
    pub product_name: Option<String>,
    /// Email of the query owner
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub recommender_email: Option<String>,
    #[serde(default)]
    pub recommender_name: Option<String>,
    pub recommended_title: String,
    pub recommended_product_name: String,
    #[serde(default)]
    pub recommended_product_image: Option<String>,
    #[serde(default)]
    pub recommendation_reason: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// Form data for a new recommendation
///
/// Query context and `recommender_name` are filled in by the
/// recommendation service from the parent query and current identity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecommendation {
    pub query_id: String,
    pub query_title: String,
    pub product_name: String,
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub recommender_name: Option<String>,
    pub recommended_title: String,
    pub recommended_product_name: String,
    pub recommended_product_image: String,
    pub recommendation_reason: String,
}

impl NewRecommendation {
    pub fn validate(&self) -> crate::Result<()> {
        for (field, value) in [
            ("queryId", &self.query_id),
            ("recommendedTitle", &self.recommended_title),
            ("recommendedProductName", &self.recommended_product_name),
            ("recommendationReason", &self.recommendation_reason),
        ] {
            if value.trim().is_empty() {
                return Err(crate::Error::validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }

    /// Local stand-in shown while the write is in flight
    pub fn to_pending(&self, placeholder_id: impl Into<String>) -> Recommendation {
        Recommendation {
            id: placeholder_id.into(),
            query_id: self.query_id.clone(),
            query_title: Some(self.query_title.clone()),
            product_name: Some(self.product_name.clone()),
            user_email: self.user_email.clone(),
            user_name: self.user_name.clone(),
            recommender_email: None,
            recommender_name: self.recommender_name.clone(),
            recommended_title: self.recommended_title.clone(),
            recommended_product_name: self.recommended_product_name.clone(),
            recommended_product_image: Some(self.recommended_product_image.clone()),
            recommendation_reason: Some(self.recommendation_reason.clone()),
            created_at: Some(Utc::now()),
        }
    }
}
