//! Query domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A request for alternatives to a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    #[serde(rename = "_id")]
    pub id: String,
    pub query_title: String,
    pub product_name: String,
    #[serde(default)]
    pub product_brand: Option<String>,
    #[serde(default)]
    pub product_image: Option<String>,
    /// Why the asker wants to move away from the product
    #[serde(default)]
    pub boycott_reason: Option<String>,
    /// Owner; the only user allowed to edit or delete
    #[serde(default)]
    pub user_email: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_photo: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recommendation_count: u32,
}

impl Query {
    /// Whether `email` owns this query
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.user_email.as_deref() == Some(email)
    }

    /// Boycott reason shortened for list views
    pub fn reason_preview(&self, max_chars: usize) -> String {
        let reason = self.boycott_reason.as_deref().unwrap_or("");
        if reason.chars().count() > max_chars {
            let cut: String = reason.chars().take(max_chars).collect();
            format!("{}...", cut)
        } else {
            reason.to_string()
        }
    }
}

/// Form data for a new query
///
/// `user_email`, `user_name` and `user_photo` are stamped from the current
/// identity by the query service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewQuery {
    pub query_title: String,
    pub product_name: String,
    pub product_brand: String,
    pub product_image: String,
    pub boycott_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_photo: Option<String>,
}

impl NewQuery {
    /// Reject empty required fields before anything reaches the backend
    pub fn validate(&self) -> crate::Result<()> {
        for (field, value) in [
            ("queryTitle", &self.query_title),
            ("productName", &self.product_name),
            ("productBrand", &self.product_brand),
            ("boycottReason", &self.boycott_reason),
        ] {
            if value.trim().is_empty() {
                return Err(crate::Error::validation(format!("{} is required", field)));
            }
        }
        Ok(())
    }
}

/// Editable fields of an existing query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryUpdate {
    pub query_title: String,
    pub product_name: String,
    pub product_brand: String,
    pub product_image: String,
    pub boycott_reason: String,
}

impl From<&Query> for QueryUpdate {
    fn from(query: &Query) -> Self {
        Self {
            query_title: query.query_title.clone(),
            product_name: query.product_name.clone(),
            product_brand: query.product_brand.clone().unwrap_or_default(),
            product_image: query.product_image.clone().unwrap_or_default(),
            boycott_reason: query.boycott_reason.clone().unwrap_or_default(),
        }
    }
}

/// Acknowledgement returned by backend writes
///
/// Every field is optional; the backend only guarantees a 2xx status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteAck {
    #[serde(default)]
    pub acknowledged: Option<bool>,
    #[serde(default)]
    pub inserted_id: Option<String>,
    #[serde(default)]
    pub modified_count: Option<u64>,
    #[serde(default)]
    pub deleted_count: Option<u64>,
}
