//! Wire types for the catalog service's query protocol.
//!
//! One outbound shape ([`QueryBody`], POSTed as JSON) and one inbound shape
//! ([`QueryResponse`]). Responses that fail to parse into the expected
//! contract become [`ServiceError::MalformedResponse`] — the core never
//! substitutes defaults for fields the service did not send.

use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::filter::Filter;

/// JSON body of one catalog query.
#[derive(Debug, Clone, Serialize)]
pub struct QueryBody {
    pub filters: Filter,
    /// Comma-separated attribute projection.
    pub fields: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub reverse: bool,
    /// Page size; service-bounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<u32>,
    /// 1-based page index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "is_false")]
    pub count: bool,
}

impl QueryBody {
    /// Count-only query: minimal projection, no items requested.
    pub fn count_only(filter: Filter) -> Self {
        QueryBody {
            filters: filter,
            fields: "id".to_string(),
            sort: None,
            reverse: false,
            results: None,
            page: None,
            count: true,
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// One catalog entity as observed at fetch time.
///
/// A snapshot: the live catalog may change between pages, so two fetches of
/// the same `id` may legitimately disagree. Identity, not content, is the
/// dedup key. All fields but `id` are optional because the projection is
/// caller-chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub votecount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub popularity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// Parsed response body of one catalog query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<CatalogItem>,
    #[serde(default)]
    pub more: bool,
    pub count: Option<u64>,
}

impl QueryResponse {
    /// Parse a raw response body, mapping any shape violation to
    /// [`ServiceError::MalformedResponse`].
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        serde_json::from_str(raw)
            .map_err(|e| ServiceError::MalformedResponse(format!("invalid response json: {e}")))
    }
}

/// One fetched page: an ordered slice of the sorted result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// 1-based index of this page within the scan.
    pub index: u32,
    pub items: Vec<CatalogItem>,
    /// Whether the service claims further pages exist.
    pub more: bool,
    pub count: Option<u64>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
