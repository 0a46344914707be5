//! Data models shared across the search, staging, and publishing stages.
//!
//! - [`SearchQuery`]: one validated search request
//! - [`ArticleRecord`]: the three-field record staged locally and streamed out
//! - [`PublishReceipt`] / [`PublishReport`]: acknowledgments from the stream
//!
//! Article records keep the camelCase field names used by the Guardian API so
//! the staging file and the stream payloads match the upstream schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Sort directive sent to the search API as `order-by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderBy {
    #[default]
    Newest,
}

impl OrderBy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderBy::Newest => "newest",
        }
    }
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single search request, built once per loop iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Free-text query as typed by the user.
    pub text: String,
    /// Start date in `YYYY-MM-DD` format.
    pub from_date: String,
    pub order: OrderBy,
}

/// An article as staged in the local store and published to the stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRecord {
    pub web_title: String,
    pub web_publication_date: String,
    pub web_url: String,
}

impl ArticleRecord {
    /// Build a record from one entry of the API's `response.results` array.
    ///
    /// Returns `None` when any of the three fields is missing or not a string.
    pub fn from_result(result: &Value) -> Option<Self> {
        let field = |name: &str| result.get(name)?.as_str().map(str::to_string);
        Some(Self {
            web_title: field("webTitle")?,
            web_publication_date: field("webPublicationDate")?,
            web_url: field("webUrl")?,
        })
    }
}

/// Acknowledgment returned by the stream for one accepted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub sequence_number: String,
    pub shard_id: String,
}

/// Outcome of one publish run over the staged records.
#[derive(Debug, Default)]
pub struct PublishReport {
    /// Number of records a push was attempted for.
    pub attempted: usize,
    pub receipts: Vec<PublishReceipt>,
    /// Records whose push failed, in staged order.
    pub failed: Vec<ArticleRecord>,
}
