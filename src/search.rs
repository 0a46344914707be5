//! Guardian content API search.
//!
//! [`SearchClient::search`] issues exactly one GET per query and never
//! retries. Every transport failure, timeout or otherwise, is reported and
//! mapped to [`SearchOutcome::NoResponse`] so the interactive loop can carry on.
//! [`handle_response`] turns the outcome into the raw `response.results` list.

use crate::config::AppConfig;
use crate::models::SearchQuery;
use crate::utils::truncate_for_log;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Result of one search request.
#[derive(Debug)]
pub enum SearchOutcome {
    /// The server answered; the body has been read in full.
    Completed { status: StatusCode, body: String },
    /// The request timed out or failed before a response arrived.
    NoResponse,
}

#[derive(Debug, Clone)]
pub struct SearchClient {
    client: Client,
    base_url: String,
    api_key: String,
    page_size: u32,
}

impl SearchClient {
    /// Build a client from the resolved configuration.
    pub fn new(config: &AppConfig) -> Result<Self, Box<dyn Error>> {
        Self::with_timeout(
            &config.search_url,
            &config.api_key,
            config.page_size,
            config.request_timeout,
        )
    }

    pub fn with_timeout(
        base_url: &str,
        api_key: &str,
        page_size: u32,
        timeout: Duration,
    ) -> Result<Self, Box<dyn Error>> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            page_size,
        })
    }

    /// Run one search. Never fails; transport problems become `NoResponse`.
    #[instrument(level = "info", skip_all, fields(q = %query.text, from_date = %query.from_date))]
    pub async fn search(&self, query: &SearchQuery) -> SearchOutcome {
        let page_size = self.page_size.to_string();
        let params = [
            ("api-key", self.api_key.as_str()),
            ("q", query.text.as_str()),
            ("from-date", query.from_date.as_str()),
            ("order-by", query.order.as_str()),
            ("show-fields", "all"),
            ("page-size", page_size.as_str()),
        ];

        let response = match self.client.get(&self.base_url).query(&params).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!(error = %e, "Search request timed out");
                println!("The request timed out. Please try again later.");
                return SearchOutcome::NoResponse;
            }
            Err(e) => {
                error!(error = %e, "Search request failed");
                println!("The request could not be completed: {e}");
                return SearchOutcome::NoResponse;
            }
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => {
                info!(%status, bytes = body.len(), "Search response received");
                SearchOutcome::Completed { status, body }
            }
            Err(e) => {
                if e.is_timeout() {
                    println!("The request timed out. Please try again later.");
                }
                error!(%status, error = %e, "Failed reading search response body");
                SearchOutcome::NoResponse
            }
        }
    }
}

/// Extract `response.results` from a successful search.
///
/// Non-200 statuses and missing responses yield an empty list. A 200 body
/// that is not JSON, or that lacks the results array, also yields an empty
/// list.
pub fn handle_response(outcome: SearchOutcome) -> Vec<Value> {
    match outcome {
        SearchOutcome::Completed { status, body } if status == StatusCode::OK => {
            let data: Value = match serde_json::from_str(&body) {
                Ok(data) => data,
                Err(e) => {
                    warn!(
                        error = %e,
                        body_preview = %truncate_for_log(&body, 300),
                        "Search response was not valid JSON"
                    );
                    return Vec::new();
                }
            };
            let results = data
                .get("response")
                .and_then(|r| r.get("results"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            debug!(count = results.len(), "Extracted search results");
            results
        }
        SearchOutcome::Completed { status, body } => {
            warn!(%status, body_preview = %truncate_for_log(&body, 300), "Search returned non-success status");
            println!("Failed to fetch data: {}", status.as_u16());
            Vec::new()
        }
        SearchOutcome::NoResponse => {
            println!("Failed to fetch data: no response");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderBy;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn query(text: &str, from_date: &str) -> SearchQuery {
        SearchQuery {
            text: text.to_string(),
            from_date: from_date.to_string(),
            order: OrderBy::Newest,
        }
    }

    fn completed(status: u16, body: Value) -> SearchOutcome {
        SearchOutcome::Completed {
            status: StatusCode::from_u16(status).unwrap(),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_handle_response_returns_results_unmodified() {
        let results = json!([
            {
                "webPublicationDate": "2024-01-01",
                "webTitle": "Test Title",
                "webUrl": "http://test.url",
            },
            { "webTitle": "Second", "sectionId": "world" }
        ]);
        let outcome = completed(200, json!({ "response": { "status": "ok", "results": results } }));

        let handled = handle_response(outcome);
        assert_eq!(handled.len(), 2);
        assert_eq!(Value::Array(handled), results);
    }

    #[test]
    fn test_handle_response_missing_results_is_empty() {
        assert!(handle_response(completed(200, json!({ "response": {} }))).is_empty());
        assert!(handle_response(completed(200, json!({}))).is_empty());
    }

    #[test]
    fn test_handle_response_non_200_is_empty() {
        let body = json!({ "response": { "results": [{ "webTitle": "ignored" }] } });
        assert!(handle_response(completed(404, body.clone())).is_empty());
        assert!(handle_response(completed(500, body)).is_empty());
    }

    #[test]
    fn test_handle_response_no_response_is_empty() {
        assert!(handle_response(SearchOutcome::NoResponse).is_empty());
    }

    #[test]
    fn test_handle_response_invalid_json_is_empty() {
        let outcome = SearchOutcome::Completed {
            status: StatusCode::OK,
            body: "<html>oops</html>".to_string(),
        };
        assert!(handle_response(outcome).is_empty());
    }

    #[tokio::test]
    async fn test_search_sends_expected_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("api-key", "test-key"))
            .and(query_param("q", "test query"))
            .and(query_param("from-date", "2024-01-01"))
            .and(query_param("order-by", "newest"))
            .and(query_param("show-fields", "all"))
            .and(query_param("page-size", "10"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "response": { "results": [] } })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = SearchClient::with_timeout(
            &format!("{}/search", server.uri()),
            "test-key",
            10,
            Duration::from_secs(20),
        )
        .unwrap();

        match client.search(&query("test query", "2024-01-01")).await {
            SearchOutcome::Completed { status, .. } => assert_eq!(status, StatusCode::OK),
            SearchOutcome::NoResponse => panic!("expected a response"),
        }
    }

    #[tokio::test]
    async fn test_search_timeout_is_no_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = SearchClient::with_timeout(
            &format!("{}/search", server.uri()),
            "test-key",
            10,
            Duration::from_millis(50),
        )
        .unwrap();

        assert!(matches!(
            client.search(&query("slow", "2024-01-01")).await,
            SearchOutcome::NoResponse
        ));
    }

    #[tokio::test]
    async fn test_search_connection_failure_is_no_response() {
        // Nothing listens on the discard port.
        let client = SearchClient::with_timeout(
            "http://127.0.0.1:9/search",
            "test-key",
            10,
            Duration::from_secs(2),
        )
        .unwrap();

        assert!(matches!(
            client.search(&query("offline", "2024-01-01")).await,
            SearchOutcome::NoResponse
        ));
    }
}
