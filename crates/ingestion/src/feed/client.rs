//! Feed retrieval
//!
//! `FeedClient` is the seam between a run and the outside world. The arXiv
//! implementation issues one bounded GET per call; retries are left to the
//! next scheduled run.

use crate::errors::FetchError;
use async_trait::async_trait;
use paperpulse_common::config::FeedConfig;
use tracing::{debug, warn};

/// Source of raw feed documents
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Fetch up to `max_results` entries matching `query`, newest first
    async fn fetch(&self, query: &str, max_results: u32) -> Result<String, FetchError>;
}

/// Build the boolean query sent to the feed.
///
/// Categories are OR-ed and parenthesized, then AND-ed with the free-text
/// terms, so the category filter always applies to every term.
pub fn search_query(categories: &[String], query: &str) -> String {
    let categories = categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| format!("cat:{}", c))
        .collect::<Vec<_>>()
        .join(" OR ");
    let query = query.trim();

    match (categories.is_empty(), query.is_empty()) {
        (true, true) => String::new(),
        (true, false) => format!("({})", query),
        (false, true) => format!("({})", categories),
        (false, false) => format!("({}) AND ({})", categories, query),
    }
}

/// arXiv Atom query API client
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
    categories: Vec<String>,
}

impl ArxivClient {
    pub fn new(config: &FeedConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            categories: config.categories.clone(),
        })
    }
}

#[async_trait]
impl FeedClient for ArxivClient {
    async fn fetch(&self, query: &str, max_results: u32) -> Result<String, FetchError> {
        let search_query = search_query(&self.categories, query);
        debug!(%search_query, max_results, "Fetching feed");

        let max_results = max_results.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Feed returned an error status");
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.text().await?)
    }
}

/// Serves a fixed document, e.g. a feed saved to disk
pub struct StaticFeed {
    body: Option<String>,
}

impl StaticFeed {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }

    /// A feed that is always down
    pub fn unavailable() -> Self {
        Self { body: None }
    }
}

#[async_trait]
impl FeedClient for StaticFeed {
    async fn fetch(&self, _query: &str, _max_results: u32) -> Result<String, FetchError> {
        self.body
            .clone()
            .ok_or_else(|| FetchError::Unavailable("static feed has no document".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, http::StatusCode, routing::get, Router};
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn categories(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_search_query_groups_categories() {
        assert_eq!(
            search_query(&categories(&["cs.HC", "cs.AI"]), "HCI OR usability"),
            "(cat:cs.HC OR cat:cs.AI) AND (HCI OR usability)"
        );
    }

    #[test]
    fn test_search_query_partial_inputs() {
        assert_eq!(search_query(&categories(&["cs.HC"]), "  "), "(cat:cs.HC)");
        assert_eq!(search_query(&[], "HCI"), "(HCI)");
        assert_eq!(search_query(&[], ""), "");
    }

    #[tokio::test]
    async fn test_static_feed() {
        let feed = StaticFeed::new("<feed/>");
        assert_eq!(feed.fetch("q", 1).await.unwrap(), "<feed/>");

        let down = StaticFeed::unavailable();
        assert!(matches!(
            down.fetch("q", 1).await,
            Err(FetchError::Unavailable(_))
        ));
    }

    #[test]
    fn test_arxiv_client_builds_from_default_config() {
        assert!(ArxivClient::new(&FeedConfig::default()).is_ok());
    }

    async fn spawn_feed_server() -> SocketAddr {
        let app = Router::new()
            .route(
                "/query",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    serde_json::to_string(&params).unwrap_or_default()
                }),
            )
            .route(
                "/down",
                get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "maintenance") }),
            )
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "<feed/>"
                }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    fn client_for(addr: SocketAddr, path: &str) -> ArxivClient {
        let config = FeedConfig {
            base_url: format!("http://{}{}", addr, path),
            categories: categories(&["cs.HC"]),
            timeout_secs: 1,
            ..FeedConfig::default()
        };
        ArxivClient::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_sends_query_parameters() {
        let addr = spawn_feed_server().await;
        let client = client_for(addr, "/query");

        let body = assert_ok!(client.fetch("gaze tracking", 25).await);
        let params: HashMap<String, String> = serde_json::from_str(&body).unwrap();

        assert_eq!(params["search_query"], "(cat:cs.HC) AND (gaze tracking)");
        assert_eq!(params["start"], "0");
        assert_eq!(params["max_results"], "25");
        assert_eq!(params["sortBy"], "submittedDate");
        assert_eq!(params["sortOrder"], "descending");
        assert_eq!(params.len(), 5);
    }

    #[tokio::test]
    async fn test_fetch_error_status_is_reported() {
        let addr = spawn_feed_server().await;
        let client = client_for(addr, "/down");

        match assert_err!(client.fetch("", 10).await) {
            FetchError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let addr = spawn_feed_server().await;
        let client = client_for(addr, "/slow");

        let err = assert_err!(client.fetch("", 10).await);
        match err {
            FetchError::Request(e) => assert!(e.is_timeout()),
            other => panic!("unexpected error: {other}"),
        }
    }
}
