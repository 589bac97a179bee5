//! arXiv query API client.
//!
//! Issues one bounded, timed GET per category set against the Atom listing
//! endpoint and hands the payload to the feed decoder. Categories are
//! combined into a single disjunctive query term; results come back sorted by
//! submission date, newest first.
//!
//! API details:
//! - Endpoint: `https://export.arxiv.org/api/query`
//! - Query syntax: `cat:cs.AI OR cat:cs.LG`
//! - No rate-limit backoff beyond the per-request timeouts

use crate::error::NetworkError;
use crate::feed;
use crate::paper::Paper;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Default listing API endpoint
pub const DEFAULT_API_URL: &str = "https://export.arxiv.org/api/query";

/// User agent string for requests
const USER_AGENT: &str = "rustarxiv/1.0";

/// Idle timeout between response reads
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Overall time budget for one fetch, connect to last byte
const RESOURCE_TIMEOUT: Duration = Duration::from_secs(20);

/// Source of paper batches, one call per category set.
///
/// The aggregator depends on this seam rather than on the concrete client, so
/// alternative listing backends (and tests) can be plugged in.
#[async_trait]
pub trait PaperSource: Send + Sync {
    async fn fetch(
        &self,
        categories: &[String],
        max_results: usize,
    ) -> Result<Vec<Paper>, NetworkError>;
}

/// HTTP client for the arXiv listing API.
pub struct ArxivClient {
    client: reqwest::Client,
    base_url: String,
}

impl ArxivClient {
    /// Create a client against the default endpoint.
    pub fn new() -> Result<Self, NetworkError> {
        Self::with_base_url(DEFAULT_API_URL)
    }

    /// Create a client against a custom endpoint (mirrors, tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .read_timeout(REQUEST_TIMEOUT)
            .timeout(RESOURCE_TIMEOUT)
            .build()
            .map_err(NetworkError::Transport)?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Fetch the newest papers for a category set.
    ///
    /// An empty category set returns an empty batch without touching the
    /// network. Results keep the feed's order; the caller sorts globally.
    pub async fn fetch(
        &self,
        categories: &[String],
        max_results: usize,
    ) -> Result<Vec<Paper>, NetworkError> {
        if categories.is_empty() {
            return Ok(Vec::new());
        }

        let search_query = build_search_query(categories);
        debug!(query = %search_query, max_results, "Querying listing feed");

        let max_results = max_results.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", search_query.as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
                ("max_results", max_results.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::BadStatus(status.as_u16()));
        }

        let body = response.bytes().await?;

        // Early sanity check before attempting a full parse.
        if !feed::starts_with_marker(&body) {
            return Err(NetworkError::MalformedPayload);
        }

        let entries = feed::parse_feed(&body)?;
        let total = entries.len();
        let papers: Vec<Paper> = entries.into_iter().filter_map(Paper::from_raw).collect();

        info!(
            entries = total,
            papers = papers.len(),
            "Fetched category batch"
        );

        Ok(papers)
    }
}

/// Combine categories into a single disjunctive query term.
fn build_search_query(categories: &[String]) -> String {
    categories
        .iter()
        .map(|cat| format!("cat:{}", cat.trim()))
        .collect::<Vec<_>>()
        .join(" OR ")
}

#[async_trait]
impl PaperSource for ArxivClient {
    async fn fetch(
        &self,
        categories: &[String],
        max_results: usize,
    ) -> Result<Vec<Paper>, NetworkError> {
        ArxivClient::fetch(self, categories, max_results).await
    }
}
