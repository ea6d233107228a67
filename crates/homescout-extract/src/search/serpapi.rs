//! HTTP client for the `SerpApi` Google search endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::{SearchHit, SearchProvider};
use crate::error::StrategyError;

const DEFAULT_BASE_URL: &str = "https://serpapi.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<SearchHit>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for `SerpApi`.
///
/// Use [`SerpApiClient::new`] for production or
/// [`SerpApiClient::with_base_url`] to point at a mock server in tests.
pub struct SerpApiClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl SerpApiClient {
    /// # Errors
    ///
    /// Returns [`StrategyError::Http`] if the `reqwest::Client` cannot be
    /// constructed.
    pub fn new(api_key: &str, timeout_secs: u64) -> Result<Self, StrategyError> {
        Self::with_base_url(api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client against a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::Http`] if the `reqwest::Client` cannot be
    /// constructed, or [`StrategyError::NotConfigured`] if `base_url` is not
    /// a valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, StrategyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("homescout/0.1 (listing-search)")
            .build()?;

        let normalised = format!("{}/search.json", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| {
            tracing::warn!(base_url, error = %e, "invalid search base URL");
            StrategyError::NotConfigured("search base URL")
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    fn build_url(&self, query: &str, count: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("engine", "google")
            .append_pair("q", query)
            .append_pair("num", &count.to_string())
            .append_pair("api_key", &self.api_key);
        url
    }
}

#[async_trait]
impl SearchProvider for SerpApiClient {
    /// # Errors
    ///
    /// - [`StrategyError::Http`] on network failure.
    /// - [`StrategyError::UnexpectedStatus`] on a non-2xx response.
    /// - [`StrategyError::Deserialize`] if the body is not the expected shape.
    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchHit>, StrategyError> {
        let url = self.build_url(query, count);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(StrategyError::UnexpectedStatus {
                status: status.as_u16(),
                url: self.base_url.to_string(),
            });
        }

        let body = response.text().await?;
        let parsed: SearchResponse =
            serde_json::from_str(&body).map_err(|e| StrategyError::Deserialize {
                context: format!("search(q={query})"),
                source: e,
            })?;

        // SerpApi reports "no results" through the error field with a 200.
        if let Some(message) = parsed.error {
            tracing::debug!(query, message, "search returned no organic results");
            return Ok(Vec::new());
        }

        let hits: Vec<SearchHit> = parsed
            .organic_results
            .into_iter()
            .filter(|hit| !hit.link.is_empty())
            .take(count as usize)
            .collect();
        tracing::debug!(query, hits = hits.len(), "search completed");
        Ok(hits)
    }
}
