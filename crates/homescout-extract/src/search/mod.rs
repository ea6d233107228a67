//! Search-results API access and canonical-listing redirection.

mod redirector;
mod serpapi;

pub use redirector::{RedirectResult, SearchRedirector};
pub use serpapi::SerpApiClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StrategyError;

/// One organic search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

/// A search-results API: query plus result count in, ordered hits out.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str, count: u32) -> Result<Vec<SearchHit>, StrategyError>;
}
