//! Property-data extraction pipeline.
//!
//! [`Extractor`] turns a listing URL or free-text address into a
//! [`homescout_core::PropertyRecord`] by running an ordered strategy chain
//! (search redirect, browser scrape, language-model extraction, URL
//! heuristics), merging results first-non-empty-wins, normalizing numerics
//! and filling the listing agent's contact details.

pub mod agent;
pub mod browser;
pub mod error;
pub mod input;
pub mod llm;
pub mod normalize;
pub mod orchestrator;
pub mod partial;
pub mod patterns;
pub mod pool;
pub mod search;
pub mod strategy;
pub mod url_parser;

pub use agent::{AgentContact, AgentContactResolver, AgentEmail};
pub use browser::{BrowserScraper, SelectorSet};
pub use error::{ExtractError, StrategyError};
pub use input::ListingInput;
pub use llm::{LanguageModel, LlmExtractor, OpenAiClient};
pub use normalize::normalize;
pub use orchestrator::{
    AttemptOutcome, ExtractionAttempt, ExtractionReport, Extractor, ExtractorConfig,
};
pub use partial::{PartialRecord, RawValue, RecordLimits};
pub use pool::ExtractionPool;
pub use search::{RedirectResult, SearchHit, SearchProvider, SearchRedirector, SerpApiClient};
pub use strategy::{Strategy, StrategyContext, StrategyKind, StrategyOutput};
pub use url_parser::{parse_listing_url, parse_listing_url_str, split_address, UrlAddress};
