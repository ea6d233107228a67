//! The strategy chain: interchangeable extraction steps run in priority
//! order by the orchestrator.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::browser::BrowserScraper;
use crate::error::StrategyError;
use crate::input::ListingInput;
use crate::llm::LlmExtractor;
use crate::partial::PartialRecord;
use crate::search::SearchRedirector;
use crate::url_parser::{parse_listing_url, parse_listing_url_str, split_address, UrlAddress};

/// Characters of page text offered to the language model after any snippet.
const PAGE_EXCERPT_CHARS: usize = 6_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    SearchRedirect,
    Browser,
    LanguageModel,
    UrlHeuristic,
    AgentDiscovery,
    AgentContact,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SearchRedirect => "search_redirect",
            Self::Browser => "browser",
            Self::LanguageModel => "language_model",
            Self::UrlHeuristic => "url_heuristic",
            Self::AgentDiscovery => "agent_discovery",
            Self::AgentContact => "agent_contact",
        };
        f.write_str(name)
    }
}

/// What earlier strategies established for the current request.
#[derive(Debug, Clone)]
pub struct StrategyContext {
    pub input: ListingInput,
    pub canonical_url: Option<String>,
    pub snippet: Option<String>,
    pub page_text: Option<String>,
    /// Fields merged so far, in precedence order.
    pub record: PartialRecord,
}

impl StrategyContext {
    #[must_use]
    pub fn new(input: ListingInput) -> Self {
        Self {
            input,
            canonical_url: None,
            snippet: None,
            page_text: None,
            record: PartialRecord::default(),
        }
    }

    /// The URL to scrape: the canonical listing if one was found, else the
    /// caller's URL.
    #[must_use]
    pub fn target_url(&self) -> Option<&str> {
        self.canonical_url
            .as_deref()
            .or_else(|| self.input.as_url().map(url::Url::as_str))
    }

    /// Merge a strategy's output without overriding anything already known.
    /// Returns the names of what was newly filled.
    pub fn absorb(&mut self, output: StrategyOutput) -> Vec<&'static str> {
        let mut filled = Vec::new();
        if self.canonical_url.is_none() && output.canonical_url.is_some() {
            self.canonical_url = output.canonical_url;
            filled.push("canonicalUrl");
        }
        if self.snippet.is_none() && output.snippet.is_some() {
            self.snippet = output.snippet;
            filled.push("snippet");
        }
        if self.page_text.is_none() {
            self.page_text = output.page_text.filter(|t| !t.trim().is_empty());
        }
        filled.extend(self.record.fill_missing_from(output.record));
        filled
    }
}

/// What one strategy produced.
#[derive(Debug, Clone, Default)]
pub struct StrategyOutput {
    pub record: PartialRecord,
    pub canonical_url: Option<String>,
    pub snippet: Option<String>,
    pub page_text: Option<String>,
}

impl From<PartialRecord> for StrategyOutput {
    fn from(record: PartialRecord) -> Self {
        Self {
            record,
            ..Self::default()
        }
    }
}

/// One step of the chain.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Time allowed for one attempt.
    fn budget(&self) -> Duration;

    /// Why this strategy has nothing to do for `ctx`, if so.
    fn skip_reason(&self, _ctx: &StrategyContext) -> Option<String> {
        None
    }

    /// Fallbacks still run once the overall deadline has passed.
    fn is_fallback(&self) -> bool {
        false
    }

    /// Whether an agent name this strategy reports has already been through
    /// the contact lookup.
    fn resolves_agent_contacts(&self) -> bool {
        false
    }

    async fn attempt(&self, ctx: &StrategyContext) -> Result<StrategyOutput, StrategyError>;
}

/// Canonical listing URL and snippet text via the search API. Contributes
/// no record fields of its own.
pub struct SearchRedirectStrategy {
    redirector: Arc<SearchRedirector>,
    budget: Duration,
}

impl SearchRedirectStrategy {
    pub fn new(redirector: Arc<SearchRedirector>, budget: Duration) -> Self {
        Self { redirector, budget }
    }
}

#[async_trait]
impl Strategy for SearchRedirectStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::SearchRedirect
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    async fn attempt(&self, ctx: &StrategyContext) -> Result<StrategyOutput, StrategyError> {
        let found = self.redirector.redirect(&ctx.input).await?;
        Ok(StrategyOutput {
            canonical_url: found.canonical_url,
            snippet: found.snippet,
            ..StrategyOutput::default()
        })
    }
}

pub struct BrowserStrategy {
    scraper: Arc<BrowserScraper>,
    budget: Duration,
}

impl BrowserStrategy {
    pub fn new(scraper: Arc<BrowserScraper>, budget: Duration) -> Self {
        Self { scraper, budget }
    }
}

#[async_trait]
impl Strategy for BrowserStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Browser
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    fn skip_reason(&self, ctx: &StrategyContext) -> Option<String> {
        ctx.target_url()
            .is_none()
            .then(|| "no listing URL to scrape".to_string())
    }

    fn resolves_agent_contacts(&self) -> bool {
        self.scraper.resolves_agent_contacts()
    }

    async fn attempt(&self, ctx: &StrategyContext) -> Result<StrategyOutput, StrategyError> {
        let Some(url) = ctx.target_url() else {
            return Ok(StrategyOutput::default());
        };
        let page = self.scraper.try_scrape_page(url).await?;
        Ok(StrategyOutput {
            record: page.record,
            page_text: Some(page.text),
            ..StrategyOutput::default()
        })
    }
}

/// Language-model extraction over snippet text, page text, or failing
/// both, the listing URL itself.
pub struct LlmStrategy {
    extractor: Arc<LlmExtractor>,
    budget: Duration,
}

impl LlmStrategy {
    pub fn new(extractor: Arc<LlmExtractor>, budget: Duration) -> Self {
        Self { extractor, budget }
    }
}

/// Text handed to the model: snippet first, then a page excerpt, else the
/// URL's structure.
fn model_input(ctx: &StrategyContext) -> Option<String> {
    let mut parts = Vec::new();
    if let Some(snippet) = &ctx.snippet {
        parts.push(format!("Search snippet: {snippet}"));
    }
    if let Some(text) = &ctx.page_text {
        let excerpt: String = text.chars().take(PAGE_EXCERPT_CHARS).collect();
        parts.push(format!("Page text: {excerpt}"));
    }
    if parts.is_empty() {
        let url = ctx.target_url()?;
        parts.push(format!("Listing URL: {url}"));
    }
    Some(parts.join("\n\n"))
}

#[async_trait]
impl Strategy for LlmStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::LanguageModel
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    fn skip_reason(&self, ctx: &StrategyContext) -> Option<String> {
        if ctx.record.has_core_fields() {
            return Some("core fields already filled".to_string());
        }
        model_input(ctx)
            .is_none()
            .then(|| "no text to extract from".to_string())
    }

    async fn attempt(&self, ctx: &StrategyContext) -> Result<StrategyOutput, StrategyError> {
        let Some(text) = model_input(ctx) else {
            return Ok(StrategyOutput::default());
        };
        let hints = (!ctx.record.is_empty()).then_some(&ctx.record);
        let record = self.extractor.extract_from_text(&text, hints).await?;
        Ok(record.into())
    }
}

/// Address parts from the URL path, or from the caller's address text.
/// Always available; runs even after the overall deadline.
pub struct UrlHeuristicStrategy {
    budget: Duration,
}

impl UrlHeuristicStrategy {
    #[must_use]
    pub fn new() -> Self {
        Self {
            budget: Duration::from_secs(1),
        }
    }
}

impl Default for UrlHeuristicStrategy {
    fn default() -> Self {
        Self::new()
    }
}

fn address_record(parts: UrlAddress) -> PartialRecord {
    PartialRecord {
        address: Some(parts.address).filter(|a| !a.trim().is_empty()),
        city: parts.city,
        state: parts.state,
        zip: parts.zip,
        ..PartialRecord::default()
    }
}

#[async_trait]
impl Strategy for UrlHeuristicStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::UrlHeuristic
    }

    fn budget(&self) -> Duration {
        self.budget
    }

    fn is_fallback(&self) -> bool {
        true
    }

    async fn attempt(&self, ctx: &StrategyContext) -> Result<StrategyOutput, StrategyError> {
        let parsed = match &ctx.input {
            ListingInput::Address(address) => Some(split_address(address)),
            ListingInput::Url(url) => parse_listing_url(url).or_else(|| {
                ctx.canonical_url
                    .as_deref()
                    .and_then(parse_listing_url_str)
            }),
        };
        Ok(parsed.map(address_record).unwrap_or_default().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partial::RawValue;

    fn url_ctx(url: &str) -> StrategyContext {
        StrategyContext::new(ListingInput::parse(url).unwrap())
    }

    #[tokio::test]
    async fn heuristic_parses_listing_url() {
        let ctx = url_ctx(
            "https://example.com/homedetails/123-Main-St-San-Francisco-CA-94117/999_zpid/",
        );
        let output = UrlHeuristicStrategy::new().attempt(&ctx).await.unwrap();
        assert_eq!(
            output.record.address.as_deref(),
            Some("123 Main St San Francisco CA 94117")
        );
        assert_eq!(output.record.city.as_deref(), Some("San Francisco"));
    }

    #[tokio::test]
    async fn heuristic_falls_back_to_canonical_url() {
        let mut ctx = url_ctx("https://brokerage.test/listing?id=42");
        ctx.canonical_url = Some(
            "https://www.zillow.com/homedetails/9-Elm-Ave-Austin-TX-78701/1_zpid/".to_string(),
        );
        let output = UrlHeuristicStrategy::new().attempt(&ctx).await.unwrap();
        assert_eq!(output.record.zip.as_deref(), Some("78701"));
    }

    #[tokio::test]
    async fn heuristic_splits_address_input() {
        let ctx = StrategyContext::new(
            ListingInput::parse("55 Ocean Ave, Santa Cruz, CA 95060").unwrap(),
        );
        let output = UrlHeuristicStrategy::new().attempt(&ctx).await.unwrap();
        assert_eq!(output.record.address.as_deref(), Some("55 Ocean Ave, Santa Cruz, CA 95060"));
        assert_eq!(output.record.state.as_deref(), Some("CA"));
    }

    #[test]
    fn absorb_keeps_existing_values() {
        let mut ctx = url_ctx("https://listings.test/home/1");
        ctx.record.price = Some(RawValue::text("$1"));
        let filled = ctx.absorb(StrategyOutput {
            record: PartialRecord {
                price: Some(RawValue::text("$2")),
                bedrooms: Some(RawValue::Number(3.0)),
                ..PartialRecord::default()
            },
            canonical_url: Some("https://www.zillow.com/homedetails/x/1_zpid/".into()),
            ..StrategyOutput::default()
        });
        assert_eq!(filled, vec!["canonicalUrl", "bedrooms"]);
        assert_eq!(ctx.record.price, Some(RawValue::text("$1")));
        assert_eq!(
            ctx.target_url(),
            Some("https://www.zillow.com/homedetails/x/1_zpid/")
        );
    }

    #[test]
    fn model_input_prefers_snippet_then_page_then_url() {
        let mut ctx = url_ctx("https://listings.test/home/1");
        assert_eq!(model_input(&ctx).as_deref(), Some("Listing URL: https://listings.test/home/1"));
        ctx.page_text = Some("3 bd".into());
        ctx.snippet = Some("2 ba".into());
        assert_eq!(
            model_input(&ctx).as_deref(),
            Some("Search snippet: 2 ba\n\nPage text: 3 bd")
        );

        let address_ctx = StrategyContext::new(ListingInput::parse("1 Main St, Reno, NV 89501").unwrap());
        assert!(model_input(&address_ctx).is_none());
    }
}
