//! Isolated browser sessions and field extraction from the rendered page.

mod challenge;
mod driver;
mod http_backend;
mod jsonld;
mod page;
mod profile;
mod selectors;
mod webdriver;

pub use challenge::detect_block;
pub use driver::{BrowserDriver, BrowserSession};
pub use http_backend::HttpPageBackend;
pub use profile::{
    Fingerprint, InteractionScript, InteractionStep, PresentationProfile, Viewport,
};
pub use selectors::SelectorSet;
pub use webdriver::WebDriverBrowser;

use std::sync::Arc;

use tokio::sync::Semaphore;
use url::Url;

use crate::agent::AgentContactResolver;
use crate::error::StrategyError;
use crate::partial::PartialRecord;
use selectors::CompiledSelectors;

/// Fields and visible text of one rendered page.
#[derive(Debug, Clone, Default)]
pub struct ScrapedPage {
    pub record: PartialRecord,
    pub text: String,
}

/// Scrapes one listing page per call in a fresh, isolated session.
///
/// Sessions are capped by a shared semaphore. Every call gets its own
/// randomized presentation profile and interaction script, so no
/// fingerprint or cookie state crosses requests.
pub struct BrowserScraper {
    driver: Arc<dyn BrowserDriver>,
    sessions: Arc<Semaphore>,
    selectors: CompiledSelectors,
    agent_resolver: Option<Arc<AgentContactResolver>>,
}

impl BrowserScraper {
    /// # Errors
    ///
    /// Returns [`StrategyError::Selectors`] if a selector candidate does not
    /// parse.
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        max_sessions: usize,
        selectors: &SelectorSet,
    ) -> Result<Self, StrategyError> {
        Ok(Self {
            driver,
            sessions: Arc::new(Semaphore::new(max_sessions.max(1))),
            selectors: selectors.compile()?,
            agent_resolver: None,
        })
    }

    /// Look up the agent's phone and email when the page names an agent but
    /// does not show them.
    #[must_use]
    pub fn with_agent_resolver(mut self, resolver: Arc<AgentContactResolver>) -> Self {
        self.agent_resolver = Some(resolver);
        self
    }

    #[must_use]
    pub fn resolves_agent_contacts(&self) -> bool {
        self.agent_resolver.is_some()
    }

    /// Scrape `url`. Any failure yields an all-empty record.
    pub async fn scrape(&self, url: &str) -> PartialRecord {
        match self.try_scrape(url).await {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(url, error = %e, "browser scrape failed");
                PartialRecord::default()
            }
        }
    }

    /// Scrape `url`, reporting why nothing was produced.
    ///
    /// # Errors
    ///
    /// Navigation, session and block failures from the browser backend.
    pub async fn try_scrape(&self, url: &str) -> Result<PartialRecord, StrategyError> {
        self.try_scrape_page(url).await.map(|page| page.record)
    }

    /// Like [`BrowserScraper::try_scrape`], also returning the page's
    /// visible text for text-based extraction.
    ///
    /// # Errors
    ///
    /// Navigation, session and block failures from the browser backend.
    pub async fn try_scrape_page(&self, url: &str) -> Result<ScrapedPage, StrategyError> {
        let page_url = Url::parse(url)
            .map_err(|e| StrategyError::Browser(format!("invalid page URL {url}: {e}")))?;

        let (profile, script) = {
            let mut rng = rand::rng();
            (
                PresentationProfile::randomized(&mut rng),
                InteractionScript::human_like(&mut rng),
            )
        };

        let html = {
            let _permit = self
                .sessions
                .acquire()
                .await
                .map_err(|_| StrategyError::Browser("session pool closed".to_string()))?;
            tracing::debug!(
                url,
                user_agent = %profile.user_agent,
                steps = script.steps.len(),
                "rendering listing page"
            );
            driver::render_page(self.driver.as_ref(), &profile, &script, url).await?
        };

        let (mut record, text) = page::extract_page(&html, &self.selectors, &page_url);
        self.fill_agent_contact(&mut record).await;
        Ok(ScrapedPage { record, text })
    }

    async fn fill_agent_contact(&self, record: &mut PartialRecord) {
        let Some(resolver) = &self.agent_resolver else {
            return;
        };
        let Some(name) = record.listing_agent_name.clone() else {
            return;
        };
        if record.listing_agent_email.is_some() && record.listing_agent_phone.is_some() {
            return;
        }

        let contact = resolver
            .resolve(&name, record.listing_agent_company.as_deref())
            .await;
        if record.listing_agent_phone.is_none() {
            record.listing_agent_phone = contact.phone;
        }
        if record.listing_agent_email.is_none() {
            if let Some(email) = contact.email {
                record.listing_agent_email = Some(email.address);
                record.listing_agent_email_source = Some(email.source);
            }
        }
    }
}
