//! Top-level extraction: strategy chain, merge, agent lookup, normalization.

use std::sync::Arc;
use std::time::Duration;

use homescout_core::{AppConfig, PropertyRecord};
use serde::Serialize;
use tokio::time::Instant;

use crate::agent::{agent_from_hits, AgentContactResolver};
use crate::browser::{BrowserDriver, BrowserScraper, HttpPageBackend, SelectorSet, WebDriverBrowser};
use crate::error::{ExtractError, StrategyError};
use crate::input::ListingInput;
use crate::llm::{LanguageModel, LlmExtractor, OpenAiClient};
use crate::normalize::normalize;
use crate::partial::RecordLimits;
use crate::search::{SearchProvider, SearchRedirector, SerpApiClient};
use crate::strategy::{
    BrowserStrategy, LlmStrategy, SearchRedirectStrategy, Strategy, StrategyContext, StrategyKind,
    UrlHeuristicStrategy,
};

/// Immutable pipeline settings, fixed at construction.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub overall_deadline: Duration,
    pub search_timeout: Duration,
    pub browser_timeout: Duration,
    pub llm_timeout: Duration,
    pub agent_timeout: Duration,
    pub use_search_redirect: bool,
    pub limits: RecordLimits,
}

impl ExtractorConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            overall_deadline: Duration::from_secs(config.overall_deadline_secs),
            search_timeout: Duration::from_secs(config.search_timeout_secs),
            browser_timeout: Duration::from_secs(config.browser_timeout_secs),
            llm_timeout: Duration::from_secs(config.llm_timeout_secs),
            agent_timeout: Duration::from_secs(config.agent_timeout_secs),
            use_search_redirect: config.use_search_redirect,
            limits: RecordLimits {
                max_features: config.max_features,
                max_images: config.max_images,
            },
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            overall_deadline: Duration::from_secs(90),
            search_timeout: Duration::from_secs(15),
            browser_timeout: Duration::from_secs(45),
            llm_timeout: Duration::from_secs(30),
            agent_timeout: Duration::from_secs(15),
            use_search_redirect: true,
            limits: RecordLimits {
                max_features: 30,
                max_images: 25,
            },
        }
    }
}

/// How one step of an extraction ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Filled { fields: Vec<&'static str> },
    Empty,
    Skipped { reason: String },
    TimedOut,
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionAttempt {
    pub strategy: StrategyKind,
    #[serde(flatten)]
    pub outcome: AttemptOutcome,
    pub elapsed_ms: u64,
}

/// The record plus a trace of every step that produced it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionReport {
    pub record: PropertyRecord,
    pub attempts: Vec<ExtractionAttempt>,
}

/// Runs the strategy chain for one listing at a time. Holds no per-request
/// state, so one instance serves concurrent requests.
pub struct Extractor {
    config: ExtractorConfig,
    strategies: Vec<Arc<dyn Strategy>>,
    redirector: Option<Arc<SearchRedirector>>,
    agent_resolver: Option<Arc<AgentContactResolver>>,
}

impl Extractor {
    /// Wire the production collaborators described by `app`.
    ///
    /// Search-backed steps need `search_api_key`; language-model steps need
    /// `llm_api_key`. Without a WebDriver URL pages are fetched over plain
    /// HTTP.
    ///
    /// # Errors
    ///
    /// HTTP client construction failures and unreadable or invalid selector
    /// overrides.
    pub fn from_config(app: &AppConfig) -> Result<Self, StrategyError> {
        let config = ExtractorConfig::from_app_config(app);

        let search: Option<Arc<dyn SearchProvider>> = match &app.search_api_key {
            Some(key) => Some(Arc::new(SerpApiClient::with_base_url(
                key,
                app.search_timeout_secs,
                &app.search_base_url,
            )?)),
            None => None,
        };
        let model: Option<Arc<dyn LanguageModel>> = match &app.llm_api_key {
            Some(key) => Some(Arc::new(OpenAiClient::with_base_url(
                key,
                &app.llm_model,
                app.llm_timeout_secs,
                &app.llm_base_url,
            )?)),
            None => None,
        };

        let redirector = search.as_ref().map(|provider| {
            Arc::new(SearchRedirector::new(
                Arc::clone(provider),
                app.preferred_domain.clone(),
                app.search_result_count,
            ))
        });
        let agent_resolver = (search.is_some() || model.is_some()).then(|| {
            Arc::new(AgentContactResolver::new(
                search.clone(),
                model.clone(),
                app.search_result_count,
                config.agent_timeout,
            ))
        });

        let selectors = match &app.selectors_path {
            Some(path) => SelectorSet::from_yaml_file(path)?,
            None => SelectorSet::default(),
        };
        let driver: Arc<dyn BrowserDriver> = match &app.webdriver_url {
            Some(url) => Arc::new(WebDriverBrowser::new(url.clone(), config.browser_timeout)),
            None => Arc::new(HttpPageBackend::new(config.browser_timeout)),
        };
        let mut scraper = BrowserScraper::new(driver, app.max_browser_sessions, &selectors)?;
        if let Some(resolver) = &agent_resolver {
            scraper = scraper.with_agent_resolver(Arc::clone(resolver));
        }

        let mut strategies: Vec<Arc<dyn Strategy>> = Vec::new();
        if let Some(redirector) = redirector.as_ref().filter(|_| config.use_search_redirect) {
            strategies.push(Arc::new(SearchRedirectStrategy::new(
                Arc::clone(redirector),
                config.search_timeout,
            )));
        }
        strategies.push(Arc::new(BrowserStrategy::new(
            Arc::new(scraper),
            config.browser_timeout,
        )));
        if let Some(model) = model {
            strategies.push(Arc::new(LlmStrategy::new(
                Arc::new(LlmExtractor::new(model)),
                config.llm_timeout,
            )));
        }
        strategies.push(Arc::new(UrlHeuristicStrategy::new()));

        tracing::info!(
            strategies = ?strategies.iter().map(|s| s.kind()).collect::<Vec<_>>(),
            agent_lookup = agent_resolver.is_some(),
            "extractor configured"
        );

        Ok(Self::with_strategies(config, strategies).with_agent_lookup(redirector, agent_resolver))
    }

    /// An extractor running exactly `strategies`, in order.
    #[must_use]
    pub fn with_strategies(config: ExtractorConfig, strategies: Vec<Arc<dyn Strategy>>) -> Self {
        Self {
            config,
            strategies,
            redirector: None,
            agent_resolver: None,
        }
    }

    /// Enable agent discovery through "listed by" search and the email
    /// lookup for a named agent.
    #[must_use]
    pub fn with_agent_lookup(
        mut self,
        redirector: Option<Arc<SearchRedirector>>,
        resolver: Option<Arc<AgentContactResolver>>,
    ) -> Self {
        self.redirector = redirector;
        self.agent_resolver = resolver;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract a record within the configured overall deadline.
    ///
    /// # Errors
    ///
    /// Only [`ExtractError::InvalidInput`]. Upstream failures degrade the
    /// record instead.
    pub async fn extract(&self, raw_input: &str) -> Result<PropertyRecord, ExtractError> {
        self.extract_with_report(raw_input, None)
            .await
            .map(|report| report.record)
    }

    /// Extract with a caller-supplied deadline instead of the configured one.
    ///
    /// # Errors
    ///
    /// Only [`ExtractError::InvalidInput`].
    pub async fn extract_with_deadline(
        &self,
        raw_input: &str,
        deadline: Duration,
    ) -> Result<PropertyRecord, ExtractError> {
        self.extract_with_report(raw_input, Some(deadline))
            .await
            .map(|report| report.record)
    }

    /// Extract and return the per-step trace alongside the record.
    ///
    /// # Errors
    ///
    /// Only [`ExtractError::InvalidInput`].
    pub async fn extract_with_report(
        &self,
        raw_input: &str,
        deadline: Option<Duration>,
    ) -> Result<ExtractionReport, ExtractError> {
        let input = ListingInput::parse(raw_input)?;
        let started = Instant::now();
        let deadline = started + deadline.unwrap_or(self.config.overall_deadline);

        tracing::info!(input = input.display(), "extraction started");

        let mut ctx = StrategyContext::new(input);
        let mut attempts = Vec::new();
        let mut contact_lookup_done = false;

        for strategy in &self.strategies {
            let kind = strategy.kind();
            let step_started = Instant::now();

            if step_started >= deadline && !strategy.is_fallback() {
                attempts.push(skipped(kind, "overall deadline reached"));
                continue;
            }
            if let Some(reason) = strategy.skip_reason(&ctx) {
                tracing::debug!(strategy = %kind, reason, "strategy skipped");
                attempts.push(skipped(kind, &reason));
                continue;
            }

            let budget_end = if strategy.is_fallback() {
                step_started + strategy.budget()
            } else {
                (step_started + strategy.budget()).min(deadline)
            };
            let outcome = match tokio::time::timeout_at(budget_end, strategy.attempt(&ctx)).await {
                Ok(Ok(output)) => {
                    let fields = ctx.absorb(output);
                    if fields.contains(&"listingAgentName") && strategy.resolves_agent_contacts() {
                        contact_lookup_done = true;
                    }
                    if fields.is_empty() {
                        tracing::debug!(strategy = %kind, "strategy found nothing new");
                        AttemptOutcome::Empty
                    } else {
                        tracing::info!(strategy = %kind, fields = ?fields, "strategy filled fields");
                        AttemptOutcome::Filled { fields }
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(strategy = %kind, error = %e, "strategy failed");
                    AttemptOutcome::Failed {
                        error: e.to_string(),
                    }
                }
                Err(_) => {
                    tracing::warn!(
                        strategy = %kind,
                        budget_ms = millis(budget_end - step_started),
                        "strategy timed out"
                    );
                    AttemptOutcome::TimedOut
                }
            };
            attempts.push(ExtractionAttempt {
                strategy: kind,
                outcome,
                elapsed_ms: millis(step_started.elapsed()),
            });
        }

        if let Some(attempt) = self.discover_agent(&mut ctx, deadline).await {
            attempts.push(attempt);
        }
        if !contact_lookup_done {
            if let Some(attempt) = self.fill_agent_email(&mut ctx, deadline).await {
                attempts.push(attempt);
            }
        }

        let property_url = ctx
            .input
            .as_url()
            .map(|u| u.as_str().to_string())
            .or_else(|| ctx.canonical_url.clone())
            .unwrap_or_default();
        let record = normalize(ctx.record).finalize(self.config.limits, property_url);

        tracing::info!(
            status = ?record.status,
            elapsed_ms = millis(started.elapsed()),
            missing = ?record.missing_core_fields(),
            "extraction finished"
        );
        Ok(ExtractionReport { record, attempts })
    }

    /// "listed by" search for an agent when no strategy named one.
    async fn discover_agent(
        &self,
        ctx: &mut StrategyContext,
        deadline: Instant,
    ) -> Option<ExtractionAttempt> {
        let redirector = self.redirector.as_ref()?;
        if ctx.record.listing_agent_name.is_some() {
            return None;
        }
        let address = ctx.record.address.clone()?;
        let started = Instant::now();
        if started >= deadline {
            return Some(skipped(StrategyKind::AgentDiscovery, "overall deadline reached"));
        }

        let budget_end = (started + self.config.agent_timeout).min(deadline);
        let outcome = match tokio::time::timeout_at(budget_end, redirector.agent_hits(&address)).await {
            Ok(Ok(hits)) => {
                let fields = ctx.record.fill_missing_from(agent_from_hits(&hits));
                if fields.is_empty() {
                    AttemptOutcome::Empty
                } else {
                    AttemptOutcome::Filled { fields }
                }
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "agent discovery search failed");
                AttemptOutcome::Failed {
                    error: e.to_string(),
                }
            }
            Err(_) => {
                tracing::warn!("agent discovery search timed out");
                AttemptOutcome::TimedOut
            }
        };
        Some(ExtractionAttempt {
            strategy: StrategyKind::AgentDiscovery,
            outcome,
            elapsed_ms: millis(started.elapsed()),
        })
    }

    /// Email lookup for a named agent whose email is still missing.
    async fn fill_agent_email(
        &self,
        ctx: &mut StrategyContext,
        deadline: Instant,
    ) -> Option<ExtractionAttempt> {
        let resolver = self.agent_resolver.as_ref()?;
        if ctx.record.listing_agent_email.is_some() {
            return None;
        }
        let name = ctx.record.listing_agent_name.clone()?;
        let started = Instant::now();
        if started >= deadline {
            return Some(skipped(StrategyKind::AgentContact, "overall deadline reached"));
        }

        let company = ctx.record.listing_agent_company.clone();
        // the resolver bounds each of its own calls; this caps the total
        let lookup = resolver.resolve(&name, company.as_deref());
        let outcome = match tokio::time::timeout_at(deadline, lookup).await {
            Ok(contact) => {
                let mut fields = Vec::new();
                if let Some(email) = contact.email {
                    ctx.record.listing_agent_email = Some(email.address);
                    ctx.record.listing_agent_email_source = Some(email.source);
                    fields.push("listingAgentEmail");
                }
                if ctx.record.listing_agent_phone.is_none() {
                    if let Some(phone) = contact.phone {
                        ctx.record.listing_agent_phone = Some(phone);
                        fields.push("listingAgentPhone");
                    }
                }
                if fields.is_empty() {
                    AttemptOutcome::Empty
                } else {
                    AttemptOutcome::Filled { fields }
                }
            }
            Err(_) => {
                tracing::warn!(agent = name, "agent contact lookup hit the overall deadline");
                AttemptOutcome::TimedOut
            }
        };
        Some(ExtractionAttempt {
            strategy: StrategyKind::AgentContact,
            outcome,
            elapsed_ms: millis(started.elapsed()),
        })
    }
}

fn skipped(kind: StrategyKind, reason: &str) -> ExtractionAttempt {
    ExtractionAttempt {
        strategy: kind,
        outcome: AttemptOutcome::Skipped {
            reason: reason.to_string(),
        },
        elapsed_ms: 0,
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "orchestrator_test.rs"]
mod tests;
