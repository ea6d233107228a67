//! Listing-agent contact lookup through search, with a model-guessed
//! fallback that is always marked as a guess.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use homescout_core::EmailSource;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::error::StrategyError;
use crate::llm::LanguageModel;
use crate::partial::PartialRecord;
use crate::patterns;
use crate::search::{SearchHit, SearchProvider};

/// Local parts and domains that are never a person's mailbox.
const JUNK_EMAIL_MARKERS: [&str; 8] = [
    "noreply",
    "no-reply",
    "donotreply",
    "example.",
    "sentry",
    "wixpress",
    "@2x",
    "privacy",
];

const IMAGE_SUFFIXES: [&str; 5] = [".png", ".jpg", ".jpeg", ".gif", ".webp"];

const GUESS_SYSTEM_PROMPT: &str = "You suggest the most likely professional email address \
for a real-estate agent using common corporate patterns such as first.last@company domain \
or first@company domain. Answer null if there is no reasonable basis for a guess.";

static GUESS_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["email"],
        "properties": {"email": {"type": ["string", "null"]}}
    })
});

#[derive(Deserialize)]
struct GuessAnswer {
    email: Option<String>,
}

/// An agent email and how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentEmail {
    pub address: String,
    pub source: EmailSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentContact {
    pub email: Option<AgentEmail>,
    pub phone: Option<String>,
}

/// Secondary search-and-parse pass for an agent's contact details.
///
/// Never fails: every upstream problem ends in "not found".
pub struct AgentContactResolver {
    search: Option<Arc<dyn SearchProvider>>,
    model: Option<Arc<dyn LanguageModel>>,
    result_count: u32,
    timeout: Duration,
}

impl AgentContactResolver {
    pub fn new(
        search: Option<Arc<dyn SearchProvider>>,
        model: Option<Arc<dyn LanguageModel>>,
        result_count: u32,
        timeout: Duration,
    ) -> Self {
        Self {
            search,
            model,
            result_count,
            timeout,
        }
    }

    /// Find a professional email for `name`.
    ///
    /// A confirmed address from search snippets is
    /// [`EmailSource::Search`]; a model guess is [`EmailSource::Guessed`] and
    /// is discarded unless it is a validly shaped email.
    pub async fn resolve_email(&self, name: &str, company: Option<&str>) -> Option<AgentEmail> {
        self.resolve(name, company).await.email
    }

    /// Email and phone for `name`, as far as they can be found.
    pub async fn resolve(&self, name: &str, company: Option<&str>) -> AgentContact {
        let name = name.trim();
        if name.is_empty() {
            return AgentContact::default();
        }

        let hits = self.search_agent(name, company).await;
        let tokens = name_tokens(name);

        let mut contact = AgentContact {
            email: best_snippet_email(&hits, &tokens).map(|address| AgentEmail {
                address,
                source: EmailSource::Search,
            }),
            phone: snippet_phone(&hits, &tokens),
        };

        if contact.email.is_none() {
            contact.email = self.guess_email(name, company, &hits).await;
        }
        tracing::debug!(
            agent = name,
            email_source = ?contact.email.as_ref().map(|e| e.source),
            has_phone = contact.phone.is_some(),
            "agent contact lookup finished"
        );
        contact
    }

    async fn search_agent(&self, name: &str, company: Option<&str>) -> Vec<SearchHit> {
        let Some(search) = &self.search else {
            return Vec::new();
        };
        let query = match company.map(str::trim).filter(|c| !c.is_empty()) {
            Some(company) => format!("\"{name}\" \"{company}\" real estate agent email"),
            None => format!("\"{name}\" realtor email contact"),
        };
        let search = search.search(&query, self.result_count);
        match within("agent search", self.timeout, search).await {
            Ok(hits) => hits,
            Err(e) => {
                tracing::warn!(agent = name, error = %e, "agent search failed");
                Vec::new()
            }
        }
    }

    async fn guess_email(
        &self,
        name: &str,
        company: Option<&str>,
        hits: &[SearchHit],
    ) -> Option<AgentEmail> {
        let model = self.model.as_ref()?;

        let domains: BTreeSet<String> = hits
            .iter()
            .filter_map(|hit| Url::parse(&hit.link).ok())
            .filter_map(|url| url.host_str().map(|h| h.trim_start_matches("www.").to_string()))
            .collect();
        let mut prompt = format!("Agent name: {name}\n");
        if let Some(company) = company {
            prompt.push_str(&format!("Brokerage: {company}\n"));
        }
        if !domains.is_empty() {
            let listed: Vec<&str> = domains.iter().map(String::as_str).collect();
            prompt.push_str(&format!("Domains seen in search results: {}\n", listed.join(", ")));
        }

        let completion =
            model.complete_json(GUESS_SYSTEM_PROMPT, &prompt, "agent_email_guess", &GUESS_SCHEMA);
        let answer = match within("agent email guess", self.timeout, completion).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::warn!(agent = name, error = %e, "agent email guess failed");
                return None;
            }
        };

        let guess = serde_json::from_str::<GuessAnswer>(answer.trim())
            .ok()
            .and_then(|a| a.email)
            .map(|e| e.trim().to_ascii_lowercase())?;
        if !patterns::is_valid_email(&guess) {
            tracing::debug!(agent = name, guess, "discarding malformed email guess");
            return None;
        }
        Some(AgentEmail {
            address: guess,
            source: EmailSource::Guessed,
        })
    }
}

/// Lowercased name parts long enough to identify a mailbox.
fn name_tokens(name: &str) -> Vec<String> {
    name.split_whitespace()
        .map(|t| {
            t.trim_matches(|c: char| !c.is_alphanumeric())
                .to_ascii_lowercase()
        })
        .filter(|t| t.len() >= 2)
        .collect()
}

fn is_personal_email(email: &str) -> bool {
    let lowered = email.to_ascii_lowercase();
    patterns::is_valid_email(email)
        && !JUNK_EMAIL_MARKERS.iter().any(|m| lowered.contains(m))
        && !IMAGE_SUFFIXES.iter().any(|s| lowered.ends_with(s))
}

/// Prefer an address whose local part names the agent; otherwise the first
/// plausible one.
fn best_snippet_email(hits: &[SearchHit], tokens: &[String]) -> Option<String> {
    let candidates: Vec<String> = hits
        .iter()
        .flat_map(|hit| {
            patterns::emails(&hit.snippet)
                .chain(patterns::emails(&hit.title))
                .map(|e| e.trim_end_matches('.').to_string())
                .collect::<Vec<_>>()
        })
        .filter(|e| is_personal_email(e))
        .collect();

    let names_agent = |email: &String| {
        let local = email
            .split('@')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        tokens.iter().any(|t| local.contains(t.as_str()))
    };
    candidates
        .iter()
        .find(|e| names_agent(e))
        .or_else(|| candidates.first())
        .cloned()
}

/// Phone from a snippet that mentions the agent.
fn snippet_phone(hits: &[SearchHit], tokens: &[String]) -> Option<String> {
    let surname = tokens.last()?;
    hits.iter()
        .map(|hit| format!("{} {}", hit.title, hit.snippet))
        .filter(|text| text.to_ascii_lowercase().contains(surname.as_str()))
        .find_map(|text| patterns::phone(&text))
}

/// Agent details from "listed by" search snippets.
#[must_use]
pub fn agent_from_hits(hits: &[SearchHit]) -> PartialRecord {
    let mut record = PartialRecord::default();
    for hit in hits {
        let text = format!("{} {}", hit.title, hit.snippet);
        let Some(name) = patterns::listed_by_name(&text) else {
            continue;
        };
        record.listing_agent_name = Some(name);
        record.listing_agent_phone = patterns::phone(&text);
        record.listing_agent_license_no = patterns::license_number(&text);
        record.listing_agent_company = patterns::company(&text);
        break;
    }
    record
}

/// Run an upstream call under `limit`; running out is a
/// [`StrategyError::Timeout`] naming `what`.
async fn within<T, F>(what: &str, limit: Duration, call: F) -> Result<T, StrategyError>
where
    F: Future<Output = Result<T, StrategyError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StrategyError::Timeout {
            what: what.to_string(),
            secs: limit.as_secs(),
        })?
}
