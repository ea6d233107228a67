//! Static page backend: a plain HTTP fetch presenting the profile's headers.
//!
//! Used when no WebDriver endpoint is configured. Pages that need script
//! execution yield less, but the selector, JSON-LD and regex passes still run
//! over the served HTML.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;

use super::driver::{BrowserDriver, BrowserSession};
use super::profile::{InteractionStep, PresentationProfile};
use crate::error::StrategyError;

/// Maximum pause honored by the static backend. There is no page to
/// interact with, so pacing only needs to look plausible between requests.
const MAX_PAUSE: Duration = Duration::from_millis(250);

pub struct HttpPageBackend {
    timeout: Duration,
}

impl HttpPageBackend {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl BrowserDriver for HttpPageBackend {
    async fn launch(
        &self,
        profile: &PresentationProfile,
    ) -> Result<Box<dyn BrowserSession>, StrategyError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &profile.headers {
            let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) else {
                tracing::debug!(header = %name, "skipping unrepresentable header");
                continue;
            };
            headers.insert(name, value);
        }

        // fresh client per session: no cookie jar or connection reuse across scrapes
        let client = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(profile.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Ok(Box::new(HttpPageSession { client, html: None }))
    }
}

struct HttpPageSession {
    client: Client,
    html: Option<String>,
}

#[async_trait]
impl BrowserSession for HttpPageSession {
    async fn navigate(&mut self, url: &str) -> Result<(), StrategyError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if let Some(signature) = super::challenge::detect_block(&body) {
            return Err(StrategyError::Blocked {
                url: url.to_string(),
                signature: signature.to_string(),
            });
        }
        if status == reqwest::StatusCode::FORBIDDEN || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(StrategyError::Blocked {
                url: url.to_string(),
                signature: format!("http_{}", status.as_u16()),
            });
        }
        if !status.is_success() {
            return Err(StrategyError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        self.html = Some(body);
        Ok(())
    }

    async fn perform(&mut self, step: InteractionStep) -> Result<(), StrategyError> {
        if let InteractionStep::Pause { millis } = step {
            tokio::time::sleep(Duration::from_millis(millis).min(MAX_PAUSE)).await;
        }
        Ok(())
    }

    async fn content(&mut self) -> Result<String, StrategyError> {
        self.html
            .clone()
            .ok_or_else(|| StrategyError::Browser("no page loaded".to_string()))
    }

    async fn close(self: Box<Self>) -> Result<(), StrategyError> {
        Ok(())
    }
}
