//! Headless Chrome over WebDriver.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use thirtyfour::extensions::cdp::ChromeDevTools;
use thirtyfour::prelude::*;

use super::driver::{BrowserDriver, BrowserSession};
use super::profile::{InteractionStep, PresentationProfile};
use crate::error::StrategyError;

/// Launches one Chrome session per scrape against a WebDriver endpoint
/// (chromedriver or a Selenium grid).
pub struct WebDriverBrowser {
    server_url: String,
    page_load_timeout: Duration,
}

impl WebDriverBrowser {
    pub fn new(server_url: impl Into<String>, page_load_timeout: Duration) -> Self {
        Self {
            server_url: server_url.into(),
            page_load_timeout,
        }
    }
}

#[async_trait]
impl BrowserDriver for WebDriverBrowser {
    async fn launch(
        &self,
        profile: &PresentationProfile,
    ) -> Result<Box<dyn BrowserSession>, StrategyError> {
        let mut caps = DesiredCapabilities::chrome();
        for arg in [
            "--headless=new",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--disable-gpu",
            "--disable-blink-features=AutomationControlled",
            "--incognito",
        ] {
            caps.add_arg(arg)?;
        }
        caps.add_arg(&format!(
            "--window-size={},{}",
            profile.viewport.width, profile.viewport.height
        ))?;
        caps.add_arg(&format!("--user-agent={}", profile.user_agent))?;
        caps.add_arg(&format!("--lang={}", profile.fingerprint.languages.join(",")))?;

        let driver = WebDriver::new(self.server_url.as_str(), caps).await?;
        let session = WebDriverSession { driver };

        // A session that cannot be configured is quit before the error
        // propagates.
        if let Err(e) = session.apply_profile(profile, self.page_load_timeout).await {
            if let Err(quit_err) = session.driver.quit().await {
                tracing::warn!(error = %quit_err, "failed to quit misconfigured session");
            }
            return Err(e);
        }

        Ok(Box::new(session))
    }
}

struct WebDriverSession {
    driver: WebDriver,
}

impl WebDriverSession {
    async fn apply_profile(
        &self,
        profile: &PresentationProfile,
        page_load_timeout: Duration,
    ) -> Result<(), StrategyError> {
        self.driver.set_page_load_timeout(page_load_timeout).await?;

        let dev_tools = ChromeDevTools::new(self.driver.handle.clone());
        dev_tools
            .execute_cdp_with_params(
                "Page.addScriptToEvaluateOnNewDocument",
                json!({ "source": profile.stealth_script() }),
            )
            .await?;

        let headers: serde_json::Map<String, serde_json::Value> = profile
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();
        dev_tools.execute_cdp("Network.enable").await?;
        dev_tools
            .execute_cdp_with_params("Network.setExtraHTTPHeaders", json!({ "headers": headers }))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn navigate(&mut self, url: &str) -> Result<(), StrategyError> {
        self.driver.goto(url).await?;
        // body present means the document at least parsed
        self.driver.query(By::Tag("body")).first().await?;
        Ok(())
    }

    async fn perform(&mut self, step: InteractionStep) -> Result<(), StrategyError> {
        match step {
            InteractionStep::Scroll { dy } => {
                self.driver
                    .execute(&format!("window.scrollBy(0, {dy});"), Vec::new())
                    .await?;
            }
            InteractionStep::MouseMove { dx, dy } => {
                // out-of-bounds moves are rejected by the driver; not fatal
                if let Err(e) = self
                    .driver
                    .action_chain()
                    .move_by_offset(i64::from(dx), i64::from(dy))
                    .perform()
                    .await
                {
                    tracing::debug!(error = %e, "mouse move ignored");
                }
            }
            InteractionStep::Pause { millis } => {
                tokio::time::sleep(Duration::from_millis(millis)).await;
            }
        }
        Ok(())
    }

    async fn content(&mut self) -> Result<String, StrategyError> {
        Ok(self.driver.source().await?)
    }

    async fn close(self: Box<Self>) -> Result<(), StrategyError> {
        self.driver.quit().await?;
        Ok(())
    }
}
