//! Browser automation seam and scoped session lifecycle.

use async_trait::async_trait;

use super::profile::{InteractionScript, InteractionStep, PresentationProfile};
use crate::error::StrategyError;

/// Starts isolated browser sessions.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Open a fresh session presenting `profile`. Nothing is shared with any
    /// other session.
    async fn launch(
        &self,
        profile: &PresentationProfile,
    ) -> Result<Box<dyn BrowserSession>, StrategyError>;
}

/// One live browser session.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), StrategyError>;

    async fn perform(&mut self, step: InteractionStep) -> Result<(), StrategyError>;

    /// Rendered HTML of the current page.
    async fn content(&mut self) -> Result<String, StrategyError>;

    async fn close(self: Box<Self>) -> Result<(), StrategyError>;
}

/// Owns a session and guarantees it is closed.
///
/// [`SessionGuard::close`] is the normal path. If the owning future is
/// dropped first (a timeout or deadline fired), `Drop` hands the session to
/// the runtime to close in the background.
pub(crate) struct SessionGuard {
    session: Option<Box<dyn BrowserSession>>,
}

impl SessionGuard {
    pub(crate) fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session: Some(session),
        }
    }

    fn session(&mut self) -> Result<&mut Box<dyn BrowserSession>, StrategyError> {
        self.session
            .as_mut()
            .ok_or_else(|| StrategyError::Browser("session already closed".to_string()))
    }

    pub(crate) async fn close(mut self) {
        if let Some(session) = self.session.take() {
            if let Err(e) = session.close().await {
                tracing::warn!(error = %e, "failed to close browser session");
            }
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!("closing abandoned browser session in background");
                handle.spawn(async move {
                    if let Err(e) = session.close().await {
                        tracing::warn!(error = %e, "failed to close abandoned browser session");
                    }
                });
            }
            Err(_) => tracing::warn!("browser session dropped outside a runtime; not closed"),
        }
    }
}

/// Launch, present, navigate, interact, read, and always tear down.
///
/// # Errors
///
/// Any launch, navigation or read failure, or a detected block page.
pub(crate) async fn render_page(
    driver: &dyn BrowserDriver,
    profile: &PresentationProfile,
    script: &InteractionScript,
    url: &str,
) -> Result<String, StrategyError> {
    let session = driver.launch(profile).await?;
    let mut guard = SessionGuard::new(session);

    let result = async {
        let session = guard.session()?;
        session.navigate(url).await?;
        for step in &script.steps {
            session.perform(*step).await?;
        }
        let html = session.content().await?;
        if let Some(signature) = super::challenge::detect_block(&html) {
            return Err(StrategyError::Blocked {
                url: url.to_string(),
                signature: signature.to_string(),
            });
        }
        Ok(html)
    }
    .await;

    guard.close().await;
    result
}
