use crate::core::{BrowserConfig, BrowserTrait};
use crate::errors::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The browser and pages owned by a single run.
///
/// Opened unlaunched so the owner can `close` it on every exit path,
/// including a failed launch.
pub struct BrowserSession<B: BrowserTrait> {
    session_id: Uuid,
    browser: B,
    launched: bool,
}

impl<B: BrowserTrait> BrowserSession<B> {
    pub fn new(browser: B, session_id: Uuid) -> Self {
        Self {
            session_id,
            browser,
            launched: false,
        }
    }

    pub async fn launch(&mut self, config: &BrowserConfig) -> Result<()> {
        self.browser.launch(config).await?;
        self.launched = true;
        debug!(session_id = %self.session_id, headless = config.headless, "browser launched");
        Ok(())
    }

    pub async fn new_page(&self) -> Result<Arc<B::Page>> {
        self.browser.new_page().await
    }

    /// The most recently opened page, or `fallback` when the page list is
    /// unavailable. A freshly opened tab is assumed to be where the site
    /// continued after login.
    pub async fn active_page(&self, fallback: Arc<B::Page>) -> Arc<B::Page> {
        match self.browser.pages().await {
            Ok(mut pages) if pages.len() > 1 => {
                info!(
                    session_id = %self.session_id,
                    open_pages = pages.len(),
                    "Found new tab for dashboard, switching"
                );
                pages.pop().unwrap_or(fallback)
            }
            Ok(_) => fallback,
            Err(e) => {
                warn!(session_id = %self.session_id, "could not list pages: {}", e);
                fallback
            }
        }
    }

    /// Release the browser, giving up after `ceiling`. Errors are logged,
    /// never returned, so closing cannot mask the run's own outcome.
    pub async fn close(mut self, ceiling: Duration) {
        match tokio::time::timeout(ceiling, self.browser.close()).await {
            Ok(Ok(())) if self.launched => {
                debug!(session_id = %self.session_id, "browser closed")
            }
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(session_id = %self.session_id, "browser close failed: {}", e),
            Err(_) => warn!(
                session_id = %self.session_id,
                "browser close did not finish within {:?}", ceiling
            ),
        }
    }
}
