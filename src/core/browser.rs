use crate::core::config::BrowserConfig;
use crate::dom::{ElementHandle, Locator};
use crate::errors::Result;
use crate::types::ClickMode;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait BrowserTrait: Send + Sync {
    type Page: PageSurface + 'static;

    /// Launch a new browser instance
    async fn launch(&mut self, config: &BrowserConfig) -> Result<()>;

    /// Open a new page/tab
    async fn new_page(&self) -> Result<Arc<Self::Page>>;

    /// All open pages, oldest first
    async fn pages(&self) -> Result<Vec<Arc<Self::Page>>>;

    /// Close every page and shut the browser down
    async fn close(&mut self) -> Result<()>;
}

/// The page operations the automation pipeline relies on.
///
/// None of these wait on their own beyond what the driver needs to answer;
/// callers bound each call with a timeout and do their own polling.
#[async_trait]
pub trait PageSurface: Send + Sync {
    /// Navigate and wait for the document to load
    async fn goto(&self, url: &str) -> Result<()>;

    /// Type `value` into the input matching a CSS selector
    async fn fill(&self, css_selector: &str, value: &str) -> Result<()>;

    /// Click the element matching a CSS selector
    async fn click_selector(&self, css_selector: &str) -> Result<()>;

    async fn current_url(&self) -> Result<String>;

    /// Number of embedded frames in the top document
    async fn frame_count(&self) -> Result<usize>;

    /// Number of elements `locator` matches in the top document or a frame
    async fn count(&self, locator: &Locator, frame: Option<usize>) -> Result<usize>;

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool>;

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool>;

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()>;

    async fn click(&self, element: &ElementHandle, mode: ClickMode) -> Result<()>;

    /// Raw markup of every element `locator` matches
    async fn outer_html(&self, locator: &Locator, frame: Option<usize>) -> Result<Vec<String>>;
}
