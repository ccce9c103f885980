use crate::core::{BrowserConfig, BrowserTrait, PageSurface};
use crate::dom::{ElementHandle, Locator};
use crate::errors::{BrowserError, Result};
use crate::types::ClickMode;
use crate::utils::javascript;
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

const IDLE_BROWSER_TIMEOUT: Duration = Duration::from_secs(300);

/// Chrome browser implementation
pub struct ChromeBrowser {
    browser: Option<Browser>,
    tab_timeout: Duration,
}

impl ChromeBrowser {
    pub fn new() -> Self {
        Self {
            browser: None,
            tab_timeout: Duration::from_secs(60),
        }
    }

    /// Runs `op` against the launched browser on the blocking pool.
    async fn on_browser<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Browser) -> Result<T> + Send + 'static,
    {
        let browser = self
            .browser
            .clone()
            .ok_or(BrowserError::BrowserNotLaunched)?;
        tokio::task::spawn_blocking(move || op(&browser))
            .await
            .map_err(BrowserError::from_any_error)?
    }

    fn wrap(&self, tab: Arc<Tab>) -> Arc<ChromePage> {
        tab.set_default_timeout(self.tab_timeout);
        Arc::new(ChromePage { tab })
    }
}

impl Default for ChromeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

fn launch_args(config: &BrowserConfig) -> Vec<String> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        ),
    ];

    if let Some(ua) = &config.user_agent {
        args.push(format!("--user-agent={}", ua));
    }

    args.extend(config.args.iter().cloned());
    args
}

#[async_trait]
impl BrowserTrait for ChromeBrowser {
    type Page = ChromePage;

    async fn launch(&mut self, config: &BrowserConfig) -> Result<()> {
        let args = launch_args(config);
        let headless = config.headless;
        let path = config.chrome_path.clone();
        let window = (config.viewport.width, config.viewport.height);

        // Launching blocks until the DevTools endpoint answers.
        let browser = tokio::task::spawn_blocking(move || -> Result<Browser> {
            let args: Vec<&OsStr> = args.iter().map(OsStr::new).collect();
            let launch_options = LaunchOptions::default_builder()
                .headless(headless)
                .window_size(Some(window))
                .path(path)
                .args(args)
                .idle_browser_timeout(IDLE_BROWSER_TIMEOUT)
                .build()
                .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;

            Browser::new(launch_options).map_err(|e| BrowserError::LaunchFailed(e.to_string()))
        })
        .await
        .map_err(BrowserError::from_any_error)??;

        self.tab_timeout = Duration::from_millis(config.timeout_ms);
        self.browser = Some(browser);
        Ok(())
    }

    async fn new_page(&self) -> Result<Arc<ChromePage>> {
        let tab = self
            .on_browser(|browser| {
                browser
                    .new_tab()
                    .map_err(|e| BrowserError::TabCreationFailed(e.to_string()))
            })
            .await?;

        Ok(self.wrap(tab))
    }

    async fn pages(&self) -> Result<Vec<Arc<ChromePage>>> {
        let tabs = self
            .on_browser(|browser| {
                let tabs = browser
                    .get_tabs()
                    .lock()
                    .map_err(BrowserError::from_any_error)?;
                Ok(tabs.clone())
            })
            .await?;

        Ok(tabs.into_iter().map(|tab| self.wrap(tab)).collect())
    }

    async fn close(&mut self) -> Result<()> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };

        tokio::task::spawn_blocking(move || {
            let tabs = browser
                .get_tabs()
                .lock()
                .map(|tabs| tabs.clone())
                .unwrap_or_default();
            for tab in tabs {
                if let Err(e) = tab.close(false) {
                    tracing::debug!("closing tab failed: {}", e);
                }
            }
            // Dropping the handle terminates the Chrome process.
            drop(browser);
        })
        .await
        .map_err(BrowserError::from_any_error)
    }
}

/// One Chrome tab.
///
/// headless_chrome is synchronous, so every call runs on the blocking pool;
/// that keeps the caller's timeouts effective.
pub struct ChromePage {
    tab: Arc<Tab>,
}

impl ChromePage {
    async fn on_tab<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Tab) -> Result<T> + Send + 'static,
    {
        let tab = Arc::clone(&self.tab);
        tokio::task::spawn_blocking(move || op(&tab))
            .await
            .map_err(BrowserError::from_any_error)?
    }

    async fn evaluate(&self, script: String) -> Result<Value> {
        self.on_tab(move |tab| {
            let result = tab
                .evaluate(&script, false)
                .map_err(|e| BrowserError::JavaScriptFailed(e.to_string()))?;
            Ok(result.value.unwrap_or(Value::Null))
        })
        .await
    }

    /// Runs an element script; `null` means the element is gone.
    async fn element_flag(&self, element: &ElementHandle, script: String) -> Result<bool> {
        match self.evaluate(script).await? {
            Value::Bool(flag) => Ok(flag),
            Value::Null => Err(BrowserError::ElementNotFound(element.to_string())),
            other => Err(BrowserError::JavaScriptFailed(format!(
                "unexpected result {} for {}",
                other, element
            ))),
        }
    }
}

#[async_trait]
impl PageSurface for ChromePage {
    async fn goto(&self, url: &str) -> Result<()> {
        let url = url.to_string();
        self.on_tab(move |tab| {
            tab.navigate_to(&url)
                .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
            tab.wait_until_navigated()
                .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn fill(&self, css_selector: &str, value: &str) -> Result<()> {
        let css_selector = css_selector.to_string();
        let value = value.to_string();
        self.on_tab(move |tab| {
            let element = tab
                .wait_for_element(&css_selector)
                .map_err(|e| BrowserError::ElementNotFound(e.to_string()))?;

            element
                .click()
                .map_err(|e| BrowserError::NotActionable(e.to_string()))?;

            element
                .type_into(&value)
                .map_err(|e| BrowserError::JavaScriptFailed(e.to_string()))?;

            Ok(())
        })
        .await
    }

    async fn click_selector(&self, css_selector: &str) -> Result<()> {
        let css_selector = css_selector.to_string();
        self.on_tab(move |tab| {
            tab.find_element(&css_selector)
                .map_err(|e| BrowserError::ElementNotFound(e.to_string()))?
                .click()
                .map_err(|e| BrowserError::NotActionable(e.to_string()))?;
            Ok(())
        })
        .await
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    async fn frame_count(&self) -> Result<usize> {
        let value = self.evaluate(javascript::frame_count()).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn count(&self, locator: &Locator, frame: Option<usize>) -> Result<usize> {
        let value = self
            .evaluate(javascript::count(&locator.to_xpath(), frame))
            .await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool> {
        self.element_flag(element, javascript::is_visible(element))
            .await
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        self.element_flag(element, javascript::is_enabled(element))
            .await
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()> {
        self.element_flag(element, javascript::scroll_into_view(element))
            .await
            .map(|_| ())
    }

    async fn click(&self, element: &ElementHandle, mode: ClickMode) -> Result<()> {
        match (mode, element.frame) {
            (ClickMode::Normal, None) => {
                if !self.is_visible(element).await? || !self.is_enabled(element).await? {
                    return Err(BrowserError::NotActionable(element.to_string()));
                }

                let xpath = element.locator.to_xpath();
                let index = element.index;
                let description = element.to_string();
                self.on_tab(move |tab| {
                    let elements = tab
                        .find_elements_by_xpath(&xpath)
                        .map_err(|e| BrowserError::ElementNotFound(e.to_string()))?;
                    let target = elements
                        .get(index)
                        .ok_or_else(|| BrowserError::ElementNotFound(description.clone()))?;
                    target.click().map_err(|e| {
                        BrowserError::NotActionable(format!("{}: {}", description, e))
                    })?;
                    Ok(())
                })
                .await
            }
            (ClickMode::Normal, Some(_)) => {
                let clicked = self
                    .element_flag(element, javascript::click(element, true))
                    .await?;
                if clicked {
                    Ok(())
                } else {
                    Err(BrowserError::NotActionable(element.to_string()))
                }
            }
            (ClickMode::Forced, _) => self
                .element_flag(element, javascript::click(element, false))
                .await
                .map(|_| ()),
        }
    }

    async fn outer_html(&self, locator: &Locator, frame: Option<usize>) -> Result<Vec<String>> {
        match self
            .evaluate(javascript::outer_html(&locator.to_xpath(), frame))
            .await?
        {
            Value::String(encoded) => Ok(serde_json::from_str(&encoded)?),
            _ => Ok(Vec::new()),
        }
    }
}
