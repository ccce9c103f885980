//! In-memory browser for exercising the pipeline without Chrome.
//!
//! A [`FixtureSite`] maps addresses to static HTML documents. Pages parse
//! their document on every call, so nothing non-`Send` is held across an
//! await. Everything a run does to the site lands in a shared journal.

use crate::core::{BrowserConfig, BrowserTrait, Config, Credentials, PageSurface};
use crate::dom::{is_disabled, is_hidden, ElementHandle, Locator};
use crate::errors::{BrowserError, Result};
use crate::types::ClickMode;
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use url::Url;

pub const PORTAL_BASE: &str = "https://portal.test";
pub const DASHBOARD_PATH: &str = "/mnjuser/homepage";

pub const LOGIN_PAGE: &str = r#"<html><body>
<form>
  <input id="usernameField" type="text">
  <input id="passwordField" type="password">
  <button type="submit">Login</button>
</form>
</body></html>"#;

pub const DASHBOARD_PAGE: &str =
    r#"<html><body><div id="header">Home</div><main>Dashboard</main></body></html>"#;

pub const PROFILE_PAGE: &str =
    r#"<html><body><div id="header">Home</div><section>Profile</section></body></html>"#;

/// One page: the top document plus embedded frame documents, by index.
#[derive(Debug, Clone, Default)]
pub struct FixtureDocument {
    pub html: String,
    /// Frame documents numbered depth-first, nested frames included
    pub frames: Vec<String>,
}

impl FixtureDocument {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            frames: Vec::new(),
        }
    }

    pub fn with_frame(mut self, html: impl Into<String>) -> Self {
        self.frames.push(html.into());
        self
    }
}

/// What submitting the login form does.
#[derive(Debug, Clone)]
pub enum LoginBehavior {
    /// The login page moves to this address
    Navigate(String),
    /// The login page moves to `here` and the site opens `tab` in a new page
    NewTab { here: String, tab: String },
    /// Nothing happens
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickRecord {
    pub page: usize,
    /// Element handle or CSS selector that was clicked
    pub target: String,
    pub mode: ClickMode,
}

#[derive(Debug, Default)]
struct Journal {
    launches: usize,
    closes: usize,
    clicks: Vec<ClickRecord>,
    fills: Vec<(String, String)>,
    visits: Vec<String>,
}

#[derive(Debug, Default)]
pub struct FixtureSite {
    routes: HashMap<String, FixtureDocument>,
    hanging: HashSet<String>,
    login: Option<(String, LoginBehavior)>,
    fail_launch: bool,
    hang_new_page: bool,
    hang_close: bool,
    address_stalled: AtomicBool,
    journal: Mutex<Journal>,
}

impl FixtureSite {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard portal: login, dashboard and profile pages under
    /// [`PORTAL_BASE`], with `modal` served as the profile editor.
    pub fn portal(modal: FixtureDocument, login: LoginBehavior) -> Self {
        Self::new()
            .route(portal_url("/nlogin/login"), FixtureDocument::new(LOGIN_PAGE))
            .route(portal_url(DASHBOARD_PATH), FixtureDocument::new(DASHBOARD_PAGE))
            .route(portal_url("/mnjuser/profile"), FixtureDocument::new(PROFILE_PAGE))
            .route(portal_url("/mnjuser/profile?action=modalOpen"), modal)
            .login(portal_url("/nlogin/login"), login)
    }

    pub fn route(mut self, url: impl Into<String>, document: FixtureDocument) -> Self {
        self.routes.insert(url.into(), document);
        self
    }

    /// Navigating to `url` never finishes.
    pub fn hang(mut self, url: impl Into<String>) -> Self {
        self.hanging.insert(url.into());
        self
    }

    pub fn login(mut self, url: impl Into<String>, behavior: LoginBehavior) -> Self {
        self.login = Some((url.into(), behavior));
        self
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    /// Opening a page never finishes.
    pub fn hanging_new_page(mut self) -> Self {
        self.hang_new_page = true;
        self
    }

    /// Closing the browser is counted, then never finishes.
    pub fn hanging_close(mut self) -> Self {
        self.hang_close = true;
        self
    }

    /// From now on, reading a page's address never finishes.
    pub fn stall_address_reads(&self) {
        self.address_stalled.store(true, Ordering::SeqCst);
    }

    pub fn browser(self: &Arc<Self>) -> FixtureBrowser {
        FixtureBrowser {
            site: self.clone(),
            tabs: Arc::new(Mutex::new(Vec::new())),
            launched: false,
        }
    }

    pub fn launches(&self) -> usize {
        self.journal().launches
    }

    pub fn closes(&self) -> usize {
        self.journal().closes
    }

    pub fn clicks(&self) -> Vec<ClickRecord> {
        self.journal().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.journal().fills.clone()
    }

    pub fn visits(&self) -> Vec<String> {
        self.journal().visits.clone()
    }

    fn journal(&self) -> MutexGuard<'_, Journal> {
        lock(&self.journal)
    }
}

pub fn portal_url(path: &str) -> String {
    format!("{}{}", PORTAL_BASE, path)
}

/// A config aimed at the fixture portal, with credentials set.
pub fn portal_config() -> Config {
    let mut config = Config::default();
    config.credentials = Some(Credentials {
        username: "candidate@example.com".to_string(),
        password: "correct horse".to_string(),
    });
    if let Ok(base) = Url::parse(PORTAL_BASE) {
        config.site = crate::automation::SiteProfile::with_base_url(base);
    }
    config
}

type Tabs = Mutex<Vec<Arc<FixturePage>>>;

pub struct FixtureBrowser {
    site: Arc<FixtureSite>,
    tabs: Arc<Tabs>,
    launched: bool,
}

#[async_trait]
impl BrowserTrait for FixtureBrowser {
    type Page = FixturePage;

    async fn launch(&mut self, _config: &BrowserConfig) -> Result<()> {
        if self.site.fail_launch {
            return Err(BrowserError::LaunchFailed("fixture refuses to launch".to_string()));
        }
        self.launched = true;
        self.site.journal().launches += 1;
        Ok(())
    }

    async fn new_page(&self) -> Result<Arc<FixturePage>> {
        if !self.launched {
            return Err(BrowserError::BrowserNotLaunched);
        }
        if self.site.hang_new_page {
            std::future::pending::<()>().await;
        }
        Ok(open_tab(&self.site, &self.tabs))
    }

    async fn pages(&self) -> Result<Vec<Arc<FixturePage>>> {
        Ok(lock(&self.tabs).clone())
    }

    async fn close(&mut self) -> Result<()> {
        if self.launched {
            lock(&self.tabs).clear();
            self.launched = false;
            self.site.journal().closes += 1;
            if self.site.hang_close {
                std::future::pending::<()>().await;
            }
        }
        Ok(())
    }
}

fn open_tab(site: &Arc<FixtureSite>, tabs: &Arc<Tabs>) -> Arc<FixturePage> {
    let mut open = lock(tabs);
    let page = Arc::new(FixturePage {
        id: open.len(),
        site: site.clone(),
        tabs: Arc::downgrade(tabs),
        current: Mutex::new(None),
    });
    open.push(page.clone());
    page
}

pub struct FixturePage {
    id: usize,
    site: Arc<FixtureSite>,
    tabs: Weak<Tabs>,
    current: Mutex<Option<(String, FixtureDocument)>>,
}

impl FixturePage {
    /// Position in the browser's page list
    pub fn id(&self) -> usize {
        self.id
    }

    fn load(&self, url: &str) -> Result<()> {
        let document = self
            .site
            .routes
            .get(url)
            .cloned()
            .ok_or_else(|| BrowserError::NavigationFailed(format!("no route for {}", url)))?;
        self.site.journal().visits.push(url.to_string());
        *lock(&self.current) = Some((url.to_string(), document));
        Ok(())
    }

    fn source(&self, frame: Option<usize>) -> Result<String> {
        let current = lock(&self.current);
        let (_, document) = current
            .as_ref()
            .ok_or_else(|| BrowserError::NavigationFailed("page is blank".to_string()))?;
        match frame {
            None => Ok(document.html.clone()),
            Some(index) => document
                .frames
                .get(index)
                .cloned()
                .ok_or_else(|| BrowserError::ElementNotFound(format!("frame[{}]", index))),
        }
    }

    /// Runs `inspect` on the element `element` refers to.
    fn with_element<T>(
        &self,
        element: &ElementHandle,
        inspect: impl FnOnce(&scraper::ElementRef<'_>) -> T,
    ) -> Result<T> {
        let document = Html::parse_document(&self.source(element.frame)?);
        let found = element.locator.find_in(&document);
        found
            .get(element.index)
            .map(inspect)
            .ok_or_else(|| BrowserError::ElementNotFound(element.to_string()))
    }

    fn css_count(&self, css_selector: &str) -> Result<usize> {
        let selector = Selector::parse(css_selector)
            .map_err(|e| BrowserError::InvalidSelector(format!("{}: {:?}", css_selector, e)))?;
        let document = Html::parse_document(&self.source(None)?);
        let count = document.select(&selector).count();
        Ok(count)
    }

    fn record_click(&self, target: String, mode: ClickMode) {
        self.site.journal().clicks.push(ClickRecord {
            page: self.id,
            target,
            mode,
        });
    }

    fn submit_login(&self) -> Result<()> {
        let Some((login_url, behavior)) = &self.site.login else {
            return Ok(());
        };
        let on_login_page = lock(&self.current)
            .as_ref()
            .map(|(url, _)| url == login_url)
            .unwrap_or(false);
        if !on_login_page {
            return Ok(());
        }

        match behavior {
            LoginBehavior::Navigate(next) => self.load(next),
            LoginBehavior::NewTab { here, tab } => {
                self.load(here)?;
                let tabs = self
                    .tabs
                    .upgrade()
                    .ok_or_else(|| BrowserError::TabCreationFailed("browser closed".to_string()))?;
                open_tab(&self.site, &tabs).load(tab)
            }
            LoginBehavior::Reject => Ok(()),
        }
    }
}

#[async_trait]
impl PageSurface for FixturePage {
    async fn goto(&self, url: &str) -> Result<()> {
        if self.site.hanging.contains(url) {
            std::future::pending::<()>().await;
        }
        self.load(url)
    }

    async fn fill(&self, css_selector: &str, value: &str) -> Result<()> {
        if self.css_count(css_selector)? == 0 {
            return Err(BrowserError::ElementNotFound(css_selector.to_string()));
        }
        self.site
            .journal()
            .fills
            .push((css_selector.to_string(), value.to_string()));
        Ok(())
    }

    async fn click_selector(&self, css_selector: &str) -> Result<()> {
        if self.css_count(css_selector)? == 0 {
            return Err(BrowserError::ElementNotFound(css_selector.to_string()));
        }
        self.record_click(css_selector.to_string(), ClickMode::Normal);
        self.submit_login()
    }

    async fn current_url(&self) -> Result<String> {
        if self.site.address_stalled.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(lock(&self.current)
            .as_ref()
            .map(|(url, _)| url.clone())
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn frame_count(&self) -> Result<usize> {
        Ok(lock(&self.current)
            .as_ref()
            .map(|(_, document)| document.frames.len())
            .unwrap_or(0))
    }

    async fn count(&self, locator: &Locator, frame: Option<usize>) -> Result<usize> {
        let document = Html::parse_document(&self.source(frame)?);
        let count = locator.find_in(&document).len();
        Ok(count)
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool> {
        self.with_element(element, |el| !is_hidden(el))
    }

    async fn is_enabled(&self, element: &ElementHandle) -> Result<bool> {
        self.with_element(element, |el| !is_disabled(el))
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()> {
        self.with_element(element, |_| ())
    }

    async fn click(&self, element: &ElementHandle, mode: ClickMode) -> Result<()> {
        let actionable = self.with_element(element, |el| !is_hidden(el) && !is_disabled(el))?;
        if mode == ClickMode::Normal && !actionable {
            return Err(BrowserError::NotActionable(element.to_string()));
        }
        self.record_click(element.to_string(), mode);
        Ok(())
    }

    async fn outer_html(&self, locator: &Locator, frame: Option<usize>) -> Result<Vec<String>> {
        let document = Html::parse_document(&self.source(frame)?);
        let markup = locator.find_in(&document).iter().map(|el| el.html()).collect();
        Ok(markup)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::ElementSelector;

    fn edit_handle(frame: Option<usize>) -> ElementHandle {
        let selector = ElementSelector::parse("em.icon.edit").unwrap();
        ElementHandle::first(Locator::element(selector), frame)
    }

    fn site_with(modal: FixtureDocument) -> Arc<FixtureSite> {
        Arc::new(FixtureSite::portal(
            modal,
            LoginBehavior::Navigate(portal_url(DASHBOARD_PATH)),
        ))
    }

    #[tokio::test]
    async fn submit_on_login_page_follows_behavior() {
        let site = site_with(FixtureDocument::default());
        let mut browser = site.browser();
        browser.launch(&BrowserConfig::default()).await.unwrap();
        let page = browser.new_page().await.unwrap();

        page.goto(&portal_url("/nlogin/login")).await.unwrap();
        page.fill("#usernameField", "me").await.unwrap();
        page.click_selector("button[type='submit']").await.unwrap();

        assert_eq!(page.current_url().await.unwrap(), portal_url(DASHBOARD_PATH));
        assert_eq!(site.fills(), vec![("#usernameField".to_string(), "me".to_string())]);
    }

    #[tokio::test]
    async fn new_tab_login_adds_a_page() {
        let site = Arc::new(FixtureSite::portal(
            FixtureDocument::default(),
            LoginBehavior::NewTab {
                here: portal_url("/mnjuser/profile"),
                tab: portal_url(DASHBOARD_PATH),
            },
        ));
        let mut browser = site.browser();
        browser.launch(&BrowserConfig::default()).await.unwrap();
        let page = browser.new_page().await.unwrap();
        page.goto(&portal_url("/nlogin/login")).await.unwrap();
        page.click_selector("button[type='submit']").await.unwrap();

        let pages = browser.pages().await.unwrap();
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].current_url().await.unwrap(), portal_url(DASHBOARD_PATH));
    }

    #[tokio::test]
    async fn normal_click_refuses_hidden_elements() {
        let site = site_with(FixtureDocument::new(
            r#"<em class="icon edit" style="display:none">editOneTheme</em>"#,
        ));
        let mut browser = site.browser();
        browser.launch(&BrowserConfig::default()).await.unwrap();
        let page = browser.new_page().await.unwrap();
        page.goto(&portal_url("/mnjuser/profile?action=modalOpen"))
            .await
            .unwrap();

        let handle = edit_handle(None);
        assert!(!page.is_visible(&handle).await.unwrap());
        assert!(matches!(
            page.click(&handle, ClickMode::Normal).await,
            Err(BrowserError::NotActionable(_))
        ));
        page.click(&handle, ClickMode::Forced).await.unwrap();
        assert_eq!(site.clicks().len(), 1);
        assert_eq!(site.clicks()[0].mode, ClickMode::Forced);
    }

    #[tokio::test]
    async fn frames_are_separate_documents() {
        let site = site_with(
            FixtureDocument::new("<p>top</p>").with_frame(r#"<em class="icon edit">x</em>"#),
        );
        let mut browser = site.browser();
        browser.launch(&BrowserConfig::default()).await.unwrap();
        let page = browser.new_page().await.unwrap();
        page.goto(&portal_url("/mnjuser/profile?action=modalOpen"))
            .await
            .unwrap();

        let locator = edit_handle(None).locator;
        assert_eq!(page.frame_count().await.unwrap(), 1);
        assert_eq!(page.count(&locator, None).await.unwrap(), 0);
        assert_eq!(page.count(&locator, Some(0)).await.unwrap(), 1);
        assert!(page.count(&locator, Some(3)).await.is_err());
    }

    #[tokio::test]
    async fn unlaunched_browser_has_no_pages() {
        let site = site_with(FixtureDocument::default());
        let browser = site.browser();
        assert!(matches!(
            browser.new_page().await,
            Err(BrowserError::BrowserNotLaunched)
        ));
    }
}
