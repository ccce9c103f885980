//! Addresses and selectors of the target portal.
//!
//! These track the portal's current markup; when it changes, this is the
//! file to update.

use crate::dom::{ElementSelector, Locator};
use crate::errors::ConfigError;
use regex::Regex;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://www.naukri.com";

#[derive(Debug, Clone)]
pub struct SiteProfile {
    pub base_url: String,
    pub login_path: String,
    pub profile_path: String,
    pub modal_path: String,
    pub username_field: String,
    pub password_field: String,
    pub submit_button: String,
    pub dashboard_marker: ElementSelector,
    pub edit_control: ElementSelector,
    pub edit_theme: String,
    pub save_control: ElementSelector,
    pub profile_pattern: String,
    pub modal_pattern: String,
}

impl SiteProfile {
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn login_url(&self) -> Result<Url, ConfigError> {
        self.join(&self.login_path)
    }

    pub fn profile_url(&self) -> Result<Url, ConfigError> {
        self.join(&self.profile_path)
    }

    pub fn modal_url(&self) -> Result<Url, ConfigError> {
        self.join(&self.modal_path)
    }

    pub fn save_locator(&self) -> Locator {
        Locator::element(self.save_control.clone())
    }

    pub fn dashboard_locator(&self) -> Locator {
        Locator::element(self.dashboard_marker.clone())
    }

    pub fn profile_regex(&self) -> Result<Regex, ConfigError> {
        compile(&self.profile_pattern)
    }

    pub fn modal_regex(&self) -> Result<Regex, ConfigError> {
        compile(&self.modal_pattern)
    }

    fn join(&self, path: &str) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url)
            .and_then(|base| base.join(path))
            .map_err(|e| ConfigError::InvalidValue {
                key: "SITE_BASE_URL".to_string(),
                value: self.base_url.clone(),
                reason: e.to_string(),
            })
    }
}

impl Default for SiteProfile {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            login_path: "/nlogin/login".to_string(),
            profile_path: "/mnjuser/profile".to_string(),
            modal_path: "/mnjuser/profile?action=modalOpen".to_string(),
            username_field: "#usernameField".to_string(),
            password_field: "#passwordField".to_string(),
            submit_button: "button[type='submit']".to_string(),
            dashboard_marker: selector("div", Some("header"), &[]),
            edit_control: selector("em", None, &["icon", "edit"]),
            edit_theme: "editOneTheme".to_string(),
            save_control: selector("*", Some("saveBasicDetailsBtn"), &[]),
            profile_pattern: r"(?i)mnjuser/profile(?:\?.*)?$".to_string(),
            modal_pattern: r"(?i)mnjuser/profile\?action=modalOpen".to_string(),
        }
    }
}

fn selector(tag: &str, id: Option<&str>, classes: &[&str]) -> ElementSelector {
    ElementSelector {
        tag: (tag != "*").then(|| tag.to_string()),
        id: id.map(str::to_string),
        classes: classes.iter().map(|c| c.to_string()).collect(),
    }
}

fn compile(pattern: &str) -> Result<Regex, ConfigError> {
    Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}
