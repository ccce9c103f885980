//! Process configuration.
//!
//! Everything is read from the environment (optionally seeded from a `.env`
//! file). Tests build configs from a plain map through [`Config::from_lookup`].

use crate::automation::site::SiteProfile;
use crate::errors::ConfigError;
use crate::types::Viewport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

pub const DEFAULT_PORT: u16 = 3000;
pub const RUN_INTERVAL: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Option<Credentials>,
    pub server: ServerConfig,
    pub triggers: TriggerConfig,
    pub browser: BrowserConfig,
    pub site: SiteProfile,
    pub timeouts: StepTimeouts,
}

/// Portal login. `Debug` never prints the password.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    /// Run once as soon as the server is listening
    pub run_on_start: bool,
    /// Run again every `interval`
    pub enable_interval: bool,
    pub interval: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub chrome_path: Option<PathBuf>,
    pub args: Vec<String>,
    /// Upper bound for any single blocking driver call
    pub timeout_ms: u64,
}

/// Per-step ceilings. None of these are cumulative.
#[derive(Debug, Clone, Copy)]
pub struct StepTimeouts {
    pub launch: Duration,
    pub login_page: Duration,
    pub fill: Duration,
    pub login_navigation: Duration,
    pub dashboard: Duration,
    pub profile_page: Duration,
    pub address_confirmation: Duration,
    pub primary_visibility: Duration,
    pub fallback_visibility: Duration,
    pub edit_click: Duration,
    pub forced_edit_click: Duration,
    pub save_presence: Duration,
    pub save_settle: Duration,
    pub save_enabled: Duration,
    pub save_click: Duration,
    /// Releasing the browser at the end of a run
    pub close: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            run_on_start: true,
            enable_interval: false,
            interval: RUN_INTERVAL,
        }
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            chrome_path: None,
            args: vec![
                "--disable-setuid-sandbox".to_string(),
                "--ignore-certificate-errors".to_string(),
            ],
            timeout_ms: 60_000,
        }
    }
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            launch: Duration::from_secs(60),
            login_page: Duration::from_secs(60),
            fill: Duration::from_secs(30),
            login_navigation: Duration::from_secs(30),
            dashboard: Duration::from_secs(20),
            profile_page: Duration::from_secs(60),
            address_confirmation: Duration::from_secs(30),
            primary_visibility: Duration::from_secs(7),
            fallback_visibility: Duration::from_secs(5),
            edit_click: Duration::from_secs(5),
            forced_edit_click: Duration::from_secs(3),
            save_presence: Duration::from_secs(15),
            save_settle: Duration::from_millis(500),
            save_enabled: Duration::from_secs(10),
            save_click: Duration::from_secs(8),
            close: Duration::from_secs(30),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            credentials: None,
            server: ServerConfig::default(),
            triggers: TriggerConfig::default(),
            browser: BrowserConfig::default(),
            site: SiteProfile::default(),
            timeouts: StepTimeouts::default(),
        }
    }
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        config.credentials = match (value("NAUKRI_EMAIL"), value("NAUKRI_PASSWORD")) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        if let Some(host) = value("HOST") {
            config.server.host = host;
        }
        if let Some(port) = value("PORT") {
            config.server.port = port.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::InvalidValue {
                    key: "PORT".to_string(),
                    value: port.clone(),
                    reason: e.to_string(),
                }
            })?;
        }

        // Startup runs are opt-out, interval runs opt-in.
        config.triggers.run_on_start = lookup("RUN_ON_START")
            .map(|v| v == "true")
            .unwrap_or(true);
        config.triggers.enable_interval = lookup("ENABLE_INTERVAL")
            .map(|v| v == "true")
            .unwrap_or(false);

        if let Some(headless) = value("BROWSER_HEADLESS") {
            config.browser.headless = !matches!(headless.as_str(), "false" | "0");
        }
        config.browser.chrome_path = value("CHROME_PATH").map(PathBuf::from);

        if let Some(base) = value("SITE_BASE_URL") {
            let url = Url::parse(&base).map_err(|e| ConfigError::InvalidValue {
                key: "SITE_BASE_URL".to_string(),
                value: base.clone(),
                reason: e.to_string(),
            })?;
            config.site = SiteProfile::with_base_url(url);
        }

        Ok(config)
    }
}
