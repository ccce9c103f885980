use std::time::Duration;

use thiserror::Error;

use crate::types::RunPhase;

/// Failures raised by the browser driver itself.
#[derive(Error, Debug)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    LaunchFailed(String),

    #[error("Browser not launched")]
    BrowserNotLaunched,

    #[error("Tab creation failed: {0}")]
    TabCreationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    #[error("Element not actionable: {0}")]
    NotActionable(String),

    #[error("Timeout error: {0}")]
    TimeoutError(String),

    #[error("JavaScript execution failed: {0}")]
    JavaScriptFailed(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Chrome error: {0}")]
    ChromeError(String),
}

pub type Result<T> = std::result::Result<T, BrowserError>;

impl BrowserError {
    pub fn from_any_error<E: std::fmt::Display>(err: E) -> Self {
        BrowserError::ChromeError(err.to_string())
    }
}

/// Fatal outcomes of a run. The display string is what callers of the HTTP
/// surface receive.
#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Credentials are not configured (set NAUKRI_EMAIL and NAUKRI_PASSWORD)")]
    MissingCredentials,

    #[error("{phase} exceeded its {}s ceiling", .ceiling.as_secs_f32())]
    StepTimeout { phase: RunPhase, ceiling: Duration },

    #[error("{phase} failed: {source}")]
    Step {
        phase: RunPhase,
        #[source]
        source: BrowserError,
    },

    #[error("{phase} landed on {actual}, expected an address matching {expected}")]
    UnexpectedAddress {
        phase: RunPhase,
        expected: String,
        actual: String,
    },

    #[error("Login was not accepted: still on {0} after submitting credentials")]
    LoginRejected(String),

    #[error(
        "{target} not clickable after {attempts} strategies; {} candidate(s) on page: [{}]",
        .snapshots.len(),
        .snapshots.join(", ")
    )]
    NotResolvable {
        target: String,
        attempts: usize,
        snapshots: Vec<String>,
    },

    #[error("Save control could not be activated: {0}")]
    SaveNotActivated(String),

    #[error("Run aborted: {0}")]
    Aborted(String),
}

/// Problems with the process configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid address pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

pub type RunResult<T> = std::result::Result<T, AutomationError>;

impl AutomationError {
    pub fn step(phase: RunPhase, source: BrowserError) -> Self {
        AutomationError::Step { phase, source }
    }

    /// Phase the run was in when it failed, if the error is tied to one.
    pub fn phase(&self) -> Option<RunPhase> {
        match self {
            AutomationError::MissingCredentials | AutomationError::LoginRejected(_) => {
                Some(RunPhase::LoggingIn)
            }
            AutomationError::StepTimeout { phase, .. }
            | AutomationError::Step { phase, .. }
            | AutomationError::UnexpectedAddress { phase, .. } => Some(*phase),
            AutomationError::NotResolvable { .. } => Some(RunPhase::ResolvingEditControl),
            AutomationError::SaveNotActivated(_) => Some(RunPhase::ActivatingSaveControl),
            AutomationError::Aborted(_) => None,
        }
    }
}
