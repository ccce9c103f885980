pub mod automation;
pub mod browser;
pub mod core;
pub mod dom;
pub mod errors;
pub mod server;
pub mod testing;
pub mod types;
pub mod utils;

pub use automation::{Automation, RunGuard, RunOutcome, StepSequencer};
pub use browser::{BrowserSession, ChromeBrowser};
pub use crate::core::{BrowserConfig, Config};
pub use errors::{AutomationError, BrowserError, ConfigError};
pub use types::*;
