pub mod browser;
pub mod config;

pub use browser::{BrowserTrait, PageSurface};
pub use config::{BrowserConfig, Config, Credentials, StepTimeouts};
