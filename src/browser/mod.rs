pub mod chrome;
pub mod element_monitor;
pub mod navigation;
pub mod session;

pub use chrome::{ChromeBrowser, ChromePage};
pub use element_monitor::ElementMonitor;
pub use navigation::{poll_until, NavigationManager, NavigationResult};
pub use session::BrowserSession;
