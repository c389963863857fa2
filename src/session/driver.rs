//! Page driver contracts
//!
//! The crawler never talks to a browser directly. It goes through these
//! traits so the orchestration logic can run against any engine that can
//! navigate, query elements by CSS selector, and click.

use crate::config::BrowserConfig;
use async_trait::async_trait;
use thiserror::Error;

/// Failures raised by the page driver or the session that owns it
///
/// All of these are retryable from the crawler's point of view: the
/// orchestrator decides whether to restart the session or give up.
#[derive(Debug, Clone, Error)]
pub enum SessionFault {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Element '{selector}' not found")]
    ElementMissing { selector: String },

    #[error("Browser command failed: {0}")]
    Command(String),

    #[error("No active browser session")]
    NotStarted,
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, SessionFault>;

/// Launches page drivers
#[async_trait]
pub trait DriverFactory: Send + Sync {
    /// Acquires a fresh driver configured from the browser settings
    async fn launch(&self, config: &BrowserConfig) -> DriverResult<Box<dyn PageDriver>>;
}

/// One browser tab
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Loads a URL, bounded by the page-load timeout
    async fn navigate(&mut self, url: &str) -> DriverResult<()>;

    /// Returns every element matching a CSS selector (possibly none)
    async fn query(&self, selector: &str) -> DriverResult<Vec<Box<dyn PageElement>>>;

    /// Releases the browser
    async fn shutdown(&mut self) -> DriverResult<()>;
}

/// A live element on the current page
#[async_trait]
pub trait PageElement: Send + Sync {
    /// Rendered text of the element
    async fn text(&self) -> DriverResult<String>;

    async fn attribute(&self, name: &str) -> DriverResult<Option<String>>;

    /// Checked state of a checkbox input
    async fn is_checked(&self) -> DriverResult<bool>;

    /// Clicks through a script call so hidden inputs can be toggled
    async fn click(&self) -> DriverResult<()>;

    async fn scroll_into_view(&self) -> DriverResult<()>;

    async fn outer_html(&self) -> DriverResult<String>;
}
