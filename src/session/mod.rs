//! Session management for the page driver
//!
//! This module owns the browser lifecycle for a crawl:
//! - Launching a driver with the configured timeouts and viewport
//! - Navigating under the page-load timeout
//! - Restarting after a page-level failure
//! - Releasing the browser on shutdown

mod chromium;
mod driver;
#[cfg(test)]
pub(crate) mod testing;

pub use chromium::{ChromiumDriver, ChromiumElement, ChromiumFactory};
pub use driver::{DriverFactory, DriverResult, PageDriver, PageElement, SessionFault};

use crate::config::BrowserConfig;
use std::time::{Duration, Instant};

/// Poll interval while waiting for an element to appear
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Owns at most one live page driver
pub struct Session {
    factory: Box<dyn DriverFactory>,
    config: BrowserConfig,
    driver: Option<Box<dyn PageDriver>>,
}

impl Session {
    /// Creates a session; no browser is launched until `start`
    pub fn new(factory: Box<dyn DriverFactory>, config: BrowserConfig) -> Self {
        Self {
            factory,
            config,
            driver: None,
        }
    }

    /// Whether a driver is currently held
    pub fn is_active(&self) -> bool {
        self.driver.is_some()
    }

    /// Launches a driver; a no-op when one is already running
    pub async fn start(&mut self) -> DriverResult<()> {
        if self.driver.is_some() {
            return Ok(());
        }
        let driver = self.factory.launch(&self.config).await?;
        self.driver = Some(driver);
        Ok(())
    }

    /// Loads a URL in the current driver
    pub async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        let driver = self.driver.as_mut().ok_or(SessionFault::NotStarted)?;
        tracing::debug!("Navigating to {}", url);
        driver.navigate(url).await
    }

    /// Tears the current driver down and launches a fresh one
    pub async fn restart(&mut self) -> DriverResult<()> {
        tracing::warn!("Restarting browser session");
        self.stop().await;
        self.start().await
    }

    /// Releases the driver
    ///
    /// Idempotent, and safe to call after a failed `start`. Shutdown errors
    /// are logged rather than returned since the driver is discarded anyway.
    pub async fn stop(&mut self) {
        if let Some(mut driver) = self.driver.take() {
            if let Err(e) = driver.shutdown().await {
                tracing::error!("Error closing browser: {}", e);
            }
        }
    }

    /// Returns every element matching a selector
    pub async fn query(&self, selector: &str) -> DriverResult<Vec<Box<dyn PageElement>>> {
        let driver = self.driver.as_ref().ok_or(SessionFault::NotStarted)?;
        driver.query(selector).await
    }

    /// Returns the first element matching a selector, if any
    pub async fn find(&self, selector: &str) -> DriverResult<Option<Box<dyn PageElement>>> {
        Ok(self.query(selector).await?.into_iter().next())
    }

    /// Waits for an element to be present, up to the element-wait bound
    pub async fn wait_for(&self, selector: &str) -> DriverResult<Box<dyn PageElement>> {
        let limit = Duration::from_secs(self.config.element_wait_seconds);
        let started = Instant::now();

        loop {
            if let Some(element) = self.find(selector).await? {
                return Ok(element);
            }

            let elapsed = started.elapsed();
            if elapsed >= limit {
                return Err(SessionFault::Timeout {
                    operation: format!("Waiting for '{}'", selector),
                    seconds: limit.as_secs(),
                });
            }
            tokio::time::sleep(ELEMENT_POLL_INTERVAL.min(limit - elapsed)).await;
        }
    }
}
