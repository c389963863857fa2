//! Headless Chromium driver using chromiumoxide.

use super::driver::{DriverFactory, DriverResult, PageDriver, PageElement, SessionFault};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Launches headless Chromium instances
#[derive(Debug, Default, Clone, Copy)]
pub struct ChromiumFactory;

#[async_trait]
impl DriverFactory for ChromiumFactory {
    async fn launch(&self, config: &BrowserConfig) -> DriverResult<Box<dyn PageDriver>> {
        let page_load_timeout = Duration::from_secs(config.page_load_timeout_seconds);
        let script_timeout = Duration::from_secs(config.script_timeout_seconds);

        let mut builder = CdpBrowserConfig::builder()
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .window_size(config.window_width, config.window_height)
            .request_timeout(page_load_timeout.max(script_timeout));

        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| SessionFault::Launch(format!("invalid browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| SessionFault::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::trace!("Browser handler event error: {}", e);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| SessionFault::Launch(format!("failed to open tab: {}", e)))?;

        tracing::debug!(
            "Launched headless browser ({}x{})",
            config.window_width,
            config.window_height
        );

        Ok(Box::new(ChromiumDriver {
            browser,
            page,
            handler: Some(handler),
            page_load_timeout,
            script_timeout,
        }))
    }
}

/// A single Chromium tab
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    handler: Option<JoinHandle<()>>,
    page_load_timeout: Duration,
    script_timeout: Duration,
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> DriverResult<()> {
        let page = &self.page;
        let load = async move {
            page.goto(url).await?;
            page.wait_for_navigation().await?;
            Ok::<(), chromiumoxide::error::CdpError>(())
        };

        match tokio::time::timeout(self.page_load_timeout, load).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionFault::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            }),
            Err(_) => Err(SessionFault::Timeout {
                operation: format!("Loading {}", url),
                seconds: self.page_load_timeout.as_secs(),
            }),
        }
    }

    async fn query(&self, selector: &str) -> DriverResult<Vec<Box<dyn PageElement>>> {
        let elements = bounded(
            self.script_timeout,
            &format!("Querying '{}'", selector),
            self.page.find_elements(selector),
        )
        .await?;

        Ok(elements
            .into_iter()
            .map(|element| {
                Box::new(ChromiumElement {
                    element,
                    script_timeout: self.script_timeout,
                }) as Box<dyn PageElement>
            })
            .collect())
    }

    async fn shutdown(&mut self) -> DriverResult<()> {
        let result = self.browser.close().await;
        let _ = self.browser.wait().await;
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        result
            .map(|_| ())
            .map_err(|e| SessionFault::Command(format!("browser close failed: {}", e)))
    }
}

/// An element handle inside a Chromium tab
pub struct ChromiumElement {
    element: Element,
    script_timeout: Duration,
}

#[async_trait]
impl PageElement for ChromiumElement {
    async fn text(&self) -> DriverResult<String> {
        let text = bounded(self.script_timeout, "Reading text", self.element.inner_text()).await?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(&self, name: &str) -> DriverResult<Option<String>> {
        bounded(
            self.script_timeout,
            "Reading attribute",
            self.element.attribute(name),
        )
        .await
    }

    async fn is_checked(&self) -> DriverResult<bool> {
        let value = bounded(
            self.script_timeout,
            "Reading checked state",
            self.element.property("checked"),
        )
        .await?;
        Ok(value.and_then(|v| v.as_bool()).unwrap_or(false))
    }

    async fn click(&self) -> DriverResult<()> {
        bounded(
            self.script_timeout,
            "Clicking element",
            self.element
                .call_js_fn("function() { this.click(); }", false),
        )
        .await?;
        Ok(())
    }

    async fn scroll_into_view(&self) -> DriverResult<()> {
        bounded(
            self.script_timeout,
            "Scrolling element into view",
            self.element.scroll_into_view(),
        )
        .await?;
        Ok(())
    }

    async fn outer_html(&self) -> DriverResult<String> {
        let html = bounded(self.script_timeout, "Reading HTML", self.element.outer_html()).await?;
        Ok(html.unwrap_or_default())
    }
}

/// Runs a browser command under the script timeout
async fn bounded<T, F>(limit: Duration, operation: &str, command: F) -> DriverResult<T>
where
    F: Future<Output = Result<T, chromiumoxide::error::CdpError>>,
{
    match tokio::time::timeout(limit, command).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(SessionFault::Command(format!("{}: {}", operation, e))),
        Err(_) => Err(SessionFault::Timeout {
            operation: operation.to_string(),
            seconds: limit.as_secs(),
        }),
    }
}
