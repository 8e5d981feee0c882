//! Headless Chromium sessions over the DevTools protocol.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use costumedb_core::AppConfig;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::{BrowserLauncher, BrowserSession};
use crate::error::{BrowserError, BrowserErrorKind};

#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    /// Browser binary; `None` lets chromiumoxide locate an installed Chrome.
    pub executable: Option<PathBuf>,
    pub user_agent: String,
    /// Upper bound for a navigation to commit.
    pub page_load_timeout: Duration,
    /// Upper bound for any other single protocol call.
    pub call_timeout: Duration,
}

impl ChromiumOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            executable: config.browser_executable.clone(),
            user_agent: config.browser_user_agent.clone(),
            page_load_timeout: Duration::from_secs(config.scraper_page_load_timeout_secs),
            call_timeout: Duration::from_secs(config.scraper_ready_timeout_secs.max(1)),
        }
    }
}

/// Launches one headless Chromium process per session.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    options: ChromiumOptions,
}

impl ChromiumLauncher {
    #[must_use]
    pub fn new(options: ChromiumOptions) -> Self {
        Self { options }
    }

    fn browser_config(&self) -> Result<BrowserConfig, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(self.options.page_load_timeout)
            .window_size(1920, 1080)
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", self.options.user_agent));
        if let Some(path) = &self.options.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(|reason| {
            BrowserError::new(
                BrowserErrorKind::Launch,
                format!("invalid browser config: {reason}"),
            )
        })
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn launch(&self) -> Result<ChromiumSession, BrowserError> {
        let config = self.browser_config()?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::new(BrowserErrorKind::Launch, e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::debug!(error = %err, "browser event handler error");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                handler.abort();
                return Err(BrowserError::new(
                    BrowserErrorKind::Launch,
                    format!("failed to open page: {err}"),
                ));
            }
        };

        tracing::debug!(
            executable = ?self.options.executable,
            "browser session started"
        );

        Ok(ChromiumSession {
            browser: Mutex::new(browser),
            page,
            handler,
            page_load_timeout: self.options.page_load_timeout,
            call_timeout: self.options.call_timeout,
        })
    }
}

/// A single tab in a dedicated Chromium process.
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    page_load_timeout: Duration,
    call_timeout: Duration,
}

/// Maps protocol errors onto the kinds callers branch on.
fn classify(err: &CdpError) -> BrowserError {
    let kind = match err {
        CdpError::Timeout => BrowserErrorKind::Timeout,
        CdpError::NotFound => BrowserErrorKind::NotFound,
        CdpError::Ws(_) | CdpError::NoResponse | CdpError::ChannelSendError(_) => {
            BrowserErrorKind::Disconnected
        }
        CdpError::JavascriptException(_) => BrowserErrorKind::Script,
        _ => BrowserErrorKind::Other,
    };
    BrowserError::new(kind, err.to_string())
}

async fn bounded<T, F>(limit: Duration, what: &str, fut: F) -> Result<T, BrowserError>
where
    F: Future<Output = Result<T, CdpError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(classify(&err)),
        Err(_) => Err(BrowserError::timeout(format!(
            "{what} exceeded {}ms",
            limit.as_millis()
        ))),
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        bounded(self.page_load_timeout, "navigation", self.page.goto(url)).await?;
        Ok(())
    }

    async fn find_element(&self, selector: &str) -> Result<Element, BrowserError> {
        self.find_elements(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::not_found(selector))
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<Element>, BrowserError> {
        bounded(
            self.call_timeout,
            "element lookup",
            self.page.find_elements(selector),
        )
        .await
    }

    async fn element_text(&self, element: &Element) -> Result<String, BrowserError> {
        let text = bounded(self.call_timeout, "text read", element.inner_text()).await?;
        Ok(text.unwrap_or_default())
    }

    async fn element_attribute(
        &self,
        element: &Element,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        bounded(self.call_timeout, "attribute read", element.attribute(name)).await
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let result = bounded(self.call_timeout, "script", self.page.evaluate(script)).await?;
        result
            .into_value::<serde_json::Value>()
            .map_err(|e| BrowserError::new(BrowserErrorKind::Script, e.to_string()))
    }

    async fn close(&self) -> Result<(), BrowserError> {
        if let Err(err) = self.page.clone().close().await {
            tracing::debug!(error = %err, "page close failed");
        }

        let mut browser = self.browser.lock().await;
        let result = bounded(self.call_timeout, "browser close", browser.close())
            .await
            .map(|_| ());
        if let Err(err) = browser.wait().await {
            tracing::debug!(error = %err, "waiting for browser exit failed");
        }
        self.handler.abort();
        tracing::debug!("browser session closed");
        result
    }
}
