//! Browser automation seam.
//!
//! Scrapers talk to a page only through [`BrowserSession`]; the session's
//! lifetime belongs to whoever obtained it from a [`BrowserLauncher`].

mod chromium;
#[cfg(test)]
pub(crate) mod fake;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrowserError;

pub use chromium::{ChromiumLauncher, ChromiumOptions, ChromiumSession};

/// Interval between element lookups in the default
/// [`BrowserSession::wait_for_element`].
pub const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One live browser page. Calls are issued sequentially by a single owner.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Handle to an element found in the current document.
    type Element: Send + Sync;

    /// Loads `url` and waits for the navigation to commit.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// First element matching `selector`, or a `NotFound` error.
    async fn find_element(&self, selector: &str) -> Result<Self::Element, BrowserError>;

    /// All elements matching `selector` in document order; empty when none match.
    async fn find_elements(&self, selector: &str) -> Result<Vec<Self::Element>, BrowserError>;

    /// Rendered text of `element`, empty when it has none.
    async fn element_text(&self, element: &Self::Element) -> Result<String, BrowserError>;

    async fn element_attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> Result<Option<String>, BrowserError>;

    /// Evaluates `script` in the page and returns its JSON-converted result.
    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, BrowserError>;

    /// Shuts the session down. Further calls fail.
    async fn close(&self) -> Result<(), BrowserError>;

    /// Polls for `selector` until it appears or `timeout` elapses.
    ///
    /// Lookup errors other than `NotFound` end the wait immediately. A zero
    /// timeout performs exactly one lookup.
    async fn wait_for_element(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<Self::Element, BrowserError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.find_element(selector).await {
                Ok(element) => return Ok(element),
                Err(err) if err.kind == crate::error::BrowserErrorKind::NotFound => {}
                Err(err) => return Err(err),
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(BrowserError::timeout(format!(
                    "{selector} did not appear within {}ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(ELEMENT_POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

/// Creates browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    type Session: BrowserSession;

    async fn launch(&self) -> Result<Self::Session, BrowserError>;
}
