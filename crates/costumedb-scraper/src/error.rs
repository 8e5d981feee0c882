use std::fmt;

use costumedb_core::ScrapeOutcome;
use thiserror::Error;

/// Category of a browser-session failure.
///
/// Callers decide whether to retry by inspecting the kind, never by matching
/// on the error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserErrorKind {
    /// A selector matched nothing.
    NotFound,
    /// A navigation, wait, or protocol call exceeded its deadline.
    Timeout,
    /// The connection to the browser process was lost.
    Disconnected,
    /// A script evaluated in the page threw or returned an unreadable value.
    Script,
    /// The browser process could not be started.
    Launch,
    Other,
}

impl fmt::Display for BrowserErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::NotFound => "not found",
            Self::Timeout => "timeout",
            Self::Disconnected => "disconnected",
            Self::Script => "script error",
            Self::Launch => "launch failed",
            Self::Other => "browser error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct BrowserError {
    pub kind: BrowserErrorKind,
    pub message: String,
}

impl BrowserError {
    pub fn new(kind: BrowserErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(selector: &str) -> Self {
        Self::new(BrowserErrorKind::NotFound, format!("no element matches {selector}"))
    }

    pub fn timeout(what: impl Into<String>) -> Self {
        Self::new(BrowserErrorKind::Timeout, what)
    }

    /// Returns `true` for failures that may clear up on a fresh attempt.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.kind,
            BrowserErrorKind::Timeout | BrowserErrorKind::Disconnected
        )
    }

    /// Returns `true` when a wait ended without the element showing up.
    #[must_use]
    pub fn is_missing_element(&self) -> bool {
        matches!(
            self.kind,
            BrowserErrorKind::Timeout | BrowserErrorKind::NotFound
        )
    }
}

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to start browser session: {0}")]
    Launch(#[source] BrowserError),

    #[error("navigation to {url} failed: {source}")]
    Navigation {
        url: String,
        #[source]
        source: BrowserError,
    },

    #[error("page {url} not ready: {selector} did not appear within {timeout_ms}ms")]
    NotReady {
        url: String,
        selector: String,
        timeout_ms: u128,
    },

    #[error("page {url} loaded without a product title")]
    EmptyTitle { url: String },

    #[error("browser session failed while reading {url}: {source}")]
    Session {
        url: String,
        #[source]
        source: BrowserError,
    },
}

impl ScrapeError {
    /// Returns `true` if the failure is transient and the page is worth
    /// loading again.
    ///
    /// Not-ready pages and empty titles are treated as transient because both
    /// are what a throttled or half-rendered page looks like. Launch failures
    /// are never retried per item.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Launch(_) => false,
            Self::NotReady { .. } | Self::EmptyTitle { .. } => true,
            Self::Navigation { source, .. } | Self::Session { source, .. } => {
                source.is_transient()
            }
        }
    }

    /// Builds the per-item failure outcome without consuming the error.
    #[must_use]
    pub fn to_outcome(&self) -> ScrapeOutcome {
        ScrapeOutcome::Failure {
            reason: self.to_string(),
            retriable: self.is_retriable(),
        }
    }
}

impl From<ScrapeError> for ScrapeOutcome {
    fn from(err: ScrapeError) -> Self {
        err.to_outcome()
    }
}

#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("sitemap {url} lists no pages")]
    Empty { url: String },

    #[error("malformed sitemap XML: {0}")]
    Xml(#[from] quick_xml::Error),
}
