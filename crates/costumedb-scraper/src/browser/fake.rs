//! Scripted in-memory browser used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{BrowserLauncher, BrowserSession};
use crate::error::{BrowserError, BrowserErrorKind};

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeElement {
    text: String,
    attributes: HashMap<String, String>,
    broken: bool,
}

impl FakeElement {
    pub(crate) fn new(text: &str) -> Self {
        Self {
            text: text.to_owned(),
            ..Self::default()
        }
    }

    /// An element whose reads fail as if it detached from the document.
    pub(crate) fn broken() -> Self {
        Self {
            broken: true,
            ..Self::default()
        }
    }

    pub(crate) fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_owned(), value.to_owned());
        self
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakePage {
    elements: HashMap<String, Vec<FakeElement>>,
}

impl FakePage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn element(mut self, selector: &str, element: FakeElement) -> Self {
        self.elements
            .entry(selector.to_owned())
            .or_default()
            .push(element);
        self
    }

    pub(crate) fn text(self, selector: &str, text: &str) -> Self {
        self.element(selector, FakeElement::new(text))
    }
}

#[derive(Default)]
struct FakeState {
    pages: Mutex<HashMap<String, FakePage>>,
    /// url -> (kind, remaining failures)
    navigation_failures: Mutex<HashMap<String, (BrowserErrorKind, u32)>>,
    panic_on: Mutex<Option<String>>,
    current: Mutex<Option<FakePage>>,
    visits: Mutex<Vec<String>>,
    scripts: Mutex<Vec<String>>,
    closes: AtomicUsize,
}

/// Cheap to clone; clones share state so tests can inspect a session after
/// handing it to a launcher.
#[derive(Clone, Default)]
pub(crate) struct FakeSession {
    state: Arc<FakeState>,
}

impl FakeSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(self, url: &str, page: FakePage) -> Self {
        self.state
            .pages
            .lock()
            .unwrap()
            .insert(url.to_owned(), page);
        self
    }

    /// The next `times` navigations to `url` fail with `kind`.
    pub(crate) fn fail_navigation(self, url: &str, kind: BrowserErrorKind, times: u32) -> Self {
        self.state
            .navigation_failures
            .lock()
            .unwrap()
            .insert(url.to_owned(), (kind, times));
        self
    }

    pub(crate) fn panic_on(self, url: &str) -> Self {
        *self.state.panic_on.lock().unwrap() = Some(url.to_owned());
        self
    }

    pub(crate) fn visits(&self) -> Vec<String> {
        self.state.visits.lock().unwrap().clone()
    }

    pub(crate) fn scripts(&self) -> Vec<String> {
        self.state.scripts.lock().unwrap().clone()
    }

    pub(crate) fn close_count(&self) -> usize {
        self.state.closes.load(Ordering::SeqCst)
    }

    fn detached() -> BrowserError {
        BrowserError::new(BrowserErrorKind::Other, "node is detached from document")
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Element = FakeElement;

    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        if self.state.panic_on.lock().unwrap().as_deref() == Some(url) {
            panic!("scripted panic while loading {url}");
        }
        self.state.visits.lock().unwrap().push(url.to_owned());

        if let Some((kind, remaining)) = self.state.navigation_failures.lock().unwrap().get_mut(url)
        {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(BrowserError::new(*kind, format!("scripted failure for {url}")));
            }
        }

        let page = self
            .state
            .pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_default();
        *self.state.current.lock().unwrap() = Some(page);
        Ok(())
    }

    async fn find_element(&self, selector: &str) -> Result<FakeElement, BrowserError> {
        self.find_elements(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::not_found(selector))
    }

    async fn find_elements(&self, selector: &str) -> Result<Vec<FakeElement>, BrowserError> {
        Ok(self
            .state
            .current
            .lock()
            .unwrap()
            .as_ref()
            .and_then(|page| page.elements.get(selector).cloned())
            .unwrap_or_default())
    }

    async fn element_text(&self, element: &FakeElement) -> Result<String, BrowserError> {
        if element.broken {
            return Err(Self::detached());
        }
        Ok(element.text.clone())
    }

    async fn element_attribute(
        &self,
        element: &FakeElement,
        name: &str,
    ) -> Result<Option<String>, BrowserError> {
        if element.broken {
            return Err(Self::detached());
        }
        Ok(element.attributes.get(name).cloned())
    }

    async fn execute_script(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        self.state.scripts.lock().unwrap().push(script.to_owned());
        Ok(serde_json::Value::Null)
    }

    async fn close(&self) -> Result<(), BrowserError> {
        self.state.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out clones of one [`FakeSession`], or a scripted launch error.
#[derive(Default)]
pub(crate) struct FakeLauncher {
    session: FakeSession,
    launch_error: Option<BrowserError>,
    launches: AtomicUsize,
}

impl FakeLauncher {
    pub(crate) fn new(session: FakeSession) -> Self {
        Self {
            session,
            ..Self::default()
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            launch_error: Some(BrowserError::new(BrowserErrorKind::Launch, message)),
            ..Self::default()
        }
    }

    pub(crate) fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self) -> Result<FakeSession, BrowserError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        match &self.launch_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.session.clone()),
        }
    }
}
