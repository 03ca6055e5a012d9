//! Offline backend serving recorded pages
//!
//! `StaticBrowser` answers navigations from an in-memory map of URL to
//! rendered page. It is what the test suites drive the fetch pipeline with.
//! Every tab operation is logged with a `tokio::time::Instant`, so tests on
//! paused time can check how far apart two steps of a page load were.

use crate::browser::{Browser, BrowserResult, BrowserTab, READY_STATE_SCRIPT};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;

/// Title rendered for URLs that have no recorded page
pub const MISSING_PAGE_TITLE: &str = "404 Not Found";

/// A recorded page
#[derive(Debug, Clone)]
pub struct StaticPage {
    pub title: String,
    pub html: String,
    /// How many ready-state polls report `"loading"` before `"complete"`
    pub loading_polls: usize,
}

impl StaticPage {
    pub fn new(title: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            html: html.into(),
            loading_polls: 0,
        }
    }

    /// Reports `"loading"` for the first `polls` ready-state checks
    pub fn loading_for(mut self, polls: usize) -> Self {
        self.loading_polls = polls;
        self
    }

    /// Never reaches the `"complete"` ready-state
    pub fn never_ready(self) -> Self {
        self.loading_for(usize::MAX)
    }
}

/// A tab operation observed by the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    Navigated(String),
    /// A ready-state poll answered `"complete"`
    Ready,
    TitleRead,
    ContentRead,
}

#[derive(Default)]
struct Shared {
    pages: Mutex<HashMap<String, StaticPage>>,
    navigations: Mutex<Vec<String>>,
    events: Mutex<Vec<(TabEvent, Instant)>>,
    open_tabs: AtomicUsize,
    peak_open_tabs: AtomicUsize,
    tabs_opened: AtomicUsize,
}

/// In-memory browser
#[derive(Clone, Default)]
pub struct StaticBrowser {
    shared: Arc<Shared>,
}

impl StaticBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`StaticBrowser::insert`]
    pub fn with_page(self, url: impl Into<String>, page: StaticPage) -> Self {
        self.insert(url, page);
        self
    }

    /// Records `page` as the rendering of `url`
    pub fn insert(&self, url: impl Into<String>, page: StaticPage) {
        if let Ok(mut pages) = self.shared.pages.lock() {
            pages.insert(url.into(), page);
        }
    }

    /// Every URL navigated to, in order
    pub fn navigations(&self) -> Vec<String> {
        self.shared
            .navigations
            .lock()
            .map(|n| n.clone())
            .unwrap_or_default()
    }

    /// Every tab operation with the instant it happened, in order
    pub fn events(&self) -> Vec<(TabEvent, Instant)> {
        self.shared.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Instant of the first `event`, if it happened
    pub fn first_event(&self, event: &TabEvent) -> Option<Instant> {
        self.events()
            .into_iter()
            .find(|(e, _)| e == event)
            .map(|(_, at)| at)
    }

    /// How many times `url` was navigated to
    pub fn navigation_count(&self, url: &str) -> usize {
        self.navigations().iter().filter(|n| n.as_str() == url).count()
    }

    /// Total tabs opened over the browser's lifetime
    pub fn tabs_opened(&self) -> usize {
        self.shared.tabs_opened.load(Ordering::SeqCst)
    }

    /// Largest number of tabs that were open at the same time
    pub fn peak_open_tabs(&self) -> usize {
        self.shared.peak_open_tabs.load(Ordering::SeqCst)
    }

    /// Tabs currently open
    pub fn open_tabs(&self) -> usize {
        self.shared.open_tabs.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Browser for StaticBrowser {
    async fn open_tab(&self) -> BrowserResult<Box<dyn BrowserTab>> {
        self.shared.tabs_opened.fetch_add(1, Ordering::SeqCst);
        let open = self.shared.open_tabs.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.peak_open_tabs.fetch_max(open, Ordering::SeqCst);

        Ok(Box::new(StaticTab {
            shared: Arc::clone(&self.shared),
            page: None,
            polls: 0,
            closed: false,
        }))
    }
}

struct StaticTab {
    shared: Arc<Shared>,
    page: Option<StaticPage>,
    polls: usize,
    closed: bool,
}

impl StaticTab {
    fn record(&self, event: TabEvent) {
        if let Ok(mut events) = self.shared.events.lock() {
            events.push((event, Instant::now()));
        }
    }
}

#[async_trait]
impl BrowserTab for StaticTab {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        if let Ok(mut navigations) = self.shared.navigations.lock() {
            navigations.push(url.to_string());
        }
        self.record(TabEvent::Navigated(url.to_string()));

        let page = self
            .shared
            .pages
            .lock()
            .ok()
            .and_then(|pages| pages.get(url).cloned())
            .unwrap_or_else(|| {
                StaticPage::new(MISSING_PAGE_TITLE, "<html><body><h1>404</h1></body></html>")
            });

        self.page = Some(page);
        self.polls = 0;
        Ok(())
    }

    async fn execute_script(&mut self, script: &str) -> BrowserResult<Value> {
        if script != READY_STATE_SCRIPT {
            return Ok(Value::Null);
        }

        let state = match &self.page {
            None => "complete",
            Some(page) if self.polls >= page.loading_polls => "complete",
            Some(_) => "loading",
        };
        self.polls = self.polls.saturating_add(1);
        if state == "complete" {
            self.record(TabEvent::Ready);
        }
        Ok(Value::String(state.to_string()))
    }

    async fn title(&mut self) -> BrowserResult<Option<String>> {
        self.record(TabEvent::TitleRead);
        Ok(self.page.as_ref().map(|p| p.title.clone()))
    }

    async fn content(&mut self) -> BrowserResult<String> {
        self.record(TabEvent::ContentRead);
        Ok(self
            .page
            .as_ref()
            .map(|p| p.html.clone())
            .unwrap_or_else(|| "<html><head></head><body></body></html>".to_string()))
    }

    async fn close(&mut self) -> BrowserResult<()> {
        if !self.closed {
            self.closed = true;
            self.shared.open_tabs.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
