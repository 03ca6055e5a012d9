//! Rate-limited page fetcher
//!
//! This module handles every page load of a run, including:
//! - Bounding in-flight loads with a fixed-size slot pool
//! - Driving a browser tab to the page and polling `document.readyState`
//! - Waiting out the settle delay before the rendered HTML is read
//! - Classifying not-found pages and ready-state timeouts as fatal
//! - Read-through caching of rendered pages
//!
//! There is no retry anywhere in this module. A page that does not become
//! ready in time fails the fetch on the first attempt.

use crate::browser::{Browser, BrowserError, BrowserTab, READY_STATE_SCRIPT};
use crate::cache::{CacheGateway, FetchKey};
use crate::config::CrawlerConfig;
use crate::url::validate_link;
use crate::{HarvestError, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Operation name used in page cache keys
pub const FETCH_OPERATION: &str = "get_page";

/// Builds the cache key of a page fetch
///
/// Only the URL identifies a fetch; the browser serving it is not part of
/// the key.
pub fn page_key(url: &str) -> FetchKey {
    FetchKey::new(FETCH_OPERATION, [url])
}

/// Fixed-size pool of fetch slots
///
/// Cloning shares the slots. A slot is held for the full duration of a page
/// load and returned when the permit is dropped, on success and on error.
#[derive(Debug, Clone)]
pub struct FetchPool {
    slots: Arc<Semaphore>,
    capacity: usize,
}

impl FetchPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots not currently held
    pub fn available(&self) -> usize {
        self.slots.available_permits()
    }

    /// Refuses every future acquire and wakes current waiters with an error
    ///
    /// Slots already held stay valid until dropped.
    pub fn close(&self) {
        self.slots.close();
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    /// Waits for a free slot
    ///
    /// # Errors
    ///
    /// * `PoolClosed` - the pool was closed before a slot became free
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.slots)
            .acquire_owned()
            .await
            .map_err(|_| HarvestError::PoolClosed)
    }
}

/// Timing and classification knobs of a page load
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub ready_timeout: Duration,
    pub settle_delay: Duration,
    pub poll_interval: Duration,
    pub not_found_marker: String,
}

impl From<&CrawlerConfig> for FetchSettings {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            ready_timeout: config.ready_timeout(),
            settle_delay: config.settle_delay(),
            poll_interval: config.poll_interval(),
            not_found_marker: config.not_found_marker.clone(),
        }
    }
}

/// Something that turns a URL into rendered HTML
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, browser: &dyn Browser, url: &str) -> Result<String>;
}

/// Loads pages in a browser, at most `pool.capacity()` at a time
pub struct PageFetcher {
    pool: FetchPool,
    settings: FetchSettings,
}

impl PageFetcher {
    pub fn new(pool: FetchPool, settings: FetchSettings) -> Self {
        Self { pool, settings }
    }

    pub fn pool(&self) -> &FetchPool {
        &self.pool
    }

    async fn load(&self, tab: &mut dyn BrowserTab, url: &str) -> Result<String> {
        let ready = tokio::time::timeout(
            self.settings.ready_timeout,
            self.navigate_and_wait(tab, url),
        )
        .await;

        match ready {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(self.classify(url, e)),
            Err(_) => {
                tracing::error!(url = %url, timeout = ?self.settings.ready_timeout, "Page did not become ready");
                return Err(self.ready_timeout(url));
            }
        }

        if !self.settings.settle_delay.is_zero() {
            tokio::time::sleep(self.settings.settle_delay).await;
        }

        let title = tab
            .title()
            .await
            .map_err(|e| self.classify(url, e))?
            .unwrap_or_default();
        if title.contains(&self.settings.not_found_marker) {
            tracing::error!(url = %url, title = %title, "Page not found");
            return Err(HarvestError::PageNotFound {
                url: url.to_string(),
                title,
            });
        }

        tab.content().await.map_err(|e| self.classify(url, e))
    }

    async fn navigate_and_wait(
        &self,
        tab: &mut dyn BrowserTab,
        url: &str,
    ) -> std::result::Result<(), BrowserError> {
        tab.navigate(url).await?;
        loop {
            let state = tab.execute_script(READY_STATE_SCRIPT).await?;
            if state.as_str() == Some("complete") {
                return Ok(());
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    fn ready_timeout(&self, url: &str) -> HarvestError {
        HarvestError::ReadyTimeout {
            url: url.to_string(),
            timeout: self.settings.ready_timeout,
        }
    }

    fn classify(&self, url: &str, err: BrowserError) -> HarvestError {
        match err {
            BrowserError::Timeout(_) => self.ready_timeout(url),
            other => other.into(),
        }
    }
}

#[async_trait]
impl Fetcher for PageFetcher {
    /// Loads `url` in a fresh tab and returns the rendered HTML
    ///
    /// # Errors
    ///
    /// * `InvalidUrl` - `url` is not an absolute http(s) URL; no slot is taken
    /// * `ReadyTimeout` - the page did not reach ready-state in time
    /// * `PageNotFound` - the page title carries the not-found marker
    /// * `Browser` - any other backend failure
    async fn fetch(&self, browser: &dyn Browser, url: &str) -> Result<String> {
        let target = validate_link(url)?;
        let _slot = self.pool.acquire().await?;

        tracing::info!(url = %target, "Requesting page");

        let mut tab = browser.open_tab().await?;
        let outcome = self.load(tab.as_mut(), target.as_str()).await;

        if let Err(e) = tab.close().await {
            tracing::warn!(url = %target, "Failed to close tab: {}", e);
        }

        outcome
    }
}

/// Read-through caching around another fetcher
pub struct CachedFetcher<F> {
    inner: F,
    gateway: CacheGateway,
    ttl: Duration,
}

impl<F: Fetcher> CachedFetcher<F> {
    pub fn new(inner: F, gateway: CacheGateway, ttl: Duration) -> Self {
        Self {
            inner,
            gateway,
            ttl,
        }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for CachedFetcher<F> {
    async fn fetch(&self, browser: &dyn Browser, url: &str) -> Result<String> {
        self.gateway
            .cached_call(page_key(url), self.ttl, || self.inner.fetch(browser, url))
            .await
    }
}
