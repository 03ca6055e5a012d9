//! Rendering backend
//!
//! The crawler only needs a small slice of a browser: open a tab, navigate,
//! evaluate a script (to poll `document.readyState`), read the title and read
//! the rendered HTML. Those operations are expressed as the [`Browser`] and
//! [`BrowserTab`] traits so the fetch pipeline can run against Chromium in
//! production and against recorded pages in tests.

mod chromium;
#[cfg(any(test, feature = "test-util"))]
mod fixture;

pub use chromium::ChromiumBrowser;
#[cfg(any(test, feature = "test-util"))]
pub use fixture::{StaticBrowser, StaticPage, TabEvent};

use async_trait::async_trait;
use thiserror::Error;

/// Script whose result is the document ready-state string
pub const READY_STATE_SCRIPT: &str = "document.readyState";

/// Errors raised by a rendering backend
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Browser request timed out: {0}")]
    Timeout(String),

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

/// Result type for rendering backend operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// A running browser that can hand out tabs
///
/// One browser is shared by every fetch of a run. Each fetch navigates in its
/// own tab, so concurrent fetches never drive the same page.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens a fresh blank tab
    async fn open_tab(&self) -> BrowserResult<Box<dyn BrowserTab>>;
}

/// A single browser tab
#[async_trait]
pub trait BrowserTab: Send {
    /// Loads `url` in this tab
    async fn navigate(&mut self, url: &str) -> BrowserResult<()>;

    /// Evaluates `script` in the page and returns its JSON value
    async fn execute_script(&mut self, script: &str) -> BrowserResult<serde_json::Value>;

    /// Current document title, if any
    async fn title(&mut self) -> BrowserResult<Option<String>>;

    /// Current rendered HTML
    async fn content(&mut self) -> BrowserResult<String>;

    /// Closes the tab; the tab must not be used afterwards
    async fn close(&mut self) -> BrowserResult<()>;
}
