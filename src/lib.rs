//! Shop-Harvest: a rendered-catalog harvester
//!
//! This crate crawls category pages of a retail catalog through a headless
//! browser, extracts product summaries and their detail specifications, and
//! persists the merged result as JSON and a spreadsheet export. Page fetches
//! are bounded by a fixed-size pool and cached in an external key-value store.

pub mod browser;
pub mod cache;
pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod state;
pub mod url;

use std::time::Duration;
use thiserror::Error;

pub use browser::BrowserError;
pub use cache::CacheError;
pub use crawler::ParseError;

/// Main error type for Shop-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid link {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("No category links found in {origin}")]
    EmptyLinkList { origin: String },

    #[error("Page not found: {url} (title: {title:?})")]
    PageNotFound { url: String, title: String },

    #[error("Page {url} did not become ready within {timeout:?}")]
    ReadyTimeout { url: String, timeout: Duration },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Fetch pool was closed")]
    PoolClosed,

    #[error("Illegal run phase transition {from} -> {to}")]
    PhaseTransition { from: RunPhase, to: RunPhase },
}

/// Coarse classification of a [`HarvestError`], used at the process boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed configuration or input (bad URL, empty link list)
    FatalConfig,
    /// The upstream site misbehaved (missing page, page never became ready)
    FatalUpstream,
    /// A structural container was missing from a page
    Parse,
    /// Everything else: I/O, browser plumbing, cache miss-path failures
    Internal,
}

impl HarvestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::InvalidUrl { .. } | Self::EmptyLinkList { .. } => {
                ErrorKind::FatalConfig
            }
            Self::PageNotFound { .. } | Self::ReadyTimeout { .. } => ErrorKind::FatalUpstream,
            Self::Parse(_) => ErrorKind::Parse,
            _ => ErrorKind::Internal,
        }
    }

    /// Process exit code for this error; never zero
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::FatalConfig => 2,
            ErrorKind::FatalUpstream => 3,
            ErrorKind::Parse => 4,
            ErrorKind::Internal => 1,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Shop-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{CategoryResult, Product, ProductDetail, ProductStub, Spec, SpecGroup};
pub use state::RunPhase;
