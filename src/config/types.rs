use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Shop-Harvest
///
/// Every section has defaults, so an absent config file is equivalent to an
/// empty one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub site: SiteConfig,
    pub cache: CacheConfig,
    pub browser: BrowserConfig,
    pub output: OutputConfig,
}

/// Fetch pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Capacity of the fetch pool
    pub max_concurrent_tasks: usize,

    /// Upper bound on listing pages fetched per category
    pub max_pages: u32,

    /// Ceiling for the document ready-state wait (seconds)
    pub ready_timeout_secs: u64,

    /// Wait after ready-state before reading content (milliseconds)
    pub settle_delay_ms: u64,

    /// Ready-state poll period (milliseconds)
    pub poll_interval_ms: u64,

    /// Title substring that marks a missing page
    pub not_found_marker: String,

    /// Isolate detail-page parse failures to the affected product
    pub skip_broken_products: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tasks: 10,
            max_pages: 1,
            ready_timeout_secs: 150,
            settle_delay_ms: 5000,
            poll_interval_ms: 250,
            not_found_marker: "404".to_string(),
            skip_broken_products: false,
        }
    }
}

impl CrawlerConfig {
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SiteConfig {
    /// Prefix that relative product links are resolved against
    pub base_url: String,

    /// Path segment appended to a product link to reach its specifications
    pub detail_suffix: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.dns-shop.kz/".to_string(),
            detail_suffix: "characteristics/".to_string(),
        }
    }
}

/// Which key-value store backs the page cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Redis,
    Sqlite,
    Disabled,
}

/// Page cache configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    pub backend: CacheBackend,

    pub redis_url: String,

    pub sqlite_path: PathBuf,

    /// Entry lifetime (seconds)
    pub ttl_secs: u64,

    /// Bound on establishing a store connection (milliseconds)
    pub connect_timeout_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Redis,
            redis_url: "redis://127.0.0.1:6379".to_string(),
            sqlite_path: PathBuf::from("./page-cache.db"),
            ttl_secs: 10 * 60 * 60,
            connect_timeout_ms: 2000,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Browser session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct BrowserConfig {
    pub headless: bool,

    pub no_sandbox: bool,

    pub single_process: bool,

    /// Chromium binary; auto-detected when unset
    pub executable: Option<PathBuf>,

    /// Extra command-line switches passed verbatim
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            no_sandbox: true,
            single_process: true,
            executable: None,
            args: Vec::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Structured result, overwritten after every category
    pub result_path: PathBuf,

    /// Spreadsheet export derived from the result file
    pub export_path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            result_path: PathBuf::from("catalog_result.json"),
            export_path: PathBuf::from("exported_data.csv"),
        }
    }
}
