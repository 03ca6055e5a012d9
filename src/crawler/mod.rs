//! Crawler module for page fetching and processing
//!
//! This module contains the core harvesting logic, including:
//! - Rate-limited, cached page fetching through a browser
//! - Listing and detail page parsing
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod parser;

pub use coordinator::{read_links, Coordinator};
pub use fetcher::{
    page_key, CachedFetcher, FetchPool, FetchSettings, Fetcher, PageFetcher, FETCH_OPERATION,
};
pub use parser::{discover_page_count, parse_detail, parse_listing, ParseError};

use crate::browser::{Browser, ChromiumBrowser};
use crate::cache::{open_gateway, CacheGateway};
use crate::config::Config;
use crate::model::CategoryResult;
use crate::Result;
use std::path::Path;

/// Runs a complete harvest against a real browser
///
/// This is the main entry point for a run. It will:
/// 1. Read the category links (an empty or invalid list stops here)
/// 2. Open the page cache selected by the configuration
/// 3. Launch Chromium
/// 4. Run every category through the coordinator
/// 5. Shut Chromium down, whether the run succeeded or not
///
/// # Arguments
///
/// * `config` - The harvest configuration
/// * `links_path` - Newline-delimited category link list
///
/// # Returns
///
/// * `Ok(Vec<CategoryResult>)` - One result per category link
/// * `Err(HarvestError)` - The first fatal error of the run
pub async fn run_harvest(config: &Config, links_path: &Path) -> Result<Vec<CategoryResult>> {
    let links = read_links(links_path)?;
    let gateway = open_gateway(&config.cache);

    let browser = ChromiumBrowser::launch(&config.browser, config.crawler.ready_timeout()).await?;
    let outcome = harvest_links(config, &links, &browser, gateway).await;
    browser.shutdown().await;

    outcome
}

/// Runs a harvest with a caller-supplied browser and cache
///
/// The links file is read before any page is fetched.
pub async fn run_with_browser(
    config: &Config,
    links_path: &Path,
    browser: &dyn Browser,
    gateway: CacheGateway,
) -> Result<Vec<CategoryResult>> {
    let links = read_links(links_path)?;
    harvest_links(config, &links, browser, gateway).await
}

async fn harvest_links(
    config: &Config,
    links: &[url::Url],
    browser: &dyn Browser,
    gateway: CacheGateway,
) -> Result<Vec<CategoryResult>> {
    let pool = FetchPool::new(config.crawler.max_concurrent_tasks);
    tracing::info!(
        slots = pool.capacity(),
        categories = links.len(),
        "Starting harvest"
    );

    let fetcher = CachedFetcher::new(
        PageFetcher::new(pool.clone(), FetchSettings::from(&config.crawler)),
        gateway,
        config.cache.ttl(),
    );

    let mut coordinator = Coordinator::new(config, fetcher)?;
    let outcome = coordinator.run(browser, links).await;

    // No fetch may start once the run has ended
    pool.close();
    outcome
}
