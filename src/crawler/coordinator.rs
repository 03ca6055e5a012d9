//! Harvest coordinator - main run orchestration logic
//!
//! This module contains the run loop that takes every category link through
//! the listing and detail stages, including:
//! - Reading and validating the category link list
//! - Fetching listing pages concurrently under the fetch pool
//! - Fetching product detail pages one at a time, in listing order
//! - Persisting and exporting each category as soon as it is complete
//!
//! Categories are processed strictly one after another. The first fatal
//! error ends the run; there is no resume, a restart reprocesses everything
//! and relies on the page cache to skip work already done.

use crate::browser::Browser;
use crate::config::Config;
use crate::crawler::fetcher::Fetcher;
use crate::crawler::parser::{discover_page_count, parse_detail, parse_listing, ParseError};
use crate::model::{CategoryResult, ListingPage, ProductDetail, ProductStub};
use crate::output::{export_spreadsheet, persist_result};
use crate::state::RunPhase;
use crate::url::{detail_url, page_url, validate_link};
use crate::{HarvestError, Result};
use futures::future::try_join_all;
use std::path::{Path, PathBuf};
use url::Url;

/// Reads the newline-delimited category link list
///
/// Blank lines are skipped with a warning. Every other line must be an
/// absolute http(s) URL.
///
/// # Errors
///
/// * `Io` - the file could not be read
/// * `InvalidUrl` - a non-blank line is not a valid link
/// * `EmptyLinkList` - the file has no non-blank lines
pub fn read_links(path: &Path) -> Result<Vec<Url>> {
    let contents = std::fs::read_to_string(path)?;
    let mut links = Vec::new();

    for (index, line) in contents.lines().enumerate() {
        let link = line.trim();
        if link.is_empty() {
            tracing::warn!(line = index + 1, "Skipping empty link");
            continue;
        }
        links.push(validate_link(link)?);
    }

    if links.is_empty() {
        tracing::error!(path = %path.display(), "No category links found");
        return Err(HarvestError::EmptyLinkList {
            origin: path.display().to_string(),
        });
    }

    tracing::info!(count = links.len(), "Loaded category links");
    Ok(links)
}

/// Main run coordinator structure
pub struct Coordinator<F> {
    fetcher: F,
    site_base: Url,
    detail_suffix: String,
    max_pages: u32,
    skip_broken_products: bool,
    result_path: PathBuf,
    export_path: PathBuf,
    phase: RunPhase,
}

impl<F: Fetcher> Coordinator<F> {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration
    /// * `fetcher` - Performs every page fetch of the run
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run, in the `ReadLinks` phase
    /// * `Err(HarvestError)` - The configured site base URL is invalid
    pub fn new(config: &Config, fetcher: F) -> Result<Self> {
        let site_base = validate_link(&config.site.base_url)?;

        Ok(Self {
            fetcher,
            site_base,
            detail_suffix: config.site.detail_suffix.clone(),
            max_pages: config.crawler.max_pages.max(1),
            skip_broken_products: config.crawler.skip_broken_products,
            result_path: config.output.result_path.clone(),
            export_path: config.output.export_path.clone(),
            phase: RunPhase::ReadLinks,
        })
    }

    /// The phase the run is currently in
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    fn advance(&mut self, next: RunPhase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(HarvestError::PhaseTransition {
                from: self.phase,
                to: next,
            });
        }
        tracing::debug!(from = %self.phase, to = %next, "Run phase");
        self.phase = next;
        Ok(())
    }

    /// Runs every category through the pipeline
    ///
    /// For each link, in order:
    /// 1. Fetch the category page to discover the page count, then fetch the
    ///    listing pages concurrently
    /// 2. Parse the listing pages into product stubs
    /// 3. Fetch and parse each stub's detail page, one at a time
    /// 4. Merge details into the stubs
    /// 5. Overwrite the result file with the category result
    /// 6. Export the result file as a spreadsheet
    ///
    /// Returns the results of all categories in link order. An empty `links`
    /// is rejected with `EmptyLinkList` before anything is fetched.
    pub async fn run(&mut self, browser: &dyn Browser, links: &[Url]) -> Result<Vec<CategoryResult>> {
        if links.is_empty() {
            return Err(HarvestError::EmptyLinkList {
                origin: "category link list".to_string(),
            });
        }

        let mut results = Vec::with_capacity(links.len());

        for link in links {
            tracing::info!(link = %link, "Parsing shop link");
            let result = self.harvest_category(browser, link).await?;

            self.advance(RunPhase::Persist)?;
            persist_result(&result, &self.result_path)?;

            self.advance(RunPhase::Export)?;
            export_spreadsheet(&self.result_path, &self.export_path)?;

            results.push(result);
        }

        self.advance(RunPhase::Done)?;
        tracing::info!(categories = results.len(), "Harvest complete");
        Ok(results)
    }

    async fn harvest_category(&mut self, browser: &dyn Browser, link: &Url) -> Result<CategoryResult> {
        self.advance(RunPhase::FetchListing)?;
        let pages = self.fetch_listing_pages(browser, link).await?;

        self.advance(RunPhase::ParseListing)?;
        let listing = merge_listing_pages(&pages)?;
        tracing::info!(
            title = %listing.title,
            stubs = listing.stubs.len(),
            "Listing parsed"
        );

        self.advance(RunPhase::FanOutDetails)?;
        let details = self.fetch_details(browser, &listing.stubs).await?;

        self.advance(RunPhase::MergeResults)?;
        let products = listing
            .stubs
            .into_iter()
            .zip(details)
            .map(|(stub, detail)| stub.into_product(detail))
            .collect();

        Ok(CategoryResult {
            title: listing.title,
            item_count: listing.item_count,
            products,
        })
    }

    async fn fetch_listing_pages(&self, browser: &dyn Browser, link: &Url) -> Result<Vec<String>> {
        let category_page = self.fetcher.fetch(browser, link.as_str()).await?;
        let discovered = discover_page_count(&category_page);
        let last_page = discovered.min(self.max_pages);
        tracing::debug!(discovered, fetching = last_page, "Pages in this category");

        let urls = (1..=last_page)
            .map(|page| page_url(link, page))
            .collect::<Result<Vec<_>>>()?;

        try_join_all(urls.iter().map(|url| {
            tracing::debug!(url = %url, "Requesting listing page");
            self.fetcher.fetch(browser, url.as_str())
        }))
        .await
    }

    async fn fetch_details(&self, browser: &dyn Browser, stubs: &[ProductStub]) -> Result<Vec<ProductDetail>> {
        let mut details = Vec::with_capacity(stubs.len());

        for stub in stubs {
            let Some(link) = stub.detail_link.as_deref() else {
                tracing::warn!(name = %stub.name, "Product has no detail link");
                details.push(ProductDetail::unavailable());
                continue;
            };

            let url = detail_url(&self.site_base, link, &self.detail_suffix)?;
            let html = self.fetcher.fetch(browser, url.as_str()).await?;

            let detail = match parse_detail(&html) {
                Ok(detail) => detail,
                Err(e) if self.skip_broken_products => {
                    tracing::warn!(name = %stub.name, url = %url, "Skipping broken product page: {}", e);
                    ProductDetail::unavailable()
                }
                Err(e) => return Err(e.into()),
            };
            details.push(detail);
        }

        Ok(details)
    }
}

/// Parses listing pages in page order and concatenates their stubs
///
/// Title and item count come from the first page.
fn merge_listing_pages(pages: &[String]) -> Result<ListingPage> {
    let mut parsed = Vec::with_capacity(pages.len());
    for html in pages {
        parsed.push(parse_listing(html)?);
    }

    parsed
        .into_iter()
        .reduce(|mut merged, page| {
            merged.stubs.extend(page.stubs);
            merged
        })
        .ok_or(HarvestError::Parse(ParseError::MissingElement(
            "catalog listing page",
        )))
}
