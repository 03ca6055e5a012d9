//! Integration tests for the harvester
//!
//! These tests serve recorded pages from a `StaticBrowser` and run the full
//! harvest cycle end-to-end: link list, listing and detail stages, page
//! cache, result file and spreadsheet export.

use shop_harvest::browser::{StaticBrowser, StaticPage};
use shop_harvest::cache::{CacheGateway, RedisStore, SqliteStore};
use shop_harvest::config::{CacheBackend, Config};
use shop_harvest::crawler::run_with_browser;
use shop_harvest::output::load_result;
use shop_harvest::{CategoryResult, HarvestError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

const PHONES: &str = "https://shop.test/catalog/phones/";
const LAPTOPS: &str = "https://shop.test/catalog/laptops/";

/// Renders a listing page with the given `(name, link, price)` cards
fn listing(title: &str, advertised: u32, cards: &[(&str, &str, &str)]) -> String {
    let cards: String = cards
        .iter()
        .map(|(name, link, price)| {
            format!(
                r#"<div class="catalog-product ui-button-widget">
                    <div class="catalog-product__image">
                        <a class="catalog-product__image-link" href="{link}">
                            <img data-src="https://cdn.shop.test/thumb{link}a.jpg">
                        </a>
                    </div>
                    <a class="catalog-product__name">{name}</a>
                    <div class="order-avail-wrap">In stock</div>
                    <div class="catalog-product__buy"><div class="product-buy__price-wrap">
                        <div class="product-buy__price">{price}&nbsp;₸<span class="product-buy__prev">1&nbsp;000&nbsp;000</span></div>
                    </div></div>
                </div>"#
            )
        })
        .collect();

    format!(
        r#"<html><body>
        <div class="products-page__title">
            <h1>{title}</h1>
            <span data-role="items-count" class="products-count">{advertised} товаров</span>
        </div>
        {cards}
        <ul><li data-page-number="1"></li><li data-page-number="4"></li></ul>
        </body></html>"#
    )
}

/// Renders a specification page with groups in the given order
fn detail(groups: &[(&str, &[(&str, &str)])]) -> String {
    let groups: String = groups
        .iter()
        .map(|(title, specs)| {
            let specs: String = specs
                .iter()
                .map(|(t, v)| {
                    format!(
                        r#"<li class="product-characteristics__spec">
                            <div class="product-characteristics__spec-title">{t}</div>
                            <div class="product-characteristics__spec-value">{v}</div>
                        </li>"#
                    )
                })
                .collect();
            format!(
                r#"<div class="product-characteristics__group">
                    <div class="product-characteristics__group-title">{title}</div>{specs}
                </div>"#
            )
        })
        .collect();

    format!(
        r#"<html><body>
        <div class="product-card-top__images"><picture>
            <source srcset="https://cdn.shop.test/thumb.webp">
            <source data-srcset="https://cdn.shop.test/full-1.webp">
        </picture></div>
        <div class="product-card-description-text"><p>Line one.</p><p>Line two.</p></div>
        <div class="product-card-tabs__contents">{groups}</div>
        </body></html>"#
    )
}

fn page(html: String) -> StaticPage {
    StaticPage::new("DNS", html).loading_for(2)
}

/// A two-category shop
fn create_test_shop() -> StaticBrowser {
    let phones = listing(
        "Smartphones",
        1520,
        &[
            ("Phone A", "/product/a/", "129&nbsp;990"),
            ("Phone B", "/product/b/", "89&nbsp;990"),
        ],
    );
    let laptops = listing("Laptops", 7, &[("Laptop C", "/product/c/", "450&nbsp;000")]);

    StaticBrowser::new()
        .with_page(PHONES, page(phones.clone()))
        .with_page(format!("{PHONES}?page=1"), page(phones))
        .with_page(LAPTOPS, page(laptops.clone()))
        .with_page(format!("{LAPTOPS}?page=1"), page(laptops))
        .with_page(
            "https://shop.test/product/a/characteristics/",
            page(detail(&[
                ("General", &[("Model", "A"), ("Color", "black")]),
                ("Display", &[("Diagonal", "6.1")]),
                ("Battery", &[("Capacity", "4000 mAh")]),
            ])),
        )
        .with_page(
            "https://shop.test/product/b/characteristics/",
            page(detail(&[("General", &[("Model", "B")])])),
        )
        .with_page(
            "https://shop.test/product/c/characteristics/",
            page(detail(&[("Processor", &[("Cores", "8")])])),
        )
}

/// Creates a test configuration writing into `dir`
fn create_test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.crawler.settle_delay_ms = 0;
    config.crawler.poll_interval_ms = 1;
    config.crawler.ready_timeout_secs = 5;
    config.site.base_url = "https://shop.test/".to_string();
    config.cache.backend = CacheBackend::Disabled;
    config.output.result_path = dir.join("catalog_result.json");
    config.output.export_path = dir.join("exported_data.csv");
    config
}

fn write_links(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("links.txt");
    std::fs::write(&path, contents).expect("Failed to write links file");
    path
}

#[tokio::test]
async fn test_full_harvest_two_categories() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let links = write_links(dir.path(), &format!("{PHONES}\n{LAPTOPS}\n"));
    let browser = create_test_shop();

    let results = run_with_browser(&config, &links, &browser, CacheGateway::disabled())
        .await
        .expect("Harvest failed");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Smartphones");
    assert_eq!(results[1].title, "Laptops");

    let phone_a = &results[0].products[0];
    assert_eq!(phone_a.stub.name, "Phone A");
    assert_eq!(phone_a.stub.price, "129\u{a0}990 KZT");
    assert_eq!(phone_a.extra.description, "Line one. Line two.");
    assert_eq!(phone_a.extra.image_links, vec!["https://cdn.shop.test/full-1.webp"]);

    // Result file holds the last category only
    let persisted = load_result(&config.output.result_path).unwrap();
    assert_eq!(persisted, results[1]);
    assert!(config.output.export_path.exists());
    assert_eq!(browser.open_tabs(), 0);
}

#[tokio::test]
async fn test_item_count_is_advisory() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let links = write_links(dir.path(), PHONES);

    let results = run_with_browser(&config, &links, &create_test_shop(), CacheGateway::disabled())
        .await
        .unwrap();

    let phones: &CategoryResult = &results[0];
    assert_eq!(phones.item_count, Some(1520));
    assert_eq!(phones.products.len(), 2);
}

#[tokio::test]
async fn test_blank_lines_are_skipped() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let links = write_links(dir.path(), &format!("\n{PHONES}\n   \n\n{LAPTOPS}\n\n"));
    let browser = create_test_shop();

    let results = run_with_browser(&config, &links, &browser, CacheGateway::disabled())
        .await
        .unwrap();

    let titles: Vec<_> = results.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec!["Smartphones", "Laptops"]);
}

#[tokio::test]
async fn test_empty_link_list_fetches_nothing() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let links = write_links(dir.path(), "\n\n  \n");
    let browser = create_test_shop();

    let err = run_with_browser(&config, &links, &browser, CacheGateway::disabled())
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::EmptyLinkList { .. }));
    assert_ne!(err.exit_code(), 0);
    assert_eq!(browser.tabs_opened(), 0);
    assert!(browser.navigations().is_empty());
}

#[tokio::test]
async fn test_invalid_link_fetches_nothing() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let links = write_links(dir.path(), &format!("{PHONES}\nwww.shop.test/catalog\n"));
    let browser = create_test_shop();

    let err = run_with_browser(&config, &links, &browser, CacheGateway::disabled())
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::InvalidUrl { .. }));
    assert_eq!(browser.tabs_opened(), 0);
}

#[tokio::test]
async fn test_spec_group_order_round_trips() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let links = write_links(dir.path(), PHONES);

    let results = run_with_browser(&config, &links, &create_test_shop(), CacheGateway::disabled())
        .await
        .unwrap();

    let persisted = load_result(&config.output.result_path).unwrap();
    assert_eq!(persisted, results[0]);

    let groups: Vec<_> = persisted.products[0]
        .extra
        .spec_groups
        .iter()
        .map(|g| g.title.as_str())
        .collect();
    assert_eq!(groups, vec!["General", "Display", "Battery"]);
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let links = write_links(dir.path(), PHONES);
    let gateway = CacheGateway::new(Arc::new(SqliteStore::in_memory().unwrap()));

    let first_browser = create_test_shop();
    let first = run_with_browser(&config, &links, &first_browser, gateway.clone())
        .await
        .unwrap();
    assert!(first_browser.tabs_opened() > 0);

    // An empty browser would render 404 for every page
    let second_browser = StaticBrowser::new();
    let second = run_with_browser(&config, &links, &second_browser, gateway)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(second_browser.tabs_opened(), 0);
}

#[tokio::test]
async fn test_unreachable_cache_does_not_fail_the_run() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let links = write_links(dir.path(), PHONES);
    let store = RedisStore::new("redis://127.0.0.1:1/", Duration::from_millis(200)).unwrap();

    let results = run_with_browser(
        &config,
        &links,
        &create_test_shop(),
        CacheGateway::new(Arc::new(store)),
    )
    .await
    .unwrap();

    assert_eq!(results[0].products.len(), 2);
}

#[tokio::test]
async fn test_missing_category_page_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path());
    let links = write_links(
        dir.path(),
        &format!("https://shop.test/catalog/gone/\n{PHONES}\n"),
    );
    let browser = create_test_shop();

    let err = run_with_browser(&config, &links, &browser, CacheGateway::disabled())
        .await
        .unwrap_err();

    assert!(matches!(err, HarvestError::PageNotFound { .. }));
    assert_eq!(err.exit_code(), 3);
    assert_eq!(browser.navigation_count(PHONES), 0);
}
