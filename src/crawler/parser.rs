//! HTML parsers for catalog pages
//!
//! This module turns rendered markup into the catalog model:
//! - Listing pages into a category title, advertised item count and product stubs
//! - Product specification pages into spec groups, description and image links
//! - The first listing page into the number of pages in the category
//!
//! All functions are pure. Only a missing structural container is an error;
//! any other missing field falls back to a sentinel or `None`.

use crate::model::{
    ListingPage, ProductDetail, ProductStub, Spec, SpecGroup, AVAILABILITY_NOT_AVAILABLE,
    DESCRIPTION_NOT_FOUND, PRICE_NOT_AVAILABLE,
};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Errors raised when a page's structure is not what the parsers expect
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("Required element missing: {0}")]
    MissingElement(&'static str),

    #[error("Invalid selector {selector:?}: {message}")]
    Selector {
        selector: &'static str,
        message: String,
    },
}

const LISTING_HEADER: &str = "div.products-page__title";
const LISTING_TITLE: &str = "h1";
const LISTING_ITEM_COUNT: &str = r#"span.products-count[data-role="items-count"]"#;
const PRODUCT_CARD: &str = "div.catalog-product.ui-button-widget";
const CARD_NAME: &str = "a.catalog-product__name";
const CARD_PRICE: &str =
    "div.catalog-product__buy div.product-buy__price-wrap div.product-buy__price";
const PREVIOUS_PRICE_CLASS: &str = "product-buy__prev";
const CARD_AVAILABILITY: &str = "div.order-avail-wrap";
const CARD_LINK: &str = "div.catalog-product__image a.catalog-product__image-link";
const CARD_THUMBNAIL: &str = "div.catalog-product__image img";
const PAGE_NUMBER: &str = "li[data-page-number]";

const DETAIL_CONTAINER: &str = "div.product-card-tabs__contents";
const SPEC_GROUP: &str = ".product-characteristics__group";
const SPEC_GROUP_TITLE: &str = ".product-characteristics__group-title";
const SPEC_ROW: &str = ".product-characteristics__spec";
const SPEC_TITLE: &str = ".product-characteristics__spec-title";
const SPEC_VALUE: &str = ".product-characteristics__spec-value";
const DESCRIPTION: &str = "div.product-card-description-text";
const DESCRIPTION_PARAGRAPH: &str = "p";
const IMAGE_BLOCK: &str = ".product-card-top__images";
const IMAGE_SOURCE: &str = "picture source";
const RESPONSIVE_SOURCE_ATTR: &str = "data-srcset";

/// Currency glyph as rendered by the site, preceded by a no-break space
const RENDERED_CURRENCY: &str = "\u{a0}₸";
const CURRENCY_SUFFIX: &str = " KZT";

fn selector(css: &'static str) -> Result<Selector, ParseError> {
    Selector::parse(css).map_err(|e| ParseError::Selector {
        selector: css,
        message: e.to_string(),
    })
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(|el| element_text(el).trim().to_string())
}

struct CardSelectors {
    name: Selector,
    price: Selector,
    availability: Selector,
    link: Selector,
    thumbnail: Selector,
}

impl CardSelectors {
    fn new() -> Result<Self, ParseError> {
        Ok(Self {
            name: selector(CARD_NAME)?,
            price: selector(CARD_PRICE)?,
            availability: selector(CARD_AVAILABILITY)?,
            link: selector(CARD_LINK)?,
            thumbnail: selector(CARD_THUMBNAIL)?,
        })
    }
}

/// Parses a rendered category listing page
///
/// # Errors
///
/// Returns [`ParseError::MissingElement`] when the listing header or its
/// title cannot be found; that means the page layout changed upstream.
///
/// # Example
///
/// ```
/// use shop_harvest::crawler::parse_listing;
///
/// let html = r#"<div class="products-page__title"><h1>Phones</h1></div>"#;
/// let page = parse_listing(html).unwrap();
/// assert_eq!(page.title, "Phones");
/// assert!(page.stubs.is_empty());
/// ```
pub fn parse_listing(html: &str) -> Result<ListingPage, ParseError> {
    let document = Html::parse_document(html);

    let header = document
        .select(&selector(LISTING_HEADER)?)
        .next()
        .ok_or(ParseError::MissingElement(LISTING_HEADER))?;

    let title = first_text(header, &selector(LISTING_TITLE)?)
        .ok_or(ParseError::MissingElement("products-page__title h1"))?;
    tracing::info!(title = %title, "Category title");

    let item_count = first_text(header, &selector(LISTING_ITEM_COUNT)?)
        .and_then(|raw| leading_number(&raw));
    tracing::info!(item_count = ?item_count, "Category item count");

    let card_selectors = CardSelectors::new()?;
    let mut stubs = Vec::new();

    for card in document.select(&selector(PRODUCT_CARD)?) {
        match parse_card(card, &card_selectors) {
            Some(stub) => {
                tracing::debug!(
                    name = %stub.name,
                    price = %stub.price,
                    availability = %stub.availability,
                    link = ?stub.detail_link,
                    thumb = ?stub.thumbnail,
                    "Parsed product card"
                );
                stubs.push(stub);
            }
            None => tracing::warn!("Skipping product card without a name"),
        }
    }

    Ok(ListingPage {
        title,
        item_count,
        stubs,
    })
}

fn parse_card(card: ElementRef<'_>, selectors: &CardSelectors) -> Option<ProductStub> {
    let name = first_text(card, &selectors.name)?;

    let price = card
        .select(&selectors.price)
        .next()
        .map(|el| normalize_price(&current_price_text(el)))
        .unwrap_or_else(|| PRICE_NOT_AVAILABLE.to_string());

    let availability = first_text(card, &selectors.availability)
        .unwrap_or_else(|| AVAILABILITY_NOT_AVAILABLE.to_string());

    let detail_link = card
        .select(&selectors.link)
        .next()
        .and_then(|el| el.value().attr("href"))
        .map(str::trim)
        .filter(|href| !href.is_empty())
        .map(str::to_string);

    let thumbnail = card
        .select(&selectors.thumbnail)
        .next()
        .and_then(|el| el.value().attr("data-src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string);

    Some(ProductStub {
        name,
        price,
        availability,
        detail_link,
        thumbnail,
    })
}

/// Text of the price element, skipping anything inside a previous-price span
fn current_price_text(price: ElementRef<'_>) -> String {
    price
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let in_previous_price = node
                .ancestors()
                .take_while(|ancestor| ancestor.id() != price.id())
                .filter_map(|ancestor| ancestor.value().as_element())
                .any(|el| el.classes().any(|class| class == PREVIOUS_PRICE_CLASS));
            if in_previous_price {
                None
            } else {
                Some(&**text)
            }
        })
        .collect()
}

fn normalize_price(raw: &str) -> String {
    raw.trim().replace(RENDERED_CURRENCY, CURRENCY_SUFFIX)
}

fn leading_number(raw: &str) -> Option<u32> {
    let digits: String = raw
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Returns the highest page number advertised by a listing's paginator
///
/// A listing without a paginator has a single page.
pub fn discover_page_count(html: &str) -> u32 {
    let document = Html::parse_document(html);
    let Ok(page_selector) = selector(PAGE_NUMBER) else {
        return 1;
    };

    document
        .select(&page_selector)
        .filter_map(|li| li.value().attr("data-page-number"))
        .filter_map(|n| n.trim().parse::<u32>().ok())
        .max()
        .unwrap_or(1)
        .max(1)
}

/// Parses a rendered product specification page
///
/// Spec groups and the specs inside them keep document order. Image links
/// come only from `picture source` elements carrying `data-srcset`; the
/// thumbnail variant, which the site renders with a plain `srcset`, is left
/// out on purpose.
///
/// # Errors
///
/// Returns [`ParseError::MissingElement`] when the characteristics container
/// is absent.
pub fn parse_detail(html: &str) -> Result<ProductDetail, ParseError> {
    let document = Html::parse_document(html);

    let container = document
        .select(&selector(DETAIL_CONTAINER)?)
        .next()
        .ok_or(ParseError::MissingElement(DETAIL_CONTAINER))?;

    let group_title = selector(SPEC_GROUP_TITLE)?;
    let spec_row = selector(SPEC_ROW)?;
    let spec_title = selector(SPEC_TITLE)?;
    let spec_value = selector(SPEC_VALUE)?;

    let spec_groups = container
        .select(&selector(SPEC_GROUP)?)
        .map(|group| SpecGroup {
            title: first_text(group, &group_title).unwrap_or_default(),
            specs: group
                .select(&spec_row)
                .map(|row| Spec {
                    title: first_text(row, &spec_title).unwrap_or_default(),
                    value: first_text(row, &spec_value).unwrap_or_default(),
                })
                .collect(),
        })
        .collect();

    let paragraph = selector(DESCRIPTION_PARAGRAPH)?;
    let description = document
        .select(&selector(DESCRIPTION)?)
        .next()
        .map(|block| {
            block
                .select(&paragraph)
                .map(element_text)
                .collect::<Vec<_>>()
                .join(" ")
        })
        .unwrap_or_else(|| DESCRIPTION_NOT_FOUND.to_string());

    let image_source = selector(IMAGE_SOURCE)?;
    let image_links = document
        .select(&selector(IMAGE_BLOCK)?)
        .next()
        .map(|block| {
            block
                .select(&image_source)
                .filter_map(|source| source.value().attr(RESPONSIVE_SOURCE_ATTR))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Ok(ProductDetail {
        spec_groups,
        description,
        image_links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body>
        <div class="products-page__title">
            <h1>Smartphones</h1>
            <span data-role="items-count" class="products-count">1520 items</span>
        </div>
        <div class="catalog-product ui-button-widget">
            <div class="catalog-product__image">
                <a class="catalog-product__image-link" href="/product/aa11/phone-a/">
                    <img data-src="https://c.dns-shop.kz/thumb/a.jpg">
                </a>
            </div>
            <a class="catalog-product__name"> Phone A 128 GB </a>
            <div class="order-avail-wrap"> In stock: 3 stores </div>
            <div class="catalog-product__buy">
                <div class="product-buy__price-wrap">
                    <div class="product-buy__price">129&nbsp;990&nbsp;₸</div>
                </div>
            </div>
        </div>
        <div class="catalog-product ui-button-widget">
            <div class="catalog-product__image">
                <a class="catalog-product__image-link" href="/product/bb22/phone-b/">
                    <img data-src="https://c.dns-shop.kz/thumb/b.jpg">
                </a>
            </div>
            <a class="catalog-product__name">Phone B</a>
            <div class="catalog-product__buy">
                <div class="product-buy__price-wrap">
                    <div class="product-buy__price product-buy__price_active">89&nbsp;990&nbsp;₸<span class="product-buy__prev">99&nbsp;990</span></div>
                </div>
            </div>
        </div>
        <div class="catalog-product ui-button-widget">
            <div class="catalog-product__image"></div>
            <a class="catalog-product__name">Phone C</a>
            <div class="catalog-product__buy">
                <div class="product-buy__price-wrap"></div>
            </div>
        </div>
        <ul class="pagination-widget__pages">
            <li data-page-number="1"></li>
            <li data-page-number="2"></li>
            <li data-page-number="12"></li>
            <li data-page-number="3"></li>
        </ul>
        </body></html>
    "#;

    const DETAIL: &str = r#"
        <html><body>
        <div class="product-card-top__images">
            <picture>
                <source type="image/webp" srcset="https://c.dns-shop.kz/thumb/a.webp">
                <img src="https://c.dns-shop.kz/thumb/a.jpg">
            </picture>
            <picture>
                <source type="image/webp" data-srcset="https://c.dns-shop.kz/full/a1.webp">
            </picture>
            <picture>
                <source type="image/webp" data-srcset="https://c.dns-shop.kz/full/a2.webp">
            </picture>
        </div>
        <div class="product-card-description-text">
            <p>Fast phone.</p>
            <p>Long battery.</p>
        </div>
        <div class="product-card-tabs__contents">
            <div class="product-characteristics__group">
                <div class="product-characteristics__group-title"> General </div>
                <li class="product-characteristics__spec">
                    <div class="product-characteristics__spec-title"> Model </div>
                    <div class="product-characteristics__spec-value"> A </div>
                </li>
                <li class="product-characteristics__spec">
                    <div class="product-characteristics__spec-title">Color</div>
                    <div class="product-characteristics__spec-value">black</div>
                </li>
            </div>
            <div class="product-characteristics__group">
                <div class="product-characteristics__group-title">Display</div>
                <li class="product-characteristics__spec">
                    <div class="product-characteristics__spec-title">Diagonal</div>
                    <div class="product-characteristics__spec-value">6.1"</div>
                </li>
            </div>
        </div>
        </body></html>
    "#;

    #[test]
    fn test_listing_header() {
        let page = parse_listing(LISTING).unwrap();
        assert_eq!(page.title, "Smartphones");
        assert_eq!(page.item_count, Some(1520));
        assert_eq!(page.stubs.len(), 3);
    }

    #[test]
    fn test_listing_preserves_card_order() {
        let page = parse_listing(LISTING).unwrap();
        let names: Vec<_> = page.stubs.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Phone A 128 GB", "Phone B", "Phone C"]);
    }

    #[test]
    fn test_price_currency_normalized() {
        let page = parse_listing(LISTING).unwrap();
        assert_eq!(page.stubs[0].price, "129\u{a0}990 KZT");
    }

    #[test]
    fn test_previous_price_is_excluded() {
        let page = parse_listing(LISTING).unwrap();
        assert_eq!(page.stubs[1].price, "89\u{a0}990 KZT");
        assert!(!page.stubs[1].price.contains("99\u{a0}990"));
    }

    #[test]
    fn test_missing_price_uses_sentinel() {
        let page = parse_listing(LISTING).unwrap();
        assert_eq!(page.stubs[2].price, PRICE_NOT_AVAILABLE);
    }

    #[test]
    fn test_availability() {
        let page = parse_listing(LISTING).unwrap();
        assert_eq!(page.stubs[0].availability, "In stock: 3 stores");
        assert_eq!(page.stubs[1].availability, AVAILABILITY_NOT_AVAILABLE);
    }

    #[test]
    fn test_links_and_thumbnails() {
        let page = parse_listing(LISTING).unwrap();
        assert_eq!(
            page.stubs[0].detail_link.as_deref(),
            Some("/product/aa11/phone-a/")
        );
        assert_eq!(
            page.stubs[0].thumbnail.as_deref(),
            Some("https://c.dns-shop.kz/thumb/a.jpg")
        );
        assert_eq!(page.stubs[2].detail_link, None);
        assert_eq!(page.stubs[2].thumbnail, None);
    }

    #[test]
    fn test_card_without_name_is_skipped() {
        let html = r#"
            <div class="products-page__title"><h1>Empty</h1></div>
            <div class="catalog-product ui-button-widget"><div class="order-avail-wrap">x</div></div>
        "#;
        let page = parse_listing(html).unwrap();
        assert!(page.stubs.is_empty());
    }

    #[test]
    fn test_missing_listing_header_is_an_error() {
        let err = parse_listing("<html><body><h1>Maintenance</h1></body></html>").unwrap_err();
        assert_eq!(err, ParseError::MissingElement(LISTING_HEADER));
    }

    #[test]
    fn test_missing_listing_title_is_an_error() {
        let err =
            parse_listing(r#"<div class="products-page__title"><span>no title</span></div>"#)
                .unwrap_err();
        assert!(matches!(err, ParseError::MissingElement(_)));
    }

    #[test]
    fn test_item_count_without_digits() {
        let html = r#"<div class="products-page__title"><h1>X</h1>
            <span data-role="items-count" class="products-count">many</span></div>"#;
        assert_eq!(parse_listing(html).unwrap().item_count, None);
    }

    #[test]
    fn test_discover_page_count() {
        assert_eq!(discover_page_count(LISTING), 12);
        assert_eq!(discover_page_count("<html></html>"), 1);
        assert_eq!(
            discover_page_count(r#"<li data-page-number="x"></li><li data-page-number="0"></li>"#),
            1
        );
    }

    #[test]
    fn test_detail_groups_in_document_order() {
        let detail = parse_detail(DETAIL).unwrap();
        assert_eq!(detail.spec_groups.len(), 2);
        assert_eq!(detail.spec_groups[0].title, "General");
        assert_eq!(detail.spec_groups[1].title, "Display");

        let general: Vec<_> = detail.spec_groups[0]
            .specs
            .iter()
            .map(|s| (s.title.as_str(), s.value.as_str()))
            .collect();
        assert_eq!(general, vec![("Model", "A"), ("Color", "black")]);
    }

    #[test]
    fn test_detail_description_joined() {
        let detail = parse_detail(DETAIL).unwrap();
        assert_eq!(detail.description, "Fast phone. Long battery.");
    }

    #[test]
    fn test_detail_missing_description_uses_sentinel() {
        let html = r#"<div class="product-card-tabs__contents"></div>"#;
        let detail = parse_detail(html).unwrap();
        assert_eq!(detail.description, DESCRIPTION_NOT_FOUND);
        assert!(detail.spec_groups.is_empty());
        assert!(detail.image_links.is_empty());
    }

    #[test]
    fn test_detail_images_exclude_thumbnail_variant() {
        let detail = parse_detail(DETAIL).unwrap();
        assert_eq!(
            detail.image_links,
            vec![
                "https://c.dns-shop.kz/full/a1.webp".to_string(),
                "https://c.dns-shop.kz/full/a2.webp".to_string(),
            ]
        );
        assert!(!detail
            .image_links
            .iter()
            .any(|link| link.contains("/thumb/")));
    }

    #[test]
    fn test_detail_missing_container_is_an_error() {
        let err = parse_detail("<html><body></body></html>").unwrap_err();
        assert_eq!(err, ParseError::MissingElement(DETAIL_CONTAINER));
    }
}
