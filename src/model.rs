//! Catalog data model
//!
//! The serialized field names are the on-disk format of the result file:
//! `{title, item_count, products: [{name, price, availability, link, thumb,
//! extra: {groups: [{title, specs: [{title, value}]}], description, image_links}}]}`.

use serde::{Deserialize, Serialize};

/// Substituted when a listing card has no current-price element
pub const PRICE_NOT_AVAILABLE: &str = "Price not available";

/// Substituted when a listing card has no availability block
pub const AVAILABILITY_NOT_AVAILABLE: &str = "Availability information not available";

/// Substituted when a detail page has no description container
pub const DESCRIPTION_NOT_FOUND: &str = "Description not found.";

/// A product as it appears on a listing page, before detail enrichment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductStub {
    pub name: String,

    /// Currency-normalized display price, or [`PRICE_NOT_AVAILABLE`]
    pub price: String,

    pub availability: String,

    /// Site-relative link to the product page
    #[serde(rename = "link")]
    pub detail_link: Option<String>,

    #[serde(rename = "thumb")]
    pub thumbnail: Option<String>,
}

/// One `title: value` row of a specification group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spec {
    pub title: String,
    pub value: String,
}

/// A titled group of specifications, in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecGroup {
    pub title: String,
    pub specs: Vec<Spec>,
}

impl SpecGroup {
    /// `"<group> - <spec>: <value>; <spec>: <value>"`
    pub fn summary_line(&self) -> String {
        let specs = self
            .specs
            .iter()
            .map(|spec| format!("{}: {}", spec.title, spec.value))
            .collect::<Vec<_>>()
            .join("; ");
        format!("{} - {}", self.title, specs)
    }
}

/// Structured content of a product's specification page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDetail {
    #[serde(rename = "groups")]
    pub spec_groups: Vec<SpecGroup>,

    pub description: String,

    pub image_links: Vec<String>,
}

impl ProductDetail {
    /// Detail attached to products whose page could not be fetched or parsed
    pub fn unavailable() -> Self {
        Self {
            spec_groups: Vec::new(),
            description: DESCRIPTION_NOT_FOUND.to_string(),
            image_links: Vec::new(),
        }
    }

    /// One line per group, newline separated
    pub fn groups_summary(&self) -> String {
        self.spec_groups
            .iter()
            .map(SpecGroup::summary_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A listing stub merged with its detail page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    #[serde(flatten)]
    pub stub: ProductStub,

    pub extra: ProductDetail,
}

impl ProductStub {
    /// Consumes the stub, attaching its detail exactly once
    pub fn into_product(self, extra: ProductDetail) -> Product {
        Product { stub: self, extra }
    }
}

/// One parsed listing page, products not yet enriched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    pub title: String,
    pub item_count: Option<u32>,
    pub stubs: Vec<ProductStub>,
}

/// Everything harvested for one category link
///
/// `item_count` is what the listing advertises; `products.len()` is the
/// number actually harvested and the two need not agree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryResult {
    pub title: String,
    pub item_count: Option<u32>,
    pub products: Vec<Product>,
}
