//! URL handling module for Shop-Harvest
//!
//! Link validation plus the two URL derivations the crawler needs: listing
//! pages of a category and the specification page of a product.

use crate::{HarvestError, Result};
use url::Url;

/// Validates that `link` is an absolute http(s) URL with a host
///
/// Anything else is a fatal configuration problem for the whole run.
///
/// # Examples
///
/// ```
/// use shop_harvest::url::validate_link;
///
/// assert!(validate_link("https://www.dns-shop.kz/catalog/17a8a01d16404e77/smartfony/").is_ok());
/// assert!(validate_link("catalog/smartfony").is_err());
/// ```
pub fn validate_link(link: &str) -> Result<Url> {
    let url = Url::parse(link).map_err(|e| HarvestError::InvalidUrl {
        url: link.to_string(),
        reason: e.to_string(),
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(HarvestError::InvalidUrl {
            url: link.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => Ok(url),
        _ => Err(HarvestError::InvalidUrl {
            url: link.to_string(),
            reason: "missing host".to_string(),
        }),
    }
}

/// Builds the URL of listing page `page` of a category
///
/// Any existing query string on the category URL is replaced.
pub fn page_url(category: &Url, page: u32) -> Result<Url> {
    category
        .join(&format!("?page={}", page))
        .map_err(|e| HarvestError::InvalidUrl {
            url: category.to_string(),
            reason: e.to_string(),
        })
}

/// Builds the specification page URL for a product link found on a listing
///
/// `link` is usually site-relative (`/product/<id>/<slug>/`) and is resolved
/// against `base`; `suffix` is appended verbatim before resolution.
pub fn detail_url(base: &Url, link: &str, suffix: &str) -> Result<Url> {
    let target = format!("{}{}", link, suffix);
    base.join(&target).map_err(|e| HarvestError::InvalidUrl {
        url: target.clone(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_https() {
        let url = validate_link("https://www.dns-shop.kz/catalog/abc/").unwrap();
        assert_eq!(url.host_str(), Some("www.dns-shop.kz"));
    }

    #[test]
    fn test_validate_rejects_relative() {
        let err = validate_link("/catalog/abc/").unwrap_err();
        assert!(matches!(err, HarvestError::InvalidUrl { .. }));
    }

    #[test]
    fn test_validate_rejects_other_schemes() {
        assert!(validate_link("ftp://example.com/file").is_err());
        assert!(validate_link("mailto:someone@example.com").is_err());
    }

    #[test]
    fn test_validate_rejects_garbage() {
        assert!(validate_link("not a url at all").is_err());
        assert!(validate_link("").is_err());
    }

    #[test]
    fn test_page_url_sets_query() {
        let category = Url::parse("https://www.dns-shop.kz/catalog/abc/smartfony/").unwrap();
        let page = page_url(&category, 3).unwrap();
        assert_eq!(
            page.as_str(),
            "https://www.dns-shop.kz/catalog/abc/smartfony/?page=3"
        );
    }

    #[test]
    fn test_page_url_replaces_existing_query() {
        let category = Url::parse("https://www.dns-shop.kz/catalog/abc/?order=6&page=9").unwrap();
        let page = page_url(&category, 1).unwrap();
        assert_eq!(page.as_str(), "https://www.dns-shop.kz/catalog/abc/?page=1");
    }

    #[test]
    fn test_detail_url_from_relative_link() {
        let base = Url::parse("https://www.dns-shop.kz/").unwrap();
        let url = detail_url(&base, "/product/5a1b/smartfon-x/", "characteristics/").unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.dns-shop.kz/product/5a1b/smartfon-x/characteristics/"
        );
    }

    #[test]
    fn test_detail_url_from_absolute_link() {
        let base = Url::parse("https://www.dns-shop.kz/").unwrap();
        let url = detail_url(&base, "https://mirror.example.com/product/1/", "characteristics/")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://mirror.example.com/product/1/characteristics/"
        );
    }
}
