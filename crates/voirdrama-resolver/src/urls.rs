//! URL builders for the upstream site.
//!
//! The fetch cache is keyed purely by URL, so every request-distinguishing
//! parameter has to be spelled out here and nowhere else.

use urlencoding::encode;

/// Sort order of the upstream listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingOrder {
    /// The site's default ordering.
    Default,
    /// Most recently updated first.
    Newest,
}

/// Upstream page number for a requested result offset.
pub fn page_for_skip(skip: u32, page_size: usize) -> u32 {
    skip / page_size.max(1) as u32 + 1
}

/// Listing page. Page 1 is the bare listing path, deeper pages use the
/// `/page/{n}/` form.
pub fn listing_url(base_url: &str, page: u32, order: ListingOrder) -> String {
    let path = if page > 1 {
        format!("{}/drama/page/{}/", base_url, page)
    } else {
        format!("{}/drama/", base_url)
    };
    match order {
        ListingOrder::Default => path,
        ListingOrder::Newest => format!("{}?m_orderby=new-manga", path),
    }
}

/// Full-text search across the site's series.
pub fn search_url(base_url: &str, query: &str) -> String {
    format!("{}/?s={}&post_type=wp-manga", base_url, encode(query))
}

/// Series detail page.
pub fn series_url(base_url: &str, slug: &str) -> String {
    format!("{}/drama/{}/", base_url, slug)
}

/// Episode page.
pub fn episode_url(base_url: &str, series_slug: &str, episode_slug: &str) -> String {
    format!("{}/drama/{}/{}/", base_url, series_slug, episode_slug)
}
