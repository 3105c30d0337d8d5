//! Request-level orchestration: catalog views, series detail and stream
//! lookup over the fetch, extract and enrichment layers.

use crate::cache::TieredCache;
use crate::cinemeta::{self, CinemetaClient};
use crate::error::FetchError;
use crate::extract;
use crate::fetch::Fetcher;
use crate::streams;
use crate::urls::{self, ListingOrder};
use anyhow::{Context, Result};
use chrono::Duration;
use shared::{parse_series_id, parse_video_id, CatalogEntry, Config, ResolvedStream, SeriesDetail, UpstreamConfig};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Which catalog the caller wants.
#[derive(Debug, Clone)]
pub enum CatalogView {
    /// One upstream listing page, mapped from the requested offset.
    Paged { skip: u32, order: ListingOrder },
    /// Full-text search; one upstream response, never paged.
    Search { query: String },
    /// Ongoing-only scan across listing pages.
    Ongoing { skip: u32 },
}

/// Status values that count as still airing, lowercased.
const ONGOING_STATUSES: [&str; 2] = ["ongoing", "en cours"];

/// The addon-facing resolver.
///
/// Owns the HTTP fetcher, the Cinemeta client and the process-lifetime
/// IMDb-to-slug map; built once at startup and shared across requests.
/// The three public operations absorb every upstream failure into an
/// empty result, since the presentation layer upstream of this crate has
/// nothing useful to do with an error.
pub struct DramaResolver {
    fetcher: Arc<Fetcher>,
    cinemeta: CinemetaClient,
    /// Learned `tt…` to slug mappings. Never persisted; a restart
    /// relearns them on demand.
    imdb_slugs: RwLock<HashMap<String, String>>,
    base_url: String,
    page_size: usize,
    ongoing_page_limit: u32,
}

impl DramaResolver {
    pub fn new(fetcher: Arc<Fetcher>, cinemeta: CinemetaClient, upstream: &UpstreamConfig) -> Self {
        Self {
            fetcher,
            cinemeta,
            imdb_slugs: RwLock::new(HashMap::new()),
            base_url: upstream.base_url.clone(),
            page_size: upstream.page_size,
            ongoing_page_limit: upstream.ongoing_page_limit,
        }
    }

    /// Wire the whole pipeline up from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache = Arc::new(TieredCache::new(
            config.cache_dir(),
            Duration::seconds(config.cache.ttl_seconds as i64),
            config.cache.version.clone(),
        ));
        let fetcher =
            Arc::new(Fetcher::new(&config.upstream, cache).context("Failed to create fetcher")?);
        let cinemeta = CinemetaClient::new(fetcher.clone(), config.cinemeta.base_url.clone());

        Ok(Self::new(fetcher, cinemeta, &config.upstream))
    }

    /// List a catalog. Upstream failures surface as an empty list, never
    /// an error.
    pub async fn catalog(&self, view: CatalogView) -> Vec<CatalogEntry> {
        let result = match &view {
            CatalogView::Paged { skip, order } => self.paged(*skip, *order).await,
            CatalogView::Search { query } => self.search(query).await,
            CatalogView::Ongoing { skip } => self.ongoing(*skip).await,
        };

        match result {
            Ok(entries) => {
                info!(view = ?view, count = entries.len(), "Catalog resolved");
                entries
            }
            Err(e) => {
                warn!(view = ?view, error = %e, "Catalog request failed");
                Vec::new()
            }
        }
    }

    /// Look one series up by `voirdrama:{slug}` id or by IMDb id.
    /// Malformed ids and upstream failures both yield `None`.
    pub async fn series_detail(&self, id: &str) -> Option<SeriesDetail> {
        let (slug, imdb_id) = self.resolve_series_ref(id).await?;

        let url = urls::series_url(&self.base_url, &slug);
        let html = match self.fetcher.text(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(id = id, error = %e, "Series page fetch failed");
                return None;
            }
        };

        let mut detail = extract::series_detail(&html, &slug);
        let meta = match &imdb_id {
            Some(imdb_id) => self.cinemeta.lookup_by_imdb(imdb_id).await,
            None => self.cinemeta.search_by_title(&detail.name).await,
        };
        if let Some(meta) = meta {
            cinemeta::apply_to_detail(&mut detail, &meta);
        }
        // A record addressed by IMDb id keeps that id even when Cinemeta
        // leaves it out.
        if detail.imdb_id.is_none() {
            detail.imdb_id = imdb_id;
        }

        info!(id = %detail.id, episodes = detail.episodes.len(), "Series resolved");
        Some(detail)
    }

    /// Resolve the streams of one episode. Order follows the candidate
    /// order on the page; a failed unwrap degrades to an external stream
    /// instead of dropping the candidate.
    pub async fn streams(&self, video_id: &str) -> Vec<ResolvedStream> {
        let (series_slug, episode_slug) = match parse_video_id(video_id) {
            Some(parts) => parts,
            None => {
                debug!(video_id = video_id, "Unrecognized video id");
                return Vec::new();
            }
        };

        let url = urls::episode_url(&self.base_url, series_slug, episode_slug);
        let html = match self.fetcher.text(&url).await {
            Ok(html) => html,
            Err(e) => {
                warn!(video_id = video_id, error = %e, "Episode page fetch failed");
                return Vec::new();
            }
        };

        let candidates = extract::stream_candidates(&html);
        let resolved = streams::resolve_all(&self.fetcher, candidates).await;
        info!(video_id = video_id, count = resolved.len(), "Streams resolved");
        resolved
    }

    async fn paged(&self, skip: u32, order: ListingOrder) -> Result<Vec<CatalogEntry>, FetchError> {
        let page = urls::page_for_skip(skip, self.page_size);
        let url = urls::listing_url(&self.base_url, page, order);
        let html = self.fetcher.text(&url).await?;

        let mut entries = extract::catalog_entries(&html);
        debug!(page, count = entries.len(), "Listing page extracted");
        self.cinemeta.enrich_entries(&mut entries).await;
        Ok(entries)
    }

    async fn search(&self, query: &str) -> Result<Vec<CatalogEntry>, FetchError> {
        // An empty query falls back to the plain listing.
        if query.is_empty() {
            return self.paged(0, ListingOrder::Default).await;
        }

        let url = urls::search_url(&self.base_url, query);
        let html = self.fetcher.text(&url).await?;

        let mut entries = extract::catalog_entries(&html);
        debug!(query = query, count = entries.len(), "Search results extracted");
        self.cinemeta.enrich_entries(&mut entries).await;
        Ok(entries)
    }

    /// Ongoing-only view. Walks listing pages in order and keeps the
    /// entries whose series page reports an airing status, so a cold scan
    /// costs one series fetch per distinct entry; the cache bounds what a
    /// warm scan costs. Skipped entries are filtered before the offset is
    /// applied, which keeps page boundaries stable between calls.
    async fn ongoing(&self, skip: u32) -> Result<Vec<CatalogEntry>, FetchError> {
        let mut collected = Vec::new();
        let mut remaining_skip = skip as usize;
        let mut page = 1;

        while collected.len() < self.page_size && page <= self.ongoing_page_limit {
            let url = urls::listing_url(&self.base_url, page, ListingOrder::Default);
            let html = self.fetcher.text(&url).await?;

            for entry in extract::catalog_entries(&html) {
                if !self.is_ongoing(&entry.slug).await {
                    continue;
                }
                if remaining_skip > 0 {
                    remaining_skip -= 1;
                    continue;
                }
                collected.push(entry);
                if collected.len() >= self.page_size {
                    break;
                }
            }

            page += 1;
        }

        self.cinemeta.enrich_entries(&mut collected).await;
        Ok(collected)
    }

    /// Status probe for one series. Any failure counts as not ongoing.
    async fn is_ongoing(&self, slug: &str) -> bool {
        let url = urls::series_url(&self.base_url, slug);
        let html = match self.fetcher.text(&url).await {
            Ok(html) => html,
            Err(e) => {
                debug!(slug = slug, error = %e, "Status probe failed");
                return false;
            }
        };

        match extract::series_status(&html) {
            Some(status) => {
                let status = status.to_lowercase();
                ONGOING_STATUSES.iter().any(|marker| status.contains(marker))
            }
            None => false,
        }
    }

    /// Turn an incoming id into an upstream slug, learning IMDb-to-slug
    /// mappings along the way.
    async fn resolve_series_ref(&self, id: &str) -> Option<(String, Option<String>)> {
        if let Some(slug) = parse_series_id(id) {
            return Some((slug.to_string(), None));
        }
        if !is_imdb_id(id) {
            debug!(id = id, "Unrecognized series id");
            return None;
        }

        if let Some(slug) = self.imdb_slugs.read().unwrap().get(id).cloned() {
            return Some((slug, Some(id.to_string())));
        }

        let name = self.cinemeta.lookup_by_imdb(id).await?.name?;
        let matched = self.find_by_title(&name).await?;
        let slug = matched.slug;
        self.imdb_slugs
            .write()
            .unwrap()
            .insert(id.to_string(), slug.clone());
        info!(imdb_id = id, slug = %slug, "Learned IMDb mapping");
        Some((slug, Some(id.to_string())))
    }

    /// Search the upstream site for a series by title, preferring an
    /// exact normalized match and falling back to the first hit.
    async fn find_by_title(&self, title: &str) -> Option<CatalogEntry> {
        let url = urls::search_url(&self.base_url, title);
        let html = match self.fetcher.text(&url).await {
            Ok(html) => html,
            Err(e) => {
                debug!(title = title, error = %e, "Upstream title search failed");
                return None;
            }
        };

        let mut entries = extract::catalog_entries(&html);
        let target = cinemeta::normalize_title(title);
        if let Some(pos) = entries
            .iter()
            .position(|entry| cinemeta::normalize_title(&entry.name) == target)
        {
            return Some(entries.swap_remove(pos));
        }
        if entries.is_empty() {
            None
        } else {
            Some(entries.swap_remove(0))
        }
    }
}

/// IMDb ids as Cinemeta uses them: `tt` followed by digits.
fn is_imdb_id(id: &str) -> bool {
    id.strip_prefix("tt")
        .map(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}
