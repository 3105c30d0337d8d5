//! Cinemeta lookups and the enrichment overlay.
//!
//! Cinemeta is consulted opportunistically for artwork and IMDb ids. Its
//! fields overlay extracted records only where present and non-empty, and
//! any failure leaves the record exactly as extracted.

use crate::fetch::Fetcher;
use serde::Deserialize;
use shared::{CatalogEntry, SeriesDetail};
use std::sync::Arc;
use tracing::debug;
use urlencoding::encode;

/// One series record as Cinemeta returns it. The service omits whatever
/// it does not know, so every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetaSummary {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub poster: Option<String>,
    #[serde(default)]
    pub background: Option<String>,
    #[serde(default)]
    pub imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    metas: Vec<MetaSummary>,
}

#[derive(Debug, Deserialize)]
struct MetaResponse {
    meta: Option<MetaSummary>,
}

/// Client for Cinemeta's series catalog and meta endpoints.
pub struct CinemetaClient {
    fetcher: Arc<Fetcher>,
    base_url: String,
}

impl CinemetaClient {
    pub fn new(fetcher: Arc<Fetcher>, base_url: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
        }
    }

    /// Find the series whose normalized name matches `title` exactly,
    /// falling back to Cinemeta's first named candidate. `None` on any
    /// failure; enrichment is never worth failing a request over.
    pub async fn search_by_title(&self, title: &str) -> Option<MetaSummary> {
        if title.is_empty() {
            return None;
        }
        let url = format!(
            "{}/catalog/series/top/search={}.json",
            self.base_url,
            encode(title)
        );

        let response: SearchResponse = match self.fetcher.json(&url).await {
            Ok(response) => response,
            Err(e) => {
                debug!(title = title, error = %e, "Cinemeta search failed");
                return None;
            }
        };

        let target = normalize_title(title);
        let mut first = None;
        for meta in response.metas {
            let name = match meta.name.as_deref() {
                Some(name) => name,
                None => continue,
            };
            if normalize_title(name) == target {
                return Some(meta);
            }
            if first.is_none() {
                first = Some(meta);
            }
        }
        first
    }

    /// Direct lookup by IMDb id.
    pub async fn lookup_by_imdb(&self, imdb_id: &str) -> Option<MetaSummary> {
        if imdb_id.is_empty() {
            return None;
        }
        let url = format!("{}/meta/series/{}.json", self.base_url, encode(imdb_id));

        match self.fetcher.json::<MetaResponse>(&url).await {
            Ok(response) => response.meta,
            Err(e) => {
                debug!(imdb_id = imdb_id, error = %e, "Cinemeta lookup failed");
                None
            }
        }
    }

    /// Overlay richer artwork onto catalog rows, one lookup per row, in
    /// order. A failed or empty lookup skips the row.
    pub async fn enrich_entries(&self, entries: &mut [CatalogEntry]) {
        for entry in entries.iter_mut() {
            if let Some(meta) = self.search_by_title(&entry.name).await {
                apply_to_entry(entry, &meta);
            }
        }
    }
}

/// Normalize a title for comparison: lowercase, `&` read as "and",
/// everything else non-alphanumeric collapsed to single spaces.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase().replace('&', "and");
    let mut normalized = String::with_capacity(lowered.len());
    let mut pending_space = false;
    for c in lowered.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_space && !normalized.is_empty() {
                normalized.push(' ');
            }
            pending_space = false;
            normalized.push(c);
        } else {
            pending_space = true;
        }
    }
    normalized
}

/// Copy non-empty overlay fields onto a catalog row.
pub fn apply_to_entry(entry: &mut CatalogEntry, meta: &MetaSummary) {
    if let Some(poster) = non_empty(&meta.poster) {
        entry.poster = Some(poster);
    }
    if let Some(background) = non_empty(&meta.background) {
        entry.background = Some(background);
    }
    if let Some(imdb_id) = non_empty(&meta.imdb_id) {
        entry.imdb_id = Some(imdb_id);
    }
}

/// Copy non-empty overlay fields onto a series record. The extracted
/// name always wins; Cinemeta only supplies artwork and the IMDb id.
pub fn apply_to_detail(detail: &mut SeriesDetail, meta: &MetaSummary) {
    if let Some(poster) = non_empty(&meta.poster) {
        detail.poster = Some(poster);
    }
    if let Some(background) = non_empty(&meta.background) {
        detail.background = Some(background);
    }
    if let Some(imdb_id) = non_empty(&meta.imdb_id) {
        detail.imdb_id = Some(imdb_id);
    }
}

fn non_empty(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TieredCache;
    use shared::Config;
    use tempfile::TempDir;

    fn test_client(temp: &TempDir) -> (CinemetaClient, Arc<TieredCache>) {
        let cache = Arc::new(TieredCache::new(
            temp.path(),
            chrono::Duration::minutes(5),
            "test",
        ));
        let fetcher = Arc::new(Fetcher::new(&Config::default().upstream, cache.clone()).unwrap());
        (
            CinemetaClient::new(fetcher, "https://cinemeta.invalid"),
            cache,
        )
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("Lovely Runner"), "lovely runner");
        assert_eq!(normalize_title("Le Roi & Moi"), "le roi and moi");
        assert_eq!(normalize_title("  It's  Okay!!  "), "it s okay");
        assert_eq!(normalize_title("Fiancée"), "fianc e");
    }

    #[test]
    fn test_normalize_title_is_idempotent() {
        for title in ["Le Roi & Moi", "It's Okay to Not Be Okay", "W: Two Worlds"] {
            let once = normalize_title(title);
            assert_eq!(normalize_title(&once), once);
        }
    }

    #[test]
    fn test_overlay_skips_empty_fields() {
        let mut entry = CatalogEntry {
            id: "voirdrama:goblin".to_string(),
            slug: "goblin".to_string(),
            name: "Goblin".to_string(),
            poster: Some("https://voirdrama.org/goblin.jpg".to_string()),
            background: None,
            imdb_id: None,
        };
        let meta = MetaSummary {
            name: Some("Goblin".to_string()),
            poster: Some(String::new()),
            background: Some("https://img.cinemeta.example/bg.jpg".to_string()),
            imdb_id: Some("tt5699154".to_string()),
        };

        apply_to_entry(&mut entry, &meta);

        // The empty poster must not clobber the extracted one.
        assert_eq!(entry.poster.as_deref(), Some("https://voirdrama.org/goblin.jpg"));
        assert_eq!(
            entry.background.as_deref(),
            Some("https://img.cinemeta.example/bg.jpg")
        );
        assert_eq!(entry.imdb_id.as_deref(), Some("tt5699154"));
    }

    #[test]
    fn test_search_response_tolerates_sparse_payloads() {
        let payload = r#"{"metas":[{"id":"tt1","type":"series"},{"name":"Goblin","poster":"p.jpg"}]}"#;
        let response: SearchResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(response.metas.len(), 2);
        assert_eq!(response.metas[0].name, None);
        assert_eq!(response.metas[1].name.as_deref(), Some("Goblin"));

        let empty: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(empty.metas.is_empty());
    }

    // Responses are seeded straight into the cache; the .invalid TLD
    // guarantees a loud failure if a real request ever goes out.

    #[tokio::test]
    async fn test_search_prefers_exact_normalized_match() {
        let temp = TempDir::new().unwrap();
        let (client, cache) = test_client(&temp);

        cache.set(
            "https://cinemeta.invalid/catalog/series/top/search=Goblin.json",
            r#"{"metas":[
                {"name":"Goblin Slayer","imdb_id":"tt1111111"},
                {"name":"GOBLIN!","imdb_id":"tt5699154"}
            ]}"#,
        );

        let meta = client.search_by_title("Goblin").await.unwrap();
        assert_eq!(meta.imdb_id.as_deref(), Some("tt5699154"));
    }

    #[tokio::test]
    async fn test_search_falls_back_to_first_named_candidate() {
        let temp = TempDir::new().unwrap();
        let (client, cache) = test_client(&temp);

        cache.set(
            "https://cinemeta.invalid/catalog/series/top/search=Goblin.json",
            r#"{"metas":[
                {"imdb_id":"tt0000000"},
                {"name":"Goblin Slayer","imdb_id":"tt1111111"},
                {"name":"Goblin Cave","imdb_id":"tt2222222"}
            ]}"#,
        );

        let meta = client.search_by_title("Goblin").await.unwrap();
        assert_eq!(meta.imdb_id.as_deref(), Some("tt1111111"));
    }

    #[tokio::test]
    async fn test_lookup_by_imdb_reads_meta_envelope() {
        let temp = TempDir::new().unwrap();
        let (client, cache) = test_client(&temp);

        cache.set(
            "https://cinemeta.invalid/meta/series/tt5699154.json",
            r#"{"meta":{"name":"Goblin","poster":"https://img.cinemeta.example/p.jpg"}}"#,
        );

        let meta = client.lookup_by_imdb("tt5699154").await.unwrap();
        assert_eq!(meta.name.as_deref(), Some("Goblin"));
        assert!(client.lookup_by_imdb("").await.is_none());
    }
}
