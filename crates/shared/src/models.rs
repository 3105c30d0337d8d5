//! Data models for the VoirDrama resolver pipeline.
//!
//! Every record here is built fresh per request from extracted markup and
//! optionally overlaid with Cinemeta fields before it is handed to the addon
//! layer. Nothing in this module is persisted.

use serde::{Deserialize, Serialize};

/// Prefix shared by every series and video id.
pub const ID_PREFIX: &str = "voirdrama";

/// Build a series id from its upstream slug: `voirdrama:{slug}`.
pub fn series_id(slug: &str) -> String {
    format!("{}:{}", ID_PREFIX, slug)
}

/// Build a video id from its slugs: `voirdrama:{series}:{episode}`.
pub fn video_id(series_slug: &str, episode_slug: &str) -> String {
    format!("{}:{}:{}", ID_PREFIX, series_slug, episode_slug)
}

/// Recover the series slug from a series id.
///
/// Ids are not opaque: the slug must always parse back out losslessly.
/// Anything that is not exactly `voirdrama:{slug}` yields `None`.
pub fn parse_series_id(id: &str) -> Option<&str> {
    let slug = id.strip_prefix(ID_PREFIX)?.strip_prefix(':')?;
    if slug.is_empty() || slug.contains(':') {
        return None;
    }
    Some(slug)
}

/// Recover `(series_slug, episode_slug)` from a video id.
pub fn parse_video_id(id: &str) -> Option<(&str, &str)> {
    let rest = id.strip_prefix(ID_PREFIX)?.strip_prefix(':')?;
    let (series, episode) = rest.split_once(':')?;
    if series.is_empty() || episode.is_empty() || episode.contains(':') {
        return None;
    }
    Some((series, episode))
}

/// One row of a catalog listing.
///
/// `slug` is internal correlation state for follow-up fetches and is never
/// serialized; consumers only ever see the composed id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(skip_serializing, default)]
    pub slug: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
}

/// Full series record: detail-page extraction plus enrichment overlay.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SeriesDetail {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imdb_id: Option<String>,
    /// Ordered as the episodes appear in the source markup.
    #[serde(rename = "videos")]
    pub episodes: Vec<EpisodeRef>,
}

/// One episode of a series.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EpisodeRef {
    pub id: String,
    pub title: String,
    /// The upstream site has no season structure; always 1.
    pub season: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<u32>,
    /// Publication-date label as written on the page, not parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub released: Option<String>,
}

/// An unresolved stream source scraped from an episode page.
///
/// Internal to the pipeline; consumers only see the resolved form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamCandidate {
    pub label: String,
    pub embed_url: String,
}

/// Outcome of resolving one stream candidate.
///
/// `Direct` carries a playable media URL recovered from the embed page.
/// `External` means only the embed page itself is known and the consuming
/// player has to load it.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResolvedStream {
    Direct {
        #[serde(rename = "title")]
        label: String,
        url: String,
    },
    External {
        #[serde(rename = "title")]
        label: String,
        #[serde(rename = "externalUrl")]
        embed_url: String,
    },
}

impl ResolvedStream {
    /// Display label of the stream, whichever variant it is.
    pub fn label(&self) -> &str {
        match self {
            ResolvedStream::Direct { label, .. } => label,
            ResolvedStream::External { label, .. } => label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_id_round_trip() {
        let id = series_id("goblin");
        assert_eq!(id, "voirdrama:goblin");
        assert_eq!(parse_series_id(&id), Some("goblin"));
    }

    #[test]
    fn test_video_id_round_trip() {
        let id = video_id("goblin", "episode-07-vostfr");
        assert_eq!(id, "voirdrama:goblin:episode-07-vostfr");
        assert_eq!(parse_video_id(&id), Some(("goblin", "episode-07-vostfr")));
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        assert_eq!(parse_series_id("voirdrama:"), None);
        assert_eq!(parse_series_id("voirdrama:a:b"), None);
        assert_eq!(parse_series_id("tt1234567"), None);
        assert_eq!(parse_video_id("voirdrama:only-series"), None);
        assert_eq!(parse_video_id("voirdrama:a:b:c"), None);
        assert_eq!(parse_video_id("voirdrama::ep"), None);
        assert_eq!(parse_video_id("other:a:b"), None);
    }

    #[test]
    fn test_catalog_entry_serialization_strips_slug() {
        let entry = CatalogEntry {
            id: series_id("goblin"),
            slug: "goblin".to_string(),
            name: "Goblin".to_string(),
            poster: Some("https://example.com/p.jpg".to_string()),
            background: None,
            imdb_id: None,
        };

        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("slug").is_none());
        assert_eq!(json["id"], "voirdrama:goblin");
        assert_eq!(json["poster"], "https://example.com/p.jpg");
        assert!(json.get("background").is_none());
    }

    #[test]
    fn test_resolved_stream_serialization_shapes() {
        let direct = ResolvedStream::Direct {
            label: "HD (direct)".to_string(),
            url: "https://cdn.example.com/v.m3u8".to_string(),
        };
        let json = serde_json::to_value(&direct).unwrap();
        assert_eq!(json["title"], "HD (direct)");
        assert_eq!(json["url"], "https://cdn.example.com/v.m3u8");

        let external = ResolvedStream::External {
            label: "HD".to_string(),
            embed_url: "https://vidmoly.net/e/abc".to_string(),
        };
        let json = serde_json::to_value(&external).unwrap();
        assert_eq!(json["title"], "HD");
        assert_eq!(json["externalUrl"], "https://vidmoly.net/e/abc");
        assert!(json.get("url").is_none());
    }

    #[test]
    fn test_episodes_serialize_as_videos() {
        let detail = SeriesDetail {
            id: series_id("goblin"),
            name: "Goblin".to_string(),
            poster: None,
            background: None,
            description: None,
            genres: vec!["Romance".to_string()],
            imdb_id: None,
            episodes: vec![EpisodeRef {
                id: video_id("goblin", "episode-01"),
                title: "Episode 1".to_string(),
                season: 1,
                episode: Some(1),
                released: Some("12 juillet 2022".to_string()),
            }],
        };

        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.get("episodes").is_none());
        assert_eq!(json["videos"][0]["id"], "voirdrama:goblin:episode-01");
        assert_eq!(json["videos"][0]["season"], 1);
    }
}
