//! Regex extraction over upstream markup.
//!
//! The site is rendered by a WordPress theme with no API, so structure is
//! recovered from anchors, image attributes and a script-level source map.
//! Every extractor is best-effort: a pattern that fails to match leaves
//! its field empty rather than failing the page.

use once_cell::sync::Lazy;
use regex::Regex;
use shared::{series_id, video_id, CatalogEntry, EpisodeRef, SeriesDetail, StreamCandidate};
use std::collections::HashSet;

/// Series anchors carry the title as bare anchor text. Anchors with
/// attributes after the href (title, class) or nested tags never match,
/// which keeps thumbnail links out.
static SERIES_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<a href="(https://voirdrama\.org/drama/[^/"]+/)">([^<]+)</a>"#)
        .expect("series link regex should compile")
});

static SERIES_SLUG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://voirdrama\.org/drama/([^/]+)/?$")
        .expect("series slug regex should compile")
});

static EPISODE_SLUG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://voirdrama\.org/drama/[^/]+/([^/]+)/?$")
        .expect("episode slug regex should compile")
});

static IMG_DATA_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img[^>]+data-src="([^"]+)""#).expect("data-src regex should compile")
});

static IMG_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img[^>]+src="([^"]+)""#).expect("img src regex should compile")
});

static IMG_SRCSET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<img[^>]+srcset="([^"]+)""#).expect("srcset regex should compile")
});

static TITLE_H1: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<h1>\s*([^<]+)\s*</h1>").expect("title regex should compile"));

static SUMMARY_POSTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<div class="summary_image".*?<img[^>]+src="([^"]+)""#)
        .expect("summary poster regex should compile")
});

static DESCRIPTION_START: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<div class="summary__content\s*">"#)
        .expect("description start regex should compile")
});

static BLOCK_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)</div>").expect("block end regex should compile"));

static GENRE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"rel="tag">([^<]+)</a>"#).expect("genre regex should compile"));

static EPISODE_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<li class="wp-manga-chapter.*?</li>"#)
        .expect("episode item regex should compile")
});

static EPISODE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<a href="(https://voirdrama\.org/drama/[^/]+/[^/"]+/)"[^>]*>([^<]+)</a>"#)
        .expect("episode link regex should compile")
});

static EPISODE_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<span class="post-on[^>]*>\s*([^<]+)\s*</span>"#)
        .expect("episode date regex should compile")
});

static FIRST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)").expect("number regex should compile"));

static SOURCES_OBJECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)var thisChapterSources = (\{.*?\});")
        .expect("sources object regex should compile")
});

static IFRAME_SRC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<iframe[^>]+src="([^"]+)""#).expect("iframe regex should compile")
});

static FRAGMENT_SRC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)src="([^"]+)""#).expect("fragment src regex should compile"));

static STATUS_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<h5>\s*Status\s*</h5>.*?<div class="summary-content">\s*([^<]+)\s*<"#)
        .expect("status regex should compile")
});

static HTML_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex should compile"));

/// How far around a series anchor to search for its poster, in bytes
/// each direction.
const POSTER_WINDOW: usize = 800;

/// Decode the handful of entities the site actually emits and collapse
/// every whitespace run into a single space.
pub fn decode_html(text: &str) -> String {
    let decoded = text
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#039;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Slug portion of a series detail-page URL.
pub fn series_slug_from_url(url: &str) -> Option<&str> {
    SERIES_SLUG
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Slug portion of an episode-page URL.
pub fn episode_slug_from_url(url: &str) -> Option<&str> {
    EPISODE_SLUG
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Extract one listing or search page worth of catalog rows.
///
/// Series are deduplicated by slug with the first occurrence winning, so
/// the page's own ordering is preserved. A missing poster is normal.
pub fn catalog_entries(html: &str) -> Vec<CatalogEntry> {
    let mut entries = Vec::new();
    let mut seen = HashSet::new();

    for caps in SERIES_LINK.captures_iter(html) {
        let url = &caps[1];
        let slug = match series_slug_from_url(url) {
            Some(slug) => slug,
            None => continue,
        };
        if !seen.insert(slug.to_string()) {
            continue;
        }

        entries.push(CatalogEntry {
            id: series_id(slug),
            slug: slug.to_string(),
            name: decode_html(&caps[2]),
            poster: poster_near(html, url),
            background: None,
            imdb_id: None,
        });
    }

    entries
}

/// Poster URL from a bounded window of markup around the anchor.
///
/// Lazy-loaded images win over the plain src, which wins over the first
/// srcset entry.
fn poster_near(html: &str, anchor_url: &str) -> Option<String> {
    let idx = html.find(anchor_url)?;
    let snippet = window_around(html, idx, POSTER_WINDOW);

    if let Some(caps) = IMG_DATA_SRC.captures(snippet) {
        return Some(caps[1].to_string());
    }
    if let Some(caps) = IMG_SRC.captures(snippet) {
        return Some(caps[1].to_string());
    }
    let srcset = IMG_SRCSET.captures(snippet)?;
    let first = srcset[1].split(',').next()?.trim();
    first.split_whitespace().next().map(str::to_string)
}

/// Byte window around `idx`, nudged outward onto char boundaries so
/// multi-byte text near the edges cannot split a code point.
fn window_around(html: &str, idx: usize, radius: usize) -> &str {
    let mut start = idx.saturating_sub(radius);
    let mut end = (idx + radius).min(html.len());
    while !html.is_char_boundary(start) {
        start -= 1;
    }
    while !html.is_char_boundary(end) {
        end += 1;
    }
    &html[start..end]
}

/// Extract a full series record from its detail page.
///
/// Whatever pattern fails to match leaves its field empty; a missing
/// title falls back to the slug so the record is always presentable.
pub fn series_detail(html: &str, slug: &str) -> SeriesDetail {
    let name = TITLE_H1
        .captures(html)
        .map(|caps| decode_html(&caps[1]))
        .unwrap_or_else(|| slug.to_string());

    let poster = SUMMARY_POSTER.captures(html).map(|caps| caps[1].to_string());

    let description = extract_between(html, &DESCRIPTION_START, &BLOCK_END)
        .map(|block| decode_html(&HTML_TAG.replace_all(block, " ")))
        .filter(|text| !text.is_empty());

    let mut genres = Vec::new();
    let mut seen = HashSet::new();
    for caps in GENRE_TAG.captures_iter(html) {
        let genre = decode_html(&caps[1]);
        if seen.insert(genre.clone()) {
            genres.push(genre);
        }
    }

    SeriesDetail {
        id: series_id(slug),
        name,
        background: poster.clone(),
        poster,
        description,
        genres,
        imdb_id: None,
        episodes: episodes(html, slug),
    }
}

/// Episode list from the `wp-manga-chapter` items, in page order. The
/// site lists newest first and that ordering is kept.
pub fn episodes(html: &str, series_slug: &str) -> Vec<EpisodeRef> {
    let mut episodes = Vec::new();

    for item in EPISODE_ITEM.find_iter(html) {
        let block = item.as_str();
        let caps = match EPISODE_LINK.captures(block) {
            Some(caps) => caps,
            None => continue,
        };
        let episode_slug = match episode_slug_from_url(&caps[1]) {
            Some(slug) => slug,
            None => continue,
        };
        let label = decode_html(&caps[2]);

        let number = FIRST_NUMBER
            .captures(&label)
            .and_then(|caps| caps[1].parse::<u32>().ok());
        let title = match number {
            Some(number) => format!("Episode {}", number),
            None => format!("Episode {}", label),
        };
        let released = EPISODE_DATE
            .captures(block)
            .map(|caps| decode_html(&caps[1]));

        episodes.push(EpisodeRef {
            id: video_id(series_slug, episode_slug),
            title,
            season: 1,
            episode: number,
            released,
        });
    }

    episodes
}

/// Stream-source candidates from an episode page.
///
/// The primary path is the script-level source map of label to iframe
/// fragment, kept in markup order. When the map is absent or its JSON
/// does not parse, the first bare iframe becomes a single "Player"
/// candidate.
pub fn stream_candidates(html: &str) -> Vec<StreamCandidate> {
    let mut candidates = Vec::new();

    if let Some(caps) = SOURCES_OBJECT.captures(html) {
        if let Ok(map) =
            serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(&caps[1])
        {
            for (label, fragment) in &map {
                let fragment = match fragment.as_str() {
                    Some(fragment) => fragment,
                    None => continue,
                };
                if let Some(src) = FRAGMENT_SRC.captures(fragment) {
                    candidates.push(StreamCandidate {
                        label: decode_html(label),
                        embed_url: src[1].to_string(),
                    });
                }
            }
        }
    }

    if candidates.is_empty() {
        if let Some(caps) = IFRAME_SRC.captures(html) {
            candidates.push(StreamCandidate {
                label: "Player".to_string(),
                embed_url: caps[1].to_string(),
            });
        }
    }

    candidates
}

/// Raw status text from the series summary, when the block is present.
pub fn series_status(html: &str) -> Option<String> {
    STATUS_BLOCK.captures(html).map(|caps| decode_html(&caps[1]))
}

/// Slice of `html` between the first match of `start` and the next match
/// of `end` after it.
fn extract_between<'a>(html: &'a str, start: &Regex, end: &Regex) -> Option<&'a str> {
    let start_match = start.find(html)?;
    let rest = &html[start_match.end()..];
    let end_match = end.find(rest)?;
    Some(&rest[..end_match.start()])
}
