//! Stream-candidate resolution.
//!
//! Candidates hosted on the vidmoly family can be unwrapped: the embed
//! page is fetched once and scanned for a playable URL. Every other host,
//! and every unwrap that fails, degrades to an external stream carrying
//! the untouched embed URL. Candidates are never dropped.

use crate::fetch::Fetcher;
use futures::future::join_all;
use once_cell::sync::Lazy;
use regex::Regex;
use shared::{ResolvedStream, StreamCandidate};
use tracing::debug;

/// The embed host family we know how to unwrap, under any of its TLDs.
static VIDMOLY_HOST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)vidmoly\.(biz|me|to|net)").expect("vidmoly regex should compile")
});

/// Playable-URL patterns in priority order; the first match wins.
static PLAYABLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?i)file:\s*"([^"]+)""#,
        r#"(?i)file:\s*'([^']+)'"#,
        r#"(?i)"file"\s*:\s*"([^"]+)""#,
        r#"(?is)sources:\s*\[.*?"file"\s*:\s*"([^"]+)""#,
        r#"(?i)source\s+src="([^"]+)""#,
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("playable pattern should compile"))
    .collect()
});

/// True when the embed URL belongs to the unwrappable host family.
pub fn is_unwrappable(embed_url: &str) -> bool {
    VIDMOLY_HOST.is_match(embed_url)
}

/// First playable URL in the embed markup, unescaped and trimmed.
pub fn first_playable_url(html: &str) -> Option<String> {
    PLAYABLE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(html))
        .map(|caps| normalize_stream_url(&caps[1]))
}

/// Undo the escaping embed scripts wrap around their URLs.
pub fn normalize_stream_url(url: &str) -> String {
    url.replace("\\u0026", "&")
        .replace("\\\\", "\\")
        .replace("&amp;", "&")
        .replace("\\/", "/")
        .trim()
        .to_string()
}

/// Resolve one candidate: at most one embed fetch, no retries.
pub async fn resolve(fetcher: &Fetcher, candidate: StreamCandidate) -> ResolvedStream {
    if is_unwrappable(&candidate.embed_url) {
        match fetcher.text(&candidate.embed_url).await {
            Ok(html) => {
                if let Some(url) = first_playable_url(&html) {
                    return ResolvedStream::Direct {
                        label: format!("{} (direct)", candidate.label),
                        url,
                    };
                }
                debug!(embed_url = %candidate.embed_url, "No playable URL in embed page");
            }
            Err(e) => {
                debug!(embed_url = %candidate.embed_url, error = %e, "Embed fetch failed");
            }
        }
    }

    ResolvedStream::External {
        label: candidate.label,
        embed_url: candidate.embed_url,
    }
}

/// Resolve all candidates concurrently. The output keeps the extraction
/// order regardless of which embed answers first.
pub async fn resolve_all(
    fetcher: &Fetcher,
    candidates: Vec<StreamCandidate>,
) -> Vec<ResolvedStream> {
    join_all(
        candidates
            .into_iter()
            .map(|candidate| resolve(fetcher, candidate)),
    )
    .await
}
