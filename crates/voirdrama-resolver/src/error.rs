//! Upstream fetch errors.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure talking to an upstream host (content site, embed host, Cinemeta).
///
/// The pipeline absorbs these at whatever granularity they occur: a failed
/// enrichment or unwrap degrades that one field or candidate, a failed
/// primary fetch empties the whole response. They never cross the
/// collaborator boundary as errors.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure, including the per-request timeout.
    #[error("GET {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("GET {url} returned status {status}")]
    Status { url: String, status: StatusCode },

    /// The body did not decode as the expected JSON shape.
    #[error("unexpected payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}
