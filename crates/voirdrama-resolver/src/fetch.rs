//! Bounded-time retrieval through the tiered cache.

use crate::cache::TieredCache;
use crate::error::FetchError;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use shared::UpstreamConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Accept header sent with every markup request. JSON endpoints are
/// requested without one.
const ACCEPT_HTML: &str = "text/html,application/xhtml+xml";

/// Cache-routed HTTP fetcher.
///
/// Every successful body is written through both cache tiers keyed by the
/// URL alone, so callers must encode all request-distinguishing state
/// (pagination, query text) into the URL itself.
pub struct Fetcher {
    client: Client,
    cache: Arc<TieredCache>,
}

impl Fetcher {
    /// Build the underlying client with the configured timeout and
    /// User-Agent. Both apply to every request this fetcher makes.
    pub fn new(config: &UpstreamConfig, cache: Arc<TieredCache>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, cache })
    }

    /// Fetch a page of markup, cache-first.
    pub async fn text(&self, url: &str) -> Result<String, FetchError> {
        if let Some(cached) = self.cache.get(url) {
            return Ok(cached);
        }

        let body = self.fetch_fresh(url, Some(ACCEPT_HTML)).await?;
        self.cache.set(url, &body);
        Ok(body)
    }

    /// Fetch a JSON payload, cache-first.
    ///
    /// The raw body is cached only after it deserialized, so a malformed
    /// response is never replayed from cache for the rest of its TTL.
    pub async fn json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        if let Some(cached) = self.cache.get(url) {
            return serde_json::from_str(&cached).map_err(|source| FetchError::Decode {
                url: url.to_string(),
                source,
            });
        }

        let body = self.fetch_fresh(url, None).await?;
        let value = serde_json::from_str(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })?;
        self.cache.set(url, &body);
        Ok(value)
    }

    /// One bounded-time GET with no retries. Timeouts surface as
    /// `FetchError::Request`, non-success answers as `FetchError::Status`.
    async fn fetch_fresh(&self, url: &str, accept: Option<&str>) -> Result<String, FetchError> {
        debug!(url = %url, "Fetching from origin");

        let mut request = self.client.get(url);
        if let Some(accept) = accept {
            request = request.header(reqwest::header::ACCEPT, accept);
        }

        let response = request.send().await.map_err(|source| {
            warn!(url = %url, error = %source, "Request failed");
            FetchError::Request {
                url: url.to_string(),
                source,
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Upstream answered with an error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use shared::Config;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use tempfile::TempDir;

    fn test_fetcher(temp: &TempDir) -> (Fetcher, Arc<TieredCache>) {
        let cache = Arc::new(TieredCache::new(
            temp.path(),
            chrono::Duration::minutes(5),
            "test",
        ));
        let fetcher = Fetcher::new(&Config::default().upstream, cache.clone()).unwrap();
        (fetcher, cache)
    }

    #[test]
    fn test_fetcher_creation() {
        let temp = TempDir::new().unwrap();
        let (_fetcher, _cache) = test_fetcher(&temp);
    }

    // The .invalid TLD can never resolve, so these tests fail loudly if
    // the cache is bypassed and a real request goes out.

    #[tokio::test]
    async fn test_text_prefers_cached_body() {
        let temp = TempDir::new().unwrap();
        let (fetcher, cache) = test_fetcher(&temp);

        cache.set("https://upstream.invalid/page", "<html>cached</html>");
        let body = fetcher.text("https://upstream.invalid/page").await.unwrap();
        assert_eq!(body, "<html>cached</html>");
    }

    #[tokio::test]
    async fn test_json_decodes_cached_body() {
        #[derive(Deserialize)]
        struct Payload {
            answer: u32,
        }

        let temp = TempDir::new().unwrap();
        let (fetcher, cache) = test_fetcher(&temp);

        cache.set("https://upstream.invalid/data.json", r#"{"answer":42}"#);
        let payload: Payload = fetcher.json("https://upstream.invalid/data.json").await.unwrap();
        assert_eq!(payload.answer, 42);

        cache.set("https://upstream.invalid/broken.json", "not json");
        let result = fetcher
            .json::<Payload>("https://upstream.invalid/broken.json")
            .await;
        assert!(matches!(result, Err(FetchError::Decode { .. })));
    }

    /// Serve one canned HTTP response on a loopback port and return the
    /// base URL to request it from.
    fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            if let Ok((mut stream, _)) = listener.accept() {
                let mut request = [0u8; 1024];
                let _ = stream.read(&mut request);
                let _ = stream.write_all(response.as_bytes());
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_error_status_is_surfaced_and_not_cached() {
        let temp = TempDir::new().unwrap();
        let (fetcher, cache) = test_fetcher(&temp);

        let base = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        );
        let url = format!("{}/page", base);

        match fetcher.text(&url).await {
            Err(FetchError::Status { status, .. }) => assert_eq!(status.as_u16(), 500),
            other => panic!("expected a status error, got {:?}", other),
        }
        assert_eq!(cache.get(&url), None);
    }

    #[tokio::test]
    async fn test_fresh_decode_failure_is_not_cached() {
        let temp = TempDir::new().unwrap();
        let (fetcher, cache) = test_fetcher(&temp);

        let base = serve_once(
            "HTTP/1.1 200 OK\r\nContent-Length: 8\r\nConnection: close\r\n\r\nnot json",
        );
        let url = format!("{}/data.json", base);

        let result = fetcher.json::<serde_json::Value>(&url).await;
        assert!(matches!(result, Err(FetchError::Decode { .. })));
        assert_eq!(cache.get(&url), None);
    }
}
