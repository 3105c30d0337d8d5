//! Two-tier TTL cache for upstream fetches.
//!
//! Tier 1 is an in-process map, tier 2 a directory of content-addressed
//! JSON files that survives restarts. Both tiers honour the same absolute
//! expiry. The durable tier is an optimization only, so every disk failure
//! is treated as a plain miss.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, warn};

/// A cached value with its absolute expiry instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CacheEntry {
    fn new(value: String, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Utc::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Two-tier TTL cache keyed by fetch URL.
pub struct TieredCache {
    /// Fast tier. Unbounded; entries only leave through expiry.
    memory: RwLock<HashMap<String, CacheEntry>>,
    /// Durable-tier directory, created on first write.
    dir: PathBuf,
    /// Default entry lifetime.
    ttl: Duration,
    /// Baked into every durable filename; bumping it strands old files.
    version: String,
}

impl TieredCache {
    pub fn new(dir: impl AsRef<Path>, ttl: Duration, version: impl Into<String>) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            dir: dir.as_ref().to_path_buf(),
            ttl,
            version: version.into(),
        }
    }

    /// Look a key up, fastest tier first. Expired entries are treated as
    /// absent in both tiers; a durable-tier hit is promoted into memory
    /// with a fresh full TTL window.
    pub fn get(&self, key: &str) -> Option<String> {
        {
            let mut memory = self.memory.write().unwrap();
            if let Some(entry) = memory.get(key) {
                if !entry.is_expired() {
                    debug!(key = key, "Memory cache hit");
                    return Some(entry.value.clone());
                }
                memory.remove(key);
            }
        }

        let entry = self.disk_get(key)?;
        debug!(key = key, "Disk cache hit, promoting to memory");
        let value = entry.value;
        self.memory
            .write()
            .unwrap()
            .insert(key.to_string(), CacheEntry::new(value.clone(), self.ttl));
        Some(value)
    }

    /// Write a value through both tiers with the default TTL.
    pub fn set(&self, key: &str, value: &str) {
        self.set_with_ttl(key, value, self.ttl);
    }

    /// Write a value through both tiers with an explicit TTL.
    pub fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) {
        let entry = CacheEntry::new(value.to_string(), ttl);
        self.memory
            .write()
            .unwrap()
            .insert(key.to_string(), entry.clone());
        self.disk_set(key, &entry);
    }

    /// Durable-tier lookup. Missing file, unreadable payload and expired
    /// entries are all the same thing: a miss.
    fn disk_get(&self, key: &str) -> Option<CacheEntry> {
        let raw = std::fs::read_to_string(self.entry_path(key)).ok()?;
        let entry: CacheEntry = serde_json::from_str(&raw).ok()?;
        if entry.is_expired() {
            return None;
        }
        Some(entry)
    }

    /// Durable-tier write. I/O failures are logged and swallowed so a
    /// read-only or full disk degrades to memory-only caching.
    fn disk_set(&self, key: &str, entry: &CacheEntry) {
        if let Err(e) = self.try_disk_set(key, entry) {
            warn!(key = key, error = %e, "Disk cache write failed");
        }
    }

    fn try_disk_set(&self, key: &str, entry: &CacheEntry) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let payload = serde_json::to_string(entry)?;
        std::fs::write(self.entry_path(key), payload)?;
        Ok(())
    }

    /// Durable filename: hex SHA-1 over the version-qualified key. Stable
    /// across processes so restarts see each other's entries.
    fn entry_path(&self, key: &str) -> PathBuf {
        let mut hasher = Sha1::new();
        hasher.update(format!("{}:{}", self.version, key).as_bytes());
        let digest = format!("{:x}", hasher.finalize());
        self.dir.join(format!("{}.json", digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_cache(dir: &Path, version: &str) -> TieredCache {
        TieredCache::new(dir, Duration::minutes(5), version)
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let temp = TempDir::new().unwrap();
        let cache = test_cache(temp.path(), "v1");

        cache.set("https://example.org/page", "<html>body</html>");
        assert_eq!(
            cache.get("https://example.org/page").as_deref(),
            Some("<html>body</html>")
        );
        assert_eq!(cache.get("https://example.org/other"), None);
    }

    #[test]
    fn test_expired_entries_miss_in_both_tiers() {
        let temp = TempDir::new().unwrap();
        let cache = test_cache(temp.path(), "v1");

        // A negative TTL writes an already-expired entry everywhere.
        cache.set_with_ttl("key", "value", Duration::seconds(-1));
        assert_eq!(cache.get("key"), None);

        // A fresh instance reading the same directory must also miss.
        let other = test_cache(temp.path(), "v1");
        assert_eq!(other.get("key"), None);
    }

    #[test]
    fn test_disk_hit_promotes_into_memory() {
        let temp = TempDir::new().unwrap();
        let writer = test_cache(temp.path(), "v1");
        writer.set("key", "value");

        // A separate instance starts with an empty memory tier, so the
        // first hit must come from disk.
        let reader = test_cache(temp.path(), "v1");
        assert_eq!(reader.get("key").as_deref(), Some("value"));

        // Remove the durable files; the promoted copy must still answer.
        for file in std::fs::read_dir(temp.path()).unwrap() {
            std::fs::remove_file(file.unwrap().path()).unwrap();
        }
        assert_eq!(reader.get("key").as_deref(), Some("value"));
    }

    #[test]
    fn test_corrupt_durable_file_is_a_miss() {
        let temp = TempDir::new().unwrap();
        let writer = test_cache(temp.path(), "v1");
        writer.set("key", "value");

        for file in std::fs::read_dir(temp.path()).unwrap() {
            std::fs::write(file.unwrap().path(), "not json").unwrap();
        }

        let reader = test_cache(temp.path(), "v1");
        assert_eq!(reader.get("key"), None);
    }

    #[test]
    fn test_version_bump_invalidates_old_files() {
        let temp = TempDir::new().unwrap();
        let old = test_cache(temp.path(), "v1");
        old.set("key", "value");

        let new = test_cache(temp.path(), "v2");
        assert_eq!(new.get("key"), None);

        // The old generation is untouched.
        assert_eq!(old.get("key").as_deref(), Some("value"));
    }

    #[test]
    fn test_same_key_same_file_across_instances() {
        let temp = TempDir::new().unwrap();
        let a = test_cache(temp.path(), "v1");
        let b = test_cache(temp.path(), "v1");
        assert_eq!(a.entry_path("key"), b.entry_path("key"));
        assert_ne!(a.entry_path("key"), a.entry_path("other"));
    }
}
