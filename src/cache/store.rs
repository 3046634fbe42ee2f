//! Cache store for persisting history responses
//!
//! Provides a `CacheStore` that writes every entry through to two tiers and reads
//! from the structured tier first, falling back to the key/value tier on a miss.

use chrono::Utc;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::tiers::{CacheTier, KeyValueTier, MemoryTier, ResponseTier};
use crate::data::RawResponse;

/// Namespace prefix for price history cache keys
pub const CACHE_NAME: &str = "nvda-stock-data";

/// How long an entry is considered fresh, in milliseconds
pub const CACHE_DURATION_MS: i64 = 5 * 60 * 1000;

/// A timestamped snapshot of one upstream response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// The cached response
    pub data: RawResponse,
    /// Epoch milliseconds when the entry was written
    pub timestamp: i64,
}

impl CacheEntry {
    /// Wraps `data` with the current time
    pub fn now(data: RawResponse) -> Self {
        Self {
            data,
            timestamp: Utc::now().timestamp_millis(),
        }
    }
}

/// Cache namespace for a ticker, e.g. `nvda-stock-data` for `NVDA`
pub fn cache_namespace(symbol: &str) -> String {
    format!("{}-stock-data", symbol.trim().to_lowercase())
}

/// Builds a cache key as `"<namespace>-<identifier>"`
pub fn cache_key(namespace: &str, identifier: &str) -> String {
    format!("{}-{}", namespace, identifier)
}

/// Returns true if an entry written at `timestamp` is older than the cache duration
pub fn is_expired(timestamp: i64) -> bool {
    is_expired_at(timestamp, Utc::now().timestamp_millis())
}

/// Expiry check against an explicit `now`, both in epoch milliseconds
pub fn is_expired_at(timestamp: i64, now: i64) -> bool {
    now.saturating_sub(timestamp) > CACHE_DURATION_MS
}

/// Reads and writes cache entries across a primary and a fallback tier
///
/// Entries are never evicted. Expiry is checked by the caller, so stale entries
/// stay readable for degraded use.
#[derive(Debug)]
pub struct CacheStore {
    primary: Box<dyn CacheTier>,
    fallback: Box<dyn CacheTier>,
}

impl CacheStore {
    /// Creates a CacheStore in the XDG cache directory
    ///
    /// Uses `~/.cache/pricewatch/` on Linux, or the equivalent path elsewhere.
    /// Returns `None` if the cache directory cannot be determined.
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "pricewatch")?;
        Some(Self::with_dir(project_dirs.cache_dir().to_path_buf()))
    }

    /// Creates a CacheStore rooted at a custom directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self::with_tiers(
            Box::new(ResponseTier::new(cache_dir.join("responses"))),
            Box::new(KeyValueTier::new(cache_dir.join("kv.json"))),
        )
    }

    /// Creates a CacheStore that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::with_tiers(Box::new(MemoryTier::new()), Box::new(MemoryTier::new()))
    }

    /// Creates a CacheStore from explicit tiers, tried in the given order
    pub fn with_tiers(primary: Box<dyn CacheTier>, fallback: Box<dyn CacheTier>) -> Self {
        Self { primary, fallback }
    }

    /// Builds a cache key, see [`cache_key`]
    pub fn key(namespace: &str, identifier: &str) -> String {
        cache_key(namespace, identifier)
    }

    /// Returns true if `timestamp` is past the cache duration, see [`is_expired`]
    pub fn is_expired(timestamp: i64) -> bool {
        is_expired(timestamp)
    }

    /// Looks up an entry, structured tier first
    ///
    /// Returns `None` if neither tier has a readable entry. Tier failures are
    /// logged and treated as misses.
    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        Self::read_tier(self.primary.as_ref(), key)
            .or_else(|| Self::read_tier(self.fallback.as_ref(), key))
    }

    fn read_tier(tier: &dyn CacheTier, key: &str) -> Option<CacheEntry> {
        let json = match tier.read(key) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(tier = tier.name(), key, error = %e, "error reading cache");
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(tier = tier.name(), key, error = %e, "error decoding cache entry");
                None
            }
        }
    }

    /// Writes an entry to both tiers, overwriting any previous entry
    ///
    /// Failures are logged and never returned.
    pub fn set(&self, key: &str, entry: &CacheEntry) {
        let json = match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(key, error = %e, "error encoding cache entry");
                return;
            }
        };

        for tier in [self.primary.as_ref(), self.fallback.as_ref()] {
            if let Err(e) = tier.write(key, &json) {
                tracing::warn!(tier = tier.name(), key, error = %e, "error writing to cache");
            }
        }
    }
}
