//! Cache module for storing history responses
//!
//! This module provides a cache store that persists responses to two storage tiers
//! with a fixed expiry window. Expired entries are still returned so callers can
//! decide whether stale data is acceptable.

mod store;
pub mod tiers;

pub use store::{
    cache_key, cache_namespace, is_expired, is_expired_at, CacheEntry, CacheStore,
    CACHE_DURATION_MS, CACHE_NAME,
};
pub use tiers::{CacheError, CacheTier, KeyValueTier, MemoryTier, ResponseTier};
