//! Storage backends for the cache store
//!
//! Each tier maps a string key to a JSON string. The store decides what the JSON
//! means; tiers only move bytes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;

/// Content type recorded alongside structured responses
const JSON_CONTENT_TYPE: &str = "application/json";

/// Errors raised by a single storage tier
#[derive(Debug, Error)]
pub enum CacheError {
    /// Reading or writing the backing file failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The stored record couldn't be (de)serialized
    #[error("Cache record is malformed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The tier's lock was poisoned by a panicking writer
    #[error("Cache tier lock poisoned")]
    Poisoned,
}

/// A string-keyed storage backend
pub trait CacheTier: Debug + Send + Sync {
    /// Short name used in log output
    fn name(&self) -> &'static str;

    /// Returns the stored JSON for `key`, or `None` if nothing is stored
    fn read(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Stores `json` under `key`, replacing any previous value
    fn write(&self, key: &str, json: &str) -> Result<(), CacheError>;
}

/// On-disk record written by [`ResponseTier`]
#[derive(Debug, Serialize, Deserialize)]
struct StoredResponse {
    content_type: String,
    body: String,
}

/// Structured tier: one response record per key
///
/// Files live at `<dir>/<key>.json` and wrap the payload with its content type,
/// the way a request/response cache would.
#[derive(Debug, Clone)]
pub struct ResponseTier {
    dir: PathBuf,
}

impl ResponseTier {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl CacheTier for ResponseTier {
    fn name(&self) -> &'static str {
        "responses"
    }

    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let content = match fs::read_to_string(self.path(key)) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let stored: StoredResponse = serde_json::from_str(&content)?;
        Ok(Some(stored.body))
    }

    fn write(&self, key: &str, json: &str) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        let stored = StoredResponse {
            content_type: JSON_CONTENT_TYPE.to_string(),
            body: json.to_string(),
        };
        fs::write(self.path(key), serde_json::to_string(&stored)?)?;
        Ok(())
    }
}

/// Fallback tier: a single JSON object of string keys to string values
#[derive(Debug)]
pub struct KeyValueTier {
    path: PathBuf,
    lock: Mutex<()>,
}

impl KeyValueTier {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    fn load(&self) -> Result<HashMap<String, String>, CacheError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl CacheTier for KeyValueTier {
    fn name(&self) -> &'static str {
        "kv"
    }

    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(self.load()?.remove(key))
    }

    fn write(&self, key: &str, json: &str) -> Result<(), CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::Poisoned)?;
        // A corrupt store is replaced rather than blocking every future write.
        let mut map = match self.load() {
            Ok(map) => map,
            Err(CacheError::Serialize(_)) => HashMap::new(),
            Err(e) => return Err(e),
        };
        map.insert(key.to_string(), json.to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string(&map)?)?;
        Ok(())
    }
}

/// Process-local tier, used when no cache directory is available
#[derive(Debug, Default)]
pub struct MemoryTier {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryTier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheTier for MemoryTier {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn read(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn write(&self, key: &str, json: &str) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(key.to_string(), json.to_string());
        Ok(())
    }
}
