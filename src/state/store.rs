use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Cheap-to-enumerate description of a cached entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMetadata {
    /// Iteration id
    pub key: String,

    /// When the payload was fetched from upstream
    pub last_fetched_at: DateTime<Utc>,

    /// Encoded payload size
    pub size_bytes: u64,

    /// Staleness threshold recorded at write time
    pub ttl_hours: f64,
}

/// Encoded payload plus its metadata, as handed to a backend
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub metadata: CacheMetadata,
    pub payload: Vec<u8>,
}

/// Persistence backend for the iteration cache.
///
/// Implementations must make a single-key `store` atomic and must be safe
/// for concurrent use on different keys. Failures are reported as
/// `AppError::CacheCorruption`; an absent key is `Ok(None)`.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Load an entry with its payload
    async fn load(&self, key: &str) -> Result<Option<StoredEntry>>;

    /// Insert or overwrite an entry
    async fn store(&self, entry: StoredEntry) -> Result<()>;

    /// Check whether a key is present
    async fn contains(&self, key: &str) -> Result<bool>;

    /// Metadata for a key without touching its payload
    async fn metadata(&self, key: &str) -> Result<Option<CacheMetadata>>;

    /// Remove a key, returning whether it was present
    async fn remove(&self, key: &str) -> Result<bool>;

    /// Remove every entry
    async fn clear(&self) -> Result<()>;

    /// Metadata for every entry, ordered by key
    async fn list_metadata(&self) -> Result<Vec<CacheMetadata>>;
}

/// In-memory cache backend (for development and testing)
#[derive(Clone, Default)]
pub struct InMemoryCacheBackend {
    entries: Arc<DashMap<String, StoredEntry>>,
}

impl InMemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCacheBackend {
    async fn load(&self, key: &str) -> Result<Option<StoredEntry>> {
        Ok(self.entries.get(key).map(|entry| entry.clone()))
    }

    async fn store(&self, entry: StoredEntry) -> Result<()> {
        let key = entry.metadata.key.clone();
        self.entries.insert(key.clone(), entry);
        tracing::debug!(key = %key, "Cache entry stored in memory");
        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.entries.contains_key(key))
    }

    async fn metadata(&self, key: &str) -> Result<Option<CacheMetadata>> {
        Ok(self.entries.get(key).map(|entry| entry.metadata.clone()))
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.entries.remove(key).is_some())
    }

    async fn clear(&self) -> Result<()> {
        self.entries.clear();
        Ok(())
    }

    async fn list_metadata(&self) -> Result<Vec<CacheMetadata>> {
        let mut metadata: Vec<CacheMetadata> = self
            .entries
            .iter()
            .map(|entry| entry.value().metadata.clone())
            .collect();

        metadata.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(metadata)
    }
}
