use crate::error::{AppError, Result};
use crate::state::{CacheBackend, CacheMetadata, StoredEntry};
use async_trait::async_trait;
use sled::transaction::TransactionResult;
use sled::{Db, Transactional};
use std::path::Path;
use std::sync::Arc;

/// Persistent cache backend using Sled embedded database.
///
/// Payloads and metadata live in separate trees so that listing metadata
/// never reads payload bytes. Both trees are written in one transaction.
#[derive(Clone)]
pub struct SledCacheBackend {
    db: Arc<Db>,
    payloads_tree: sled::Tree,
    metadata_tree: sled::Tree,
}

impl SledCacheBackend {
    /// Open (or create) a cache database at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let db = sled::open(path).map_err(|e| {
            AppError::CacheCorruption(format!("Failed to open Sled database: {}", e))
        })?;

        let payloads_tree = db.open_tree("payloads").map_err(|e| {
            AppError::CacheCorruption(format!("Failed to open payloads tree: {}", e))
        })?;

        let metadata_tree = db.open_tree("metadata").map_err(|e| {
            AppError::CacheCorruption(format!("Failed to open metadata tree: {}", e))
        })?;

        tracing::info!("Initialized Sled cache at {:?}", path);

        Ok(Self {
            db: Arc::new(db),
            payloads_tree,
            metadata_tree,
        })
    }

    fn serialize_metadata(metadata: &CacheMetadata) -> Result<Vec<u8>> {
        bincode::serialize(metadata).map_err(|e| {
            AppError::CacheCorruption(format!("Failed to serialize cache metadata: {}", e))
        })
    }

    fn deserialize_metadata(bytes: &[u8]) -> Result<CacheMetadata> {
        bincode::deserialize(bytes).map_err(|e| {
            AppError::CacheCorruption(format!("Failed to deserialize cache metadata: {}", e))
        })
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db.flush_async().await.map_err(|e| {
            AppError::CacheCorruption(format!("Failed to flush database: {}", e))
        })?;
        Ok(())
    }

    /// Get database size in bytes
    pub fn size_on_disk(&self) -> Result<u64> {
        self.db.size_on_disk().map_err(|e| {
            AppError::CacheCorruption(format!("Failed to get database size: {}", e))
        })
    }
}

#[async_trait]
impl CacheBackend for SledCacheBackend {
    async fn load(&self, key: &str) -> Result<Option<StoredEntry>> {
        let Some(metadata) = self.metadata(key).await? else {
            return Ok(None);
        };

        match self.payloads_tree.get(key.as_bytes()) {
            Ok(Some(bytes)) => Ok(Some(StoredEntry {
                metadata,
                payload: bytes.to_vec(),
            })),
            Ok(None) => Err(AppError::CacheCorruption(format!(
                "Metadata present without payload for {}",
                key
            ))),
            Err(e) => Err(AppError::CacheCorruption(format!(
                "Failed to read payload: {}",
                e
            ))),
        }
    }

    async fn store(&self, entry: StoredEntry) -> Result<()> {
        let key = entry.metadata.key.as_bytes().to_vec();
        let metadata = Self::serialize_metadata(&entry.metadata)?;

        let result: TransactionResult<()> = (&self.payloads_tree, &self.metadata_tree)
            .transaction(|(payloads, metadata_tree)| {
                payloads.insert(key.as_slice(), entry.payload.as_slice())?;
                metadata_tree.insert(key.as_slice(), metadata.as_slice())?;
                Ok(())
            });

        result.map_err(|e| {
            AppError::CacheCorruption(format!("Failed to store cache entry: {:?}", e))
        })?;

        self.flush().await?;

        tracing::debug!(key = %entry.metadata.key, "Cache entry saved to Sled");
        Ok(())
    }

    async fn contains(&self, key: &str) -> Result<bool> {
        self.metadata_tree.contains_key(key.as_bytes()).map_err(|e| {
            AppError::CacheCorruption(format!("Failed to check cache entry: {}", e))
        })
    }

    async fn metadata(&self, key: &str) -> Result<Option<CacheMetadata>> {
        match self.metadata_tree.get(key.as_bytes()) {
            Ok(Some(bytes)) => Ok(Some(Self::deserialize_metadata(&bytes)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(AppError::CacheCorruption(format!(
                "Failed to read cache metadata: {}",
                e
            ))),
        }
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let key = key.as_bytes();

        let result: TransactionResult<bool> = (&self.payloads_tree, &self.metadata_tree)
            .transaction(|(payloads, metadata_tree)| {
                payloads.remove(key)?;
                Ok(metadata_tree.remove(key)?.is_some())
            });

        let removed = result.map_err(|e| {
            AppError::CacheCorruption(format!("Failed to remove cache entry: {:?}", e))
        })?;

        self.flush().await?;
        Ok(removed)
    }

    async fn clear(&self) -> Result<()> {
        self.metadata_tree.clear().map_err(|e| {
            AppError::CacheCorruption(format!("Failed to clear metadata tree: {}", e))
        })?;

        self.payloads_tree.clear().map_err(|e| {
            AppError::CacheCorruption(format!("Failed to clear payloads tree: {}", e))
        })?;

        self.flush().await
    }

    async fn list_metadata(&self) -> Result<Vec<CacheMetadata>> {
        let mut entries = Vec::new();

        // sled iterates in key order
        for result in self.metadata_tree.iter() {
            let (_, value) = result.map_err(|e| {
                AppError::CacheCorruption(format!("Failed to iterate cache metadata: {}", e))
            })?;

            entries.push(Self::deserialize_metadata(&value)?);
        }

        Ok(entries)
    }
}
