use crate::config::{CacheBackendKind, CacheConfig};
use crate::error::{AppError, Result};
use crate::state::{CacheBackend, InMemoryCacheBackend, IterationCacheStore, SledCacheBackend};
use std::sync::Arc;

/// Create a cache backend based on configuration
pub fn create_cache_backend(config: &CacheConfig) -> Result<Arc<dyn CacheBackend>> {
    match config.backend {
        CacheBackendKind::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration("Sled backend requires 'path' configuration".to_string())
            })?;

            tracing::info!(path = ?path, "Initializing Sled cache backend");

            let backend = SledCacheBackend::new(path)?;
            Ok(Arc::new(backend))
        }

        CacheBackendKind::Memory => {
            tracing::info!("Initializing in-memory cache backend");
            Ok(Arc::new(InMemoryCacheBackend::new()))
        }
    }
}

/// Create the iteration cache store described by configuration
pub fn create_cache_store(config: &CacheConfig) -> Result<IterationCacheStore> {
    let backend = create_cache_backend(config)?;
    IterationCacheStore::new(backend, config.ttl_hours)
}
