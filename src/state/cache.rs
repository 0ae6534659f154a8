use crate::error::{AppError, Result};
use crate::models::IterationData;
use crate::state::{CacheBackend, CacheMetadata, StoredEntry};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use strum::{Display, EnumString};

/// Entries younger than this are fresh regardless of TTL
pub const FRESH_WINDOW_HOURS: f64 = 1.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Staleness bucket of a cached entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CacheStatus {
    Fresh,
    Aging,
    Stale,
}

impl CacheStatus {
    /// Bucket an entry of `age_hours` under `ttl_hours`.
    ///
    /// Stale is checked first, so with `ttl_hours <= 1` an entry moves from
    /// fresh straight to stale. Negative ages count as fresh.
    pub fn classify(age_hours: f64, ttl_hours: f64) -> Self {
        if age_hours >= ttl_hours {
            CacheStatus::Stale
        } else if age_hours < FRESH_WINDOW_HOURS {
            CacheStatus::Fresh
        } else {
            CacheStatus::Aging
        }
    }
}

/// Source of "now" for staleness decisions
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for tests and replays
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.write() = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}

/// Cached payload with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: IterationData,
    pub metadata: CacheMetadata,
}

/// Metadata paired with age and staleness bucket
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryStatus {
    #[serde(flatten)]
    pub metadata: CacheMetadata,
    pub age_hours: f64,
    pub status: CacheStatus,
}

/// Persistent cache of raw iteration data keyed by iteration id.
///
/// Entries are never evicted; staleness is reported, and acting on it is
/// left to the caller.
#[derive(Clone)]
pub struct IterationCacheStore {
    backend: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    default_ttl_hours: f64,
}

impl IterationCacheStore {
    pub fn new(backend: Arc<dyn CacheBackend>, default_ttl_hours: f64) -> Result<Self> {
        Self::with_clock(backend, Arc::new(SystemClock), default_ttl_hours)
    }

    pub fn with_clock(
        backend: Arc<dyn CacheBackend>,
        clock: Arc<dyn Clock>,
        default_ttl_hours: f64,
    ) -> Result<Self> {
        validate_ttl(default_ttl_hours)?;

        Ok(Self {
            backend,
            clock,
            default_ttl_hours,
        })
    }

    pub fn default_ttl_hours(&self) -> f64 {
        self.default_ttl_hours
    }

    /// Cached payload for `key`; a miss is `Ok(None)`
    pub async fn get(&self, key: &str) -> Result<Option<IterationData>> {
        Ok(self.get_entry(key).await?.map(|entry| entry.data))
    }

    /// Cached payload together with its metadata
    pub async fn get_entry(&self, key: &str) -> Result<Option<CacheEntry>> {
        let Some(stored) = self.backend.load(key).await? else {
            tracing::debug!(key = %key, "Cache miss");
            return Ok(None);
        };

        let data: IterationData = serde_json::from_slice(&stored.payload).map_err(|e| {
            AppError::CacheCorruption(format!("Failed to decode cached payload for {}: {}", key, e))
        })?;

        Ok(Some(CacheEntry {
            data,
            metadata: stored.metadata,
        }))
    }

    /// Store `data` under `key`, stamping it with the current time.
    /// `ttl_hours` falls back to the store default.
    pub async fn set(&self, key: &str, data: &IterationData, ttl_hours: Option<f64>) -> Result<()> {
        let ttl_hours = ttl_hours.unwrap_or(self.default_ttl_hours);
        validate_ttl(ttl_hours)?;

        let payload = serde_json::to_vec(data).map_err(|e| {
            AppError::CacheCorruption(format!("Failed to encode payload for {}: {}", key, e))
        })?;

        let metadata = CacheMetadata {
            key: key.to_string(),
            last_fetched_at: self.clock.now(),
            size_bytes: payload.len() as u64,
            ttl_hours,
        };

        tracing::debug!(key = %key, size_bytes = metadata.size_bytes, ttl_hours, "Caching iteration data");

        self.backend.store(StoredEntry { metadata, payload }).await
    }

    pub async fn has(&self, key: &str) -> Result<bool> {
        self.backend.contains(key).await
    }

    /// Remove one entry, returning whether it existed
    pub async fn clear(&self, key: &str) -> Result<bool> {
        let removed = self.backend.remove(key).await?;
        if removed {
            tracing::info!(key = %key, "Cleared cache entry");
        }
        Ok(removed)
    }

    pub async fn clear_all(&self) -> Result<()> {
        self.backend.clear().await?;
        tracing::info!("Cleared all cache entries");
        Ok(())
    }

    /// Metadata for every entry; payloads are not decoded
    pub async fn get_all_metadata(&self) -> Result<Vec<CacheMetadata>> {
        self.backend.list_metadata().await
    }

    /// Age and staleness of one entry
    pub async fn status(&self, key: &str) -> Result<Option<CacheEntryStatus>> {
        let metadata = self.backend.metadata(key).await?;
        Ok(metadata.map(|metadata| self.describe(metadata)))
    }

    /// Age and staleness of every entry
    pub async fn get_all_status(&self) -> Result<Vec<CacheEntryStatus>> {
        let metadata = self.get_all_metadata().await?;
        Ok(metadata.into_iter().map(|m| self.describe(m)).collect())
    }

    /// Age in hours of an entry relative to the store clock
    pub fn age_hours(&self, metadata: &CacheMetadata) -> f64 {
        (self.clock.now() - metadata.last_fetched_at).num_milliseconds() as f64 / MILLIS_PER_HOUR
    }

    pub fn classify(&self, metadata: &CacheMetadata) -> CacheStatus {
        CacheStatus::classify(self.age_hours(metadata), metadata.ttl_hours)
    }

    fn describe(&self, metadata: CacheMetadata) -> CacheEntryStatus {
        let age_hours = self.age_hours(&metadata);
        let status = CacheStatus::classify(age_hours, metadata.ttl_hours);

        CacheEntryStatus {
            metadata,
            age_hours,
            status,
        }
    }
}

fn validate_ttl(ttl_hours: f64) -> Result<()> {
    if ttl_hours.is_finite() && ttl_hours > 0.0 {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "ttl_hours must be a positive number, got {}",
            ttl_hours
        )))
    }
}
