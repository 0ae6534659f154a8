use crate::error::{AppError, Result};
use crate::metrics::{CACHE_LOOKUPS_TOTAL, PROVIDER_FETCHES_TOTAL};
use crate::models::IterationData;
use crate::provider::DataProvider;
use crate::state::{CacheStatus, IterationCacheStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Serves iteration data from the cache and falls back to an upstream
/// provider on a miss.
///
/// Fetches for the same iteration are serialized: while one caller is
/// checking the cache, fetching and storing, others wait on a per-key lock
/// and then find the fresh entry. Upstream is hit once per miss.
pub struct CachedDataProvider {
    upstream: Arc<dyn DataProvider>,
    cache: IterationCacheStore,
    refresh_stale: bool,
    ttl_hours: Option<f64>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

enum Lookup {
    Hit(IterationData),
    Miss,
}

impl CachedDataProvider {
    pub fn new(upstream: Arc<dyn DataProvider>, cache: IterationCacheStore) -> Self {
        Self {
            upstream,
            cache,
            refresh_stale: true,
            ttl_hours: None,
            in_flight: DashMap::new(),
        }
    }

    /// Serve stale entries as-is instead of refetching them
    pub fn with_refresh_stale(mut self, refresh_stale: bool) -> Self {
        self.refresh_stale = refresh_stale;
        self
    }

    /// TTL recorded on entries written by this provider; the store default
    /// applies otherwise
    pub fn with_ttl_hours(mut self, ttl_hours: f64) -> Self {
        self.ttl_hours = Some(ttl_hours);
        self
    }

    pub fn cache(&self) -> &IterationCacheStore {
        &self.cache
    }

    /// Number of keys currently holding a fetch lock
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    async fn lock_key(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        lock.lock_owned().await
    }

    fn release_key(&self, key: &str) {
        self.in_flight
            .remove_if(key, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn lookup(&self, key: &str) -> Result<Lookup> {
        let entry = match self.cache.get_entry(key).await {
            Ok(entry) => entry,
            Err(AppError::CacheCorruption(message)) => {
                tracing::warn!(key = %key, error = %message, "Unreadable cache entry, refetching");
                None
            }
            Err(e) => return Err(e),
        };

        let Some(entry) = entry else {
            CACHE_LOOKUPS_TOTAL.with_label_values(&["miss"]).inc();
            return Ok(Lookup::Miss);
        };

        let status = self.cache.classify(&entry.metadata);
        if status == CacheStatus::Stale && self.refresh_stale {
            CACHE_LOOKUPS_TOTAL.with_label_values(&["stale"]).inc();
            tracing::debug!(key = %key, "Cache entry stale, refetching");
            return Ok(Lookup::Miss);
        }

        CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
        tracing::debug!(key = %key, status = %status, "Cache hit");
        Ok(Lookup::Hit(entry.data))
    }

    async fn fetch_upstream(&self, key: &str) -> Result<IterationData> {
        let result = self.upstream.fetch_iteration_data(key).await;
        record_fetch(&result);
        let data = result?;

        self.cache.set(key, &data, self.ttl_hours).await?;
        Ok(data)
    }

    async fn fetch_locked(&self, key: &str) -> Result<IterationData> {
        match self.lookup(key).await? {
            Lookup::Hit(data) => Ok(data),
            Lookup::Miss => self.fetch_upstream(key).await,
        }
    }

    async fn fetch_batch_locked(&self, iteration_ids: &[String]) -> Result<Vec<IterationData>> {
        let mut resolved: HashMap<&str, IterationData> = HashMap::new();
        let mut missing: Vec<String> = Vec::new();

        for key in iteration_ids {
            if resolved.contains_key(key.as_str()) || missing.contains(key) {
                continue;
            }
            match self.lookup(key).await? {
                Lookup::Hit(data) => {
                    resolved.insert(key.as_str(), data);
                }
                Lookup::Miss => missing.push(key.clone()),
            }
        }

        if !missing.is_empty() {
            let result = self.upstream.fetch_multiple_iterations(&missing).await;
            record_fetch(&result);
            let fetched = result?;

            if fetched.len() != missing.len() {
                return Err(AppError::Internal(format!(
                    "Provider returned {} iterations for {} requested",
                    fetched.len(),
                    missing.len()
                )));
            }

            for (key, data) in missing.iter().zip(fetched) {
                self.cache.set(key, &data, self.ttl_hours).await?;
                if let Some(requested) = iteration_ids.iter().find(|id| *id == key) {
                    resolved.insert(requested.as_str(), data);
                }
            }
        }

        iteration_ids
            .iter()
            .map(|key| {
                resolved.get(key.as_str()).cloned().ok_or_else(|| {
                    AppError::Internal(format!("No data resolved for iteration {}", key))
                })
            })
            .collect()
    }
}

fn record_fetch<T>(result: &Result<T>) {
    let outcome = if result.is_ok() { "success" } else { "error" };
    PROVIDER_FETCHES_TOTAL.with_label_values(&[outcome]).inc();
}

#[async_trait]
impl DataProvider for CachedDataProvider {
    async fn fetch_iteration_data(&self, iteration_id: &str) -> Result<IterationData> {
        let guard = self.lock_key(iteration_id).await;
        let result = self.fetch_locked(iteration_id).await;
        drop(guard);
        self.release_key(iteration_id);
        result
    }

    async fn fetch_multiple_iterations(&self, iteration_ids: &[String]) -> Result<Vec<IterationData>> {
        // Locks are taken in key order so overlapping batches cannot deadlock
        let keys: BTreeSet<&str> = iteration_ids.iter().map(String::as_str).collect();
        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.lock_key(key).await);
        }

        let result = self.fetch_batch_locked(iteration_ids).await;

        drop(guards);
        for key in keys {
            self.release_key(key);
        }
        result
    }
}
