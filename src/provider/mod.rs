//! Sources of raw iteration data
//!
//! The orchestrator consumes a [`DataProvider`]. [`FileDataProvider`] reads
//! materialized snapshots from disk and [`CachedDataProvider`] puts the
//! iteration cache in front of any other provider.

mod cached;
mod file;

pub use cached::CachedDataProvider;
pub use file::FileDataProvider;

use crate::error::Result;
use crate::models::IterationData;
use async_trait::async_trait;

/// Upstream source of raw iteration data
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetch everything needed to compute one iteration's metrics
    async fn fetch_iteration_data(&self, iteration_id: &str) -> Result<IterationData>;

    /// Fetch several iterations. Results follow the order of `iteration_ids`.
    async fn fetch_multiple_iterations(&self, iteration_ids: &[String]) -> Result<Vec<IterationData>> {
        let mut results = Vec::with_capacity(iteration_ids.len());
        for iteration_id in iteration_ids {
            results.push(self.fetch_iteration_data(iteration_id).await?);
        }
        Ok(results)
    }
}
