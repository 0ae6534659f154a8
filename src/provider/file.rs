use crate::analytics::attach_change_links;
use crate::error::{AppError, Result};
use crate::models::IterationData;
use crate::provider::DataProvider;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Reads iteration snapshots stored as `<data_dir>/<iteration id>.json`.
///
/// Incidents without an explicit change link get one parsed from their
/// timeline on load.
#[derive(Debug, Clone)]
pub struct FileDataProvider {
    data_dir: PathBuf,
    max_concurrent_reads: usize,
}

impl FileDataProvider {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            max_concurrent_reads: 8,
        }
    }

    /// Bound on snapshots read at once by a batch fetch
    pub fn with_max_concurrent_reads(mut self, max_concurrent_reads: usize) -> Self {
        self.max_concurrent_reads = max_concurrent_reads.max(1);
        self
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn snapshot_path(&self, iteration_id: &str) -> Result<PathBuf> {
        let is_plain = !iteration_id.is_empty()
            && !iteration_id.contains(['/', '\\'])
            && iteration_id != "."
            && iteration_id != "..";

        if !is_plain {
            return Err(AppError::Validation(format!(
                "Invalid iteration id: {:?}",
                iteration_id
            )));
        }

        Ok(self.data_dir.join(format!("{}.json", iteration_id)))
    }
}

#[async_trait]
impl DataProvider for FileDataProvider {
    async fn fetch_iteration_data(&self, iteration_id: &str) -> Result<IterationData> {
        let path = self.snapshot_path(iteration_id)?;

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AppError::NotFound(format!(
                    "No snapshot for iteration {} at {}",
                    iteration_id,
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let mut data: IterationData = serde_json::from_slice(&bytes)?;

        if data.iteration.id != iteration_id {
            return Err(AppError::Validation(format!(
                "Snapshot {} describes iteration {}",
                path.display(),
                data.iteration.id
            )));
        }

        let linked = attach_change_links(&mut data.incidents);

        tracing::debug!(
            iteration_id = %iteration_id,
            issues = data.issues.len(),
            merge_requests = data.merge_requests.len(),
            incidents = data.incidents.len(),
            linked,
            "Loaded iteration snapshot"
        );

        Ok(data)
    }

    async fn fetch_multiple_iterations(&self, iteration_ids: &[String]) -> Result<Vec<IterationData>> {
        use futures::stream::{self, StreamExt, TryStreamExt};

        let reads: Vec<_> = iteration_ids
            .iter()
            .map(|iteration_id| self.fetch_iteration_data(iteration_id))
            .collect();

        // buffered keeps input order
        stream::iter(reads)
            .buffered(self.max_concurrent_reads)
            .try_collect()
            .await
    }
}
