use crate::analytics::{
    change_failure_rate, cycle_time, deployment_count, deployment_frequency, lead_time,
    mean_time_to_recovery, throughput, velocity, DEFAULT_DEPLOYMENT_BRANCHES,
};
use crate::correlation::correlate_incidents;
use crate::error::{AppError, Result};
use crate::metrics::{COMPUTATIONS_TOTAL, COMPUTATION_DURATION_SECONDS};
use crate::models::{IterationData, IterationMetrics, MetricsInput, RawData};
use crate::provider::DataProvider;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info_span, instrument};

const FETCH_OPERATION: &str = "fetch iteration data";
const BUILD_OPERATION: &str = "build metrics";

/// Computes iteration metric records from provider data
pub struct MetricsOrchestrator {
    provider: Arc<dyn DataProvider>,
    deployment_branches: Vec<String>,
}

impl MetricsOrchestrator {
    pub fn new(provider: Arc<dyn DataProvider>) -> Self {
        Self {
            provider,
            deployment_branches: DEFAULT_DEPLOYMENT_BRANCHES
                .iter()
                .map(|branch| branch.to_string())
                .collect(),
        }
    }

    /// Set which target branches count as deployments
    pub fn with_deployment_branches(mut self, branches: Vec<String>) -> Self {
        self.deployment_branches = branches;
        self
    }

    pub fn deployment_branches(&self) -> &[String] {
        &self.deployment_branches
    }

    /// Fetch one iteration and compute its record
    #[instrument(skip(self))]
    pub async fn compute_metrics(&self, iteration_id: &str) -> Result<IterationMetrics> {
        let data = self
            .provider
            .fetch_iteration_data(iteration_id)
            .await
            .map_err(|e| fetch_failed(iteration_id, e))?;

        let metrics = build_metrics(&data, &self.deployment_branches, Utc::now());
        record_outcome(&metrics);
        metrics
    }

    /// Fetch several iterations in one provider call and compute a record
    /// for each. Output order matches `iteration_ids`.
    #[instrument(skip(self), fields(count = iteration_ids.len()))]
    pub async fn compute_metrics_batch(&self, iteration_ids: &[String]) -> Result<Vec<IterationMetrics>> {
        if iteration_ids.is_empty() {
            return Ok(Vec::new());
        }

        let batch = self
            .provider
            .fetch_multiple_iterations(iteration_ids)
            .await
            .map_err(|e| fetch_failed(&iteration_ids.join(","), e))?;

        if batch.len() != iteration_ids.len() {
            COMPUTATIONS_TOTAL.with_label_values(&["fetch_error"]).inc();
            return Err(AppError::fetch_failure(
                iteration_ids.join(","),
                FETCH_OPERATION,
                format!(
                    "provider returned {} iterations for {} requested",
                    batch.len(),
                    iteration_ids.len()
                ),
            ));
        }

        let created_at = Utc::now();
        batch
            .iter()
            .map(|data| {
                let metrics = build_metrics(data, &self.deployment_branches, created_at);
                record_outcome(&metrics);
                metrics
            })
            .collect()
    }
}

fn fetch_failed(iteration_id: &str, cause: AppError) -> AppError {
    COMPUTATIONS_TOTAL.with_label_values(&["fetch_error"]).inc();
    tracing::error!(iteration_id = %iteration_id, error = %cause, "Failed to fetch iteration data");
    AppError::fetch_failure(iteration_id, FETCH_OPERATION, cause)
}

fn record_outcome(metrics: &Result<IterationMetrics>) {
    let outcome = match metrics {
        Ok(_) => "success",
        Err(_) => "validation_error",
    };
    COMPUTATIONS_TOTAL.with_label_values(&[outcome]).inc();
}

fn invalid_record(iteration_id: &str, cause: AppError) -> AppError {
    let detail = match cause {
        AppError::Validation(detail) => detail,
        other => other.to_string(),
    };

    AppError::Validation(format!(
        "iteration {} failed to {}: {}",
        iteration_id, BUILD_OPERATION, detail
    ))
}

/// Derive the record for one iteration from its raw data.
///
/// MTTR, change failure rate and incident count all use the same set of
/// incidents: those whose causing change landed inside the iteration.
pub fn build_metrics<S: AsRef<str>>(
    data: &IterationData,
    deployment_branches: &[S],
    created_at: DateTime<Utc>,
) -> Result<IterationMetrics> {
    let iteration = &data.iteration;
    let span = info_span!("build_metrics", iteration_id = %iteration.id);
    let _enter = span.enter();
    let started = Instant::now();

    let sprint_days = iteration.sprint_days();
    let deployments = deployment_count(&data.merge_requests, deployment_branches);

    let correlation = correlate_incidents(&data.incidents, iteration);
    let incident_count = correlation.included_count() as u64;

    let input = MetricsInput {
        iteration_id: iteration.id.clone(),
        iteration_title: iteration.title.clone(),
        start_date: iteration.start_date,
        end_date: iteration.due_date,
        sprint_days,
        velocity: velocity(&data.issues),
        throughput: throughput(&data.issues),
        cycle_time: cycle_time(&data.issues),
        lead_time: lead_time(&data.merge_requests),
        deployment_frequency: deployment_frequency(
            &data.merge_requests,
            sprint_days,
            deployment_branches,
        ),
        deployment_count: deployments,
        mttr_hours: mean_time_to_recovery(&correlation.included),
        change_failure_rate: change_failure_rate(incident_count, deployments),
        incident_count,
        incident_decisions: correlation.decisions,
        raw_data: RawData {
            issues: data.issues.clone(),
            merge_requests: data.merge_requests.clone(),
            incidents: correlation.included,
        },
        created_at,
    };

    let metrics =
        IterationMetrics::try_new(input).map_err(|e| invalid_record(&iteration.id, e));
    COMPUTATION_DURATION_SECONDS.observe(started.elapsed().as_secs_f64());

    match &metrics {
        Ok(m) => tracing::info!(
            sprint_days,
            velocity_points = m.velocity().points,
            deployments,
            incident_count,
            "Computed iteration metrics"
        ),
        Err(e) => tracing::warn!(error = %e, "Iteration metrics failed validation"),
    }

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChangeLink, Incident, IntegrationEvent, Iteration, WorkItem};
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    fn link(id: u64) -> ChangeLink {
        ChangeLink::MergeEvent {
            url: format!("https://gitlab.example.com/g/app/-/merge_requests/{}", id),
            project: "g/app".to_string(),
            id,
        }
    }

    fn sample() -> IterationData {
        let mut data = IterationData::new(Iteration::new("5", "Sprint 5", day(1), day(14)));

        data.issues = vec![
            WorkItem::new("1", day(2)).closed(day(3)).with_weight(5),
            WorkItem::new("2", day(2)).closed(day(5)).with_weight(1),
            WorkItem::new("3", day(2)).closed(day(7)).with_weight(3),
            WorkItem::new("4", day(2)),
        ];
        data.merge_requests = vec![
            IntegrationEvent::new("10", "main").created(day(2)).merged(day(4)),
            IntegrationEvent::new("11", "Master").created(day(3)).merged(day(6)),
            IntegrationEvent::new("12", "feature/x").created(day(3)).merged(day(6)),
        ];
        data.incidents = vec![
            Incident::new("a", day(4))
                .closed(day(4) + Duration::hours(2))
                .caused_by(link(10), day(4)),
            Incident::new("b", day(20))
                .closed(day(20) + Duration::hours(8))
                .caused_by(link(11), day(20)),
            Incident::new("c", day(5)).closed(day(5) + Duration::hours(4)),
        ];
        data
    }

    #[test]
    fn test_build_metrics_scenario() {
        let metrics = build_metrics(&sample(), &["main", "master"], day(15)).unwrap();

        assert_eq!(metrics.sprint_days(), 14);
        assert_eq!(metrics.velocity().points, 9);
        assert_eq!(metrics.velocity().stories, 3);
        assert_eq!(metrics.throughput(), 3);
        assert_eq!(metrics.deployment_count(), 2);
        assert!((metrics.deployment_frequency() - 2.0 / 14.0).abs() < 1e-9);
        assert_eq!(metrics.cycle_time().p50, 3.0);
    }

    #[test]
    fn test_incident_metrics_share_correlated_subset() {
        let metrics = build_metrics(&sample(), &["main", "master"], day(15)).unwrap();

        assert_eq!(metrics.incident_count(), 1);
        assert_eq!(metrics.mttr(), 2.0);
        assert_eq!(metrics.change_failure_rate(), 50.0);
        assert_eq!(metrics.raw_data().incidents.len(), 1);
        assert_eq!(metrics.incident_decisions().len(), 3);
    }

    #[test]
    fn test_empty_iteration() {
        let data = IterationData::new(Iteration::new("6", "Quiet", day(1), day(14)));
        let metrics = build_metrics(&data, &["main"], day(15)).unwrap();

        assert_eq!(metrics.velocity().points, 0);
        assert_eq!(metrics.deployment_frequency(), 0.0);
        assert_eq!(metrics.change_failure_rate(), 0.0);
        assert_eq!(metrics.mttr(), 0.0);
    }

    #[test]
    fn test_empty_title_fails_validation() {
        let data = IterationData::new(Iteration::new("7", "", day(1), day(14)));
        let err = build_metrics(&data, &["main"], day(15)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let message = err.to_string();
        assert!(message.contains("iteration 7"));
        assert!(message.contains(BUILD_OPERATION));
        assert!(message.contains("iteration_title"));
    }

    #[test]
    fn test_backwards_item_does_not_invalidate_record() {
        let mut data = sample();
        data.issues
            .push(WorkItem::new("5", day(2)).started(day(8)).closed(day(3)));

        let metrics = build_metrics(&data, &["main", "master"], day(15)).unwrap();
        assert_eq!(metrics.cycle_time().avg, 3.0);
        assert_eq!(metrics.velocity().stories, 4);
    }
}
