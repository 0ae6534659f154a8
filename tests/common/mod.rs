//! Shared fixtures for integration tests
//!
//! Iteration builders, a scripted [`MockProvider`] and helpers for reading
//! Prometheus exposition output.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use iteration_metrics::error::{AppError, Result};
use iteration_metrics::models::{
    ChangeLink, Incident, IntegrationEvent, Iteration, IterationData, TimelineAnnotation, WorkItem,
};
use iteration_metrics::provider::DataProvider;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Midnight UTC on the given day of March 2024
pub fn day(d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
}

/// Two-week iteration from March 1st to March 14th
pub fn sprint(id: &str) -> Iteration {
    Iteration::new(id, format!("Sprint {}", id), day(1), day(14))
}

pub fn merge_link(id: u64) -> ChangeLink {
    ChangeLink::MergeEvent {
        url: format!("https://gitlab.example.com/team/app/-/merge_requests/{}", id),
        project: "team/app".to_string(),
        id,
    }
}

/// Closed incident caused by a change that landed at `change_date`
pub fn caused_incident(id: &str, change_date: DateTime<Utc>, downtime_hours: i64) -> Incident {
    Incident::new(id, change_date)
        .closed(change_date + Duration::hours(downtime_hours))
        .caused_by(merge_link(1), change_date)
}

/// Iteration with three closed issues weighted 5, 1 and 3, two merges to
/// deployment branches, one feature-branch merge, and one correlated
/// incident lasting two hours
pub fn scenario_data(id: &str) -> IterationData {
    let mut data = IterationData::new(sprint(id));

    data.issues = vec![
        WorkItem::new("1", day(2)).closed(day(3)).with_weight(5),
        WorkItem::new("2", day(2)).started(day(4)).closed(day(7)).with_weight(1),
        WorkItem::new("3", day(2)).closed(day(7)).with_weight(3),
        WorkItem::new("4", day(3)),
    ];

    data.merge_requests = vec![
        IntegrationEvent::new("10", "main")
            .created(day(2))
            .with_commit(day(1))
            .merged(day(4)),
        IntegrationEvent::new("11", "master").created(day(5)).merged(day(6)),
        IntegrationEvent::new("12", "feature/search").created(day(5)).merged(day(6)),
        IntegrationEvent::new("13", "main").created(day(8)),
    ];

    data.incidents = vec![
        caused_incident("inc-1", day(4), 2),
        caused_incident("inc-2", day(15), 6),
        Incident::new("inc-3", day(9))
            .closed(day(9) + Duration::hours(1))
            .annotate(TimelineAnnotation::new(day(9), "no causing change").tagged("start time")),
    ];

    data
}

/// Scripted provider that counts upstream calls
#[derive(Default)]
pub struct MockProvider {
    data: HashMap<String, IterationData>,
    failing: HashSet<String>,
    delay_ms: u64,
    pub single_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_iteration(mut self, data: IterationData) -> Self {
        self.data.insert(data.iteration.id.clone(), data);
        self
    }

    pub fn failing_on(mut self, iteration_id: &str) -> Self {
        self.failing.insert(iteration_id.to_string());
        self
    }

    /// Sleep before answering, to widen race windows
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn single_calls(&self) -> usize {
        self.single_calls.load(Ordering::SeqCst)
    }

    pub fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, iteration_id: &str) -> Result<IterationData> {
        if self.failing.contains(iteration_id) {
            return Err(AppError::Internal("upstream returned 502".to_string()));
        }

        self.data
            .get(iteration_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("iteration {}", iteration_id)))
    }

    async fn pause(&self) {
        if self.delay_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
    }
}

#[async_trait]
impl DataProvider for MockProvider {
    async fn fetch_iteration_data(&self, iteration_id: &str) -> Result<IterationData> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        self.lookup(iteration_id)
    }

    async fn fetch_multiple_iterations(&self, iteration_ids: &[String]) -> Result<Vec<IterationData>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        self.pause().await;
        iteration_ids.iter().map(|id| self.lookup(id)).collect()
    }
}

/// Metric lines grouped by metric name
pub fn parse_prometheus_output(output: &str) -> HashMap<String, Vec<String>> {
    let mut metrics: HashMap<String, Vec<String>> = HashMap::new();
    let mut current_metric = String::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("# HELP") || line.starts_with("# TYPE") {
            if let Some(name) = line.split_whitespace().nth(2) {
                current_metric = name.to_string();
            }
        } else if !line.starts_with('#') && !current_metric.is_empty() {
            metrics
                .entry(current_metric.clone())
                .or_default()
                .push(line.to_string());
        }
    }

    metrics
}

/// Value of the sample line carrying `label="value"`
pub fn sample_value(lines: &[String], label: &str, value: &str) -> Option<f64> {
    let needle = format!("{}=\"{}\"", label, value);
    lines
        .iter()
        .find(|line| line.contains(&needle))
        .and_then(|line| line.split_whitespace().last())
        .and_then(|raw| raw.parse().ok())
}
