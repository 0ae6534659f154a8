//! Delivery metric calculators
//!
//! Every calculator is a pure function over a slice of domain records. Time
//! based calculators resolve their start timestamps through the ordered
//! chains in [`crate::analytics::resolvers`].

use crate::analytics::error::{AnalyticsError, AnalyticsResult};
use crate::analytics::resolvers::{resolve_first, CYCLE_TIME_START, LEAD_TIME_START};
use crate::analytics::statistics::DurationSummary;
use crate::models::{IntegrationEvent, WorkItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Branches a merge must target to count as a deployment
pub const DEFAULT_DEPLOYMENT_BRANCHES: [&str; 2] = ["main", "master"];

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Completed story points and story count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Velocity {
    pub points: u64,
    pub stories: u64,
}

/// Sum of weights (absent weight counts as 1) over closed work items
pub fn velocity(items: &[WorkItem]) -> Velocity {
    items
        .iter()
        .filter(|item| item.is_closed())
        .fold(Velocity::default(), |acc, item| Velocity {
            points: acc.points + item.effective_weight(),
            stories: acc.stories + 1,
        })
}

/// Velocity over an untyped payload. Fails when the payload is not an array
/// of work items.
pub fn velocity_from_value(value: &serde_json::Value) -> AnalyticsResult<Velocity> {
    if !value.is_array() {
        return Err(AnalyticsError::InvalidInput(
            "velocity expects an array of work items".to_string(),
        ));
    }

    let items: Vec<WorkItem> = serde_json::from_value(value.clone())
        .map_err(|e| AnalyticsError::InvalidInput(format!("malformed work item: {}", e)))?;

    Ok(velocity(&items))
}

/// Number of closed work items
pub fn throughput(items: &[WorkItem]) -> u64 {
    items.iter().filter(|item| item.is_closed()).count() as u64
}

/// Cycle time in days over closed items, from work start (or creation) to close.
/// Items closed before their resolved start are skipped.
pub fn cycle_time(items: &[WorkItem]) -> DurationSummary {
    let durations = items
        .iter()
        .filter(|item| item.is_closed())
        .filter_map(|item| {
            let end = item.closed_at?;
            let start = resolve_first(CYCLE_TIME_START, item)?;
            forward_days(&item.id, start, end)
        })
        .collect();

    DurationSummary::from_data(durations)
}

/// Lead time in days over merged events, from first commit (or creation) to
/// merge. Events merged before their resolved start are skipped.
pub fn lead_time(events: &[IntegrationEvent]) -> DurationSummary {
    let durations = events
        .iter()
        .filter(|event| event.is_merged())
        .filter_map(|event| {
            let end = event.merged_at?;
            let start = resolve_first(LEAD_TIME_START, event)?;
            forward_days(&event.id, start, end)
        })
        .collect();

    DurationSummary::from_data(durations)
}

/// Whether an event is a merge into one of `branches` (ASCII case-insensitive)
pub fn is_deployment<S: AsRef<str>>(event: &IntegrationEvent, branches: &[S]) -> bool {
    event.is_merged()
        && branches
            .iter()
            .any(|branch| event.target_branch.eq_ignore_ascii_case(branch.as_ref()))
}

/// Number of merges into a deployment branch
pub fn deployment_count<S: AsRef<str>>(events: &[IntegrationEvent], branches: &[S]) -> u64 {
    events
        .iter()
        .filter(|event| is_deployment(event, branches))
        .count() as u64
}

/// Deployments per day over a sprint of `sprint_days` days
pub fn deployment_frequency<S: AsRef<str>>(
    events: &[IntegrationEvent],
    sprint_days: u32,
    branches: &[S],
) -> f64 {
    if sprint_days == 0 || events.is_empty() {
        return 0.0;
    }

    deployment_count(events, branches) as f64 / f64::from(sprint_days)
}

/// Percentage of deployments that caused an incident. Not clamped: more
/// incidents than deployments yields a value above 100.
pub fn change_failure_rate(incident_count: u64, deployment_count: u64) -> f64 {
    if deployment_count == 0 {
        return 0.0;
    }

    incident_count as f64 / deployment_count as f64 * 100.0
}

fn days_between(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    (end - start).num_milliseconds() as f64 / MILLIS_PER_DAY
}

/// Span in days, or `None` when `end` precedes `start`
fn forward_days(record_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<f64> {
    if end < start {
        tracing::debug!(record_id, %start, %end, "Skipping record that ends before it starts");
        return None;
    }

    Some(days_between(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde_json::json;

    fn jan(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn closed_item(id: &str, created: u32, closed: u32) -> WorkItem {
        WorkItem::new(id, jan(created)).closed(jan(closed))
    }

    #[test]
    fn test_velocity_counts_closed_items_only() {
        let items = vec![
            closed_item("1", 1, 2).with_weight(5),
            closed_item("2", 1, 3),
            closed_item("3", 1, 4).with_weight(3),
            WorkItem::new("4", jan(1)).with_weight(8),
        ];

        assert_eq!(velocity(&items), Velocity { points: 9, stories: 3 });
        assert_eq!(throughput(&items), 3);
    }

    #[test]
    fn test_velocity_from_value_rejects_non_array() {
        let err = velocity_from_value(&json!({"id": 1})).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidInput(_)));

        let ok = velocity_from_value(&json!([
            {"id": 1, "state": "closed", "createdAt": "2024-01-01T00:00:00Z", "closedAt": "2024-01-02T00:00:00Z", "weight": 2}
        ]))
        .unwrap();
        assert_eq!(ok, Velocity { points: 2, stories: 1 });
    }

    #[test]
    fn test_cycle_time_statistics() {
        let items = vec![
            closed_item("1", 1, 2),
            closed_item("2", 1, 4),
            closed_item("3", 1, 6),
        ];

        let summary = cycle_time(&items);
        assert_eq!(summary, DurationSummary { avg: 3.0, p50: 3.0, p90: 5.0 });
    }

    #[test]
    fn test_cycle_time_prefers_in_progress() {
        let item = closed_item("1", 1, 8).started(jan(5));
        assert_eq!(cycle_time(&[item]).avg, 3.0);
    }

    #[test]
    fn test_cycle_time_ignores_open_items() {
        let mut reopened = closed_item("1", 1, 8);
        reopened.state = crate::models::WorkItemState::Open;

        assert_eq!(cycle_time(&[reopened]), DurationSummary::default());
        assert_eq!(cycle_time(&[]), DurationSummary::default());
    }

    #[test]
    fn test_cycle_time_skips_items_closed_before_start() {
        let backwards = WorkItem::new("1", jan(2)).started(jan(8)).closed(jan(3));
        let normal = closed_item("2", 2, 4);

        assert_eq!(
            cycle_time(&[backwards.clone(), normal]),
            DurationSummary { avg: 2.0, p50: 2.0, p90: 2.0 }
        );
        assert_eq!(cycle_time(&[backwards]), DurationSummary::default());
    }

    #[test]
    fn test_lead_time_skips_events_merged_before_first_commit() {
        let backwards = IntegrationEvent::new("1", "main")
            .created(jan(1))
            .with_commit(jan(9))
            .merged(jan(5));
        let normal = IntegrationEvent::new("2", "main").created(jan(1)).merged(jan(2));

        assert_eq!(lead_time(&[backwards, normal]).avg, 1.0);
    }

    #[test]
    fn test_lead_time_uses_earliest_commit() {
        let event = IntegrationEvent::new("1", "main")
            .created(jan(5))
            .with_commit(jan(3))
            .with_commit(jan(2))
            .merged(jan(6));

        assert_eq!(lead_time(&[event]).avg, 4.0);
    }

    #[test]
    fn test_lead_time_falls_back_to_creation() {
        let event = IntegrationEvent::new("1", "main")
            .created(jan(5))
            .merged(jan(5) + Duration::hours(12));

        assert_eq!(lead_time(&[event]).avg, 0.5);
    }

    #[test]
    fn test_lead_time_skips_unresolvable_events() {
        let no_start = IntegrationEvent::new("1", "main").merged(jan(6));
        let open = IntegrationEvent::new("2", "main").created(jan(1));

        assert_eq!(lead_time(&[no_start, open]), DurationSummary::default());
    }

    #[test]
    fn test_deployment_frequency() {
        let events = vec![
            IntegrationEvent::new("1", "main").merged(jan(2)),
            IntegrationEvent::new("2", "MAIN").merged(jan(3)),
            IntegrationEvent::new("3", "feature/x").merged(jan(3)),
            IntegrationEvent::new("4", "main"),
        ];

        assert_eq!(deployment_count(&events, &DEFAULT_DEPLOYMENT_BRANCHES), 2);
        assert!((deployment_frequency(&events, 5, &DEFAULT_DEPLOYMENT_BRANCHES) - 0.4).abs() < 1e-12);
        assert_eq!(deployment_frequency(&events, 0, &DEFAULT_DEPLOYMENT_BRANCHES), 0.0);
        assert_eq!(deployment_frequency(&[], 5, &DEFAULT_DEPLOYMENT_BRANCHES), 0.0);
    }

    #[test]
    fn test_master_counts_as_deployment() {
        let event = IntegrationEvent::new("1", "Master").merged(jan(2));
        assert!(is_deployment(&event, &DEFAULT_DEPLOYMENT_BRANCHES));
        assert!(!is_deployment(&event, &["production"]));
    }

    #[test]
    fn test_change_failure_rate() {
        assert_eq!(change_failure_rate(2, 10), 20.0);
        assert_eq!(change_failure_rate(3, 2), 150.0);
        assert_eq!(change_failure_rate(5, 0), 0.0);
        assert_eq!(change_failure_rate(0, 4), 0.0);
    }
}
