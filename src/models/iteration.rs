use crate::models::{Incident, IntegrationEvent, Pipeline, WorkItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// A fixed calendar window (sprint) used as the aggregation unit.
/// Both bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Iteration {
    #[serde(deserialize_with = "super::deserialize_id")]
    pub id: String,
    pub title: String,
    pub start_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

impl Iteration {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        start_date: DateTime<Utc>,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start_date,
            due_date,
        }
    }

    /// Whether `at` falls inside the window, bounds included
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start_date <= at && at <= self.due_date
    }

    /// Number of calendar days covered, counting both boundary days.
    /// An inverted window yields 0.
    pub fn sprint_days(&self) -> u32 {
        let span_ms = (self.due_date - self.start_date).num_milliseconds() as f64;
        let days = (span_ms / MILLIS_PER_DAY).ceil() + 1.0;
        if days <= 0.0 {
            0
        } else {
            days as u32
        }
    }
}

/// Raw data for one iteration as returned by a data provider.
/// This is also the cache payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IterationData {
    #[serde(default)]
    pub issues: Vec<WorkItem>,

    #[serde(default)]
    pub merge_requests: Vec<IntegrationEvent>,

    #[serde(default)]
    pub incidents: Vec<Incident>,

    #[serde(default)]
    pub pipelines: Vec<Pipeline>,

    pub iteration: Iteration,
}

impl IterationData {
    /// Empty data set for an iteration
    pub fn new(iteration: Iteration) -> Self {
        Self {
            issues: Vec::new(),
            merge_requests: Vec::new(),
            incidents: Vec::new(),
            pipelines: Vec::new(),
            iteration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_sprint_days_counts_both_boundaries() {
        let iteration = Iteration::new("1", "Sprint 1", day(1), day(14));
        assert_eq!(iteration.sprint_days(), 14);

        let single = Iteration::new("2", "Sprint 2", day(1), day(1));
        assert_eq!(single.sprint_days(), 1);
    }

    #[test]
    fn test_sprint_days_rounds_partial_day_up() {
        let iteration = Iteration::new("1", "Sprint 1", day(1), day(3) + Duration::hours(1));
        assert_eq!(iteration.sprint_days(), 4);
    }

    #[test]
    fn test_inverted_window_has_no_days() {
        let iteration = Iteration::new("1", "Backwards", day(10), day(1));
        assert_eq!(iteration.sprint_days(), 0);
    }

    #[test]
    fn test_contains_is_inclusive() {
        let iteration = Iteration::new("1", "Sprint 1", day(1), day(14));
        assert!(iteration.contains(day(1)));
        assert!(iteration.contains(day(14)));
        assert!(!iteration.contains(day(15)));
        assert!(!iteration.contains(day(1) - Duration::milliseconds(1)));
    }
}
