use crate::analytics::{DurationSummary, Velocity};
use crate::correlation::CorrelationDecision;
use crate::error::{AppError, Result};
use crate::models::{Incident, IntegrationEvent, WorkItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Echo of the inputs a record was computed from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawData {
    pub issues: Vec<WorkItem>,
    pub merge_requests: Vec<IntegrationEvent>,

    /// Only the incidents attributed to the iteration
    pub incidents: Vec<Incident>,
}

/// Everything needed to build an [`IterationMetrics`]
#[derive(Debug, Clone)]
pub struct MetricsInput {
    pub iteration_id: String,
    pub iteration_title: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub sprint_days: u32,
    pub velocity: Velocity,
    pub throughput: u64,
    pub cycle_time: DurationSummary,
    pub lead_time: DurationSummary,
    pub deployment_frequency: f64,
    pub deployment_count: u64,
    pub mttr_hours: f64,
    pub change_failure_rate: f64,
    pub incident_count: u64,
    pub incident_decisions: Vec<CorrelationDecision>,
    pub raw_data: RawData,
    pub created_at: DateTime<Utc>,
}

/// Delivery metrics for one iteration.
///
/// Immutable once built: fields are only readable through accessors, and
/// every constructor validates. Durations are in days except `mttr`, which is
/// in hours. `change_failure_rate` is a percentage and may exceed 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct IterationMetrics {
    #[validate(length(min = 1))]
    iteration_id: String,

    #[validate(length(min = 1))]
    iteration_title: String,

    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    sprint_days: u32,

    velocity_points: u64,
    velocity_stories: u64,
    throughput: u64,

    #[validate(range(min = 0.0))]
    cycle_time_avg: f64,
    #[validate(range(min = 0.0))]
    cycle_time_p50: f64,
    #[validate(range(min = 0.0))]
    cycle_time_p90: f64,

    #[validate(range(min = 0.0))]
    deployment_frequency: f64,
    deployment_count: u64,

    #[validate(range(min = 0.0))]
    lead_time_avg: f64,
    #[validate(range(min = 0.0))]
    lead_time_p50: f64,
    #[validate(range(min = 0.0))]
    lead_time_p90: f64,

    #[validate(range(min = 0.0))]
    mttr: f64,
    #[validate(range(min = 0.0))]
    change_failure_rate: f64,
    incident_count: u64,

    incident_decisions: Vec<CorrelationDecision>,
    raw_data: RawData,
    created_at: DateTime<Utc>,
}

impl IterationMetrics {
    /// Build and validate a record
    pub fn try_new(input: MetricsInput) -> Result<Self> {
        let metrics = Self {
            iteration_id: input.iteration_id,
            iteration_title: input.iteration_title,
            start_date: input.start_date,
            end_date: input.end_date,
            sprint_days: input.sprint_days,
            velocity_points: input.velocity.points,
            velocity_stories: input.velocity.stories,
            throughput: input.throughput,
            cycle_time_avg: input.cycle_time.avg,
            cycle_time_p50: input.cycle_time.p50,
            cycle_time_p90: input.cycle_time.p90,
            deployment_frequency: input.deployment_frequency,
            deployment_count: input.deployment_count,
            lead_time_avg: input.lead_time.avg,
            lead_time_p50: input.lead_time.p50,
            lead_time_p90: input.lead_time.p90,
            mttr: input.mttr_hours,
            change_failure_rate: input.change_failure_rate,
            incident_count: input.incident_count,
            incident_decisions: input.incident_decisions,
            raw_data: input.raw_data,
            created_at: input.created_at,
        };

        metrics.check()?;
        Ok(metrics)
    }

    /// Serialize to a JSON value
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuild a record from JSON, re-running validation
    pub fn from_json(value: &serde_json::Value) -> Result<Self> {
        let metrics: Self = serde_json::from_value(value.clone())
            .map_err(|e| AppError::Validation(format!("Malformed metrics record: {}", e)))?;
        metrics.check()?;
        Ok(metrics)
    }

    fn check(&self) -> Result<()> {
        self.validate()?;

        for (name, value) in self.numeric_fields() {
            if !value.is_finite() {
                return Err(AppError::Validation(format!(
                    "{} must be a finite number, got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }

    fn numeric_fields(&self) -> [(&'static str, f64); 9] {
        [
            ("cycleTimeAvg", self.cycle_time_avg),
            ("cycleTimeP50", self.cycle_time_p50),
            ("cycleTimeP90", self.cycle_time_p90),
            ("deploymentFrequency", self.deployment_frequency),
            ("leadTimeAvg", self.lead_time_avg),
            ("leadTimeP50", self.lead_time_p50),
            ("leadTimeP90", self.lead_time_p90),
            ("mttr", self.mttr),
            ("changeFailureRate", self.change_failure_rate),
        ]
    }

    pub fn iteration_id(&self) -> &str {
        &self.iteration_id
    }

    pub fn iteration_title(&self) -> &str {
        &self.iteration_title
    }

    pub fn start_date(&self) -> DateTime<Utc> {
        self.start_date
    }

    pub fn end_date(&self) -> DateTime<Utc> {
        self.end_date
    }

    pub fn sprint_days(&self) -> u32 {
        self.sprint_days
    }

    pub fn velocity(&self) -> Velocity {
        Velocity {
            points: self.velocity_points,
            stories: self.velocity_stories,
        }
    }

    pub fn throughput(&self) -> u64 {
        self.throughput
    }

    pub fn cycle_time(&self) -> DurationSummary {
        DurationSummary {
            avg: self.cycle_time_avg,
            p50: self.cycle_time_p50,
            p90: self.cycle_time_p90,
        }
    }

    pub fn lead_time(&self) -> DurationSummary {
        DurationSummary {
            avg: self.lead_time_avg,
            p50: self.lead_time_p50,
            p90: self.lead_time_p90,
        }
    }

    /// Deployments per day
    pub fn deployment_frequency(&self) -> f64 {
        self.deployment_frequency
    }

    pub fn deployment_count(&self) -> u64 {
        self.deployment_count
    }

    /// Mean time to recovery in hours
    pub fn mttr(&self) -> f64 {
        self.mttr
    }

    pub fn change_failure_rate(&self) -> f64 {
        self.change_failure_rate
    }

    pub fn incident_count(&self) -> u64 {
        self.incident_count
    }

    pub fn incident_decisions(&self) -> &[CorrelationDecision] {
        &self.incident_decisions
    }

    pub fn raw_data(&self) -> &RawData {
        &self.raw_data
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::correlation::DecisionReason;
    use chrono::TimeZone;

    fn input() -> MetricsInput {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 1, 14, 0, 0, 0).unwrap();

        MetricsInput {
            iteration_id: "42".to_string(),
            iteration_title: "Sprint 42".to_string(),
            start_date: start,
            end_date: end,
            sprint_days: 14,
            velocity: Velocity { points: 9, stories: 3 },
            throughput: 3,
            cycle_time: DurationSummary { avg: 3.0, p50: 3.0, p90: 4.6 },
            lead_time: DurationSummary { avg: 1.5, p50: 1.5, p90: 1.9 },
            deployment_frequency: 2.0 / 14.0,
            deployment_count: 2,
            mttr_hours: 3.0,
            change_failure_rate: 150.0,
            incident_count: 3,
            incident_decisions: vec![CorrelationDecision::new("9", DecisionReason::InWindow)],
            raw_data: RawData::default(),
            created_at: end,
        }
    }

    #[test]
    fn test_accepts_change_failure_rate_above_100() {
        let metrics = IterationMetrics::try_new(input()).unwrap();
        assert_eq!(metrics.change_failure_rate(), 150.0);
        assert_eq!(metrics.velocity(), Velocity { points: 9, stories: 3 });
    }

    #[test]
    fn test_rejects_missing_identity() {
        let mut bad = input();
        bad.iteration_id = String::new();
        assert!(matches!(
            IterationMetrics::try_new(bad),
            Err(AppError::Validation(_))
        ));

        let mut bad = input();
        bad.iteration_title = String::new();
        assert!(IterationMetrics::try_new(bad).is_err());
    }

    #[test]
    fn test_rejects_negative_and_non_finite_numbers() {
        let mut negative = input();
        negative.mttr_hours = -1.0;
        assert!(matches!(
            IterationMetrics::try_new(negative),
            Err(AppError::Validation(_))
        ));

        let mut nan = input();
        nan.cycle_time.p90 = f64::NAN;
        assert!(matches!(
            IterationMetrics::try_new(nan),
            Err(AppError::Validation(_))
        ));

        let mut infinite = input();
        infinite.deployment_frequency = f64::INFINITY;
        assert!(IterationMetrics::try_new(infinite).is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let metrics = IterationMetrics::try_new(input()).unwrap();
        let json = metrics.to_json().unwrap();

        assert_eq!(json["iterationId"], "42");
        assert_eq!(json["velocityPoints"], 9);
        assert_eq!(json["incidentDecisions"][0]["reason"], "in_window");

        let rebuilt = IterationMetrics::from_json(&json).unwrap();
        assert_eq!(rebuilt.to_json().unwrap(), json);
        assert_eq!(rebuilt, metrics);
    }

    #[test]
    fn test_from_json_rejects_missing_date() {
        let metrics = IterationMetrics::try_new(input()).unwrap();
        let mut json = metrics.to_json().unwrap();
        json.as_object_mut().unwrap().remove("startDate");

        assert!(matches!(
            IterationMetrics::from_json(&json),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_from_json_rejects_negative_value() {
        let metrics = IterationMetrics::try_new(input()).unwrap();
        let mut json = metrics.to_json().unwrap();
        json["leadTimeAvg"] = serde_json::json!(-2.5);

        assert!(IterationMetrics::from_json(&json).is_err());
    }
}
