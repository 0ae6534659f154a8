use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A unit of planned work (an issue)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    /// Identifier in the upstream tracker
    #[serde(deserialize_with = "super::deserialize_id")]
    pub id: String,

    /// Human-readable title
    #[serde(default)]
    pub title: Option<String>,

    /// Current state
    pub state: WorkItemState,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Time the item was closed
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,

    /// Time work started on the item
    #[serde(default)]
    pub in_progress_at: Option<DateTime<Utc>>,

    /// Story points; absent weights count as 1
    #[serde(default)]
    pub weight: Option<u32>,
}

impl WorkItem {
    /// Create an open work item with no weight
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: None,
            state: WorkItemState::Open,
            created_at,
            closed_at: None,
            in_progress_at: None,
            weight: None,
        }
    }

    /// Mark the item closed at the given time
    pub fn closed(mut self, closed_at: DateTime<Utc>) -> Self {
        self.state = WorkItemState::Closed;
        self.closed_at = Some(closed_at);
        self
    }

    /// Record when work started
    pub fn started(mut self, in_progress_at: DateTime<Utc>) -> Self {
        self.in_progress_at = Some(in_progress_at);
        self
    }

    /// Set the story-point weight
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = Some(weight);
        self
    }

    pub fn is_closed(&self) -> bool {
        self.state == WorkItemState::Closed
    }

    /// Weight used for velocity
    pub fn effective_weight(&self) -> u64 {
        u64::from(self.weight.unwrap_or(1))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum WorkItemState {
    #[serde(alias = "opened")]
    Open,
    Closed,
}
