use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A code-integration event (merge request)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationEvent {
    #[serde(deserialize_with = "super::deserialize_id")]
    pub id: String,

    pub state: IntegrationState,

    /// Branch the change was merged into
    pub target_branch: String,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub commits: Vec<Commit>,
}

impl IntegrationEvent {
    /// Create an open event targeting `target_branch`
    pub fn new(id: impl Into<String>, target_branch: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: IntegrationState::Open,
            target_branch: target_branch.into(),
            created_at: None,
            merged_at: None,
            commits: Vec::new(),
        }
    }

    pub fn created(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Mark the event merged at the given time
    pub fn merged(mut self, merged_at: DateTime<Utc>) -> Self {
        self.state = IntegrationState::Merged;
        self.merged_at = Some(merged_at);
        self
    }

    pub fn with_commit(mut self, committed_date: DateTime<Utc>) -> Self {
        self.commits.push(Commit { committed_date });
        self
    }

    pub fn is_merged(&self) -> bool {
        self.state == IntegrationState::Merged
    }

    /// Earliest commit timestamp, if the event carries any commits
    pub fn first_commit_at(&self) -> Option<DateTime<Utc>> {
        self.commits.iter().map(|c| c.committed_date).min()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum IntegrationState {
    #[serde(alias = "opened")]
    Open,
    Merged,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commit {
    pub committed_date: DateTime<Utc>,
}

/// A CI pipeline run fetched alongside the iteration. Not used by any
/// calculator; kept so cached payloads are complete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    #[serde(deserialize_with = "super::deserialize_id")]
    pub id: String,

    pub status: String,

    #[serde(rename = "ref", default)]
    pub git_ref: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}
