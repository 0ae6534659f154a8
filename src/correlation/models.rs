use crate::models::Incident;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Why an incident was or was not attributed to an iteration
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DecisionReason {
    /// Linked change landed inside the iteration window
    InWindow,

    /// No causing change could be identified
    MissingChangeLink,

    /// A change was linked but its date is unknown
    MissingChangeDate,

    /// Linked change landed before the iteration started
    BeforeWindow,

    /// Linked change landed after the iteration ended
    AfterWindow,
}

impl DecisionReason {
    pub fn is_included(&self) -> bool {
        matches!(self, DecisionReason::InWindow)
    }
}

/// Structured record of one inclusion/exclusion decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationDecision {
    pub incident_id: String,
    pub included: bool,
    pub reason: DecisionReason,
}

impl CorrelationDecision {
    pub fn new(incident_id: impl Into<String>, reason: DecisionReason) -> Self {
        Self {
            incident_id: incident_id.into(),
            included: reason.is_included(),
            reason,
        }
    }
}

/// Result of correlating incidents against one iteration
#[derive(Debug, Clone, Default)]
pub struct CorrelationOutcome {
    /// Incidents attributed to the iteration, in input order
    pub included: Vec<Incident>,

    /// One decision per input incident, in input order
    pub decisions: Vec<CorrelationDecision>,
}

impl CorrelationOutcome {
    pub fn included_count(&self) -> usize {
        self.included.len()
    }

    /// Decisions that excluded an incident
    pub fn exclusions(&self) -> impl Iterator<Item = &CorrelationDecision> {
        self.decisions.iter().filter(|d| !d.included)
    }
}
