//! Incident-to-iteration windowing

use crate::correlation::models::{CorrelationDecision, CorrelationOutcome, DecisionReason};
use crate::models::{Incident, Iteration};

/// Decide whether a single incident counts toward `iteration`.
///
/// An incident counts only when it has a change link, a change date, and
/// `start_date <= change_date <= due_date`.
pub fn classify_incident(incident: &Incident, iteration: &Iteration) -> DecisionReason {
    if incident.change_link.is_none() {
        return DecisionReason::MissingChangeLink;
    }

    let Some(change_date) = incident.change_date else {
        return DecisionReason::MissingChangeDate;
    };

    if change_date < iteration.start_date {
        DecisionReason::BeforeWindow
    } else if change_date > iteration.due_date {
        DecisionReason::AfterWindow
    } else {
        DecisionReason::InWindow
    }
}

/// Split incidents into the set attributed to `iteration` plus a decision
/// record for every input incident.
pub fn correlate_incidents(incidents: &[Incident], iteration: &Iteration) -> CorrelationOutcome {
    let mut outcome = CorrelationOutcome {
        included: Vec::new(),
        decisions: Vec::with_capacity(incidents.len()),
    };

    for incident in incidents {
        let reason = classify_incident(incident, iteration);

        tracing::debug!(
            iteration_id = %iteration.id,
            incident_id = %incident.id,
            included = reason.is_included(),
            reason = %reason,
            "Incident correlation decision"
        );

        if reason.is_included() {
            outcome.included.push(incident.clone());
        }
        outcome
            .decisions
            .push(CorrelationDecision::new(incident.id.clone(), reason));
    }

    outcome
}
