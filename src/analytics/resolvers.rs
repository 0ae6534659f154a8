//! Ordered timestamp fallback chains
//!
//! A chain is a slice of resolvers tried in order; the first one yielding a
//! timestamp wins. Keeping the order as data lets each link be tested on its
//! own and makes the precedence visible in one place.

use crate::analytics::incident::{find_tag, END_TIME_TAG, IMPACT_MITIGATED_TAG, START_TIME_TAG};
use crate::models::{Incident, IntegrationEvent, WorkItem};
use chrono::{DateTime, Utc};

/// A single link of a fallback chain
pub type Resolver<T> = fn(&T) -> Option<DateTime<Utc>>;

/// Cycle time start: work start, then creation
pub const CYCLE_TIME_START: &[Resolver<WorkItem>] = &[work_started_at, work_item_created_at];

/// Lead time start: earliest commit, then creation
pub const LEAD_TIME_START: &[Resolver<IntegrationEvent>] =
    &[first_commit_at, integration_created_at];

/// Incident start: "start time" annotation, then creation
pub const INCIDENT_START: &[Resolver<Incident>] = &[start_time_annotation, incident_created_at];

/// Incident end: "end time" annotation, "impact mitigated" annotation, then close
pub const INCIDENT_END: &[Resolver<Incident>] = &[
    end_time_annotation,
    impact_mitigated_annotation,
    incident_closed_at,
];

/// Run `chain` against `record`, returning the first resolved timestamp
pub fn resolve_first<T>(chain: &[Resolver<T>], record: &T) -> Option<DateTime<Utc>> {
    chain.iter().find_map(|resolve| resolve(record))
}

pub fn work_started_at(item: &WorkItem) -> Option<DateTime<Utc>> {
    item.in_progress_at
}

pub fn work_item_created_at(item: &WorkItem) -> Option<DateTime<Utc>> {
    Some(item.created_at)
}

pub fn first_commit_at(event: &IntegrationEvent) -> Option<DateTime<Utc>> {
    event.first_commit_at()
}

pub fn integration_created_at(event: &IntegrationEvent) -> Option<DateTime<Utc>> {
    event.created_at
}

pub fn start_time_annotation(incident: &Incident) -> Option<DateTime<Utc>> {
    find_tag(&incident.timeline_annotations, START_TIME_TAG).map(|a| a.occurred_at)
}

pub fn incident_created_at(incident: &Incident) -> Option<DateTime<Utc>> {
    Some(incident.created_at)
}

pub fn end_time_annotation(incident: &Incident) -> Option<DateTime<Utc>> {
    find_tag(&incident.timeline_annotations, END_TIME_TAG).map(|a| a.occurred_at)
}

pub fn impact_mitigated_annotation(incident: &Incident) -> Option<DateTime<Utc>> {
    find_tag(&incident.timeline_annotations, IMPACT_MITIGATED_TAG).map(|a| a.occurred_at)
}

pub fn incident_closed_at(incident: &Incident) -> Option<DateTime<Utc>> {
    incident.closed_at
}
