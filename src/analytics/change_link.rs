//! Extraction of the causing change from incident timeline notes

use crate::analytics::incident::{find_tag, START_TIME_TAG};
use crate::models::{ChangeLink, Incident, TimelineAnnotation};
use once_cell::sync::Lazy;
use regex::Regex;

static MERGE_EVENT_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"https?://[^\s/()\[\]<>"']+/(?P<project>[^\s()\[\]<>"']+?)/(?:-/)?merge_requests/(?P<id>\d+)"#,
    )
    .expect("merge event pattern is valid")
});

static COMMIT_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"https?://[^\s/()\[\]<>"']+/(?P<project>[^\s()\[\]<>"']+?)/(?:-/)?commit/(?P<sha>[0-9a-fA-F]{7,40})\b"#,
    )
    .expect("commit pattern is valid")
});

/// Parse the change reference out of an incident timeline.
///
/// Only the first annotation tagged "start time" is inspected. A merge
/// request URL in its note wins over a commit URL.
pub fn extract_change_link(annotations: &[TimelineAnnotation]) -> Option<ChangeLink> {
    let annotation = find_tag(annotations, START_TIME_TAG)?;
    parse_change_link(&annotation.note)
}

/// Parse a change reference out of free text
pub fn parse_change_link(note: &str) -> Option<ChangeLink> {
    merge_event_link(note).or_else(|| commit_link(note))
}

/// Fill in `change_link` for incidents that do not carry one.
/// Returns how many incidents gained a link.
pub fn attach_change_links(incidents: &mut [Incident]) -> usize {
    let mut attached = 0;

    for incident in incidents.iter_mut().filter(|i| i.change_link.is_none()) {
        if let Some(link) = extract_change_link(&incident.timeline_annotations) {
            tracing::debug!(incident_id = %incident.id, url = %link.url(), "Attached change link");
            incident.change_link = Some(link);
            attached += 1;
        }
    }

    attached
}

fn merge_event_link(note: &str) -> Option<ChangeLink> {
    let captures = MERGE_EVENT_URL.captures(note)?;
    let id = captures["id"].parse().ok()?;

    Some(ChangeLink::MergeEvent {
        url: captures[0].to_string(),
        project: captures["project"].to_string(),
        id,
    })
}

fn commit_link(note: &str) -> Option<ChangeLink> {
    let captures = COMMIT_URL.captures(note)?;

    Some(ChangeLink::Commit {
        url: captures[0].to_string(),
        project: captures["project"].to_string(),
        sha: captures["sha"].to_lowercase(),
    })
}
