//! Incident downtime and mean time to recovery

use crate::analytics::resolvers::{resolve_first, INCIDENT_END, INCIDENT_START};
use crate::models::{Incident, TimelineAnnotation};
use chrono::{DateTime, Utc};

/// Tag marking when impact began
pub const START_TIME_TAG: &str = "start time";

/// Tag marking when impact ended
pub const END_TIME_TAG: &str = "end time";

/// Tag marking when impact was mitigated
pub const IMPACT_MITIGATED_TAG: &str = "impact mitigated";

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// First annotation with a tag containing `tag_name`, ignoring case
pub fn find_tag<'a>(
    annotations: &'a [TimelineAnnotation],
    tag_name: &str,
) -> Option<&'a TimelineAnnotation> {
    annotations
        .iter()
        .find(|annotation| annotation.has_tag_containing(tag_name))
}

/// When impact began: the "start time" annotation, else creation
pub fn resolve_start(incident: &Incident) -> Option<DateTime<Utc>> {
    resolve_first(INCIDENT_START, incident)
}

/// When impact ended: "end time", then "impact mitigated", then close
pub fn resolve_end(incident: &Incident) -> Option<DateTime<Utc>> {
    resolve_first(INCIDENT_END, incident)
}

/// Hours between resolved start and end.
///
/// Open incidents report 0 even when their timeline carries an end
/// annotation. A span that resolves backwards also reports 0.
pub fn downtime_hours(incident: &Incident) -> f64 {
    if incident.is_open() {
        return 0.0;
    }

    match (resolve_start(incident), resolve_end(incident)) {
        (Some(start), Some(end)) => {
            let hours = (end - start).num_milliseconds() as f64 / MILLIS_PER_HOUR;
            hours.max(0.0)
        }
        _ => 0.0,
    }
}

/// Average downtime in hours over closed incidents; 0 when none are closed
pub fn mean_time_to_recovery(incidents: &[Incident]) -> f64 {
    let downtimes: Vec<f64> = incidents
        .iter()
        .filter(|incident| !incident.is_open())
        .map(downtime_hours)
        .collect();

    if downtimes.is_empty() {
        return 0.0;
    }

    downtimes.iter().sum::<f64>() / downtimes.len() as f64
}
