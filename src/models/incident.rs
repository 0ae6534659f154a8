use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents an operational incident and its timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    /// Unique identifier
    #[serde(deserialize_with = "super::deserialize_id")]
    pub id: String,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Time the incident was closed; absent while still open
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,

    /// Change that caused the incident, if one could be identified
    #[serde(default)]
    pub change_link: Option<ChangeLink>,

    /// When the linked change landed
    #[serde(default)]
    pub change_date: Option<DateTime<Utc>>,

    /// Annotated timeline events
    #[serde(default)]
    pub timeline_annotations: Vec<TimelineAnnotation>,
}

impl Incident {
    /// Create an open incident with an empty timeline
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
            closed_at: None,
            change_link: None,
            change_date: None,
            timeline_annotations: Vec::new(),
        }
    }

    pub fn closed(mut self, closed_at: DateTime<Utc>) -> Self {
        self.closed_at = Some(closed_at);
        self
    }

    /// Attach the causing change and the time it landed
    pub fn caused_by(mut self, link: ChangeLink, change_date: DateTime<Utc>) -> Self {
        self.change_link = Some(link);
        self.change_date = Some(change_date);
        self
    }

    /// Append a timeline annotation
    pub fn annotate(mut self, annotation: TimelineAnnotation) -> Self {
        self.timeline_annotations.push(annotation);
        self
    }

    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

/// A timeline event attached to an incident
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineAnnotation {
    pub occurred_at: DateTime<Utc>,

    /// Free-text note
    #[serde(default)]
    pub note: String,

    #[serde(default)]
    pub tags: Vec<AnnotationTag>,
}

impl TimelineAnnotation {
    pub fn new(occurred_at: DateTime<Utc>, note: impl Into<String>) -> Self {
        Self {
            occurred_at,
            note: note.into(),
            tags: Vec::new(),
        }
    }

    pub fn tagged(mut self, name: impl Into<String>) -> Self {
        self.tags.push(AnnotationTag { name: name.into() });
        self
    }

    /// Whether any tag contains `needle`, ignoring case
    pub fn has_tag_containing(&self, needle: &str) -> bool {
        let needle = needle.to_lowercase();
        self.tags
            .iter()
            .any(|tag| tag.name.to_lowercase().contains(&needle))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationTag {
    pub name: String,
}

/// Resolved reference to the change that caused an incident
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeLink {
    /// A merge request, identified by project path and internal id
    MergeEvent {
        url: String,
        project: String,
        id: u64,
    },

    /// A single commit
    Commit {
        url: String,
        project: String,
        sha: String,
    },
}

impl ChangeLink {
    pub fn url(&self) -> &str {
        match self {
            ChangeLink::MergeEvent { url, .. } | ChangeLink::Commit { url, .. } => url,
        }
    }

    pub fn project(&self) -> &str {
        match self {
            ChangeLink::MergeEvent { project, .. } | ChangeLink::Commit { project, .. } => {
                project
            }
        }
    }
}
