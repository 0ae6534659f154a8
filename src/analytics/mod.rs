//! Delivery metric derivation
//!
//! This module turns raw iteration data into delivery indicators.
//!
//! # Features
//!
//! - **Calculators**: velocity, throughput, cycle time, lead time,
//!   deployment frequency and change failure rate as pure functions
//! - **Fallback chains**: ordered timestamp resolvers for cycle time, lead
//!   time and incident start/end
//! - **Incident analysis**: per-incident downtime and mean time to recovery
//! - **Change links**: parsing the causing merge request or commit out of
//!   incident timeline notes
//!
//! # Example
//!
//! ```
//! use iteration_metrics::analytics::{change_failure_rate, cycle_time};
//! use iteration_metrics::models::WorkItem;
//! use chrono::{Duration, Utc};
//!
//! let created = Utc::now() - Duration::days(3);
//! let item = WorkItem::new("1", created).closed(created + Duration::days(2));
//!
//! assert_eq!(cycle_time(&[item]).avg, 2.0);
//! assert_eq!(change_failure_rate(1, 4), 25.0);
//! ```

mod calculators;
mod change_link;
mod error;
mod incident;
mod resolvers;
mod statistics;

pub use calculators::{
    change_failure_rate, cycle_time, deployment_count, deployment_frequency, is_deployment,
    lead_time, throughput, velocity, velocity_from_value, Velocity, DEFAULT_DEPLOYMENT_BRANCHES,
};
pub use change_link::{attach_change_links, extract_change_link, parse_change_link};
pub use error::{AnalyticsError, AnalyticsResult};
pub use incident::{
    downtime_hours, find_tag, mean_time_to_recovery, resolve_end, resolve_start, END_TIME_TAG,
    IMPACT_MITIGATED_TAG, START_TIME_TAG,
};
pub use resolvers::{
    resolve_first, Resolver, CYCLE_TIME_START, INCIDENT_END, INCIDENT_START, LEAD_TIME_START,
};
pub use statistics::{mean, percentile, DurationSummary};
