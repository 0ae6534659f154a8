//! Correlation of incidents to the iteration whose change caused them
//!
//! This module provides:
//! - The windowing rule attributing an incident to an iteration
//! - A structured decision log explaining every inclusion and exclusion

pub mod models;
pub mod window;

pub use models::{CorrelationDecision, CorrelationOutcome, DecisionReason};
pub use window::{classify_incident, correlate_incidents};
