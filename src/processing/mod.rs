mod orchestrator;

pub use orchestrator::{build_metrics, MetricsOrchestrator};
