//! Prometheus metrics for metric computation, the iteration cache and the
//! upstream data provider.
//!
//! All collectors live in a process-wide registry. Call [`init_metrics`]
//! once at startup, then export with [`gather_metrics`].
//!
//! # Example
//! ```no_run
//! use iteration_metrics::metrics::{self, CACHE_LOOKUPS_TOTAL};
//!
//! metrics::init_metrics().expect("metrics registered once");
//! CACHE_LOOKUPS_TOTAL.with_label_values(&["hit"]).inc();
//! println!("{}", metrics::gather_metrics());
//! ```

use lazy_static::lazy_static;
use prometheus::{CounterVec, GaugeVec, Histogram, HistogramOpts, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Iteration metric computations
    ///
    /// Labels: outcome (success, fetch_error, validation_error)
    pub static ref COMPUTATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("computations_total", "Total number of iteration metric computations")
            .namespace("iteration_metrics"),
        &["outcome"]
    ).expect("Failed to create COMPUTATIONS_TOTAL metric");

    /// Time spent deriving one iteration record from raw data
    pub static ref COMPUTATION_DURATION_SECONDS: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "computation_duration_seconds",
            "Iteration metric computation duration in seconds"
        )
        .namespace("iteration_metrics")
        .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0]),
    ).expect("Failed to create COMPUTATION_DURATION_SECONDS metric");

    /// Cache lookups made by the cached provider
    ///
    /// Labels: result (hit, miss, stale)
    pub static ref CACHE_LOOKUPS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("cache_lookups_total", "Total number of iteration cache lookups")
            .namespace("iteration_metrics"),
        &["result"]
    ).expect("Failed to create CACHE_LOOKUPS_TOTAL metric");

    /// Calls to the upstream data provider
    ///
    /// Labels: outcome (success, error)
    pub static ref PROVIDER_FETCHES_TOTAL: CounterVec = CounterVec::new(
        Opts::new("provider_fetches_total", "Total number of upstream iteration fetches")
            .namespace("iteration_metrics"),
        &["outcome"]
    ).expect("Failed to create PROVIDER_FETCHES_TOTAL metric");

    /// Build information
    ///
    /// Labels: version
    pub static ref BUILD_INFO: GaugeVec = GaugeVec::new(
        Opts::new("build_info", "Application build information")
            .namespace("iteration_metrics"),
        &["version"]
    ).expect("Failed to create BUILD_INFO metric");
}

/// Initialize the Prometheus metrics registry
///
/// Registers every collector with [`PROMETHEUS_REGISTRY`]. A second call
/// fails with `AlreadyReg`.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(COMPUTATIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(COMPUTATION_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(CACHE_LOOKUPS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(PROVIDER_FETCHES_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(BUILD_INFO.clone()))?;

    BUILD_INFO
        .with_label_values(&[env!("CARGO_PKG_VERSION")])
        .set(1.0);

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Generate Prometheus text format metrics
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
