use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Iteration data cache
    #[serde(default)]
    pub cache: CacheConfig,

    /// Raw data provider
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Metric calculation settings
    #[serde(default)]
    pub calculation: CalculationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and
    /// the environment, in increasing order of precedence.
    ///
    /// The file is `path` when given, else `CONFIG_PATH`, else
    /// `config/iteration-metrics.toml`. Environment variables use the
    /// `ITERATION_METRICS__` prefix, e.g. `ITERATION_METRICS__CACHE__TTL_HOURS=12`.
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let config_path = match path {
            Some(path) => path.to_string_lossy().into_owned(),
            None => std::env::var("CONFIG_PATH")
                .unwrap_or_else(|_| "config/iteration-metrics.toml".to_string()),
        };

        config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config::File::with_name(&config_path).required(path.is_some()))
            .add_source(
                config::Environment::with_prefix("ITERATION_METRICS")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("calculation.deployment_branches"),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache backend type
    #[serde(default)]
    pub backend: CacheBackendKind,

    /// Directory for the embedded database (sled)
    #[serde(default = "default_cache_path")]
    pub path: Option<PathBuf>,

    /// Age in hours after which an entry is classified stale
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackendKind::default(),
            path: default_cache_path(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackendKind {
    /// Process-local; entries are lost on exit
    Memory,
    #[default]
    Sled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Directory holding materialized iteration snapshots (`<id>.json`)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Refetch entries classified stale instead of serving them
    #[serde(default = "default_true")]
    pub refresh_stale: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            refresh_stale: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationConfig {
    /// Merges into these branches count as deployments (case-insensitive)
    #[serde(default = "default_deployment_branches")]
    pub deployment_branches: Vec<String>,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self {
            deployment_branches: default_deployment_branches(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_ttl_hours() -> f64 {
    24.0
}

fn default_cache_path() -> Option<PathBuf> {
    Some(PathBuf::from(".cache/iteration-metrics"))
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data/iterations")
}

fn default_deployment_branches() -> Vec<String> {
    vec!["main".to_string(), "master".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        let config = Config::default();
        assert_eq!(config.cache.backend, CacheBackendKind::Sled);
        assert_eq!(
            config.cache.path,
            Some(PathBuf::from(".cache/iteration-metrics"))
        );
        assert_eq!(config.cache.ttl_hours, 24.0);
        assert_eq!(config.calculation.deployment_branches, vec!["main", "master"]);
        assert_eq!(config.observability.log_level, "info");
        assert!(config.provider.refresh_stale);
    }

    #[test]
    fn test_load_embedded_defaults() {
        let config = Config::load(None).unwrap();
        assert_eq!(config.cache.backend, CacheBackendKind::Sled);
        assert!(config.cache.path.is_some());
        assert_eq!(config.cache.ttl_hours, 24.0);
        assert_eq!(config.calculation.deployment_branches.len(), 2);
    }

    #[test]
    fn test_load_file_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            "[cache]\nbackend = \"sled\"\npath = \"/tmp/cache\"\nttl_hours = 6.0\n",
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.cache.backend, CacheBackendKind::Sled);
        assert_eq!(config.cache.ttl_hours, 6.0);
        assert_eq!(config.cache.path, Some(PathBuf::from("/tmp/cache")));
    }

    #[test]
    fn test_memory_backend_is_opt_in() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.toml");
        std::fs::write(&path, "[cache]\nbackend = \"memory\"\n").unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.cache.backend, CacheBackendKind::Memory);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(Config::load(Some(&path)).is_err());
    }
}
