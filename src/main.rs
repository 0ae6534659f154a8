use anyhow::Context;
use clap::{Parser, Subcommand};
use iteration_metrics::{
    config::{CacheBackendKind, Config},
    processing::MetricsOrchestrator,
    provider::{CachedDataProvider, FileDataProvider},
    state::create_cache_store,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "iteration-metrics")]
#[command(about = "Delivery metrics per iteration", version, long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding iteration snapshots; overrides provider.data_dir
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print Prometheus metrics to stderr before exiting
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute metrics for one or more iterations and print them as JSON
    Compute {
        #[arg(value_name = "ITERATION_ID", required = true)]
        ids: Vec<String>,
    },

    /// Inspect or clear the iteration cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// List cached iterations with their age and staleness
    Status,

    /// Remove one iteration, or every entry when no id is given
    Clear {
        #[arg(value_name = "ITERATION_ID")]
        id: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(data_dir) = cli.data_dir.clone() {
        config.provider.data_dir = data_dir;
    }

    init_tracing(&config);

    tracing::debug!("Starting iteration-metrics v{}", env!("CARGO_PKG_VERSION"));

    if config.observability.prometheus_enabled {
        if let Err(e) = iteration_metrics::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
        }
    }

    let cache = create_cache_store(&config.cache).context("Failed to open iteration cache")?;
    if config.cache.backend == CacheBackendKind::Memory {
        tracing::debug!("In-memory cache: entries do not outlive this process");
    }

    match cli.command {
        Commands::Compute { ids } => {
            let upstream = Arc::new(FileDataProvider::new(config.provider.data_dir.clone()));
            let provider = CachedDataProvider::new(upstream, cache)
                .with_refresh_stale(config.provider.refresh_stale);

            let orchestrator = MetricsOrchestrator::new(Arc::new(provider))
                .with_deployment_branches(config.calculation.deployment_branches.clone());

            let records = if ids.len() == 1 {
                vec![orchestrator.compute_metrics(&ids[0]).await?]
            } else {
                orchestrator.compute_metrics_batch(&ids).await?
            };

            let json = records
                .iter()
                .map(|record| record.to_json())
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", serde_json::to_string_pretty(&json)?);
        }

        Commands::Cache { command } => match command {
            CacheCommands::Status => {
                let status = cache.get_all_status().await?;
                println!("{}", serde_json::to_string_pretty(&status)?);
            }

            CacheCommands::Clear { id: Some(id) } => {
                if cache.clear(&id).await? {
                    println!("Cleared iteration {}", id);
                } else {
                    println!("Iteration {} was not cached", id);
                }
            }

            CacheCommands::Clear { id: None } => {
                cache.clear_all().await?;
                println!("Cleared all cached iterations");
            }
        },
    }

    if cli.print_metrics {
        eprintln!("{}", iteration_metrics::metrics::gather_metrics());
    }

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("iteration_metrics={}", config.observability.log_level).into()
    });

    let (json_layer, text_layer) = if config.observability.json_logs {
        (
            Some(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)),
            None,
        )
    } else {
        (
            None,
            Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr)),
        )
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
