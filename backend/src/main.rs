mod config;
mod observability;

use clap::{Parser, Subcommand};
use config::Config;
use sentry_backend::SentryPlugin;
use sentry_backend::catalog::{CatalogError, HttpCatalogClient};
use sentry_backend::config::InstanceRegistry;
use shared::plugin::{PluginHost, PluginHostError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(about = "Backend serving the sentry plugin")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Start the HTTP server
    Run {
        #[arg(long, short)]
        config: PathBuf,
    },
    /// Check that the configuration loads and exit
    Validate {
        #[arg(long, short)]
        config: PathBuf,
    },
}

#[derive(thiserror::Error, Debug)]
enum BackendError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),
    #[error("invalid sentry config: {0}")]
    SentryConfig(#[from] sentry_backend::config::ConfigError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Plugin(#[from] PluginHostError),
    #[error(transparent)]
    Observability(#[from] observability::ObservabilityError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        CliCommand::Run { config } => run(&config),
        CliCommand::Validate { config } => validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Exiting");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn validate(path: &std::path::Path) -> Result<(), BackendError> {
    let config = Config::from_file(path)?;
    let registry = InstanceRegistry::from_config(&config.sentry)?;
    HttpCatalogClient::new(reqwest::Client::new(), &config.catalog.base_url)?;

    println!(
        "Config ok: {} sentry instance(s) configured",
        registry.instances().len()
    );
    Ok(())
}

fn run(path: &std::path::Path) -> Result<(), BackendError> {
    let config = Config::from_file(path)?;

    // Keep the guard alive so pending events are flushed on exit
    let _sentry_guard = observability::init_logging(&config.logging)?;
    if let Some(metrics) = &config.metrics {
        observability::init_metrics(metrics)?;
    }

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(serve(config))
}

async fn serve(config: Config) -> Result<(), BackendError> {
    let client = reqwest::Client::new();
    let catalog = HttpCatalogClient::new(client.clone(), &config.catalog.base_url)?;
    let plugin = SentryPlugin::from_config(&config.sentry, Arc::new(catalog), client)?;

    let mut host = PluginHost::new();
    host.add(plugin)?;
    let plugins: Vec<&str> = host.plugin_ids().collect();
    tracing::info!(?plugins, "Serving plugins");

    shared::http::serve(
        &config.listener.host,
        config.listener.port,
        host.into_router(),
    )
    .await?;
    Ok(())
}
