pub mod cli;
pub mod config;
pub mod constants;
pub mod db;
pub mod domain;
pub mod entities;
pub mod models;
pub mod services;
pub mod state;
pub mod web;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, cmd_init, cmd_list_users};
pub use config::Config;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run(config: Config) -> anyhow::Result<()> {
    let cli = Cli::parse();

    config.validate()?;

    init_tracing(&config);
    info!(
        "Configuration loaded (database: {}, sessions: {})",
        config.general.database_path, config.server.session_store
    );

    dispatch(cli.command.unwrap_or(Commands::Serve), config).await
}

/// Runs one command against an already validated config.
pub async fn dispatch(command: Commands, config: Config) -> anyhow::Result<()> {
    match command {
        Commands::Serve => {
            let prometheus_handle = install_metrics(&config)?;
            run_server(config, prometheus_handle).await
        }
        Commands::Init => cmd_init(),
        Commands::Users => cmd_list_users(&config).await,
    }
}

fn init_tracing(config: &Config) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);

    if config.general.log_format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn install_metrics(config: &Config) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.observability.metrics_enabled {
        return Ok(None);
    }

    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    info!("Prometheus metrics recorder initialized");
    Ok(Some(handle))
}

async fn run_server(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<()> {
    info!("Postboard v{} starting...", env!("CARGO_PKG_VERSION"));

    let addr = config.listen_addr();
    let state = web::create_app_state_from_config(config, prometheus_handle).await?;
    let app = web::app(state).await?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Web server running at http://{addr}");

    axum::serve(
        listener,
        axum::ServiceExt::<axum::extract::Request>::into_make_service(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Postboard stopped");
    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
