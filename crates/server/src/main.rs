//! `pipeline-api-server`: serve configured in-memory resources over REST with an `OpenAPI`
//! document at `/api.json`.
//!
//! | Flag | Env | Default |
//! |---|---|---|
//! | `--config` | `PIPELINE_API_CONFIG` | *(none: empty registry)* |
//! | `--bind` | `PIPELINE_API_BIND` | config `bind`, then `127.0.0.1:8089` |
//! | `--port` | `PORT` | port of the bind address |
//! | `--log-level` | `PIPELINE_API_LOG` | `info` |
//! | `--log-format` | | `text` |

mod app;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use pipeline_api::ApiConfig;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "pipeline-api-server", version, about)]
struct Cli {
    /// YAML config file.
    #[arg(long, env = "PIPELINE_API_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (`host:port`).
    #[arg(long, env = "PIPELINE_API_BIND")]
    bind: Option<String>,

    /// Override the port of the listen address.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// `tracing` filter directives, e.g. `info` or `pipeline_api=debug`.
    #[arg(long, env = "PIPELINE_API_LOG", default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn init_tracing(level: &str, format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level).with_context(|| format!("invalid log level '{level}'"))?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level, cli.log_format)?;

    let config = match &cli.config {
        Some(path) => ApiConfig::load(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => ApiConfig::default(),
    };

    let router = app::build_router(&config)?;
    let bind = app::resolve_bind(cli.bind.as_deref(), config.bind.as_deref(), cli.port)?;

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("bind {bind}"))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        resources = config.resources.len(),
        "pipeline-api-server listening"
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;
    Ok(())
}
