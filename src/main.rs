use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use prompt_enhancer_api::auth::TokenVerifier;
use prompt_enhancer_api::config::AppConfig;
use prompt_enhancer_api::database::StoreHandle;
use prompt_enhancer_api::{app, AppState};

#[derive(Parser, Debug)]
#[command(name = "prompt-enhancer-api")]
#[command(about = "Prompt enhancement API server")]
#[command(version)]
struct Args {
    /// Bind address (overrides HOST)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides PORT / API_PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Environment file to load instead of ./.env
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load .env if present so cargo run picks up DATABASE_URL, AUTH_JWT_SECRET, etc.
    match &args.env_file {
        Some(path) => {
            dotenvy::from_path(path).with_context(|| format!("failed to load {}", path.display()))?;
        }
        None => {
            let _ = dotenvy::dotenv();
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,prompt_enhancer_api=debug")),
        )
        .init();

    let mut config = AppConfig::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    tracing::info!("Starting Prompt Enhancer API in {:?} mode", config.environment);

    let store = match StoreHandle::connect(&config.database).await {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Document store connection failed, continuing degraded: {}", e);
            StoreHandle::degraded()
        }
    };

    let verifier = TokenVerifier::from_config(&config).context("failed to build token verifier")?;
    if config.anonymous_fallback_enabled() {
        tracing::warn!("Anonymous fallback identity is enabled; do not use this setting outside development");
    }

    let sweep = Duration::from_secs(config.cache.sweep_interval_secs);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(config, store.clone(), verifier);
    let token_sweeper = state.verifier.spawn_sweeper(sweep);
    let cache_sweeper = state.cache.spawn_sweeper(sweep);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Prompt Enhancer API listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    token_sweeper.abort();
    cache_sweeper.abort();
    store.close().await;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
