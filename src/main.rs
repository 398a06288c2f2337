use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use scoreboard_api::backend::Backends;
use scoreboard_api::config::AppConfig;
use scoreboard_api::schema::SchemaRegistry;
use scoreboard_api::services::KEEP_ALIVE_JOB;
use scoreboard_api::state::AppState;

#[derive(Debug, Parser)]
#[command(name = "scoreboard-api", version, about = "Game backend: auth, allowlisted tables and leaderboards")]
struct Args {
    /// Interface to bind (overrides the environment preset)
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, short, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SUPABASE_URL, SUPABASE_KEY, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = AppConfig::from_env();
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config.validate().context("invalid configuration")?;
    tracing::info!(
        environment = ?config.environment,
        backend = ?config.backend.kind,
        "Starting Scoreboard API"
    );

    let registry = SchemaRegistry::load(&config.schema).context("failed to load table allowlist")?;
    tracing::info!(tables = registry.tables().count(), "Table allowlist loaded");

    let backends = Backends::from_config(&config).context("failed to initialize backend")?;
    let keep_alive_at = config.keep_alive.enabled.then(|| config.keep_alive.time()).transpose()?;
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);

    let state = AppState::new(config, registry, backends).shared();

    if let Some(at) = keep_alive_at {
        state
            .scheduler
            .schedule_daily(KEEP_ALIVE_JOB, at, state.keep_alive.task())
            .await;
    }

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Scoreboard API listening on http://{}", bind_addr);

    axum::serve(listener, scoreboard_api::app(state.clone()))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    state.scheduler.shutdown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
