use anyhow::{Context, Result};
use clap::Parser;
use recall_core::RecallService;
use recall_server::config::Config;
use recall_sqlite::SqliteDatabase;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();

    let db = SqliteDatabase::open(&config.database)
        .with_context(|| format!("failed to open database {}", config.database.display()))?;
    info!(path = %config.database.display(), "opened database");

    let assistant = config.assistant().context("failed to set up AI client")?;
    if !assistant.is_available() {
        warn!("OPENAI_API_KEY not set, AI routes will answer 503");
    }

    let service = RecallService::new(db)
        .with_assistant(assistant)
        .with_daily_limits(config.daily_limits());
    let cors = recall_server::cors_layer(config.cors_origin.as_deref())
        .context("invalid CORS origin")?;
    let app = recall_server::app(service, cors);

    let listener = TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    info!(address = %config.bind, "server running");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("received SIGTERM, shutting down");
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
