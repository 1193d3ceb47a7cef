use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dashboard_dal::DalError;
use dashboard_dal::api::{AppState, router};
use dashboard_dal::executor::QueryExecutor;
use dashboard_dal::mssql::MssqlFactory;
use dashboard_dal::pool::PoolManager;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Dashboard API server backed by SQL Server.
///
/// Database targets are configured through `DB_*` and `HRMS_DB_*` variables.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    bind: SocketAddr,

    /// Per-statement timeout in milliseconds (0 disables it)
    #[arg(long, env = "QUERY_TIMEOUT_MS", default_value_t = 30_000)]
    query_timeout_ms: u64,
}

#[derive(Debug, thiserror::Error)]
enum ServerError {
    #[error(transparent)]
    Config(#[from] DalError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .compact()
        .init();

    let cli = Cli::parse();

    let pools = Arc::new(PoolManager::from_env(Arc::new(MssqlFactory::new()))?);
    let executor = match cli.query_timeout_ms {
        0 => QueryExecutor::new(),
        ms => QueryExecutor::new().with_timeout(Duration::from_millis(ms)),
    };
    let app = router(AppState::new(Arc::clone(&pools), executor))
        .layer(TraceLayer::new_for_http());

    let listener = TcpListener::bind(cli.bind).await?;
    tracing::info!(addr = %cli.bind, targets = ?pools.targets().collect::<Vec<_>>(), "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pools.shutdown().await;
    tracing::info!("server shutdown complete");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
