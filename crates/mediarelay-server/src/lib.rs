//! mediarelay-server: HTTP API in front of the external downloader.
//!
//! Two handlers make up the service:
//!
//! - `POST /download` -- the metadata resolver ([`routes::download`])
//! - `GET /stream` -- the stream relay ([`routes::stream`])
//!
//! plus `GET /health`. [`start`] wires configuration, the yt-dlp
//! [`MediaSource`], and graceful shutdown together.

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;

#[cfg(test)]
pub(crate) mod test_support;

use std::net::SocketAddr;
use std::sync::Arc;

use mediarelay_core::config::{Config, DownloaderConfig};
use mediarelay_core::Error;
use mediarelay_fetch::{MediaSource, ToolInfo, YtDlp};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::context::AppContext;

/// Start the mediarelay server.
///
/// Binds `server.host:server.port` and serves until Ctrl+C or SIGTERM.
pub async fn start(config: Config) -> mediarelay_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let cancel = CancellationToken::new();

    let info = check_downloader(config.downloader.clone()).await?;
    if info.available {
        tracing::info!(
            "Tool found: {} ({}) at {}",
            info.name,
            info.version.as_deref().unwrap_or("unknown version"),
            info.path.as_deref().map(|p| p.display().to_string()).unwrap_or_default()
        );
    } else {
        tracing::warn!(
            "Tool not found: {}; requests will fail until it is installed",
            info.name
        );
    }

    let ytdlp = YtDlp::new(config.downloader.clone()).with_shutdown(cancel.clone());
    let source: Arc<dyn MediaSource> = Arc::new(ytdlp);
    let ctx = AppContext::new(config.clone(), source);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| Error::Internal(format!("Invalid server address: {e}")))?;

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Internal(format!("Failed to bind to {addr}: {e}")))?;

    serve(listener, ctx, cancel).await
}

/// Probe the downloader's `--version` on the blocking pool.
async fn check_downloader(config: DownloaderConfig) -> mediarelay_core::Result<ToolInfo> {
    tokio::task::spawn_blocking(move || YtDlp::new(config).check())
        .await
        .map_err(|e| Error::Internal(format!("Tool check task failed: {e}")))
}

/// Serve the router on an already-bound listener.
///
/// Returns after a shutdown signal or after `cancel` fires. On shutdown the
/// token is cancelled so running relays kill their subprocesses, then
/// in-flight connections are drained.
pub async fn serve(
    listener: TcpListener,
    ctx: AppContext,
    cancel: CancellationToken,
) -> mediarelay_core::Result<()> {
    let app = router::build_router(ctx);

    tracing::info!("Starting server on {}", listener.local_addr()?);

    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal(shutdown.clone()).await;
            shutdown.cancel();
        })
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM) or cancellation.
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
        _ = cancel.cancelled() => {},
    }

    tracing::info!("Shutdown signal received");
}
