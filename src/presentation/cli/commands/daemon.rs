use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::application::services::digest::DigestScheduler;
use crate::application::services::live_loop::LiveLoop;
use crate::presentation::http::{serve, AppState};

/// Run the sampling loop, the digest scheduler and the HTTP server until
/// `shutdown` resolves or the server stops on its own.
///
/// Both periodic loops are stopped before returning, and the server is given
/// the chance to drain open connections.
///
/// # Errors
///
/// Returns an error if the HTTP server fails.
pub async fn run_daemon<F>(
    live: Arc<LiveLoop>,
    digest: Arc<DigestScheduler>,
    state: AppState,
    listener: TcpListener,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()>,
{
    let live_handle = live.start();
    let digest_handle = digest.start();

    let (stop_server, server_stopped) = oneshot::channel::<()>();
    let mut server = tokio::spawn(serve(listener, state, async {
        let _ = server_stopped.await;
    }));

    tokio::pin!(shutdown);
    let early_exit = tokio::select! {
        () = &mut shutdown => {
            tracing::info!("Shutdown signal received, stopping");
            None
        }
        result = &mut server => Some(result),
    };

    live_handle.stop().await;
    digest_handle.stop().await;

    let result = match early_exit {
        Some(result) => result,
        None => {
            let _ = stop_server.send(());
            server.await
        }
    };
    result
        .context("HTTP server task panicked")?
        .context("HTTP server failed")?;

    tracing::info!("Daemon stopped");
    Ok(())
}

/// Resolve on Ctrl+C, or on SIGTERM where signals exist.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Cannot listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
