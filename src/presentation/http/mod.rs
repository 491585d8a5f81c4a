//! HTTP surface: live websocket feed plus notification settings.

pub mod error;
pub mod handlers;
pub mod ws;

use std::future::Future;
use std::sync::Arc;

use axum::routing::{get, put};
use axum::Router;
use tokio::net::TcpListener;

use crate::domain::entities::static_info::StaticInfo;
use crate::domain::ports::store::{SubscriptionStore, ThresholdStore};
use crate::infrastructure::live::broadcast::BroadcastSink;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub thresholds: Arc<dyn ThresholdStore>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub live: BroadcastSink,
    /// Described once at startup.
    pub static_info: Arc<StaticInfo>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws/metrics", get(ws::ws_metrics))
        .route(
            "/notifications/thresholds",
            get(handlers::get_thresholds).patch(handlers::patch_thresholds),
        )
        .route(
            "/notifications/subscriptions",
            get(handlers::list_subscriptions).post(handlers::add_subscription),
        )
        .route("/notifications/relay", put(handlers::put_relay))
        .route("/system/static-info", get(handlers::static_info))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
///
/// # Errors
///
/// Returns an I/O error if the server fails while accepting connections.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "HTTP server listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
