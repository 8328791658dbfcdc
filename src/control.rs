//! Local control API for the UI surface.
//!
//! ```text
//! GET  /status   - peer reachability, command channel, tab count, active tab
//! POST /capture  - forced capture of the active tab
//! POST /resync   - full resync with the browser
//! GET  /health   - liveness
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use tabwatch_config::ControlConfig;
use tabwatch_core::{
    CaptureOutcome, DeliveryMetrics, DeliveryStats, RuntimeStopped, TrackerControl,
};
use tabwatch_protocols::{PeerSink, TabId};
use tabwatch_sync::ChannelStats;

pub(crate) const NO_ACTIVE_TAB: &str = "No active tab";

/// Everything the handlers read from.
pub(crate) struct ControlState {
    pub tracker: Arc<dyn TrackerControl>,
    pub peer: Arc<dyn PeerSink>,
    pub channel: Arc<ChannelStats>,
    pub delivery: Arc<DeliveryMetrics>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StatusResponse {
    pub connected: bool,
    pub command_channel: bool,
    pub tab_count: usize,
    pub active_tab_id: Option<TabId>,
    pub delivery: DeliveryStats,
}

/// Reply to `/capture` and `/resync`: `{"ok": bool}` or `{"error": ".."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct ActionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ok: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionResponse {
    pub fn ok() -> Self {
        Self::done(true)
    }

    pub fn done(success: bool) -> Self {
        Self {
            ok: Some(success),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: None,
            error: Some(message.into()),
        }
    }
}

fn stopped(e: RuntimeStopped) -> Response {
    warn!("Control request failed: {}", e);
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(ActionResponse::error(e.to_string())),
    )
        .into_response()
}

pub(crate) fn router(state: Arc<ControlState>) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/capture", post(capture))
        .route("/resync", post(resync))
        .route("/health", get(health))
        .with_state(state)
}

async fn status(State(state): State<Arc<ControlState>>) -> Response {
    let tracker = match state.tracker.status().await {
        Ok(status) => status,
        Err(e) => return stopped(e),
    };
    let connected = state.peer.health().await;

    Json(StatusResponse {
        connected,
        command_channel: state.channel.is_connected(),
        tab_count: tracker.tab_count,
        active_tab_id: tracker.active_tab_id,
        delivery: state.delivery.snapshot(),
    })
    .into_response()
}

async fn capture(State(state): State<Arc<ControlState>>) -> Response {
    match state.tracker.capture_active().await {
        Ok(Some(outcome)) => {
            debug!("Forced capture: {:?}", outcome);
            let delivered = matches!(outcome, CaptureOutcome::Sent { delivered: true, .. });
            Json(ActionResponse::done(delivered)).into_response()
        }
        Ok(None) => Json(ActionResponse::error(NO_ACTIVE_TAB)).into_response(),
        Err(e) => stopped(e),
    }
}

async fn resync(State(state): State<Arc<ControlState>>) -> Response {
    match state.tracker.resync().await {
        Ok(summary) => {
            info!(
                "Resync via control API: {} tabs, {} pruned",
                summary.total, summary.pruned
            );
            Json(ActionResponse::ok()).into_response()
        }
        Err(e) => stopped(e),
    }
}

async fn health() -> &'static str {
    "ok"
}

/// Serve the control API until shutdown.
pub(crate) async fn serve(
    config: ControlConfig,
    state: Arc<ControlState>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!("Control API listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    info!("Control API stopped");
    Ok(())
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
