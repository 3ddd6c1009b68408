//! ==============================================================================
//! server.rs - http api over the telemetry store
//! ==============================================================================
//!
//! routes:
//!     GET     /api/iot-data   current snapshot + full history + alert
//!     POST    /api/iot-data   push a partial telemetry update (sensor node)
//!     OPTIONS /api/iot-data   cors preflight (answered by the cors layer)
//!     GET     /healthz        liveness + retained sample count
//!
//! cors is always permissive: the dashboard is served from another origin.
//!
//! ==============================================================================

use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::domain::{Ack, IngestError, QueryResponse, TelemetryPatch};
use crate::store::TelemetryStore;

pub const TELEMETRY_PATH: &str = "/api/iot-data";

/// Handler state: the injected store plus logging switches.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<TelemetryStore>,
    pub show_sensor_data: bool,
}

impl ApiState {
    pub fn new(store: Arc<TelemetryStore>, show_sensor_data: bool) -> Self {
        Self { store, show_sensor_data }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route(TELEMETRY_PATH, get(query_handler).post(ingest_handler))
        .route("/healthz", get(health_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds and serves until ctrl-c / SIGTERM.
pub async fn serve(addr: SocketAddr, state: ApiState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("[STARTUP] ✓ API live at http://{}{}", listener.local_addr()?, TELEMETRY_PATH);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("[SHUTDOWN] server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("[SHUTDOWN] ctrl-c handler failed: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("[SHUTDOWN] SIGTERM handler failed: {}", e);
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
    info!("[SHUTDOWN] signal received, draining connections");
}

// ==============================================================================
// handlers
// ==============================================================================

/// query: everything the dashboard needs in one response
async fn query_handler(State(api): State<ApiState>) -> Json<QueryResponse> {
    Json(api.store.query().await)
}

/// ingest: the body is read and parsed by hand so unreadable or oversized
/// bodies and malformed json all get the same 400 + message contract
async fn ingest_handler(
    State(api): State<ApiState>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<Ack>, IngestError> {
    let body = body.map_err(|e| IngestError::Unreadable(e.body_text()))?;
    debug!(body = %String::from_utf8_lossy(&body), "[INGEST] received payload");

    let patch = TelemetryPatch::from_json(&body)?;
    if patch.is_empty() {
        debug!("[INGEST] payload carried no known fields");
    }
    let outcome = api.store.ingest(&patch).await;

    if api.show_sensor_data {
        let snap = &outcome.snapshot;
        info!(
            temperature = ?snap.temperature,
            humidity = ?snap.humidity,
            cpu_temp = snap.cpu_temperature,
            board_temp = snap.board_temperature,
            memory = %snap.memory_use_label,
            cpu_usage = snap.cpu_usage_percent,
            rssi = snap.wifi_signal_dbm,
            sampled = outcome.sampled,
            history = outcome.history_len,
            "[INGEST] update applied"
        );
    }

    Ok(Json(Ack::RECEIVED))
}

async fn health_handler(State(api): State<ApiState>) -> Json<serde_json::Value> {
    let (samples, capacity) = api.store.history_usage().await;
    Json(serde_json::json!({
        "status": "ok",
        "samples": samples,
        "capacity": capacity,
    }))
}

impl IntoResponse for IngestError {
    fn into_response(self) -> Response {
        warn!(error = %self, "[INGEST] rejected payload");
        (StatusCode::BAD_REQUEST, Json(Ack::REJECTED)).into_response()
    }
}
