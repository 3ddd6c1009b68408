//! ==============================================================================
//! main.rs - telemetry hub entry point
//! ==============================================================================
//!
//! purpose:
//!     this is the backend an esp32 sensor node pushes its readings to, and the
//!     dashboard polls. it keeps the latest reading per field, a bounded rolling
//!     history of ambient temperature/humidity, and derives a simple alert.
//!
//! responsibilities:
//!     - load hub.toml (or defaults) and set up logging
//!     - build the shared telemetry store
//!     - serve the ingest/query api until ctrl-c / SIGTERM
//!
//! relationships:
//!     - config.rs   (runtime configuration)
//!     - store.rs    (snapshot + history behind one lock)
//!     - server.rs   (axum routes over the store)
//!
//! architecture:
//!
//!     ┌──────────────┐  POST /api/iot-data   ┌────────────────────────────┐
//!     │  esp32 node  │ ─────────────────────▶│        rust hub            │
//!     └──────────────┘                       │  ┌──────────┐ ┌─────────┐  │
//!                                            │  │ snapshot │ │ history │  │
//!     ┌──────────────┐  GET /api/iot-data    │  └──────────┘ └─────────┘  │
//!     │  dashboard   │ ◀─────────────────────│     (one RwLock, Arc)      │
//!     └──────────────┘                       └────────────────────────────┘
//!
//! ==============================================================================

mod alert;
mod config;
mod domain;
mod history;
mod server;
mod snapshot;
mod store;

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // step 1: load configuration (its log level drives the subscriber)
    let (config, source) = config::HubConfig::load_or_default()?;

    // step 2: logging - RUST_LOG wins over hub.toml
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    // startup banner
    info!("===========================================================");
    info!("  Telemetry Hub");
    info!("  \"Push Once, Poll Anywhere\"");
    info!("===========================================================");

    source.log();
    config.print_summary();

    // step 3: initialize shared state
    let store = Arc::new(store::TelemetryStore::from_config(&config));
    info!(
        "[STARTUP] ✓ Store ready ({} sample history)",
        config.history.capacity
    );

    // step 4: serve until shutdown
    let state = server::ApiState::new(store, config.logging.show_sensor_data);
    server::serve(config.listen_addr()?, state).await
}
