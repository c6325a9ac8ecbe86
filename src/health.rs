//! `GET /health` endpoint handler.
//!
//! Returns a [`HealthResponse`] JSON payload with the server version,
//! uptime, which config revision is being served, the size of the mux
//! tables, and cumulative request and delivery counters.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::config::model::FanoutMode;
use crate::server::AppState;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub config: ConfigHealth,
    pub stats: StatsResponse,
}

#[derive(Serialize, Deserialize)]
pub struct ConfigHealth {
    pub source: String,
    pub version: String,
    pub loaded_ago_seconds: u64,
    pub endpoints: usize,
    pub destinations: usize,
    pub directives: usize,
    pub fanout: FanoutMode,
}

#[derive(Serialize, Deserialize)]
pub struct StatsResponse {
    pub requests_accepted: u64,
    pub requests_rejected: u64,
    pub deliveries_succeeded: u64,
    pub deliveries_failed: u64,
}

pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let loaded = &state.config;
    let config = &loaded.config;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        config: ConfigHealth {
            source: loaded.source_name.clone(),
            version: loaded.version.short().to_string(),
            loaded_ago_seconds: loaded.loaded_at.elapsed().as_secs(),
            endpoints: config.mux.source_endpoints.len(),
            destinations: config.mux.destinations.len(),
            directives: config.total_directives(),
            fanout: config.defaults.fanout,
        },
        stats: StatsResponse {
            requests_accepted: state.stats.accepted.load(Ordering::Relaxed),
            requests_rejected: state.stats.rejected.load(Ordering::Relaxed),
            deliveries_succeeded: state.stats.delivered.load(Ordering::Relaxed),
            deliveries_failed: state.stats.failed.load(Ordering::Relaxed),
        },
    })
}
