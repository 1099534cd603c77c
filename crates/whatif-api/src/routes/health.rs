use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;
use whatif_generation::CacheStats;

use crate::{state::AppState, tracker::GenerationStatus};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub generating: GenerationStatus,
    pub timelines: usize,
    pub current_timeline_id: Option<String>,
    pub cache: CacheStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    pub total_entries: usize,
    pub active_entries: usize,
}

impl From<CacheStats> for CacheStatus {
    fn from(stats: CacheStats) -> Self {
        Self {
            total_entries: stats.total_entries,
            active_entries: stats.active_entries,
        }
    }
}

/// Which generations are running, plus a summary of saved state
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let manager = state.manager.read().await;

    Json(StatusResponse {
        generating: state.tracker.status(),
        timelines: manager.len(),
        current_timeline_id: manager.current_id().map(str::to_string),
        cache: state.gateway.cache().stats().into(),
    })
}
