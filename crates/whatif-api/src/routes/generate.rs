//! Stateless generation endpoints: validated milestones come back to the
//! caller and nothing is saved.

use axum::{extract::rejection::JsonRejection, extract::State, Json};
use std::sync::Arc;
use whatif_generation::{BranchRequest, BranchResponse, GenerationKind, TimelineRequest, TimelineResponse};

use crate::{
    error::{ApiError, ApiResult},
    routes::ApiResponse,
    state::AppState,
};

pub async fn generate_timeline(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TimelineRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<TimelineResponse>>> {
    let Json(request) = payload?;

    let _guard = state.tracker.begin(GenerationKind::Timeline);
    let generated = state
        .gateway
        .timeline(&request)
        .await
        .map_err(|e| ApiError::generation(GenerationKind::Timeline, e))?;

    Ok(Json(ApiResponse::generated(generated.data, generated.cached)))
}

pub async fn generate_branch(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BranchRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<BranchResponse>>> {
    let Json(request) = payload?;

    let _guard = state.tracker.begin(GenerationKind::Branch);
    let generated = state
        .gateway
        .branch(&request)
        .await
        .map_err(|e| ApiError::generation(GenerationKind::Branch, e))?;

    Ok(Json(ApiResponse::generated(generated.data, generated.cached)))
}
