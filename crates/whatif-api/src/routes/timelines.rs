//! Saved timelines and the tree operations on them.
//!
//! Every route names its timeline explicitly. Mutations are written through
//! to storage before the response goes out.

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use whatif_generation::{BranchRequest, GenerationKind, TimelineRequest};
use whatif_tree::{
    leaves, path_to_root, responsive_direction, Layout, LayoutDirection, LayoutEngine, LayoutOptions, Timeline,
    TimelineNode, TreeError, TreeLayout,
};

use crate::{
    error::{ApiError, ApiResult},
    routes::ApiResponse,
    state::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSummary {
    pub id: String,
    pub person: String,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub milestone_count: usize,
    pub version: u64,
    pub current: bool,
}

impl TimelineSummary {
    fn new(timeline: &Timeline, current_id: Option<&str>) -> Self {
        Self {
            id: timeline.id().to_string(),
            person: timeline.person().to_string(),
            created_at: timeline.created_at(),
            last_accessed: timeline.last_accessed(),
            milestone_count: timeline.milestone_count(),
            version: timeline.version(),
            current: current_id == Some(timeline.id()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBranchRequest {
    pub parent_id: String,
    pub alternate_scenario: String,
    /// Reject the branch if the timeline has changed since this version
    #[serde(default)]
    pub expected_version: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchAdded {
    pub timeline_id: String,
    pub node_ids: Vec<String>,
    pub version: u64,
    pub milestone_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodesRemoved {
    pub removed: Vec<String>,
    pub milestone_count: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRemoved {
    pub id: String,
    pub current_timeline_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LayoutQuery {
    pub direction: Option<LayoutDirection>,
    /// Viewport width; picks the direction when none is given
    pub width: Option<u32>,
}

// ============ TIMELINES ============

pub async fn list_timelines(State(state): State<Arc<AppState>>) -> Json<ApiResponse<Vec<TimelineSummary>>> {
    let manager = state.manager.read().await;
    let current = manager.current_id();
    let summaries = manager
        .list()
        .into_iter()
        .map(|t| TimelineSummary::new(t, current))
        .collect();

    Json(ApiResponse::ok(summaries))
}

/// Generate a timeline for a person and save it as current.
///
/// A person who already has a saved timeline is switched to without
/// generating anything. The timeline is keyed on the name the model
/// resolves, which may differ from what was typed.
pub async fn create_timeline(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TimelineRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<Timeline>>)> {
    let Json(request) = payload?;

    let existing = {
        let manager = state.manager.read().await;
        manager
            .list()
            .into_iter()
            .find(|t| t.is_for(&request.person))
            .map(|t| t.id().to_string())
    };
    if let Some(timeline_id) = existing {
        let timeline = state.manager.write().await.switch_to(&timeline_id)?.clone();
        state.flush().await?;
        return Ok((StatusCode::OK, Json(ApiResponse::generated(timeline, true))));
    }

    let generated = {
        let _guard = state.tracker.begin(GenerationKind::Timeline);
        state
            .gateway
            .timeline(&request)
            .await
            .map_err(|e| ApiError::generation(GenerationKind::Timeline, e))?
    };

    // saved under the name the model resolved, so "einstein" and
    // "Albert Einstein" land on the same timeline
    let person = match generated.data.person.trim() {
        "" => request.person.as_str(),
        resolved => resolved,
    };

    let (timeline, existed) = {
        let mut manager = state.manager.write().await;
        let existed = manager.list().into_iter().any(|t| t.is_for(person));
        let id = manager.save(person, generated.data.milestones)?;
        let timeline = manager
            .get(&id)
            .cloned()
            .ok_or_else(|| ApiError::Internal(format!("saved timeline {} missing", id)))?;
        (timeline, existed)
    };
    state.flush().await?;

    let status = if existed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(ApiResponse::generated(timeline, generated.cached || existed))))
}

pub async fn get_timeline(
    State(state): State<Arc<AppState>>,
    Path(timeline_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Timeline>>> {
    let manager = state.manager.read().await;
    let timeline = find(&manager, &timeline_id)?;
    Ok(Json(ApiResponse::ok(timeline.clone())))
}

pub async fn delete_timeline(
    State(state): State<Arc<AppState>>,
    Path(timeline_id): Path<String>,
) -> ApiResult<Json<ApiResponse<TimelineRemoved>>> {
    let removed = {
        let mut manager = state.manager.write().await;
        let removed = manager.remove(&timeline_id)?;
        TimelineRemoved {
            id: removed.id().to_string(),
            current_timeline_id: manager.current_id().map(str::to_string),
        }
    };
    state.flush().await?;

    Ok(Json(ApiResponse::ok(removed)))
}

pub async fn switch_timeline(
    State(state): State<Arc<AppState>>,
    Path(timeline_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Timeline>>> {
    let timeline = state.manager.write().await.switch_to(&timeline_id)?.clone();
    state.flush().await?;

    Ok(Json(ApiResponse::ok(timeline)))
}

// ============ BRANCHING ============

/// Generate an alternate branch under `parentId` and attach it.
///
/// The manager lock is released while the model runs; the branch is applied
/// only if the timeline is still at the version it was read at.
pub async fn add_branch(
    State(state): State<Arc<AppState>>,
    Path(timeline_id): Path<String>,
    payload: Result<Json<AddBranchRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ApiResponse<BranchAdded>>)> {
    let Json(body) = payload?;

    let (request, version) = {
        let manager = state.manager.read().await;
        let timeline = find(&manager, &timeline_id)?;

        if let Some(expected) = body.expected_version {
            if expected != timeline.version() {
                return Err(TreeError::StaleVersion {
                    timeline_id: timeline_id.clone(),
                    expected,
                    actual: timeline.version(),
                }
                .into());
            }
        }

        let path = path_to_root(timeline.nodes(), &body.parent_id);
        let request = BranchRequest::from_path(&path, body.alternate_scenario.clone())
            .ok_or_else(|| TreeError::NodeNotFound(body.parent_id.clone()))?
            .with_person(timeline.person());
        (request, timeline.version())
    };

    let generated = {
        let _guard = state.tracker.begin(GenerationKind::Branch);
        state
            .gateway
            .branch(&request)
            .await
            .map_err(|e| ApiError::generation(GenerationKind::Branch, e))?
    };

    let added = {
        let mut manager = state.manager.write().await;
        let node_ids = manager.branch_in_checked(
            &timeline_id,
            version,
            &body.parent_id,
            generated.data.milestones,
            body.alternate_scenario.trim(),
        )?;
        let timeline = find(&manager, &timeline_id)?;
        BranchAdded {
            timeline_id: timeline_id.clone(),
            node_ids,
            version: timeline.version(),
            milestone_count: timeline.milestone_count(),
        }
    };
    state.flush().await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::generated(added, generated.cached))))
}

// ============ NODES ============

pub async fn delete_node(
    State(state): State<Arc<AppState>>,
    Path((timeline_id, node_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<NodesRemoved>>> {
    let removed = {
        let mut manager = state.manager.write().await;
        let removed = manager.delete_node_in(&timeline_id, &node_id)?;
        NodesRemoved {
            removed,
            milestone_count: find(&manager, &timeline_id)?.milestone_count(),
        }
    };
    state.flush().await?;

    Ok(Json(ApiResponse::ok(removed)))
}

/// Select a node; returns the new root-to-node path
pub async fn select_node(
    State(state): State<Arc<AppState>>,
    Path((timeline_id, node_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<Vec<String>>>> {
    let path = {
        let mut manager = state.manager.write().await;
        manager.select_node_in(&timeline_id, &node_id)?;
        find(&manager, &timeline_id)?.current_path().to_vec()
    };
    state.flush().await?;

    Ok(Json(ApiResponse::ok(path)))
}

pub async fn expand_node(
    State(state): State<Arc<AppState>>,
    Path((timeline_id, node_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<TimelineNode>>> {
    set_expanded(&state, &timeline_id, &node_id, true).await
}

pub async fn collapse_node(
    State(state): State<Arc<AppState>>,
    Path((timeline_id, node_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<TimelineNode>>> {
    set_expanded(&state, &timeline_id, &node_id, false).await
}

async fn set_expanded(
    state: &AppState,
    timeline_id: &str,
    node_id: &str,
    expanded: bool,
) -> ApiResult<Json<ApiResponse<TimelineNode>>> {
    let node = {
        let mut manager = state.manager.write().await;
        manager.set_expanded_in(timeline_id, node_id, expanded)?;
        find_node(find(&manager, timeline_id)?, node_id)?.clone()
    };
    state.flush().await?;

    Ok(Json(ApiResponse::ok(node)))
}

pub async fn node_path(
    State(state): State<Arc<AppState>>,
    Path((timeline_id, node_id)): Path<(String, String)>,
) -> ApiResult<Json<ApiResponse<Vec<TimelineNode>>>> {
    let manager = state.manager.read().await;
    let timeline = find(&manager, &timeline_id)?;
    find_node(timeline, &node_id)?;

    let path = path_to_root(timeline.nodes(), &node_id)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(ApiResponse::ok(path)))
}

pub async fn timeline_leaves(
    State(state): State<Arc<AppState>>,
    Path(timeline_id): Path<String>,
) -> ApiResult<Json<ApiResponse<Vec<TimelineNode>>>> {
    let manager = state.manager.read().await;
    let timeline = find(&manager, &timeline_id)?;
    Ok(Json(ApiResponse::ok(leaves(timeline.nodes()).into_iter().cloned().collect())))
}

pub async fn timeline_layout(
    State(state): State<Arc<AppState>>,
    Path(timeline_id): Path<String>,
    query: Result<Query<LayoutQuery>, QueryRejection>,
) -> ApiResult<Json<ApiResponse<Layout>>> {
    let Query(query) = query?;
    let direction = query
        .direction
        .or_else(|| query.width.map(responsive_direction))
        .unwrap_or_default();

    let manager = state.manager.read().await;
    let timeline = find(&manager, &timeline_id)?;
    let layout = TreeLayout::new(LayoutOptions::new().direction(direction)).layout(timeline.nodes());

    Ok(Json(ApiResponse::ok(layout)))
}

fn find<'a>(manager: &'a whatif_tree::TimelineManager, timeline_id: &str) -> ApiResult<&'a Timeline> {
    manager.get(timeline_id).ok_or_else(|| {
        tracing::warn!(timeline_id = %timeline_id, "Unknown timeline");
        TreeError::TimelineNotFound(timeline_id.to_string()).into()
    })
}

fn find_node<'a>(timeline: &'a Timeline, node_id: &str) -> ApiResult<&'a TimelineNode> {
    timeline.nodes().get(node_id).ok_or_else(|| {
        tracing::warn!(timeline_id = %timeline.id(), node_id = %node_id, "Unknown node");
        TreeError::NodeNotFound(node_id.to_string()).into()
    })
}
