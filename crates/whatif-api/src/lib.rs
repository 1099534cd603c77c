pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod tracker;

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::routes::{generate, health, timelines};
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/status", get(health::status))
        // Stateless generation
        .route("/generate-timeline", post(generate::generate_timeline))
        .route("/generate-branch", post(generate::generate_branch))
        // Timelines
        .route("/timelines", get(timelines::list_timelines).post(timelines::create_timeline))
        .route(
            "/timelines/:timeline_id",
            get(timelines::get_timeline).delete(timelines::delete_timeline),
        )
        .route("/timelines/:timeline_id/switch", post(timelines::switch_timeline))
        .route("/timelines/:timeline_id/branches", post(timelines::add_branch))
        .route("/timelines/:timeline_id/leaves", get(timelines::timeline_leaves))
        .route("/timelines/:timeline_id/layout", get(timelines::timeline_layout))
        // Nodes
        .route(
            "/timelines/:timeline_id/nodes/:node_id",
            axum::routing::delete(timelines::delete_node),
        )
        .route("/timelines/:timeline_id/nodes/:node_id/select", post(timelines::select_node))
        .route("/timelines/:timeline_id/nodes/:node_id/expand", post(timelines::expand_node))
        .route("/timelines/:timeline_id/nodes/:node_id/collapse", post(timelines::collapse_node))
        .route("/timelines/:timeline_id/nodes/:node_id/path", get(timelines::node_path));

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .layer(from_fn(middleware::logging::log_request))
        .layer(TimeoutLayer::new(Duration::from_secs(state.config.server.timeout_secs)))
        .layer(CompressionLayer::new())
        .layer(build_cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn build_cors_layer(config: &Config) -> CorsLayer {
    if config.cors.enabled {
        let cors = CorsLayer::new()
            .allow_methods([
                axum::http::Method::GET,
                axum::http::Method::POST,
                axum::http::Method::DELETE,
                axum::http::Method::OPTIONS,
            ])
            .allow_headers(Any);

        if config.cors.origins.iter().any(|o| o == "*") {
            cors.allow_origin(Any)
        } else {
            let parsed_origins: Vec<axum::http::HeaderValue> = config
                .cors
                .origins
                .iter()
                .filter_map(|o| o.parse::<axum::http::HeaderValue>().ok())
                .collect();

            cors.allow_origin(parsed_origins)
        }
    } else {
        CorsLayer::permissive()
    }
}
