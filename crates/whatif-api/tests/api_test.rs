use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use whatif_api::{build_router, config::Config, state::AppState};
use whatif_generation::{BranchPrompt, GenerationGateway, GenerationProvider, LlmProvider};
use whatif_llm::ProviderType;
use whatif_persist::{MemoryStore, PersistenceClient};
use whatif_tree::TimelineManager;

const CONFIG: &str = r#"
    [server]
    host = "127.0.0.1"
    port = 0

    [cors]
    enabled = false
    origins = []

    [llm]
    model = "test-model"
    timeline_max_tokens = 4096
    branch_max_tokens = 3072

    [storage]
    path = "unused.json"
    max_timelines = 20

    [cache]
    ttl_secs = 60

    [logging]
    level = "debug"
    format = "pretty"
"#;

/// Replies with `branch_size` branch milestones and counts calls
struct FakeProvider {
    branch_size: AtomicUsize,
    calls: AtomicUsize,
    /// Full name to answer with instead of echoing the request
    resolved_name: Option<String>,
}

impl FakeProvider {
    fn new(branch_size: usize) -> Self {
        Self {
            branch_size: AtomicUsize::new(branch_size),
            calls: AtomicUsize::new(0),
            resolved_name: None,
        }
    }

    fn resolving_to(name: &str) -> Self {
        Self {
            resolved_name: Some(name.to_string()),
            ..Self::new(5)
        }
    }
}

fn milestones(n: usize, prefix: &str) -> Value {
    json!((0..n)
        .map(|i| json!({
            "date": format!("{}", 1867 + i),
            "title": format!("{} {}", prefix, i),
            "description": "Something happened.",
            "impact": "It mattered.",
            "keyFigures": ["Pierre Curie"]
        }))
        .collect::<Vec<_>>())
}

#[async_trait]
impl GenerationProvider for FakeProvider {
    async fn generate_timeline(&self, person: &str, _context: Option<&str>) -> whatif_generation::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let person = self.resolved_name.as_deref().unwrap_or(person);
        Ok(json!({ "person": person, "milestones": milestones(10, "Event") }).to_string())
    }

    async fn generate_branch(&self, _prompt: &BranchPrompt) -> whatif_generation::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let n = self.branch_size.load(Ordering::SeqCst);
        Ok(json!({ "milestones": milestones(n, "Alt") }).to_string())
    }
}

struct TestApp {
    router: Router,
    provider: Arc<FakeProvider>,
    store: Arc<MemoryStore>,
}

fn test_app_with(provider: Arc<dyn GenerationProvider>) -> (Router, Arc<MemoryStore>) {
    let config: Config = toml::from_str(CONFIG).unwrap();
    let store = Arc::new(MemoryStore::new());
    let state = AppState::new(
        config,
        TimelineManager::new(),
        GenerationGateway::new(provider),
        store.clone(),
    );
    (build_router(Arc::new(state)), store)
}

fn test_app(branch_size: usize) -> TestApp {
    test_app_from(FakeProvider::new(branch_size))
}

fn test_app_from(provider: FakeProvider) -> TestApp {
    let provider = Arc::new(provider);
    let (router, store) = test_app_with(provider.clone());
    TestApp { router, provider, store }
}

async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_timeline(app: &TestApp, person: &str) -> Value {
    let (status, body) = send(&app.router, Method::POST, "/api/timelines", Some(json!({ "person": person }))).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body["data"].clone()
}

fn node_id(timeline: &Value, index: usize) -> String {
    timeline["nodes"]["allIds"][index].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_and_status() {
    let app = test_app(5);

    let (status, body) = send(&app.router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app.router, Method::GET, "/api/status", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["generating"], json!({ "timeline": false, "branch": false }));
    assert_eq!(body["timelines"], 0);
}

#[tokio::test]
async fn test_create_timeline_saves_and_persists() {
    let app = test_app(5);
    let timeline = create_timeline(&app, "Marie Curie").await;

    assert_eq!(timeline["person"], "Marie Curie");
    assert_eq!(timeline["milestoneCount"], 10);
    assert_eq!(timeline["nodes"]["allIds"].as_array().unwrap().len(), 10);

    let saved = app.store.load().await.unwrap().unwrap();
    assert_eq!(saved.timelines.len(), 1);
    assert_eq!(saved.current_timeline_id.as_deref(), timeline["id"].as_str());
}

#[tokio::test]
async fn test_same_person_switches_without_generating() {
    let app = test_app(5);
    let first = create_timeline(&app, "Marie Curie").await;
    create_timeline(&app, "Ada Lovelace").await;

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/timelines",
        Some(json!({ "person": "  marie curie" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], first["id"]);
    assert_eq!(app.provider.calls.load(Ordering::SeqCst), 2);

    let (_, list) = send(&app.router, Method::GET, "/api/timelines", None).await;
    let list = list["data"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["id"], first["id"]);
    assert_eq!(list[0]["current"], true);
}

#[tokio::test]
async fn test_branch_attaches_generated_nodes() {
    let app = test_app(6);
    let timeline = create_timeline(&app, "Marie Curie").await;
    let id = timeline["id"].as_str().unwrap();
    let parent = node_id(&timeline, 4);

    let (status, body) = send(
        &app.router,
        Method::POST,
        &format!("/api/timelines/{}/branches", id),
        Some(json!({ "parentId": parent, "alternateScenario": "What if she stayed in Warsaw?" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["nodeIds"].as_array().unwrap().len(), 6);
    assert_eq!(body["data"]["milestoneCount"], 16);
    assert_eq!(body["data"]["version"], 1);
    assert_eq!(body["cached"], false);

    let first_new = body["data"]["nodeIds"][0].as_str().unwrap();
    let (_, fetched) = send(&app.router, Method::GET, &format!("/api/timelines/{}", id), None).await;
    let node = &fetched["data"]["nodes"]["byId"][first_new];
    assert_eq!(node["type"], "alternate");
    assert_eq!(node["depth"], 5);
    assert_eq!(node["parentId"], parent.as_str());
    assert_eq!(node["scenario"], "What if she stayed in Warsaw?");

    let (_, leaves) = send(&app.router, Method::GET, &format!("/api/timelines/{}/leaves", id), None).await;
    assert_eq!(leaves["data"].as_array().unwrap().len(), 2);

    let saved = app.store.load().await.unwrap().unwrap();
    assert_eq!(saved.timelines[0].milestone_count(), 16);
}

#[tokio::test]
async fn test_invalid_branch_response_leaves_timeline_untouched() {
    let app = test_app(3);
    let timeline = create_timeline(&app, "Marie Curie").await;
    let id = timeline["id"].as_str().unwrap();

    let (status, body) = send(
        &app.router,
        Method::POST,
        &format!("/api/timelines/{}/branches", id),
        Some(json!({ "parentId": node_id(&timeline, 2), "alternateScenario": "What if she stayed in Warsaw?" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request format"));

    let (_, fetched) = send(&app.router, Method::GET, &format!("/api/timelines/{}", id), None).await;
    assert_eq!(fetched["data"]["milestoneCount"], 10);
    assert_eq!(fetched["data"]["version"], 0);
}

#[tokio::test]
async fn test_stale_expected_version_is_conflict() {
    let app = test_app(5);
    let timeline = create_timeline(&app, "Marie Curie").await;
    let id = timeline["id"].as_str().unwrap();

    let (status, _) = send(
        &app.router,
        Method::POST,
        &format!("/api/timelines/{}/branches", id),
        Some(json!({
            "parentId": node_id(&timeline, 2),
            "alternateScenario": "What if she stayed in Warsaw?",
            "expectedVersion": 7
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(app.provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_generate_branch_depth_limit() {
    let app = test_app(5);

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/generate-branch",
        Some(json!({
            "parentNodeId": "n10",
            "parentTimeline": [{ "date": "1900", "title": "Deep" }],
            "alternateScenario": "What if it rained?",
            "depth": 10
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Maximum branching depth (10) reached");
    assert_eq!(app.provider.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_generate_timeline_reports_cache_hits() {
    let app = test_app(5);
    let request = json!({ "person": "Ada Lovelace" });

    let (status, first) = send(&app.router, Method::POST, "/api/generate-timeline", Some(request.clone())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["cached"], false);
    assert_eq!(first["data"]["milestones"].as_array().unwrap().len(), 10);

    let (_, second) = send(&app.router, Method::POST, "/api/generate-timeline", Some(request)).await;
    assert_eq!(second["cached"], true);
    assert_eq!(app.provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let app = test_app(5);

    let (status, body) = send(&app.router, Method::POST, "/api/generate-timeline", Some(json!({ "name": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid request format"));

    let (status, _) = send(&app.router, Method::POST, "/api/generate-timeline", Some(json!({ "person": "X" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_missing_credential_is_configuration_error() {
    let (router, _) = test_app_with(Arc::new(LlmProvider::unconfigured(ProviderType::Anthropic)));

    let (status, body) = send(
        &router,
        Method::POST,
        "/api/generate-timeline",
        Some(json!({ "person": "Ada Lovelace" })),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Server configuration error. Please contact support.");
}

#[tokio::test]
async fn test_node_operations() {
    let app = test_app(5);
    let timeline = create_timeline(&app, "Marie Curie").await;
    let id = timeline["id"].as_str().unwrap();
    let target = node_id(&timeline, 3);

    let (status, body) = send(
        &app.router,
        Method::POST,
        &format!("/api/timelines/{}/nodes/{}/select", id, target),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 4);

    let (_, body) = send(
        &app.router,
        Method::POST,
        &format!("/api/timelines/{}/nodes/{}/collapse", id, target),
        None,
    )
    .await;
    assert_eq!(body["data"]["expanded"], false);

    let (_, body) = send(
        &app.router,
        Method::GET,
        &format!("/api/timelines/{}/nodes/{}/path", id, target),
        None,
    )
    .await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Event 0", "Event 1", "Event 2", "Event 3"]);

    let (_, body) = send(
        &app.router,
        Method::GET,
        &format!("/api/timelines/{}/layout?width=1024", id),
        None,
    )
    .await;
    assert_eq!(body["data"]["edges"].as_array().unwrap().len(), 9);
    assert_eq!(body["data"]["positions"].as_object().unwrap().len(), 10);
    assert_eq!(body["data"]["dates"][&target], "1870");

    let (status, body) = send(
        &app.router,
        Method::DELETE,
        &format!("/api/timelines/{}/nodes/{}", id, target),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"].as_array().unwrap().len(), 7);
    assert_eq!(body["data"]["milestoneCount"], 3);

    let (_, fetched) = send(&app.router, Method::GET, &format!("/api/timelines/{}", id), None).await;
    assert_eq!(fetched["data"]["currentPath"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = test_app(5);
    let timeline = create_timeline(&app, "Marie Curie").await;
    let id = timeline["id"].as_str().unwrap();

    let (status, _) = send(&app.router, Method::GET, "/api/timelines/missing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        Method::DELETE,
        &format!("/api/timelines/{}/nodes/missing", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, fetched) = send(&app.router, Method::GET, &format!("/api/timelines/{}", id), None).await;
    assert_eq!(fetched["data"]["milestoneCount"], 10);
}

#[tokio::test]
async fn test_delete_timeline_reselects() {
    let app = test_app(5);
    let first = create_timeline(&app, "Marie Curie").await;
    let second = create_timeline(&app, "Ada Lovelace").await;

    let (status, body) = send(
        &app.router,
        Method::DELETE,
        &format!("/api/timelines/{}", second["id"].as_str().unwrap()),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["currentTimelineId"], first["id"]);

    let saved = app.store.load().await.unwrap().unwrap();
    assert_eq!(saved.timelines.len(), 1);
}

#[tokio::test]
async fn test_timeline_keyed_on_resolved_name() {
    let app = test_app_from(FakeProvider::resolving_to("Albert Einstein"));

    let first = create_timeline(&app, "einstein").await;
    assert_eq!(first["person"], "Albert Einstein");

    let (status, body) = send(
        &app.router,
        Method::POST,
        "/api/timelines",
        Some(json!({ "person": "Albert Einstein" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["cached"], true);
    assert_eq!(body["data"]["id"], first["id"]);
    assert_eq!(app.provider.calls.load(Ordering::SeqCst), 1);

    // a different spelling that resolves to the same person switches too
    let (status, body) = send(&app.router, Method::POST, "/api/timelines", Some(json!({ "person": "A. Einstein" }))).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["id"], first["id"]);
    assert_eq!(app.provider.calls.load(Ordering::SeqCst), 2);

    let (_, list) = send(&app.router, Method::GET, "/api/timelines", None).await;
    assert_eq!(list["data"].as_array().unwrap().len(), 1);
}
