use async_trait::async_trait;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use whatif_generation::{
    BranchPrompt, BranchRequest, GenerationError, GenerationGateway, GenerationProvider, LlmProvider,
    TimelineRequest,
};
use whatif_llm::ProviderType;
use whatif_tree::TimelineManager;

/// Replies with canned text and counts calls
struct FakeProvider {
    timeline_reply: String,
    branch_reply: String,
    calls: AtomicUsize,
    last_branch: Mutex<Option<BranchPrompt>>,
}

impl FakeProvider {
    fn new(timeline_reply: String, branch_reply: String) -> Self {
        Self {
            timeline_reply,
            branch_reply,
            calls: AtomicUsize::new(0),
            last_branch: Mutex::new(None),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationProvider for FakeProvider {
    async fn generate_timeline(&self, _person: &str, _context: Option<&str>) -> whatif_generation::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.timeline_reply.clone())
    }

    async fn generate_branch(&self, prompt: &BranchPrompt) -> whatif_generation::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_branch.lock().unwrap() = Some(prompt.clone());
        Ok(self.branch_reply.clone())
    }
}

fn milestones_json(n: usize) -> serde_json::Value {
    json!((0..n)
        .map(|i| json!({
            "date": format!("{}", 1867 + i),
            "title": format!("Event {}", i),
            "description": "Something happened.",
            "impact": "It mattered.",
            "keyFigures": []
        }))
        .collect::<Vec<_>>())
}

fn timeline_reply(n: usize) -> String {
    json!({ "person": "Marie Curie", "milestones": milestones_json(n) }).to_string()
}

fn branch_reply(n: usize) -> String {
    format!("```json\n{}\n```", json!({ "milestones": milestones_json(n) }))
}

fn gateway(provider: Arc<FakeProvider>) -> GenerationGateway {
    GenerationGateway::new(provider)
}

#[tokio::test]
async fn test_timeline_is_cached_after_first_success() {
    let provider = Arc::new(FakeProvider::new(timeline_reply(10), branch_reply(5)));
    let gateway = gateway(provider.clone());

    let first = gateway.timeline(&TimelineRequest::new("Marie Curie")).await.unwrap();
    assert!(!first.cached);
    assert_eq!(first.data.milestones.len(), 10);

    let second = gateway.timeline(&TimelineRequest::new("  marie curie ")).await.unwrap();
    assert!(second.cached);
    assert_eq!(second.data, first.data);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_invalid_branch_is_not_cached_and_store_is_untouched() {
    let provider = Arc::new(FakeProvider::new(timeline_reply(10), branch_reply(3)));
    let gateway = gateway(provider.clone());

    let mut manager = TimelineManager::new();
    let timeline = gateway.timeline(&TimelineRequest::new("Marie Curie")).await.unwrap();
    manager.save("Marie Curie", timeline.data.milestones).unwrap();

    let current = manager.current().unwrap();
    let leaf_id = current.nodes().ids()[9].clone();
    let before = serde_json::to_value(manager.state()).unwrap();

    let path = manager.current_node_path(&leaf_id);
    let request = BranchRequest::from_path(&path, "What if she had stayed in Poland?")
        .unwrap()
        .with_person("Marie Curie");

    let err = gateway.branch(&request).await.unwrap_err();
    assert!(matches!(err, GenerationError::Validation(_)));
    assert_eq!(serde_json::to_value(manager.state()).unwrap(), before);
    assert_eq!(gateway.cache().stats().total_entries, 1);

    // A failed response is asked for again rather than served from cache
    let _ = gateway.branch(&request).await;
    assert_eq!(provider.calls(), 3);
}

#[tokio::test]
async fn test_branch_prompt_built_from_last_five_path_entries() {
    let provider = Arc::new(FakeProvider::new(timeline_reply(10), branch_reply(6)));
    let gateway = gateway(provider.clone());

    let mut manager = TimelineManager::new();
    let timeline = gateway.timeline(&TimelineRequest::new("Marie Curie")).await.unwrap();
    manager.save("Marie Curie", timeline.data.milestones).unwrap();
    let leaf_id = manager.current().unwrap().nodes().ids()[9].clone();

    let path = manager.current_node_path(&leaf_id);
    let request = BranchRequest::from_path(&path, "What if she had stayed in Poland?")
        .unwrap()
        .with_person("Marie Curie");
    let branch = gateway.branch(&request).await.unwrap();
    assert!(!branch.cached);

    let prompt = provider.last_branch.lock().unwrap().clone().unwrap();
    assert_eq!(prompt.person, "Marie Curie");
    assert_eq!(prompt.context.lines().count(), 5);
    assert!(prompt.context.starts_with("1872: Event 5"));
    assert_eq!(prompt.branch_point, "1876: Event 9");

    let new_ids = manager
        .branch(&leaf_id, branch.data.milestones, &request.alternate_scenario)
        .unwrap();
    assert_eq!(new_ids.len(), 6);
    assert_eq!(manager.current().unwrap().milestone_count(), 16);

    let again = gateway.branch(&request).await.unwrap();
    assert!(again.cached);
}

#[tokio::test]
async fn test_depth_limit_rejected_before_provider() {
    let provider = Arc::new(FakeProvider::new(timeline_reply(10), branch_reply(5)));
    let gateway = gateway(provider.clone());

    let mut manager = TimelineManager::new();
    manager
        .save("Marie Curie", serde_json::from_value(milestones_json(11)).unwrap())
        .unwrap();
    let deepest = manager.current().unwrap().nodes().ids()[10].clone();
    let request = BranchRequest::from_path(&manager.current_node_path(&deepest), "What if it rained?").unwrap();

    let err = gateway.branch(&request).await.unwrap_err();
    assert_eq!(err.to_string(), "Maximum branching depth (10) reached");
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_missing_credential_surfaces_configuration_error() {
    let gateway = GenerationGateway::new(Arc::new(LlmProvider::unconfigured(ProviderType::Anthropic)));

    let err = gateway.timeline(&TimelineRequest::new("Ada Lovelace")).await.unwrap_err();
    assert!(matches!(err, GenerationError::Configuration(_)));
    assert!(!err.is_retryable());
    assert_eq!(gateway.cache().stats().total_entries, 0);
}
