pub mod error;
pub mod request;
pub mod prompts;
pub mod validation;
pub mod cache;
pub mod provider;
pub mod gateway;

pub use error::{GenerationError, Result};
pub use request::{
    BranchRequest, BranchResponse, Generated, GenerationKind, PathEntry, TimelineRequest, TimelineResponse,
};
pub use prompts::{BranchPrompt, BRANCH_SYSTEM_PROMPT, TIMELINE_SYSTEM_PROMPT};
pub use validation::{
    parse_branch_response, parse_timeline_response, strip_code_fence, validate_branch_request,
    validate_timeline_request, BRANCH_MILESTONES, TIMELINE_MILESTONES,
};
pub use cache::{branch_cache_key, timeline_cache_key, CacheStats, ResponseCache, DEFAULT_CACHE_TTL};
pub use provider::{GenerationProvider, GenerationSettings, LlmProvider, DEFAULT_MODEL};
pub use gateway::GenerationGateway;
