use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::cache::{branch_cache_key, timeline_cache_key, ResponseCache};
use crate::error::{GenerationError, Result};
use crate::prompts::BranchPrompt;
use crate::provider::GenerationProvider;
use crate::request::{BranchRequest, BranchResponse, Generated, TimelineRequest, TimelineResponse};
use crate::validation::{
    parse_branch_response, parse_timeline_response, validate_branch_request, validate_timeline_request,
};

/// Turns requests into validated milestone lists.
///
/// Only responses that pass validation are cached, and nothing returned from
/// here can break the tree's invariants.
#[derive(Clone)]
pub struct GenerationGateway {
    provider: Arc<dyn GenerationProvider>,
    cache: ResponseCache,
}

impl GenerationGateway {
    pub fn new(provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            provider,
            cache: ResponseCache::default(),
        }
    }

    pub fn with_cache(mut self, cache: ResponseCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    pub async fn timeline(&self, request: &TimelineRequest) -> Result<Generated<TimelineResponse>> {
        validate_timeline_request(request)?;

        let key = timeline_cache_key(&request.person);
        if let Some(data) = self.cached::<TimelineResponse>(&key) {
            tracing::debug!(person = %request.person, "Cache hit for timeline");
            return Ok(Generated { data, cached: true });
        }

        tracing::info!(person = %request.person, "Generating timeline");
        let raw = self
            .provider
            .generate_timeline(request.person.trim(), request.context.as_deref())
            .await?;
        let data = parse_timeline_response(&raw)?;

        self.store(key, &data);
        Ok(Generated { data, cached: false })
    }

    pub async fn branch(&self, request: &BranchRequest) -> Result<Generated<BranchResponse>> {
        validate_branch_request(request)?;

        let key = branch_cache_key(&request.parent_node_id, &request.alternate_scenario);
        if let Some(data) = self.cached::<BranchResponse>(&key) {
            tracing::debug!(parent_node_id = %request.parent_node_id, "Cache hit for branch");
            return Ok(Generated { data, cached: true });
        }

        let prompt = BranchPrompt::from_request(request)
            .ok_or_else(|| GenerationError::Validation("parentTimeline must contain the branch point".to_string()))?;

        tracing::info!(
            parent_node_id = %request.parent_node_id,
            depth = request.depth,
            "Generating branch"
        );
        let raw = self.provider.generate_branch(&prompt).await?;
        let data = parse_branch_response(&raw)?;

        self.store(key, &data);
        Ok(Generated { data, cached: false })
    }

    /// A cached entry that no longer decodes is dropped and treated as a miss
    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(key)?;
        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Discarding undecodable cache entry");
                self.cache.invalidate(key);
                None
            }
        }
    }

    fn store<T: Serialize>(&self, key: String, data: &T) {
        match serde_json::to_value(data) {
            Ok(value) => self.cache.set(key, value),
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to cache response"),
        }
    }
}
