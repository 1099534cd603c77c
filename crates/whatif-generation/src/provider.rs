use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use whatif_llm::{ChatClient, ChatOptions, ChatRequest, Message, ProviderType};

use crate::error::{GenerationError, Result};
use crate::prompts::{timeline_user_message, BranchPrompt, BRANCH_SYSTEM_PROMPT, TIMELINE_SYSTEM_PROMPT};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";

/// Source of raw, unvalidated generation text.
///
/// The gateway owns validation and caching, so implementations only talk to
/// the model.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate_timeline(&self, person: &str, context: Option<&str>) -> Result<String>;

    async fn generate_branch(&self, prompt: &BranchPrompt) -> Result<String>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: String,
    pub timeline_max_tokens: u32,
    pub branch_max_tokens: u32,
    pub temperature: Option<f32>,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            timeline_max_tokens: 4096,
            branch_max_tokens: 3072,
            temperature: None,
        }
    }
}

/// [`GenerationProvider`] backed by a chat client.
///
/// Built without a client when no credential is configured; every request
/// then fails with a configuration error instead of the server refusing to
/// start.
pub struct LlmProvider {
    client: Option<Arc<dyn ChatClient>>,
    provider: ProviderType,
    settings: GenerationSettings,
}

impl LlmProvider {
    pub fn new(client: Arc<dyn ChatClient>, provider: ProviderType) -> Self {
        Self {
            client: Some(client),
            provider,
            settings: GenerationSettings::default(),
        }
    }

    pub fn unconfigured(provider: ProviderType) -> Self {
        Self {
            client: None,
            provider,
            settings: GenerationSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    async fn complete(&self, system: &str, user: String, max_tokens: u32) -> Result<String> {
        let client = self.client.as_ref().ok_or_else(|| {
            GenerationError::Configuration(format!(
                "{} is not set in environment variables",
                self.provider.api_key_env()
            ))
        })?;

        let mut options = ChatOptions::new().max_tokens(max_tokens);
        if let Some(temperature) = self.settings.temperature {
            options = options.temperature(temperature);
        }

        let request = ChatRequest::new(
            self.settings.model.clone(),
            vec![Message::system(system), Message::human(user)],
        )
        .with_options(options);

        let response = client.chat(request).await?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "Generation completed"
            );
        }

        response
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| GenerationError::Provider(anyhow::anyhow!("Unexpected response type from model")))
    }
}

#[async_trait]
impl GenerationProvider for LlmProvider {
    async fn generate_timeline(&self, person: &str, context: Option<&str>) -> Result<String> {
        self.complete(
            TIMELINE_SYSTEM_PROMPT,
            timeline_user_message(person, context),
            self.settings.timeline_max_tokens,
        )
        .await
    }

    async fn generate_branch(&self, prompt: &BranchPrompt) -> Result<String> {
        self.complete(BRANCH_SYSTEM_PROMPT, prompt.user_message(), self.settings.branch_max_tokens)
            .await
    }
}
