//! Model Adapter Trait and Types
//!
//! Every backend translates its own wire shape into a
//! [`NormalizedModelResponse`]. Nothing past this boundary knows which
//! backend produced a reply.

use std::sync::Arc;

use async_trait::async_trait;
use avi_core::{
    AgentConfig, CallContext, Conversation, ModelDefaults, NormalizedModelResponse, ProviderKind,
    Result,
};
use avi_tools::ToolCatalog;
use tracing::info;

use crate::mistral::MistralAdapter;
use crate::ollama::OllamaAdapter;

/// One chat completion request
#[derive(Debug, Clone, Copy)]
pub struct ModelQuery<'a> {
    pub conversation: &'a Conversation,
    pub catalog: &'a ToolCatalog,
    /// Falls back to the configured default model
    pub model: Option<&'a str>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl<'a> ModelQuery<'a> {
    pub fn new(conversation: &'a Conversation, catalog: &'a ToolCatalog) -> Self {
        Self {
            conversation,
            catalog,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_model(mut self, model: &'a str) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Fill omitted settings from the adapter's defaults
    pub fn resolve(&self, defaults: &ModelDefaults) -> ResolvedQuery {
        ResolvedQuery {
            model: self
                .model
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(&defaults.model)
                .to_string(),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
        }
    }
}

/// Settings actually sent upstream
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedQuery {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Capability contract shared by the model backends
#[async_trait]
pub trait ModelAdapter: Send + Sync {
    fn provider(&self) -> ProviderKind;

    /// Model used when a request names none
    fn default_model(&self) -> &str;

    /// Send the conversation and the tool catalog, normalize the reply.
    ///
    /// Text-only replies are valid and carry zero invocations.
    async fn submit_query(
        &self,
        ctx: &CallContext,
        query: ModelQuery<'_>,
    ) -> Result<NormalizedModelResponse>;

    async fn list_available_models(&self, ctx: &CallContext) -> Result<Vec<String>>;

    async fn validate_model(&self, ctx: &CallContext, model: &str) -> Result<bool> {
        let models = self.list_available_models(ctx).await?;
        Ok(models.iter().any(|m| m == model))
    }
}

/// Shared adapter held by the orchestrator
pub type BoxedAdapter = Arc<dyn ModelAdapter>;

/// Build the adapter for the configured provider.
pub fn build_adapter(config: &AgentConfig) -> Result<BoxedAdapter> {
    let adapter: BoxedAdapter = match config.provider_kind()? {
        ProviderKind::Ollama => Arc::new(OllamaAdapter::new(&config.ollama)?),
        ProviderKind::Mistral => Arc::new(MistralAdapter::new(&config.mistral)?),
    };
    info!(
        provider = %adapter.provider(),
        model = adapter.default_model(),
        "Model adapter ready"
    );
    Ok(adapter)
}
