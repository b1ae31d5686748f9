//! Ollama Adapter (local model service)
//!
//! ## API Endpoints
//!
//! | Endpoint | URL | Purpose |
//! |----------|-----|---------|
//! | Local API | `http://localhost:11434` | Default host |
//! | Chat | `/api/chat` | Chat completions |
//! | Models | `/api/tags` | Installed models |
//!
//! The reply is a single assistant message. A tool choice arrives either as
//! native `tool_calls` or as a JSON object embedded in the message text:
//! `{"tool": "...", "parameters": {...}}`. Anything else is plain narrative.

use async_trait::async_trait;
use avi_core::config::OllamaConfig;
use avi_core::{
    ArgumentMap, CallContext, ModelDefaults, NormalizedModelResponse, ProviderKind, Result,
    TokenUsage, ToolInvocation,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::http::{self, WireMessage};
use crate::provider::{ModelAdapter, ModelQuery};

// =============================================================================
// API ENDPOINT CONFIGURATION
// =============================================================================

pub mod endpoints {
    /// Local API URL (default)
    pub const LOCAL_API: &str = "http://localhost:11434";

    /// Full URL: {API}/api/chat
    pub const CHAT: &str = "/api/chat";

    /// Full URL: {API}/api/tags
    pub const TAGS: &str = "/api/tags";
}

// =============================================================================
// DATA STRUCTURES
// =============================================================================

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    tools: Vec<Value>,
    stream: bool,
    options: OllamaChatOptions,
}

#[derive(Debug, Serialize)]
struct OllamaChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    message: OllamaMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
    /// Nanoseconds
    #[serde(default)]
    total_duration: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<OllamaToolCall>,
}

#[derive(Debug, Deserialize)]
struct OllamaToolCall {
    function: OllamaFunction,
}

#[derive(Debug, Deserialize)]
struct OllamaFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

// =============================================================================
// EMBEDDED TOOL CALLS
// =============================================================================

/// Find a `{"tool": ..., "parameters": ...}` object in assistant text.
///
/// Accepts the whole trimmed message or the first fenced ```json block.
/// Returns `None` for anything else; never fails.
pub fn extract_embedded_invocation(content: &str) -> Option<ToolInvocation> {
    let trimmed = content.trim();
    parse_tool_object(trimmed).or_else(|| fenced_json(trimmed).and_then(parse_tool_object))
}

fn fenced_json(text: &str) -> Option<&str> {
    const FENCE: &str = "```json";
    let start = text.find(FENCE)? + FENCE.len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

fn parse_tool_object(text: &str) -> Option<ToolInvocation> {
    if !text.starts_with('{') {
        return None;
    }
    let value: Value = serde_json::from_str(text).ok()?;
    let tool = value.get("tool")?.as_str()?.trim();
    if tool.is_empty() {
        return None;
    }
    let arguments = match value.get("parameters") {
        Some(Value::Object(map)) => map.clone(),
        _ => ArgumentMap::new(),
    };
    Some(ToolInvocation::new(tool, arguments))
}

fn native_invocations(calls: Vec<OllamaToolCall>) -> Vec<ToolInvocation> {
    calls
        .into_iter()
        .map(|call| {
            let arguments = match call.function.arguments {
                Value::Object(map) => map,
                _ => ArgumentMap::new(),
            };
            ToolInvocation::new(call.function.name, arguments)
        })
        .collect()
}

// =============================================================================
// ADAPTER
// =============================================================================

pub struct OllamaAdapter {
    client: Client,
    base_url: String,
    defaults: ModelDefaults,
}

impl OllamaAdapter {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        let defaults = config.defaults();
        Ok(Self {
            client: http::build_client(defaults.timeout)?,
            base_url: http::base_url(&config.host),
            defaults,
        })
    }

    /// Local instance on the default port
    pub fn local(defaults: ModelDefaults) -> Result<Self> {
        Ok(Self {
            client: http::build_client(defaults.timeout)?,
            base_url: endpoints::LOCAL_API.to_string(),
            defaults,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn normalize(&self, model: &str, reply: OllamaChatResponse) -> NormalizedModelResponse {
        let mut usage = TokenUsage::new(
            reply.prompt_eval_count.unwrap_or(0),
            reply.eval_count.unwrap_or(0),
        );
        usage.duration_ms = reply.total_duration.map(|ns| ns / 1_000_000);

        let OllamaMessage { content, tool_calls } = reply.message;
        let invocations = if tool_calls.is_empty() {
            extract_embedded_invocation(&content).into_iter().collect()
        } else {
            native_invocations(tool_calls)
        };

        NormalizedModelResponse {
            narrative: content,
            invocations,
            model: reply.model.unwrap_or_else(|| model.to_string()),
            usage,
        }
    }
}

#[async_trait]
impl ModelAdapter for OllamaAdapter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn default_model(&self) -> &str {
        &self.defaults.model
    }

    async fn submit_query(
        &self,
        ctx: &CallContext,
        query: ModelQuery<'_>,
    ) -> Result<NormalizedModelResponse> {
        let resolved = query.resolve(&self.defaults);
        let url = format!("{}{}", self.base_url, endpoints::CHAT);
        let request = OllamaChatRequest {
            model: &resolved.model,
            messages: http::wire_messages(query.conversation),
            tools: query.catalog.function_definitions(),
            stream: false,
            options: OllamaChatOptions {
                temperature: resolved.temperature,
                num_predict: resolved.max_tokens,
            },
        };

        debug!(
            model = %resolved.model,
            turns = query.conversation.len(),
            "Sending Ollama chat request"
        );
        let reply: OllamaChatResponse =
            http::exchange(ctx, self.client.post(&url).json(&request), &url).await?;

        let normalized = self.normalize(&resolved.model, reply);
        info!(
            model = %normalized.model,
            invocations = normalized.invocations.len(),
            tokens = normalized.usage.total_tokens,
            "Ollama reply normalized"
        );
        Ok(normalized)
    }

    async fn list_available_models(&self, ctx: &CallContext) -> Result<Vec<String>> {
        let url = format!("{}{}", self.base_url, endpoints::TAGS);
        let tags: OllamaTagsResponse = http::exchange(ctx, self.client.get(&url), &url).await?;
        debug!("Fetched {} models from Ollama", tags.models.len());
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }
}
