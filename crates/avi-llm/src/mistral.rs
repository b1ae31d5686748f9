//! Mistral AI Adapter (cloud model service)
//!
//! ## API Endpoints
//!
//! | Endpoint | URL | Purpose |
//! |----------|-----|---------|
//! | API | `https://api.mistral.ai` | Default base URL |
//! | Chat | `/v1/chat/completions` | Chat completions with tools |
//! | Models | `/v1/models` | Available models |
//!
//! ## Authentication
//! - Header: `Authorization: Bearer {MISTRAL_API_KEY}`
//!
//! Tool calls come back as a structured list on the first choice, with
//! arguments either as a JSON-encoded string or an inline object.

use async_trait::async_trait;
use avi_core::config::MistralConfig;
use avi_core::{
    ArgumentMap, CallContext, Error, ModelDefaults, NormalizedModelResponse, ProviderKind, Result,
    TokenUsage, ToolInvocation,
};
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::http::{self, WireMessage};
use crate::provider::{ModelAdapter, ModelQuery};

// =============================================================================
// API ENDPOINT CONFIGURATION
// =============================================================================

pub mod endpoints {
    pub const DEFAULT_API: &str = "https://api.mistral.ai";

    /// Full URL: {API}/v1/chat/completions
    pub const CHAT: &str = "/v1/chat/completions";

    /// Full URL: {API}/v1/models
    pub const MODELS: &str = "/v1/models";
}

// =============================================================================
// DATA STRUCTURES
// =============================================================================

#[derive(Debug, Serialize)]
struct MistralChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    tools: Vec<Value>,
    tool_choice: &'static str,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MistralChatResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<MistralChoice>,
    #[serde(default)]
    usage: Option<MistralUsage>,
}

#[derive(Debug, Deserialize)]
struct MistralChoice {
    #[serde(default)]
    message: MistralMessage,
    /// Older replies put tool calls beside the message
    #[serde(default)]
    tool_calls: Option<Vec<MistralToolCall>>,
}

#[derive(Debug, Default, Deserialize)]
struct MistralMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<MistralToolCall>>,
}

#[derive(Debug, Deserialize)]
struct MistralToolCall {
    #[serde(default)]
    id: Option<String>,
    function: MistralFunction,
}

#[derive(Debug, Deserialize)]
struct MistralFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct MistralUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct MistralModelsResponse {
    #[serde(default)]
    data: Vec<MistralModel>,
}

#[derive(Debug, Deserialize)]
struct MistralModel {
    id: String,
}

/// Tool arguments as an object, whichever way they were encoded.
///
/// Malformed arguments yield an empty map so the dispatch engine reports the
/// missing fields instead of the whole reply failing.
fn decode_arguments(tool: &str, raw: Value) -> ArgumentMap {
    match raw {
        Value::Object(map) => map,
        Value::Null => ArgumentMap::new(),
        Value::String(text) if text.trim().is_empty() => ArgumentMap::new(),
        Value::String(text) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            _ => {
                warn!(tool, "Discarding undecodable tool arguments: {}", text);
                ArgumentMap::new()
            }
        },
        other => {
            warn!(tool, "Discarding non-object tool arguments: {}", other);
            ArgumentMap::new()
        }
    }
}

fn to_invocation(call: MistralToolCall) -> ToolInvocation {
    let arguments = decode_arguments(&call.function.name, call.function.arguments);
    let invocation = ToolInvocation::new(call.function.name, arguments);
    match call.id {
        Some(id) if !id.is_empty() => invocation.with_id(id),
        _ => invocation,
    }
}

fn normalize(model: &str, reply: MistralChatResponse) -> Result<NormalizedModelResponse> {
    let choice = reply
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::upstream("no choices returned from Mistral"))?;

    let calls = choice
        .message
        .tool_calls
        .filter(|c| !c.is_empty())
        .or(choice.tool_calls)
        .unwrap_or_default();

    let usage = reply
        .usage
        .map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens.max(u.prompt_tokens.saturating_add(u.completion_tokens)),
            duration_ms: None,
        })
        .unwrap_or_default();

    Ok(NormalizedModelResponse {
        narrative: choice.message.content.unwrap_or_default(),
        invocations: calls.into_iter().map(to_invocation).collect(),
        model: reply.model.unwrap_or_else(|| model.to_string()),
        usage,
    })
}

// =============================================================================
// ADAPTER
// =============================================================================

pub struct MistralAdapter {
    client: Client,
    api_key: String,
    base_url: String,
    defaults: ModelDefaults,
}

impl MistralAdapter {
    /// Fails when no API key is configured.
    pub fn new(config: &MistralConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::config("mistral.api_key is required for the mistral provider"))?;
        let defaults = config.defaults();
        let base_url = if config.api_base_url.trim().is_empty() {
            endpoints::DEFAULT_API.to_string()
        } else {
            http::base_url(&config.api_base_url)
        };

        Ok(Self {
            client: http::build_client(defaults.timeout)?,
            api_key,
            base_url,
            defaults,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

#[async_trait]
impl ModelAdapter for MistralAdapter {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Mistral
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
        let request = MistralChatRequest {
            model: &resolved.model,
            messages: http::wire_messages(query.conversation),
            tools: query.catalog.function_definitions(),
            tool_choice: "auto",
            temperature: resolved.temperature,
            max_tokens: resolved.max_tokens,
        };

        debug!(
            model = %resolved.model,
            turns = query.conversation.len(),
            "Sending Mistral chat request"
        );
        let builder = self
            .client
            .post(&url)
            .header(AUTHORIZATION, self.bearer())
            .json(&request);
        let reply: MistralChatResponse = http::exchange(ctx, builder, &url).await?;

        let normalized = normalize(&resolved.model, reply)?;
        info!(
            model = %normalized.model,
            invocations = normalized.invocations.len(),
            tokens = normalized.usage.total_tokens,
            "Mistral reply normalized"
        );
        Ok(normalized)
    }

    async fn list_available_models(&self, ctx: &CallContext) -> Result<Vec<String>> {
        let url = format!("{}{}", self.base_url, endpoints::MODELS);
        let builder = self.client.get(&url).header(AUTHORIZATION, self.bearer());
        let models: MistralModelsResponse = http::exchange(ctx, builder, &url).await?;
        debug!("Fetched {} models from Mistral", models.data.len());
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(value: Value) -> MistralChatResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_string_and_object_arguments() {
        let normalized = normalize(
            "mistral-tiny",
            reply(json!({
                "model": "mistral-small",
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [
                            {"id": "abc", "function": {"name": "get_pool", "arguments": "{\"uuid\": \"p1\"}"}},
                            {"function": {"name": "list_pools", "arguments": {"name": "web"}}}
                        ]
                    }
                }],
                "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
            })),
        )
        .unwrap();

        assert_eq!(normalized.model, "mistral-small");
        assert_eq!(normalized.narrative, "");
        assert_eq!(normalized.invocations[0].id, "abc");
        assert_eq!(normalized.invocations[0].arguments["uuid"], "p1");
        assert_eq!(normalized.invocations[1].arguments["name"], "web");
        assert_eq!(normalized.usage.total_tokens, 15);
    }

    #[test]
    fn test_oversized_usage_saturates() {
        let normalized = normalize(
            "mistral-tiny",
            reply(json!({
                "choices": [{"message": {"content": "ok"}}],
                "usage": {"prompt_tokens": u32::MAX, "completion_tokens": 10, "total_tokens": 0}
            })),
        )
        .unwrap();
        assert_eq!(normalized.usage.total_tokens, u32::MAX);
    }

    #[test]
    fn test_choice_level_tool_calls() {
        let normalized = normalize(
            "mistral-tiny",
            reply(json!({
                "choices": [{
                    "message": {"content": "Looking that up."},
                    "tool_calls": [{"function": {"name": "list_virtual_services", "arguments": ""}}]
                }]
            })),
        )
        .unwrap();
        assert_eq!(normalized.model, "mistral-tiny");
        assert_eq!(normalized.narrative, "Looking that up.");
        assert_eq!(normalized.invocations.len(), 1);
        assert!(normalized.invocations[0].arguments.is_empty());
    }

    #[test]
    fn test_malformed_arguments_keep_invocation() {
        let args = decode_arguments("get_pool", json!("{uuid:"));
        assert!(args.is_empty());
        let args = decode_arguments("get_pool", json!([1, 2]));
        assert!(args.is_empty());
    }

    #[test]
    fn test_no_choices_is_upstream_error() {
        let err = normalize("mistral-tiny", reply(json!({"choices": []}))).unwrap_err();
        assert!(matches!(err, Error::UpstreamModel { status: None, .. }));
    }

    #[test]
    fn test_api_key_required() {
        let config = MistralConfig {
            api_base_url: endpoints::DEFAULT_API.to_string(),
            api_key: Some("   ".to_string()),
            default_model: "mistral-tiny".to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            timeout_secs: 60,
        };
        assert!(matches!(MistralAdapter::new(&config), Err(Error::Config(_))));
    }
}
