//! Common types shared by the adapters, the gateway and the dispatch engine

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Untyped argument bag proposed by a model for one tool call.
///
/// Only the dispatch engine interprets these; adapters pass them through.
pub type ArgumentMap = serde_json::Map<String, Value>;

/// Model backend selected at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local model service (Ollama)
    Ollama,
    /// Cloud model service (Mistral)
    Mistral,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Ollama => write!(f, "ollama"),
            ProviderKind::Mistral => write!(f, "mistral"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "mistral" => Ok(ProviderKind::Mistral),
            other => Err(Error::UnsupportedProvider(other.to_string())),
        }
    }
}

/// Conversation role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One turn of dialogue context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered turns submitted to a model backend.
///
/// Always starts with exactly one system turn and ends with the new user
/// turn, so it never holds fewer than two turns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
}

impl Conversation {
    /// Build `system + history + user`.
    ///
    /// System turns found in `history` are dropped so the operating
    /// instructions appear exactly once.
    pub fn assemble(
        system_prompt: impl Into<String>,
        history: &[ConversationTurn],
        user_message: impl Into<String>,
    ) -> Self {
        let mut turns = Vec::with_capacity(history.len() + 2);
        turns.push(ConversationTurn::system(system_prompt));
        turns.extend(
            history
                .iter()
                .filter(|turn| turn.role != Role::System)
                .cloned(),
        );
        turns.push(ConversationTurn::user(user_message));
        Self { turns }
    }

    /// Accept an externally built turn list, checking the shape.
    pub fn from_turns(turns: Vec<ConversationTurn>) -> Result<Self> {
        if turns.len() < 2 {
            return Err(Error::InvalidConversation(format!(
                "expected at least 2 turns, got {}",
                turns.len()
            )));
        }
        if turns[0].role != Role::System {
            return Err(Error::InvalidConversation(
                "first turn must be the system prompt".to_string(),
            ));
        }
        if turns[1..].iter().any(|t| t.role == Role::System) {
            return Err(Error::InvalidConversation(
                "only one system turn is allowed".to_string(),
            ));
        }
        Ok(Self { turns })
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Content of the final user turn
    pub fn latest_user_message(&self) -> &str {
        self.turns
            .iter()
            .rev()
            .find(|t| t.role == Role::User)
            .map(|t| t.content.as_str())
            .unwrap_or_default()
    }
}

/// A tool call proposed by a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub id: String,
    pub tool_name: String,
    #[serde(default)]
    pub arguments: ArgumentMap,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, arguments: ArgumentMap) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            tool_name: tool_name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Token usage reported by a model backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
            duration_ms: None,
        }
    }
}

/// Backend-agnostic model reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedModelResponse {
    pub narrative: String,
    #[serde(default)]
    pub invocations: Vec<ToolInvocation>,
    pub model: String,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl NormalizedModelResponse {
    /// Text-only reply
    pub fn text(model: impl Into<String>, narrative: impl Into<String>) -> Self {
        Self {
            narrative: narrative.into(),
            invocations: Vec::new(),
            model: model.into(),
            usage: TokenUsage::default(),
        }
    }

    pub fn with_invocation(mut self, invocation: ToolInvocation) -> Self {
        self.invocations.push(invocation);
        self
    }

    pub fn with_usage(mut self, usage: TokenUsage) -> Self {
        self.usage = usage;
        self
    }

    pub fn has_invocations(&self) -> bool {
        !self.invocations.is_empty()
    }
}
