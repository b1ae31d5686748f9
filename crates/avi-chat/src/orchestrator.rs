//! Request Orchestrator
//!
//! One call per inbound chat request: validate the model, assemble the
//! conversation, query the configured adapter, dispatch the proposed tool
//! invocations and compose the reply.

use std::sync::Arc;

use avi_core::{
    CallContext, Conversation, ConversationTurn, Error, ProviderKind, Result, TokenUsage,
};
use avi_gateway::SharedController;
use avi_llm::{system_prompt, BoxedAdapter, ModelQuery};
use avi_tools::ToolCatalog;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dispatch::DispatchEngine;

/// Inbound chat request
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatSubmission {
    pub message: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Accepted for compatibility; conversations are not persisted
    #[serde(default, alias = "session")]
    pub session_id: Option<String>,
}

impl ChatSubmission {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Composed answer returned to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub message: String,
    /// Every tool the model proposed, in order
    pub tool_calls: Vec<String>,
    pub model: String,
    pub usage: TokenUsage,
}

pub struct RequestOrchestrator {
    adapter: BoxedAdapter,
    controller: SharedController,
    catalog: Arc<ToolCatalog>,
    system_prompt: String,
}

impl RequestOrchestrator {
    pub fn new(adapter: BoxedAdapter, controller: SharedController, catalog: Arc<ToolCatalog>) -> Self {
        let system_prompt = system_prompt(&catalog);
        Self {
            adapter,
            controller,
            catalog,
            system_prompt,
        }
    }

    pub fn provider(&self) -> ProviderKind {
        self.adapter.provider()
    }

    pub fn adapter(&self) -> &BoxedAdapter {
        &self.adapter
    }

    pub fn controller(&self) -> &SharedController {
        &self.controller
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub async fn handle(&self, ctx: &CallContext, submission: ChatSubmission) -> Result<ChatReply> {
        self.handle_with_history(ctx, submission, &[]).await
    }

    /// Run one turn with prior dialogue placed between the system prompt and
    /// the new message.
    pub async fn handle_with_history(
        &self,
        ctx: &CallContext,
        submission: ChatSubmission,
        history: &[ConversationTurn],
    ) -> Result<ChatReply> {
        let message = submission.message.trim();
        if message.is_empty() {
            return Err(Error::InvalidRequest("message must not be empty".to_string()));
        }

        let model = submission
            .model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| self.adapter.default_model())
            .to_string();

        if !self.adapter.validate_model(ctx, &model).await? {
            return Err(Error::UnknownModel(format!("model '{}' is not available", model)));
        }

        let conversation = Conversation::assemble(self.system_prompt.as_str(), history, message);
        info!(
            provider = %self.adapter.provider(),
            model = %model,
            session = submission.session_id.as_deref().unwrap_or("-"),
            turns = conversation.len(),
            "Processing chat request"
        );

        let query = ModelQuery::new(&conversation, &self.catalog).with_model(&model);
        let response = self.adapter.submit_query(ctx, query).await?;
        debug!(
            invocations = response.invocations.len(),
            narrative_len = response.narrative.len(),
            "Model replied"
        );

        let outcome = DispatchEngine::new(&self.catalog, self.controller.as_ref())
            .run(ctx, response)
            .await;

        Ok(ChatReply {
            tool_calls: outcome.tool_names(),
            message: outcome.narrative,
            model: outcome.model,
            usage: outcome.usage,
        })
    }
}
