//! Dispatch Engine
//!
//! Per chat turn: validate each proposed invocation against the catalog,
//! shape its arguments, execute it on the gateway and fold the result into
//! the narrative. Invocations run strictly in the order the model proposed
//! them. A failing invocation is logged and skipped; the turn never aborts.
//!
//! ```text
//! Received → (Validating → Shaping → Executing → Folding)* → Done
//! ```

use avi_core::{CallContext, Error, NormalizedModelResponse, Result, TokenUsage, ToolInvocation};
use avi_gateway::ControllerApi;
use avi_tools::ToolCatalog;
use tracing::{debug, info, warn};

use crate::fold::ToolOutput;
use crate::shaping::{shape, ShapedCall};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchPhase {
    Received,
    Validating,
    Shaping,
    Executing,
    Folding,
    Done,
}

impl std::fmt::Display for DispatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DispatchPhase::Received => "received",
            DispatchPhase::Validating => "validating",
            DispatchPhase::Shaping => "shaping",
            DispatchPhase::Executing => "executing",
            DispatchPhase::Folding => "folding",
            DispatchPhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Result of one invocation
#[derive(Debug)]
pub enum InvocationOutcome {
    Succeeded(ToolOutput),
    /// `phase` is where the invocation stopped
    Failed { phase: DispatchPhase, error: Error },
}

#[derive(Debug)]
pub struct InvocationRecord {
    /// Position in the model's proposal
    pub index: usize,
    pub id: String,
    pub tool_name: String,
    pub outcome: InvocationOutcome,
}

impl InvocationRecord {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, InvocationOutcome::Succeeded(_))
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            InvocationOutcome::Failed { error, .. } => Some(error),
            InvocationOutcome::Succeeded(_) => None,
        }
    }
}

/// Composed turn
#[derive(Debug)]
pub struct DispatchOutcome {
    /// Model prose followed by every successful result block
    pub narrative: String,
    pub model: String,
    pub usage: TokenUsage,
    pub records: Vec<InvocationRecord>,
}

impl DispatchOutcome {
    /// Tool names in proposal order, whether or not they succeeded
    pub fn tool_names(&self) -> Vec<String> {
        self.records.iter().map(|r| r.tool_name.clone()).collect()
    }

    pub fn succeeded(&self) -> usize {
        self.records.iter().filter(|r| r.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.records.len() - self.succeeded()
    }
}

/// Single-use engine; `run` consumes it.
pub struct DispatchEngine<'a> {
    catalog: &'a ToolCatalog,
    controller: &'a dyn ControllerApi,
    phase: DispatchPhase,
}

impl<'a> DispatchEngine<'a> {
    pub fn new(catalog: &'a ToolCatalog, controller: &'a dyn ControllerApi) -> Self {
        Self {
            catalog,
            controller,
            phase: DispatchPhase::Received,
        }
    }

    pub fn phase(&self) -> DispatchPhase {
        self.phase
    }

    fn enter(&mut self, phase: DispatchPhase, index: usize, tool: &str) {
        debug!(from = %self.phase, to = %phase, index, tool, "dispatch transition");
        self.phase = phase;
    }

    pub async fn run(mut self, ctx: &CallContext, response: NormalizedModelResponse) -> DispatchOutcome {
        let NormalizedModelResponse {
            mut narrative,
            invocations,
            model,
            usage,
        } = response;

        if !invocations.is_empty() {
            info!(model = %model, count = invocations.len(), "Dispatching tool invocations");
        }

        let mut records = Vec::with_capacity(invocations.len());
        for (index, invocation) in invocations.into_iter().enumerate() {
            let outcome = self.dispatch_one(ctx, index, &invocation).await;
            match &outcome {
                InvocationOutcome::Succeeded(output) => {
                    self.enter(DispatchPhase::Folding, index, &invocation.tool_name);
                    narrative.push_str(&output.render(&invocation.tool_name));
                    info!(index, tool = %invocation.tool_name, "Tool invocation succeeded");
                }
                InvocationOutcome::Failed { phase, error } => {
                    warn!(
                        index,
                        tool = %invocation.tool_name,
                        phase = %phase,
                        kind = error.kind(),
                        "Tool invocation failed: {}",
                        error
                    );
                }
            }
            records.push(InvocationRecord {
                index,
                id: invocation.id,
                tool_name: invocation.tool_name,
                outcome,
            });
        }

        self.phase = DispatchPhase::Done;
        let outcome = DispatchOutcome {
            narrative,
            model,
            usage,
            records,
        };
        if !outcome.records.is_empty() {
            info!(
                succeeded = outcome.succeeded(),
                failed = outcome.failed(),
                "Dispatch complete"
            );
        }
        outcome
    }

    async fn dispatch_one(
        &mut self,
        ctx: &CallContext,
        index: usize,
        invocation: &ToolInvocation,
    ) -> InvocationOutcome {
        let tool = invocation.tool_name.as_str();

        self.enter(DispatchPhase::Validating, index, tool);
        let descriptor = match self.catalog.find_by_name(tool) {
            Ok(descriptor) => descriptor,
            Err(error) => return self.failed(error),
        };

        self.enter(DispatchPhase::Shaping, index, tool);
        let call = match shape(descriptor, &invocation.arguments) {
            Ok(call) => call,
            Err(error) => return self.failed(error),
        };

        self.enter(DispatchPhase::Executing, index, tool);
        if ctx.is_cancelled() {
            return self.failed(Error::Cancelled(format!("turn cancelled before {}", tool)));
        }
        match execute(self.controller, ctx, call).await {
            Ok(output) => InvocationOutcome::Succeeded(output),
            Err(error) => self.failed(error),
        }
    }

    fn failed(&self, error: Error) -> InvocationOutcome {
        InvocationOutcome::Failed {
            phase: self.phase,
            error,
        }
    }
}

async fn execute(
    controller: &dyn ControllerApi,
    ctx: &CallContext,
    call: ShapedCall,
) -> Result<ToolOutput> {
    let output = match call {
        ShapedCall::List { kind, query } => ToolOutput::Page {
            kind,
            page: controller.list(ctx, kind, &query).await?,
        },
        ShapedCall::Get { kind, uuid, query } => {
            ToolOutput::Object(controller.get(ctx, kind, &uuid, &query).await?)
        }
        ShapedCall::Create { kind, body } => {
            ToolOutput::Object(controller.create(ctx, kind, &body).await?)
        }
        ShapedCall::Update { kind, uuid, body } => {
            ToolOutput::Object(controller.update(ctx, kind, &uuid, &body).await?)
        }
        ShapedCall::Delete { kind, uuid } => {
            controller.delete(ctx, kind, &uuid).await?;
            ToolOutput::deleted(kind, &uuid)
        }
        ShapedCall::Scale {
            kind,
            uuid,
            direction,
            body,
        } => {
            controller.scale(ctx, kind, &uuid, direction, &body).await?;
            ToolOutput::scaled(kind, &uuid, direction)
        }
        ShapedCall::Metrics(query) => ToolOutput::Object(controller.metrics(ctx, &query).await?),
        ShapedCall::Generic(request) => ToolOutput::Object(controller.execute(ctx, &request).await?),
    };
    Ok(output)
}
