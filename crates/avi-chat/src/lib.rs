//! avi-chat: Dispatch Engine and Request Orchestrator
//!
//! Turns one chat message into a model query, executes the tool calls the
//! model proposes against the controller and folds their results into the
//! reply text. Also carries the chat-facing HTTP routes.

pub mod dispatch;
pub mod fold;
pub mod orchestrator;
pub mod router;
pub mod shaping;

// Re-export main types
pub use dispatch::{DispatchEngine, DispatchOutcome, DispatchPhase, InvocationOutcome, InvocationRecord};
pub use fold::ToolOutput;
pub use orchestrator::{ChatReply, ChatSubmission, RequestOrchestrator};
pub use router::{create_router, status_for, ApiError, ChatServiceRouter, ChatState};
pub use shaping::{shape, ShapedCall};
