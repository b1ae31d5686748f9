//! Core types and utilities for the Avi load-balancer agent
//!
//! # Modules
//!
//! - `config`: Layered configuration and validation
//! - `context`: Cancellation and deadline scope for network calls
//! - `error`: Error taxonomy and Result alias
//! - `types`: Conversation, tool invocation and model response types

pub mod config;
pub mod context;
pub mod error;
pub mod types;

// Re-exports
pub use config::{AgentConfig, ConfigLoader, ModelDefaults};
pub use context::{CallContext, Interrupted};
pub use error::{Error, Result};
pub use types::*;
