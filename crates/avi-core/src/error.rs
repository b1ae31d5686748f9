//! Error types for the Avi agent
//!
//! A single taxonomy is shared by the model adapters, the controller gateway
//! and the dispatch engine so that every layer can classify a failure the same
//! way (timeouts vs transport failures vs rejected input).

use thiserror::Error;

/// Main error type for agent operations
#[derive(Error, Debug)]
pub enum Error {
    // ------------------------------------------------------------------
    // Model backend
    // ------------------------------------------------------------------
    #[error("Model backend error{}: {message}", status.map(|s| format!(" (HTTP {})", s)).unwrap_or_default())]
    UpstreamModel {
        status: Option<u16>,
        message: String,
    },

    #[error("Model backend timed out: {0}")]
    ModelTimeout(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------
    #[error("Tool not found: {0}")]
    UnknownTool(String),

    #[error("Tool '{tool}' is missing required argument '{argument}'")]
    MissingArgument { tool: String, argument: String },

    #[error("Tool '{tool}' has invalid argument '{argument}': {reason}")]
    InvalidArgument {
        tool: String,
        argument: String,
        reason: String,
    },

    // ------------------------------------------------------------------
    // Controller gateway
    // ------------------------------------------------------------------
    #[error("Controller authentication failed: {0}")]
    GatewayAuthentication(String),

    #[error("Controller resource not found: {0}")]
    GatewayNotFound(String),

    #[error("Controller rejected request (HTTP {status}): {body}")]
    GatewayValidation { status: u16, body: String },

    #[error("Controller server error (HTTP {status}): {body}")]
    GatewayServer { status: u16, body: String },

    #[error("Controller network error: {0}")]
    GatewayNetwork(String),

    #[error("Controller request timed out: {0}")]
    GatewayTimeout(String),

    // ------------------------------------------------------------------
    // General
    // ------------------------------------------------------------------
    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid conversation: {0}")]
    InvalidConversation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a model backend error without an HTTP status
    pub fn upstream(msg: impl Into<String>) -> Self {
        Error::UpstreamModel {
            status: None,
            message: msg.into(),
        }
    }

    /// Create a model backend error for a non-2xx reply
    pub fn upstream_status(status: u16, body: impl Into<String>) -> Self {
        Error::UpstreamModel {
            status: Some(status),
            message: body.into(),
        }
    }

    /// Create a model timeout error
    pub fn model_timeout(msg: impl Into<String>) -> Self {
        Error::ModelTimeout(msg.into())
    }

    /// Create an unknown tool error
    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Error::UnknownTool(name.into())
    }

    /// Create a missing argument error
    pub fn missing_argument(tool: impl Into<String>, argument: impl Into<String>) -> Self {
        Error::MissingArgument {
            tool: tool.into(),
            argument: argument.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(
        tool: impl Into<String>,
        argument: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Error::InvalidArgument {
            tool: tool.into(),
            argument: argument.into(),
            reason: reason.into(),
        }
    }

    /// Create a controller network error
    pub fn gateway_network(msg: impl Into<String>) -> Self {
        Error::GatewayNetwork(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Map a non-2xx controller status into the gateway taxonomy.
    pub fn from_gateway_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 | 403 => Error::GatewayAuthentication(format!("HTTP {}: {}", status, body)),
            404 => Error::GatewayNotFound(body),
            400..=499 => Error::GatewayValidation { status, body },
            _ => Error::GatewayServer { status, body },
        }
    }

    /// True for deadline expiry on either side of the agent.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::ModelTimeout(_) | Error::GatewayTimeout(_))
    }

    /// True for errors raised by the controller gateway.
    pub fn is_gateway(&self) -> bool {
        matches!(
            self,
            Error::GatewayAuthentication(_)
                | Error::GatewayNotFound(_)
                | Error::GatewayValidation { .. }
                | Error::GatewayServer { .. }
                | Error::GatewayNetwork(_)
                | Error::GatewayTimeout(_)
        )
    }

    /// Whether a caller could reasonably try the same call again.
    ///
    /// Nothing in the agent retries on its own; this is advisory.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ModelTimeout(_) | Error::GatewayTimeout(_) | Error::GatewayNetwork(_) => true,
            Error::GatewayServer { .. } => true,
            Error::UpstreamModel { status, .. } => status.map_or(true, |s| s >= 500 || s == 429),
            _ => false,
        }
    }

    /// Stable identifier used in logs and HTTP error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UpstreamModel { .. } => "upstream_model",
            Error::ModelTimeout(_) => "model_timeout",
            Error::UnknownModel(_) => "unknown_model",
            Error::UnsupportedProvider(_) => "unsupported_provider",
            Error::UnknownTool(_) => "unknown_tool",
            Error::MissingArgument { .. } => "missing_argument",
            Error::InvalidArgument { .. } => "invalid_argument",
            Error::GatewayAuthentication(_) => "gateway_authentication",
            Error::GatewayNotFound(_) => "gateway_not_found",
            Error::GatewayValidation { .. } => "gateway_validation",
            Error::GatewayServer { .. } => "gateway_server",
            Error::GatewayNetwork(_) => "gateway_network",
            Error::GatewayTimeout(_) => "gateway_timeout",
            Error::Cancelled(_) => "cancelled",
            Error::InvalidRequest(_) => "invalid_request",
            Error::InvalidConversation(_) => "invalid_conversation",
            Error::Config(_) => "config",
            Error::Serialization(_) => "serialization",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_status_mapping() {
        assert!(matches!(
            Error::from_gateway_status(401, "expired"),
            Error::GatewayAuthentication(_)
        ));
        assert!(matches!(
            Error::from_gateway_status(403, "forbidden"),
            Error::GatewayAuthentication(_)
        ));
        assert!(matches!(
            Error::from_gateway_status(404, "gone"),
            Error::GatewayNotFound(_)
        ));
        assert!(matches!(
            Error::from_gateway_status(422, "bad field"),
            Error::GatewayValidation { status: 422, .. }
        ));
        assert!(matches!(
            Error::from_gateway_status(503, "down"),
            Error::GatewayServer { status: 503, .. }
        ));
    }

    #[test]
    fn test_timeouts_are_distinct_from_network() {
        assert!(Error::GatewayTimeout("slow".into()).is_timeout());
        assert!(Error::model_timeout("slow").is_timeout());
        assert!(!Error::gateway_network("reset").is_timeout());
    }

    #[test]
    fn test_upstream_display_includes_status() {
        let err = Error::upstream_status(502, "bad gateway");
        assert_eq!(err.to_string(), "Model backend error (HTTP 502): bad gateway");
        let err = Error::upstream("connection refused");
        assert_eq!(err.to_string(), "Model backend error: connection refused");
    }

    #[test]
    fn test_kind_and_retryable() {
        let err = Error::missing_argument("get_pool", "uuid");
        assert_eq!(err.kind(), "missing_argument");
        assert!(!err.is_retryable());
        assert!(Error::GatewayServer { status: 500, body: String::new() }.is_retryable());
        assert!(!Error::upstream_status(400, "bad").is_retryable());
    }
}
