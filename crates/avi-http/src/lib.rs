//! avi-http: HTTP hosting layer
//!
//! Every crate that serves HTTP exports a router; they are composed here.
//!
//! ```text
//! avi-agent binary
//!     └── avi-http (this crate)
//!         ├── Middleware stack (CORS, tracing, timeout, compression)
//!         └── Router composition
//!             ├── /api/chat, /api/models, /api/health, /api/avi/* → avi_chat::create_router()
//!             └── /api/tools/*                                     → avi_tools::create_router()
//! ```

pub mod middleware;
pub mod router;
pub mod server;

// Re-export main types
pub use middleware::{MiddlewareConfig, MiddlewareStack};
pub use router::{RouterBuilder, ServiceRouter};
pub use server::{HttpServer, HttpServerBuilder, ServerConfig};

pub use axum;

/// Error types for the HTTP server
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Server binding error: {0}")]
    BindError(#[from] std::io::Error),

    #[error("Invalid bind address: {0}")]
    AddressError(String),
}

pub type Result<T> = std::result::Result<T, ServerError>;
