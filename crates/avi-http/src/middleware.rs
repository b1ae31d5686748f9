//! Shared Middleware Stack
//!
//! Layered once over the composed router, outermost first:
//!
//! | Layer | Effect |
//! |-------|--------|
//! | CORS | browser access from the configured origins (any when empty) |
//! | Trace | one span per request, response status logged at debug |
//! | Compression | gzip bodies when the client accepts it |
//! | Timeout | `408` once the hard ceiling passes |

use std::time::Duration;

use axum::{http::HeaderValue, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{warn, Level};

/// Middleware configuration
#[derive(Debug, Clone)]
pub struct MiddlewareConfig {
    pub cors_enabled: bool,
    /// Allowed origins; empty allows any
    pub cors_origins: Vec<String>,
    pub tracing_enabled: bool,
    pub compression_enabled: bool,
    /// Hard ceiling on request handling. Chat turns carry their own deadline,
    /// so this must sit above the configured request timeout.
    pub timeout: Duration,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            cors_enabled: true,
            cors_origins: Vec::new(),
            tracing_enabled: true,
            compression_enabled: true,
            timeout: Duration::from_secs(130),
        }
    }
}

impl MiddlewareConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cors(mut self, enabled: bool) -> Self {
        self.cors_enabled = enabled;
        self
    }

    pub fn cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = origins;
        self
    }

    pub fn tracing(mut self, enabled: bool) -> Self {
        self.tracing_enabled = enabled;
        self
    }

    pub fn compression(mut self, enabled: bool) -> Self {
        self.compression_enabled = enabled;
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }
}

/// Middleware stack that can be applied to a router
pub struct MiddlewareStack {
    config: MiddlewareConfig,
}

impl MiddlewareStack {
    pub fn new(config: MiddlewareConfig) -> Self {
        Self { config }
    }

    pub fn apply(self, router: Router) -> Router {
        let config = self.config;
        // Each `layer` call wraps everything added before it
        let mut router = router.layer(TimeoutLayer::new(config.timeout));

        if config.compression_enabled {
            router = router.layer(CompressionLayer::new());
        }

        if config.tracing_enabled {
            router = router.layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
            );
        }

        if config.cors_enabled {
            router = router.layer(cors_layer(&config.cors_origins));
        }

        router
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();
    layer.allow_origin(parsed)
}

/// Apply the stack described by `config`
pub fn apply_middleware(router: Router, config: MiddlewareConfig) -> Router {
    MiddlewareStack::new(config).apply(router)
}
