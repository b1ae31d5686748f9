//! Router Composition
//!
//! Each crate that serves HTTP implements [`ServiceRouter`] and exports a
//! `create_router(state)`; the binary mounts them with [`RouterBuilder`].

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    Router,
};
use tracing::{debug, info};

/// Trait for crates that provide HTTP routes
///
/// ```ignore
/// pub struct ChatServiceRouter;
///
/// impl ServiceRouter for ChatServiceRouter {
///     fn prefix() -> &'static str {
///         "/api"
///     }
///
///     fn name() -> &'static str {
///         "chat"
///     }
/// }
/// ```
pub trait ServiceRouter: Send + Sync {
    /// The URL prefix for this service (e.g., "/api/tools")
    fn prefix() -> &'static str;

    /// Service name for logging
    fn name() -> &'static str;

    /// Optional: service description
    fn description() -> &'static str {
        ""
    }
}

/// Builder for composing multiple service routers
pub struct RouterBuilder {
    router: Router,
    services: Vec<(&'static str, &'static str)>, // (prefix, name)
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            router: Router::new(),
            services: Vec::new(),
        }
    }

    /// Add a router at a specific prefix
    pub fn nest(mut self, prefix: &'static str, name: &'static str, router: Router) -> Self {
        info!("Mounting service '{}' at {}", name, prefix);
        self.router = self.router.nest(prefix, router);
        self.services.push((prefix, name));
        self
    }

    /// Mount a router using its [`ServiceRouter`] metadata
    pub fn mount<S: ServiceRouter>(self, router: Router) -> Self {
        if !S::description().is_empty() {
            debug!("{}: {}", S::name(), S::description());
        }
        self.nest(S::prefix(), S::name(), router)
    }

    /// Merge another router (no prefix)
    pub fn merge(mut self, router: Router) -> Self {
        self.router = self.router.merge(router);
        self
    }

    /// Get list of mounted services
    pub fn services(&self) -> &[(&'static str, &'static str)] {
        &self.services
    }

    /// Build the final router; unmatched paths get a JSON 404.
    pub fn build(self) -> Router {
        self.router.fallback(not_found)
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "application/json")],
        r#"{"error":"route not found","kind":"not_found"}"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_nest_and_fallback() {
        let app = RouterBuilder::new()
            .nest("/api/ping", "ping", Router::new().route("/", get(|| async { "pong" })))
            .build();

        let ok = app
            .clone()
            .oneshot(Request::get("/api/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let missing = app
            .oneshot(Request::get("/elsewhere").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
