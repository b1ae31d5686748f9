//! avi-gateway: Backend API Gateway
//!
//! Owns one authenticated session against the Avi controller and exposes
//! typed list/get/create/update/delete/scale operations, metrics retrieval
//! and a generic passthrough. List responses go through a [`ResponseCache`].

pub mod api;
pub mod cache;
pub mod client;
pub mod session;
pub mod types;

// Re-export main types
pub use api::{ControllerApi, SharedController};
pub use cache::{CacheKey, NoopCache, ResponseCache, TtlCache};
pub use client::AviGateway;
pub use session::GatewaySession;
pub use types::{
    ApiMethod, GenericRequest, ListPage, ManagedKind, MetricsQuery, MetricsResource, QueryParams,
    ResourceKind, ScaleDirection,
};
