//! Controller operation surface
//!
//! The dispatch engine talks to this trait, never to the HTTP client
//! directly, so tests can substitute an in-memory controller.

use std::sync::Arc;

use async_trait::async_trait;
use avi_core::{CallContext, Result};
use serde_json::Value;

use crate::types::{
    GenericRequest, ListPage, ManagedKind, MetricsQuery, QueryParams, ResourceKind, ScaleDirection,
};

#[async_trait]
pub trait ControllerApi: Send + Sync {
    /// List a collection; served from the response cache when fresh
    async fn list(&self, ctx: &CallContext, kind: ResourceKind, query: &QueryParams) -> Result<ListPage>;

    async fn get(
        &self,
        ctx: &CallContext,
        kind: ResourceKind,
        uuid: &str,
        query: &QueryParams,
    ) -> Result<Value>;

    async fn create(&self, ctx: &CallContext, kind: ManagedKind, body: &Value) -> Result<Value>;

    async fn update(
        &self,
        ctx: &CallContext,
        kind: ManagedKind,
        uuid: &str,
        body: &Value,
    ) -> Result<Value>;

    async fn delete(&self, ctx: &CallContext, kind: ManagedKind, uuid: &str) -> Result<()>;

    async fn scale(
        &self,
        ctx: &CallContext,
        kind: ManagedKind,
        uuid: &str,
        direction: ScaleDirection,
        body: &Value,
    ) -> Result<()>;

    async fn metrics(&self, ctx: &CallContext, query: &MetricsQuery) -> Result<Value>;

    /// Anything the typed operations do not cover
    async fn execute(&self, ctx: &CallContext, request: &GenericRequest) -> Result<Value>;

    /// End the session; never fails
    async fn close(&self) {}
}

pub type SharedController = Arc<dyn ControllerApi>;
