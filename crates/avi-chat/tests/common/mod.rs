//! In-memory model backend and controller shared by the chat tests

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use avi_chat::RequestOrchestrator;
use avi_core::{
    ArgumentMap, CallContext, Conversation, Error, Interrupted, NormalizedModelResponse,
    ProviderKind, Result, TokenUsage, ToolInvocation,
};
use avi_gateway::{
    ControllerApi, GenericRequest, ListPage, ManagedKind, MetricsQuery, QueryParams, ResourceKind,
    ScaleDirection,
};
use avi_llm::{ModelAdapter, ModelQuery};
use avi_tools::ToolCatalog;
use serde_json::{json, Value};

pub const MODEL: &str = "llama3.2";

pub fn args(value: Value) -> ArgumentMap {
    match value {
        Value::Object(map) => map,
        other => panic!("arguments must be an object, got {}", other),
    }
}

pub fn invocation(tool: &str, arguments: Value) -> ToolInvocation {
    ToolInvocation::new(tool, args(arguments))
}

pub fn reply(narrative: &str, invocations: Vec<ToolInvocation>) -> NormalizedModelResponse {
    let mut response =
        NormalizedModelResponse::text(MODEL, narrative).with_usage(TokenUsage::new(100, 50));
    response.invocations = invocations;
    response
}

// =============================================================================
// MODEL BACKEND
// =============================================================================

pub enum Script {
    Reply(NormalizedModelResponse),
    /// Never answers; only the call context ends the query
    Hang,
    Fail(u16, &'static str),
}

pub struct FakeModel {
    models: Vec<String>,
    script: Mutex<VecDeque<Script>>,
    pub queries: AtomicUsize,
    pub conversations: Mutex<Vec<Conversation>>,
    pub list_fails: bool,
}

impl FakeModel {
    pub fn new(script: Vec<Script>) -> Self {
        Self {
            models: vec![MODEL.to_string(), "mistral".to_string()],
            script: Mutex::new(script.into()),
            queries: AtomicUsize::new(0),
            conversations: Mutex::new(Vec::new()),
            list_fails: false,
        }
    }

    pub fn replying(response: NormalizedModelResponse) -> Self {
        Self::new(vec![Script::Reply(response)])
    }

    pub fn unreachable() -> Self {
        Self {
            list_fails: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ModelAdapter for FakeModel {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn default_model(&self) -> &str {
        MODEL
    }

    async fn submit_query(
        &self,
        ctx: &CallContext,
        query: ModelQuery<'_>,
    ) -> Result<NormalizedModelResponse> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.conversations
            .lock()
            .unwrap()
            .push(query.conversation.clone());

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Script::Reply(response)) => Ok(response),
            Some(Script::Fail(status, body)) => Err(Error::upstream_status(status, body)),
            Some(Script::Hang) => match ctx.run(std::future::pending::<()>()).await {
                Err(Interrupted::DeadlineExceeded) => {
                    Err(Error::model_timeout("model did not answer in time"))
                }
                Err(Interrupted::Cancelled) => Err(Error::Cancelled("query cancelled".into())),
                Ok(()) => unreachable!(),
            },
            None => Ok(NormalizedModelResponse::text(MODEL, "Nothing scripted.")),
        }
    }

    async fn list_available_models(&self, _ctx: &CallContext) -> Result<Vec<String>> {
        if self.list_fails {
            return Err(Error::upstream("connection refused"));
        }
        Ok(self.models.clone())
    }
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Records `op:path` for every call, in arrival order
#[derive(Default)]
pub struct FakeController {
    pub calls: Mutex<Vec<String>>,
    /// Completion order, which differs from arrival order only under delays
    pub completed: Mutex<Vec<String>>,
    pages: HashMap<&'static str, ListPage>,
    failures: HashMap<String, (u16, &'static str)>,
    delays: HashMap<String, Duration>,
    unreachable: bool,
}

impl FakeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, kind: ResourceKind, names: &[&str]) -> Self {
        let results = names
            .iter()
            .enumerate()
            .map(|(i, name)| json!({"uuid": format!("{}-{}", &kind.collection_path()[1..], i + 1), "name": name}))
            .collect();
        self.pages.insert(
            kind.collection_path(),
            ListPage {
                count: names.len() as u64,
                results,
                next: None,
            },
        );
        self
    }

    pub fn failing(mut self, key: &str, status: u16, body: &'static str) -> Self {
        self.failures.insert(key.to_string(), (status, body));
        self
    }

    pub fn delayed(mut self, key: &str, delay: Duration) -> Self {
        self.delays.insert(key.to_string(), delay);
        self
    }

    /// Every call fails as if the controller were down
    pub fn offline(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    async fn record(&self, key: String) -> Result<()> {
        self.calls.lock().unwrap().push(key.clone());
        if self.unreachable {
            return Err(Error::GatewayNetwork("connection refused".into()));
        }
        if let Some(delay) = self.delays.get(&key) {
            tokio::time::sleep(*delay).await;
        }
        self.completed.lock().unwrap().push(key.clone());
        match self.failures.get(&key) {
            Some((status, body)) => Err(Error::from_gateway_status(*status, body.to_string())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ControllerApi for FakeController {
    async fn list(&self, _ctx: &CallContext, kind: ResourceKind, _query: &QueryParams) -> Result<ListPage> {
        self.record(format!("list:{}", kind.collection_path())).await?;
        Ok(self.pages.get(kind.collection_path()).cloned().unwrap_or_default())
    }

    async fn get(
        &self,
        _ctx: &CallContext,
        kind: ResourceKind,
        uuid: &str,
        _query: &QueryParams,
    ) -> Result<Value> {
        self.record(format!("get:{}", kind.object_path(uuid))).await?;
        Ok(json!({"uuid": uuid}))
    }

    async fn create(&self, _ctx: &CallContext, kind: ManagedKind, body: &Value) -> Result<Value> {
        let kind = ResourceKind::from(kind);
        self.record(format!("create:{}", kind.collection_path())).await?;
        Ok(body.clone())
    }

    async fn update(
        &self,
        _ctx: &CallContext,
        kind: ManagedKind,
        uuid: &str,
        body: &Value,
    ) -> Result<Value> {
        let kind = ResourceKind::from(kind);
        self.record(format!("update:{}", kind.object_path(uuid))).await?;
        Ok(body.clone())
    }

    async fn delete(&self, _ctx: &CallContext, kind: ManagedKind, uuid: &str) -> Result<()> {
        let kind = ResourceKind::from(kind);
        self.record(format!("delete:{}", kind.object_path(uuid))).await
    }

    async fn scale(
        &self,
        _ctx: &CallContext,
        kind: ManagedKind,
        uuid: &str,
        direction: ScaleDirection,
        _body: &Value,
    ) -> Result<()> {
        let kind = ResourceKind::from(kind);
        self.record(format!(
            "scale:{}/{}",
            kind.object_path(uuid),
            direction.path_segment()
        ))
        .await
    }

    async fn metrics(&self, _ctx: &CallContext, query: &MetricsQuery) -> Result<Value> {
        self.record(format!("metrics:{}", query.path())).await?;
        Ok(json!({"series": []}))
    }

    async fn execute(&self, _ctx: &CallContext, request: &GenericRequest) -> Result<Value> {
        self.record(format!(
            "{}:{}",
            request.method.as_str(),
            request.normalized_endpoint()
        ))
        .await?;
        Ok(json!({"method": request.method.as_str(), "body": request.body}))
    }
}

pub fn orchestrator(model: FakeModel, controller: FakeController) -> (Arc<RequestOrchestrator>, Arc<FakeModel>, Arc<FakeController>) {
    let model = Arc::new(model);
    let controller = Arc::new(controller);
    let orchestrator = RequestOrchestrator::new(
        model.clone(),
        controller.clone(),
        Arc::new(ToolCatalog::standard()),
    );
    (Arc::new(orchestrator), model, controller)
}
