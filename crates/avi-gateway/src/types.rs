//! Shaped parameter and result types for controller operations
//!
//! Everything here is already validated: the gateway never looks at an
//! untyped argument map.

use std::collections::BTreeMap;

use avi_core::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resource collections exposed by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    VirtualService,
    Pool,
    HealthMonitor,
    ServiceEngine,
}

impl ResourceKind {
    /// Collection path below `/api`
    pub fn collection_path(&self) -> &'static str {
        match self {
            ResourceKind::VirtualService => "/virtualservice",
            ResourceKind::Pool => "/pool",
            ResourceKind::HealthMonitor => "/healthmonitor",
            ResourceKind::ServiceEngine => "/serviceengine",
        }
    }

    pub fn object_path(&self, uuid: &str) -> String {
        format!("{}/{}", self.collection_path(), uuid)
    }

    /// Singular human label
    pub fn noun(&self) -> &'static str {
        match self {
            ResourceKind::VirtualService => "virtual service",
            ResourceKind::Pool => "pool",
            ResourceKind::HealthMonitor => "health monitor",
            ResourceKind::ServiceEngine => "service engine",
        }
    }

    /// Plural human label used when folding results
    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::VirtualService => "virtual services",
            ResourceKind::Pool => "pools",
            ResourceKind::HealthMonitor => "health monitors",
            ResourceKind::ServiceEngine => "service engines",
        }
    }
}

/// Kinds that support create/update/delete/scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManagedKind {
    VirtualService,
    Pool,
}

impl From<ManagedKind> for ResourceKind {
    fn from(kind: ManagedKind) -> Self {
        match kind {
            ManagedKind::VirtualService => ResourceKind::VirtualService,
            ManagedKind::Pool => ResourceKind::Pool,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDirection {
    Out,
    In,
}

impl ScaleDirection {
    pub fn path_segment(&self) -> &'static str {
        match self {
            ScaleDirection::Out => "scaleout",
            ScaleDirection::In => "scalein",
        }
    }
}

/// String-only query parameters, kept sorted
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One page of a list endpoint: `{count, results, next?}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    #[serde(default)]
    pub count: u64,
    #[serde(default)]
    pub results: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
}

impl ListPage {
    /// `name` of every result that has one
    pub fn names(&self) -> Vec<&str> {
        self.results
            .iter()
            .filter_map(|r| r.get("name").and_then(Value::as_str))
            .collect()
    }

    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// Resource types with analytics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsResource {
    VirtualService,
    Pool,
    ServiceEngine,
}

impl MetricsResource {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricsResource::VirtualService => "virtualservice",
            MetricsResource::Pool => "pool",
            MetricsResource::ServiceEngine => "serviceengine",
        }
    }
}

impl std::str::FromStr for MetricsResource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "virtualservice" => Ok(MetricsResource::VirtualService),
            "pool" => Ok(MetricsResource::Pool),
            "serviceengine" => Ok(MetricsResource::ServiceEngine),
            other => Err(Error::InvalidRequest(format!(
                "unsupported analytics resource type: {}",
                other
            ))),
        }
    }
}

/// Shaped metrics request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsQuery {
    pub resource: MetricsResource,
    pub uuid: String,
    pub metric: Option<String>,
    pub time_range: Option<String>,
}

impl MetricsQuery {
    pub fn path(&self) -> String {
        format!("/analytics/{}/{}", self.resource.as_str(), self.uuid)
    }

    pub fn params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        if let Some(metric) = &self.metric {
            params.insert("metric", metric.as_str());
        }
        if let Some(range) = &self.time_range {
            params.insert("time_range", range.as_str());
        }
        params
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl ApiMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiMethod::Get => "GET",
            ApiMethod::Post => "POST",
            ApiMethod::Put => "PUT",
            ApiMethod::Patch => "PATCH",
            ApiMethod::Delete => "DELETE",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            ApiMethod::Get => reqwest::Method::GET,
            ApiMethod::Post => reqwest::Method::POST,
            ApiMethod::Put => reqwest::Method::PUT,
            ApiMethod::Patch => reqwest::Method::PATCH,
            ApiMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for ApiMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ApiMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(ApiMethod::Get),
            "POST" => Ok(ApiMethod::Post),
            "PUT" => Ok(ApiMethod::Put),
            "PATCH" => Ok(ApiMethod::Patch),
            "DELETE" => Ok(ApiMethod::Delete),
            other => Err(Error::InvalidRequest(format!("unsupported HTTP method: {}", other))),
        }
    }
}

/// Shaped generic operation
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRequest {
    pub method: ApiMethod,
    pub endpoint: String,
    pub body: Option<Value>,
    pub query: QueryParams,
}

impl GenericRequest {
    pub fn new(method: ApiMethod, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
            query: QueryParams::new(),
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    /// Endpoint with a leading `/`
    pub fn normalized_endpoint(&self) -> String {
        if self.endpoint.starts_with('/') {
            self.endpoint.clone()
        } else {
            format!("/{}", self.endpoint)
        }
    }
}
