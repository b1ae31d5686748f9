//! Avi Controller REST Client
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Purpose |
//! |----------|--------|---------|
//! | `/login` | POST | Open a session |
//! | `/logout` | POST | Close the session |
//! | `/api/{kind}` | GET, POST | List / create |
//! | `/api/{kind}/{uuid}` | GET, PUT, DELETE | Read / update / delete |
//! | `/api/{kind}/{uuid}/scaleout` | POST | Add capacity |
//! | `/api/{kind}/{uuid}/scalein` | POST | Remove capacity |
//! | `/api/analytics/{type}/{uuid}` | GET | Metrics |
//!
//! ## Authentication
//! - Cookie: `sessionid={session}`
//! - Header: `X-CSRFToken: {token}`
//! - Headers: `X-Avi-Version`, `X-Avi-Tenant`

use std::sync::Arc;

use async_trait::async_trait;
use avi_core::config::AviConfig;
use avi_core::{CallContext, Error, Interrupted, Result};
use reqwest::header::{CONTENT_TYPE, COOKIE};
use reqwest::{Client, Method};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::api::ControllerApi;
use crate::cache::{CacheKey, NoopCache, ResponseCache, TtlCache};
use crate::session::{self, GatewaySession, CSRF_HEADER, TENANT_HEADER, VERSION_HEADER};
use crate::types::{
    GenericRequest, ListPage, ManagedKind, MetricsQuery, QueryParams, ResourceKind, ScaleDirection,
};

// =============================================================================
// ERROR MAPPING
// =============================================================================

/// Transport failure; client-side timeouts stay distinguishable.
pub(crate) fn transport_error(err: reqwest::Error, url: &str) -> Error {
    if err.is_timeout() {
        Error::GatewayTimeout(format!("{}: {}", url, err))
    } else {
        Error::gateway_network(format!("{}: {}", url, err))
    }
}

pub(crate) fn interrupted(reason: Interrupted, url: &str) -> Error {
    match reason {
        Interrupted::Cancelled => Error::Cancelled(format!("controller call to {}", url)),
        Interrupted::DeadlineExceeded => Error::GatewayTimeout(format!("deadline exceeded calling {}", url)),
    }
}

/// Which statuses count as success for an operation
#[derive(Debug, Clone, Copy)]
enum Expect {
    AnySuccess,
    Only(&'static [u16]),
}

impl Expect {
    fn accepts(&self, status: u16) -> bool {
        match self {
            Expect::AnySuccess => (200..300).contains(&status),
            Expect::Only(codes) => codes.contains(&status),
        }
    }
}

struct RawResponse {
    status: u16,
    body: String,
}

impl RawResponse {
    fn ensure(self, expect: Expect) -> Result<Self> {
        if expect.accepts(self.status) {
            Ok(self)
        } else {
            Err(Error::from_gateway_status(self.status, self.body))
        }
    }

    /// Strict JSON decode; an empty body is `null`
    fn json(&self) -> Result<Value> {
        if self.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&self.body)?)
    }

    /// JSON when possible, the raw text otherwise
    fn json_or_text(self) -> Value {
        if self.body.trim().is_empty() {
            return Value::Null;
        }
        serde_json::from_str(&self.body).unwrap_or(Value::String(self.body))
    }
}

// =============================================================================
// CLIENT IMPLEMENTATION
// =============================================================================

/// Authenticated controller client
pub struct AviGateway {
    client: Client,
    /// `https://host`
    root_url: String,
    /// `https://host/api`
    base_url: String,
    version: String,
    tenant: String,
    session: RwLock<Option<GatewaySession>>,
    cache: Arc<dyn ResponseCache>,
}

impl AviGateway {
    /// Log in and return a ready gateway. Caching follows `avi.cache_ttl_secs`.
    pub async fn connect(ctx: &CallContext, config: &AviConfig) -> Result<Self> {
        let cache: Arc<dyn ResponseCache> = if config.cache_ttl_secs == 0 {
            Arc::new(NoopCache)
        } else {
            Arc::new(TtlCache::new(config.cache_ttl()))
        };
        Self::connect_with_cache(ctx, config, cache).await
    }

    /// Log in with an explicit cache implementation
    pub async fn connect_with_cache(
        ctx: &CallContext,
        config: &AviConfig,
        cache: Arc<dyn ResponseCache>,
    ) -> Result<Self> {
        if config.insecure {
            warn!("TLS certificate verification disabled for controller {}", config.host);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.insecure)
            .build()
            .map_err(|e| Error::config(format!("failed to build controller HTTP client: {}", e)))?;

        let root_url = root_url(&config.host);
        let session = session::login(&client, ctx, &root_url, config).await?;

        Ok(Self {
            client,
            base_url: format!("{}/api", root_url),
            root_url,
            version: config.version.clone(),
            tenant: config.tenant.clone(),
            session: RwLock::new(Some(session)),
            cache,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn is_connected(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// API version reported at login
    pub async fn api_version(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.api_version.clone())
    }

    async fn send(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        query: &QueryParams,
        body: Option<&Value>,
    ) -> Result<RawResponse> {
        let session = self
            .session
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::GatewayAuthentication("session closed".to_string()))?;

        let url = format!("{}{}", self.base_url, path);
        debug!(method = method.as_str(), %url, params = query.len(), "controller request");

        let mut request = self
            .client
            .request(method, &url)
            .header(CONTENT_TYPE, "application/json")
            .header(VERSION_HEADER, &self.version)
            .header(TENANT_HEADER, &self.tenant)
            .header(COOKIE, session.cookie());
        if !session.csrf_token.is_empty() {
            request = request.header(CSRF_HEADER, &session.csrf_token);
        }
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let exchange = async {
            let response = request.send().await.map_err(|e| transport_error(e, &url))?;
            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| transport_error(e, &url))?;
            Ok::<_, Error>(RawResponse { status, body })
        };

        let raw = ctx.run(exchange).await.map_err(|i| interrupted(i, &url))??;
        debug!(%url, status = raw.status, "controller response");
        Ok(raw)
    }
}

/// `host`, `host:port` or a full `scheme://host` → root URL without trailing slash
fn root_url(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[async_trait]
impl ControllerApi for AviGateway {
    async fn list(&self, ctx: &CallContext, kind: ResourceKind, query: &QueryParams) -> Result<ListPage> {
        let path = kind.collection_path();
        let key = CacheKey::new("GET", path, query);
        if let Some(page) = self.cache.get(&key) {
            debug!(key = key.as_str(), "serving {} from cache", kind.label());
            return Ok(page);
        }

        let raw = self
            .send(ctx, Method::GET, path, query, None)
            .await?
            .ensure(Expect::Only(&[200]))?;
        let page: ListPage = serde_json::from_str(&raw.body)?;

        self.cache.put(key, page.clone());
        Ok(page)
    }

    async fn get(
        &self,
        ctx: &CallContext,
        kind: ResourceKind,
        uuid: &str,
        query: &QueryParams,
    ) -> Result<Value> {
        self.send(ctx, Method::GET, &kind.object_path(uuid), query, None)
            .await?
            .ensure(Expect::Only(&[200]))?
            .json()
    }

    async fn create(&self, ctx: &CallContext, kind: ManagedKind, body: &Value) -> Result<Value> {
        let kind = ResourceKind::from(kind);
        let result = self
            .send(ctx, Method::POST, kind.collection_path(), &QueryParams::new(), Some(body))
            .await?
            .ensure(Expect::Only(&[200, 201]))?
            .json()?;
        info!("Created object in {}", kind.collection_path());
        Ok(result)
    }

    async fn update(
        &self,
        ctx: &CallContext,
        kind: ManagedKind,
        uuid: &str,
        body: &Value,
    ) -> Result<Value> {
        let kind = ResourceKind::from(kind);
        self.send(ctx, Method::PUT, &kind.object_path(uuid), &QueryParams::new(), Some(body))
            .await?
            .ensure(Expect::Only(&[200]))?
            .json()
    }

    async fn delete(&self, ctx: &CallContext, kind: ManagedKind, uuid: &str) -> Result<()> {
        let kind = ResourceKind::from(kind);
        self.send(ctx, Method::DELETE, &kind.object_path(uuid), &QueryParams::new(), None)
            .await?
            .ensure(Expect::Only(&[200, 204]))?;
        info!("Deleted {}", kind.object_path(uuid));
        Ok(())
    }

    async fn scale(
        &self,
        ctx: &CallContext,
        kind: ManagedKind,
        uuid: &str,
        direction: ScaleDirection,
        body: &Value,
    ) -> Result<()> {
        let kind = ResourceKind::from(kind);
        let path = format!("{}/{}", kind.object_path(uuid), direction.path_segment());
        self.send(ctx, Method::POST, &path, &QueryParams::new(), Some(body))
            .await?
            .ensure(Expect::AnySuccess)?;
        info!("Requested {} on {}", direction.path_segment(), kind.object_path(uuid));
        Ok(())
    }

    async fn metrics(&self, ctx: &CallContext, query: &MetricsQuery) -> Result<Value> {
        self.send(ctx, Method::GET, &query.path(), &query.params(), None)
            .await?
            .ensure(Expect::Only(&[200]))?
            .json()
    }

    async fn execute(&self, ctx: &CallContext, request: &GenericRequest) -> Result<Value> {
        let path = request.normalized_endpoint();
        let raw = self
            .send(
                ctx,
                request.method.to_reqwest(),
                &path,
                &request.query,
                request.body.as_ref(),
            )
            .await?
            .ensure(Expect::AnySuccess)?;
        Ok(raw.json_or_text())
    }

    async fn close(&self) {
        let session = self.session.write().await.take();
        if let Some(session) = session {
            session::logout(&self.client, &self.root_url, &session).await;
            info!("Controller session closed");
        }
    }
}
