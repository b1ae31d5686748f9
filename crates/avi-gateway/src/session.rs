//! Controller session lifecycle
//!
//! `POST /login` yields `{sessionid, csrftoken, version}`; the session id
//! travels as a cookie and the CSRF token as `X-CSRFToken` on every request.

use avi_core::config::AviConfig;
use avi_core::{CallContext, Error, Result};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::client::{interrupted, transport_error};

/// Header carrying the API version
pub const VERSION_HEADER: &str = "X-Avi-Version";
/// Header carrying the tenant
pub const TENANT_HEADER: &str = "X-Avi-Tenant";
/// Header carrying the anti-forgery token
pub const CSRF_HEADER: &str = "X-CSRFToken";

/// Authenticated session; never leaves the gateway
#[derive(Clone, PartialEq, Eq)]
pub struct GatewaySession {
    pub session_id: String,
    pub csrf_token: String,
    pub api_version: String,
}

impl GatewaySession {
    pub(crate) fn cookie(&self) -> String {
        format!("sessionid={}", self.session_id)
    }
}

impl std::fmt::Debug for GatewaySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySession")
            .field("session_id", &"***")
            .field("csrf_token", &"***")
            .field("api_version", &self.api_version)
            .finish()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    sessionid: Option<String>,
    #[serde(default)]
    csrftoken: Option<String>,
    #[serde(default)]
    version: Option<String>,
}

/// Value of cookie `name` among the `Set-Cookie` headers
fn cookie_value(response: &Response, name: &str) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.split(';').next())
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.trim() == name)
        .map(|(_, v)| v.trim().to_string())
}

/// Open a session against `root` (scheme + host, no `/api`).
pub(crate) async fn login(
    client: &Client,
    ctx: &CallContext,
    root: &str,
    config: &AviConfig,
) -> Result<GatewaySession> {
    let url = format!("{}/login", root);
    info!("Authenticating to controller {} as {}", config.host, config.username);

    let exchange = async {
        let response = client
            .post(&url)
            .header(VERSION_HEADER, &config.version)
            .json(&LoginRequest {
                username: &config.username,
                password: &config.password,
            })
            .send()
            .await
            .map_err(|e| transport_error(e, &url))?;

        let status = response.status().as_u16();
        let cookie_session = cookie_value(&response, "sessionid");
        let cookie_csrf = cookie_value(&response, "csrftoken");
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(e, &url))?;
        Ok::<_, Error>((status, cookie_session, cookie_csrf, body))
    };

    let (status, cookie_session, cookie_csrf, body) =
        ctx.run(exchange).await.map_err(|i| interrupted(i, &url))??;

    if !(200..300).contains(&status) {
        return Err(match status {
            401 | 403 => Error::GatewayAuthentication(format!("login rejected (HTTP {})", status)),
            _ => Error::from_gateway_status(status, body),
        });
    }

    let parsed: LoginResponse = serde_json::from_str(&body).unwrap_or_default();

    let session_id = parsed
        .sessionid
        .filter(|s| !s.is_empty())
        .or(cookie_session)
        .ok_or_else(|| {
            Error::GatewayAuthentication("login response carried no session id".to_string())
        })?;

    let session = GatewaySession {
        session_id,
        csrf_token: parsed
            .csrftoken
            .filter(|s| !s.is_empty())
            .or(cookie_csrf)
            .unwrap_or_default(),
        api_version: parsed
            .version
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| config.version.clone()),
    };

    info!("Controller session established (API {})", session.api_version);
    Ok(session)
}

/// Best-effort logout; every failure is swallowed.
pub(crate) async fn logout(client: &Client, root: &str, session: &GatewaySession) {
    let url = format!("{}/logout", root);
    let mut request = client.post(&url).header(COOKIE, session.cookie());
    if !session.csrf_token.is_empty() {
        request = request.header(CSRF_HEADER, &session.csrf_token);
    }

    match request.send().await {
        Ok(response) => debug!("Controller logout returned {}", response.status()),
        Err(e) => debug!("Controller logout failed (ignored): {}", e),
    }
}
