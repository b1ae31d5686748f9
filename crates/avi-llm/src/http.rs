//! HTTP plumbing shared by the adapters

use std::time::Duration;

use avi_core::{CallContext, Conversation, Error, Interrupted, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// `{role, content}` as both backends expect it
#[derive(Debug, Serialize)]
pub(crate) struct WireMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

pub(crate) fn wire_messages(conversation: &Conversation) -> Vec<WireMessage<'_>> {
    conversation
        .turns()
        .iter()
        .map(|turn| WireMessage {
            role: turn.role.as_str(),
            content: &turn.content,
        })
        .collect()
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::config(format!("failed to build model HTTP client: {}", e)))
}

pub(crate) fn transport_error(err: reqwest::Error, url: &str) -> Error {
    if err.is_timeout() {
        Error::model_timeout(format!("{}: {}", url, err))
    } else {
        Error::upstream(format!("{}: {}", url, err))
    }
}

pub(crate) fn interrupted(reason: Interrupted, url: &str) -> Error {
    match reason {
        Interrupted::Cancelled => Error::Cancelled(format!("model call to {}", url)),
        Interrupted::DeadlineExceeded => {
            Error::model_timeout(format!("deadline exceeded calling {}", url))
        }
    }
}

/// Send, require a 2xx and decode the JSON body, all under `ctx`.
pub(crate) async fn exchange<T: DeserializeOwned>(
    ctx: &CallContext,
    request: RequestBuilder,
    url: &str,
) -> Result<T> {
    let call = async {
        let response = request.send().await.map_err(|e| transport_error(e, url))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| transport_error(e, url))?;
        debug!(%url, status = status.as_u16(), bytes = body.len(), "model backend response");

        if !status.is_success() {
            return Err(Error::upstream_status(status.as_u16(), body));
        }
        serde_json::from_str(&body)
            .map_err(|e| Error::upstream(format!("undecodable reply from {}: {}", url, e)))
    };

    ctx.run(call).await.map_err(|i| interrupted(i, url))?
}

/// Trim a trailing slash so endpoint paths can be appended
pub(crate) fn base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
