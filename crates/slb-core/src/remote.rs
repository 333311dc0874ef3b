use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    errors::RemoteError,
    ports::{ApiArgs, SlackApi},
    rate_gate::RateGate,
};

/// Rate-limited wrapper around every outbound Slack call.
///
/// Classifies each outcome as success, [`RemoteError::Rejected`] or
/// [`RemoteError::Transport`]. Never retries.
#[derive(Clone, Debug)]
pub struct RemoteCaller {
    gate: Arc<RateGate>,
}

impl RemoteCaller {
    pub fn new(gate: Arc<RateGate>) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    pub async fn call(
        &self,
        client: &dyn SlackApi,
        method: &str,
        args: &ApiArgs,
    ) -> Result<Value, RemoteError> {
        self.gate.acquire().await;
        debug!(method, "slack call");

        let outcome = match client.invoke(method, args).await {
            Ok(raw) => classify(raw),
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            warn!(method, "slack call failed: {e}");
        }
        outcome
    }

    pub async fn download_text(
        &self,
        client: &dyn SlackApi,
        url: &str,
    ) -> Result<String, RemoteError> {
        self.gate.acquire().await;
        debug!("slack file download");
        client.download_text(url).await.map_err(|e| {
            warn!("slack file download failed: {e}");
            e
        })
    }

    pub async fn upload_bytes(
        &self,
        client: &dyn SlackApi,
        upload_url: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<(), RemoteError> {
        self.gate.acquire().await;
        debug!(filename, size = bytes.len(), "slack file upload");
        client
            .upload_bytes(upload_url, filename, bytes)
            .await
            .map_err(|e| {
                warn!("slack file upload failed: {e}");
                e
            })
    }
}

/// Split a Web API envelope into success or rejection.
pub fn classify(raw: Value) -> Result<Value, RemoteError> {
    match raw.get("ok").and_then(|v| v.as_bool()) {
        Some(true) => Ok(raw),
        Some(false) => {
            let code = raw
                .get("error")
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .unwrap_or("unknown_error")
                .to_string();
            let message = rejection_message(&raw, &code);
            Err(RemoteError::Rejected { code, message })
        }
        None => Err(RemoteError::Transport(
            "malformed response: missing `ok` field".to_string(),
        )),
    }
}

fn rejection_message(raw: &Value, code: &str) -> String {
    let mut parts = Vec::new();

    if let Some(msgs) = raw
        .pointer("/response_metadata/messages")
        .and_then(|v| v.as_array())
    {
        parts.extend(msgs.iter().filter_map(|m| m.as_str()).map(|s| s.to_string()));
    }
    if let Some(needed) = raw.get("needed").and_then(|v| v.as_str()) {
        parts.push(format!("needed scope: {needed}"));
    }
    if let Some(provided) = raw.get("provided").and_then(|v| v.as_str()) {
        parts.push(format!("provided scopes: {provided}"));
    }
    if parts.is_empty() {
        if let Some(warning) = raw.get("warning").and_then(|v| v.as_str()) {
            parts.push(format!("warning: {warning}"));
        }
    }

    if parts.is_empty() {
        code.to_string()
    } else {
        parts.join("; ")
    }
}
