//! Slack Web API adapter (reqwest).
//!
//! Implements the `SlackApi` port: form-encoded POSTs with bearer auth, plus
//! the two raw transfers file tools need (private downloads, upload URLs).

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde_json::Value;
use slb_core::{
    config::Config,
    errors::{Error, RemoteError},
    ports::{ApiArgs, ClientFactory, SlackApi},
    Result,
};
use tracing::debug;

const ERROR_BODY_PREVIEW: usize = 200;

#[derive(Clone)]
pub struct SlackWebClient {
    token: String,
    base_url: String,
    http: reqwest::Client,
}

impl std::fmt::Debug for SlackWebClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackWebClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SlackWebClient {
    pub fn new(
        token: impl Into<String>,
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }
}

/// Flatten arguments into form fields. Strings pass through; everything else
/// (numbers, booleans, `blocks` arrays) is JSON-encoded.
pub fn form_pairs(args: &ApiArgs) -> Vec<(String, String)> {
    args.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

/// Turn an HTTP response body into a Web API envelope.
///
/// Classification of `ok` happens in the core; this only decides whether the
/// body is an envelope at all.
pub fn interpret_body(
    status: StatusCode,
    retry_after: Option<&str>,
    body: &str,
) -> std::result::Result<Value, RemoteError> {
    match serde_json::from_str::<Value>(body) {
        Ok(v) if v.is_object() => Ok(v),
        _ if status == StatusCode::TOO_MANY_REQUESTS => {
            let message = match retry_after {
                Some(secs) => format!("rate limited by Slack; retry after {secs}s"),
                None => "rate limited by Slack".to_string(),
            };
            Err(RemoteError::rejected("ratelimited", message))
        }
        _ => Err(RemoteError::Transport(format!(
            "non-JSON response (HTTP {status}): {}",
            body.chars().take(ERROR_BODY_PREVIEW).collect::<String>()
        ))),
    }
}

fn transport(context: &str, e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Transport(format!("{context}: request timed out"))
    } else {
        RemoteError::Transport(format!("{context}: {e}"))
    }
}

async fn ensure_success(
    context: &str,
    resp: reqwest::Response,
) -> std::result::Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RemoteError::Transport(format!(
        "{context} failed: HTTP {status} {}",
        body.chars().take(ERROR_BODY_PREVIEW).collect::<String>()
    )))
}

#[async_trait]
impl SlackApi for SlackWebClient {
    async fn invoke(&self, method: &str, args: &ApiArgs) -> std::result::Result<Value, RemoteError> {
        debug!(method, "Slack API request");
        let resp = self
            .http
            .post(self.method_url(method))
            .bearer_auth(&self.token)
            .form(&form_pairs(args))
            .send()
            .await
            .map_err(|e| transport(method, e))?;

        let status = resp.status();
        let retry_after = resp
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = resp.text().await.map_err(|e| transport(method, e))?;
        interpret_body(status, retry_after.as_deref(), &body)
    }

    async fn download_text(&self, url: &str) -> std::result::Result<String, RemoteError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| transport("file download", e))?;
        let resp = ensure_success("file download", resp).await?;
        resp.text().await.map_err(|e| transport("file download", e))
    }

    async fn upload_bytes(
        &self,
        upload_url: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> std::result::Result<(), RemoteError> {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let resp = self
            .http
            .post(upload_url)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport("file upload", e))?;
        ensure_success("file upload", resp).await?;
        Ok(())
    }
}

/// Builds one [`SlackWebClient`] per credential from the loaded config.
#[derive(Clone, Debug)]
pub struct SlackWebFactory {
    base_url: String,
    user_agent: String,
    timeout: Duration,
}

impl SlackWebFactory {
    pub fn from_config(config: &Config) -> Self {
        Self {
            base_url: config.api_base_url.clone(),
            user_agent: config.user_agent.clone(),
            timeout: config.request_timeout,
        }
    }
}

impl ClientFactory for SlackWebFactory {
    fn connect(&self, token: &str) -> Result<Arc<dyn SlackApi>> {
        let client = SlackWebClient::new(token, &self.base_url, &self.user_agent, self.timeout)?;
        Ok(Arc::new(client))
    }
}
