//! Tool handlers exposed to the assistant runtime.
//!
//! Each handler is stateless: validate → call Slack through the context → format.
//! Failures travel as [`Error`] and are rendered into text by the registry.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::{
    config::Config,
    credential::CredentialHolder,
    errors::Error,
    ports::{ApiArgs, ClientFactory, SlackApi},
    rate_gate::RateGate,
    remote::RemoteCaller,
    Result,
};

pub mod args;
pub mod auth;
pub mod channels;
pub mod files;
pub mod messages;
pub mod registry;
pub mod schema;
pub mod users;

pub use args::ToolArgs;
pub use registry::ToolRegistry;

/// Result of one tool invocation: display text plus an error flag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }

    pub fn from_error(err: &Error) -> Self {
        Self::failure(err.display_text())
    }
}

/// Process-wide state every handler reads: config, credential, rate gate.
pub struct ToolContext {
    config: Arc<Config>,
    caller: RemoteCaller,
    credentials: CredentialHolder,
}

impl ToolContext {
    pub fn new(config: Arc<Config>, factory: Arc<dyn ClientFactory>) -> Self {
        let gate = Arc::new(RateGate::new(config.min_api_interval));
        Self {
            config,
            caller: RemoteCaller::new(gate),
            credentials: CredentialHolder::new(factory),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn credentials(&self) -> &CredentialHolder {
        &self.credentials
    }

    pub fn caller(&self) -> &RemoteCaller {
        &self.caller
    }

    /// Bind the active client, or fail with [`Error::NotConfigured`].
    pub fn session(&self) -> Result<Session<'_>> {
        Ok(Session {
            caller: &self.caller,
            client: self.credentials.client()?,
        })
    }
}

/// The active client paired with the rate-limited caller.
pub struct Session<'a> {
    caller: &'a RemoteCaller,
    client: Arc<dyn SlackApi>,
}

impl Session<'_> {
    pub async fn call(&self, method: &str, args: ApiArgs) -> Result<Value> {
        Ok(self.caller.call(self.client.as_ref(), method, &args).await?)
    }

    pub async fn download_text(&self, url: &str) -> Result<String> {
        Ok(self.caller.download_text(self.client.as_ref(), url).await?)
    }

    pub async fn upload_bytes(&self, upload_url: &str, filename: &str, bytes: Vec<u8>) -> Result<()> {
        Ok(self
            .caller
            .upload_bytes(self.client.as_ref(), upload_url, filename, bytes)
            .await?)
    }
}

/// One tool exposed over the protocol.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used for dispatch.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// JSON Schema for the tool's arguments.
    fn input_schema(&self) -> Value;

    async fn run(&self, ctx: &ToolContext, args: ToolArgs) -> Result<String>;
}

/// Build Web API arguments, skipping `None` values.
#[derive(Debug, Default)]
pub struct ApiArgsBuilder(ApiArgs);

impl ApiArgsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn set_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    pub fn build(self) -> ApiArgs {
        self.0
    }
}

pub fn api_args() -> ApiArgsBuilder {
    ApiArgsBuilder::new()
}
