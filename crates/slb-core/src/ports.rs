use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::{errors::RemoteError, Result};

/// Arguments for one Web API method call.
pub type ApiArgs = Map<String, Value>;

/// Hexagonal port for the Slack Web API.
///
/// Implementations return the raw response envelope; classifying `"ok"` is the
/// job of [`crate::remote::RemoteCaller`]. Only failures that never produced an
/// envelope (network, timeout, non-JSON body, HTTP 429) are returned as `Err`.
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn invoke(&self, method: &str, args: &ApiArgs) -> std::result::Result<Value, RemoteError>;

    /// Fetch a private file URL (`url_private_download`) as text.
    async fn download_text(&self, url: &str) -> std::result::Result<String, RemoteError>;

    /// Send file bytes to an upload URL from `files.getUploadURLExternal`.
    async fn upload_bytes(
        &self,
        upload_url: &str,
        filename: &str,
        bytes: Vec<u8>,
    ) -> std::result::Result<(), RemoteError>;
}

/// Builds a client bound to one token.
pub trait ClientFactory: Send + Sync {
    fn connect(&self, token: &str) -> Result<Arc<dyn SlackApi>>;
}
