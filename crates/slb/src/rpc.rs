//! MCP over stdio: newline-delimited JSON-RPC 2.0.
//!
//! Requests are read in order; every `tools/call` runs on its own task and all
//! responses go through a single writer task so lines never interleave.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use slb_core::tools::{ToolContext, ToolRegistry};
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt},
    sync::mpsc,
};
use tracing::{debug, warn};

pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "slack";

const PARSE_ERROR: i64 = -32700;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
pub struct RpcRequest {
    #[allow(dead_code)]
    pub jsonrpc: Option<String>,
    pub id: Option<Value>,
    pub method: String,
    pub params: Option<Value>,
}

#[derive(Debug, Serialize)]
pub struct RpcResponse {
    jsonrpc: &'static str,
    id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<Value>,
}

fn respond_ok(id: Value, result: Value) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0",
        id,
        result: Some(result),
        error: None,
    }
}

fn respond_err(id: Value, code: i64, message: &str) -> RpcResponse {
    RpcResponse {
        jsonrpc: "2.0",
        id,
        result: None,
        error: Some(json!({ "code": code, "message": message })),
    }
}

/// Registry plus the state its tools share.
pub struct Server {
    registry: ToolRegistry,
    ctx: ToolContext,
}

impl Server {
    pub fn new(registry: ToolRegistry, ctx: ToolContext) -> Self {
        Self { registry, ctx }
    }
}

pub async fn handle_rpc(server: &Server, req: RpcRequest) -> Option<RpcResponse> {
    // Notifications have no id => no response.
    let id = req.id?;

    match req.method.as_str() {
        "initialize" => {
            let proto = req
                .params
                .as_ref()
                .and_then(|p| p.get("protocolVersion"))
                .and_then(|v| v.as_str())
                .unwrap_or(DEFAULT_PROTOCOL_VERSION);

            Some(respond_ok(
                id,
                json!({
                  "protocolVersion": proto,
                  "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
                  "capabilities": { "tools": {} }
                }),
            ))
        }

        "ping" => Some(respond_ok(id, json!({}))),

        "tools/list" => Some(respond_ok(
            id,
            json!({ "tools": server.registry.descriptors() }),
        )),

        "tools/call" => {
            let Some(params) = req.params.as_ref() else {
                return Some(respond_err(id, INVALID_PARAMS, "Missing params"));
            };
            let Some(name) = params.get("name").and_then(|v| v.as_str()) else {
                return Some(respond_err(id, INVALID_PARAMS, "Missing tool name"));
            };
            let args = params.get("arguments").cloned().unwrap_or(Value::Null);

            match server.registry.call(&server.ctx, name, args).await {
                Some(out) => Some(respond_ok(
                    id,
                    json!({
                      "content": [{ "type": "text", "text": out.text }],
                      "isError": out.is_error
                    }),
                )),
                None => Some(respond_err(
                    id,
                    INVALID_PARAMS,
                    &format!("Unknown tool: {name}"),
                )),
            }
        }

        other => {
            debug!("Unsupported method: {}", other);
            Some(respond_err(id, METHOD_NOT_FOUND, "Method not found"))
        }
    }
}

fn encode(resp: &RpcResponse) -> Option<String> {
    match serde_json::to_string(resp) {
        Ok(s) => Some(s),
        Err(e) => {
            warn!("Failed to encode response: {}", e);
            None
        }
    }
}

/// Serve until `reader` hits EOF and every in-flight call has answered.
/// Returns the writer once it has been flushed.
pub async fn serve<R, W>(server: Arc<Server>, reader: R, mut writer: W) -> anyhow::Result<W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<String>(64);

    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<W, std::io::Error>(writer)
    });

    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let req = match serde_json::from_str::<RpcRequest>(&line) {
            Ok(v) => v,
            Err(e) => {
                debug!("Unparseable request line: {}", e);
                if let Some(out) = encode(&respond_err(Value::Null, PARSE_ERROR, "Parse error")) {
                    let _ = tx.send(out).await;
                }
                continue;
            }
        };

        if req.method == "tools/call" {
            let server = server.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(out) = handle_rpc(&server, req).await.as_ref().and_then(encode) {
                    let _ = tx.send(out).await;
                }
            });
        } else if let Some(out) = handle_rpc(&server, req).await.as_ref().and_then(encode) {
            let _ = tx.send(out).await;
        }
    }

    drop(tx);
    let writer = writer_task.await??;
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use slb_core::config::Config;
    use slb_web::SlackWebFactory;
    use tokio::io::BufReader;

    use super::*;

    fn server() -> Server {
        let config = Arc::new(Config {
            min_api_interval: Duration::ZERO,
            ..Config::default()
        });
        let factory = Arc::new(SlackWebFactory::from_config(&config));
        Server::new(ToolRegistry::with_defaults(), ToolContext::new(config, factory))
    }

    fn request(id: Option<Value>, method: &str, params: Option<Value>) -> RpcRequest {
        RpcRequest {
            jsonrpc: Some("2.0".to_string()),
            id,
            method: method.to_string(),
            params,
        }
    }

    #[tokio::test]
    async fn initialize_echoes_protocol_version() {
        let s = server();
        let resp = handle_rpc(
            &s,
            request(
                Some(json!(1)),
                "initialize",
                Some(json!({"protocolVersion": "2025-03-26"})),
            ),
        )
        .await
        .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], "2025-03-26");
        assert_eq!(result["serverInfo"]["name"], "slack");
        assert!(result["capabilities"]["tools"].is_object());

        let resp = handle_rpc(&s, request(Some(json!(2)), "initialize", None))
            .await
            .unwrap();
        assert_eq!(resp.result.unwrap()["protocolVersion"], DEFAULT_PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn tools_list_contains_slack_tools() {
        let s = server();
        let resp = handle_rpc(&s, request(Some(json!(1)), "tools/list", None))
            .await
            .unwrap();
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().clone();
        assert!(tools
            .iter()
            .any(|t| t.get("name").and_then(|n| n.as_str()) == Some("send_message")));
        assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let s = server();
        assert!(handle_rpc(&s, request(None, "notifications/initialized", None))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn unknown_method_and_tool_errors() {
        let s = server();
        let resp = handle_rpc(&s, request(Some(json!(1)), "resources/list", None))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap()["code"], METHOD_NOT_FOUND);

        let resp = handle_rpc(
            &s,
            request(Some(json!(2)), "tools/call", Some(json!({"name": "nope"}))),
        )
        .await
        .unwrap();
        assert_eq!(resp.error.unwrap()["code"], INVALID_PARAMS);

        let resp = handle_rpc(&s, request(Some(json!(3)), "tools/call", None))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap()["code"], INVALID_PARAMS);
    }

    #[tokio::test]
    async fn tool_failures_are_results_not_rpc_errors() {
        let s = server();
        let resp = handle_rpc(
            &s,
            request(
                Some(json!("abc")),
                "tools/call",
                Some(json!({"name": "list_channels", "arguments": {}})),
            ),
        )
        .await
        .unwrap();
        assert!(resp.error.is_none());
        assert_eq!(resp.id, json!("abc"));
        let result = resp.result.unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("❌ Not Configured:"));
    }

    #[tokio::test]
    async fn serve_answers_each_line_and_reports_parse_errors() {
        let input = concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"ping\"}\n",
            "\n",
            "not json\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/call\",\"params\":{\"name\":\"get_user_info\",\"arguments\":{\"user\":\"U1\"}}}\n",
        );
        let out = serve(
            Arc::new(server()),
            BufReader::new(input.as_bytes()),
            Vec::new(),
        )
        .await
        .unwrap();

        let lines: Vec<Value> = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);

        let by_id = |id: Value| lines.iter().find(|l| l["id"] == id).unwrap();
        assert_eq!(by_id(json!(1))["result"], json!({}));
        assert_eq!(by_id(Value::Null)["error"]["code"], PARSE_ERROR);
        assert_eq!(by_id(json!(2))["result"]["isError"], true);
    }
}
