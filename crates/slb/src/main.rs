//! Slack MCP server: Slack Web API tools over stdio.

use std::sync::Arc;

use slb_core::{
    config::Config,
    tools::{ToolContext, ToolRegistry},
};
use slb_web::SlackWebFactory;
use tokio::io::BufReader;
use tracing::{info, warn};

mod rpc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    slb_core::logging::init("slack_mcp")?;

    let config = Arc::new(Config::load());
    let factory = Arc::new(SlackWebFactory::from_config(&config));
    let ctx = ToolContext::new(config.clone(), factory);

    match config.slack_token.as_deref() {
        Some(token) => {
            if let Err(e) = ctx.credentials().install(token) {
                warn!("Ignoring startup Slack token: {}", e);
            }
        }
        None => info!("No Slack token in environment; set_slack_token must be called first"),
    }

    let registry = ToolRegistry::with_defaults();
    info!(
        tools = registry.len(),
        min_interval_ms = config.min_api_interval.as_millis() as u64,
        "Slack MCP server running on stdio"
    );

    let server = Arc::new(rpc::Server::new(registry, ctx));
    rpc::serve(server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;
    Ok(())
}
