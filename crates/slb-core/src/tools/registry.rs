//! Tool registry: ordered catalogue plus name dispatch.

use std::{collections::HashMap, sync::Arc};

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::{auth, channels, files, messages, users, Tool, ToolArgs, ToolContext, ToolOutput};

/// What `tools/list` reports for one tool.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

/// Tools by name, keeping registration order for listing.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<&'static str, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every Slack tool this server offers.
    pub fn with_defaults() -> Self {
        let mut reg = Self::new();
        auth::register(&mut reg);
        messages::register(&mut reg);
        channels::register(&mut reg);
        users::register(&mut reg);
        files::register(&mut reg);
        info!(count = reg.len(), "Tool registry ready");
        reg
    }

    /// Register a tool. A tool with the same name is replaced in place.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name();
        debug!("Registering tool: {}", name);
        let tool: Arc<dyn Tool> = Arc::new(tool);
        match self.index.get(name) {
            Some(&i) => self.tools[i] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|t| ToolDescriptor {
                name: t.name(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Run `name` with raw JSON arguments. `None` when no such tool exists.
    ///
    /// Every failure is rendered into a failure [`ToolOutput`]; nothing escapes
    /// as an `Err`.
    pub async fn call(&self, ctx: &ToolContext, name: &str, args: Value) -> Option<ToolOutput> {
        let tool = self.get(name)?;
        debug!("Executing tool '{}'", name);

        let result = match ToolArgs::from_value(args) {
            Ok(args) => tool.run(ctx, args).await,
            Err(e) => Err(e),
        };

        let output = match result {
            Ok(text) => ToolOutput::success(text),
            Err(e) => {
                debug!("Tool '{}' failed: {}", name, e.category());
                ToolOutput::from_error(&e)
            }
        };
        Some(output)
    }
}
