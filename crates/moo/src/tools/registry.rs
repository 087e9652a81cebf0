use std::fmt::Debug;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::errors::{ToolError, ToolResult};
use crate::models::tool::Tool;

/// The capability behind a tool: arguments in, text out.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, arguments: &Map<String, Value>) -> ToolResult<String>;
}

struct FnExecutor<F>(F);

#[async_trait]
impl<F> ToolExecutor for FnExecutor<F>
where
    F: Fn(&Map<String, Value>) -> ToolResult<String> + Send + Sync,
{
    async fn execute(&self, arguments: &Map<String, Value>) -> ToolResult<String> {
        (self.0)(arguments)
    }
}

/// A tool schema paired with the executor that powers it
#[derive(Clone)]
pub struct ToolDefinition {
    pub tool: Tool,
    pub executor: Arc<dyn ToolExecutor>,
}

impl ToolDefinition {
    pub fn new(tool: Tool, executor: Arc<dyn ToolExecutor>) -> Self {
        Self { tool, executor }
    }

    /// Build a definition around a synchronous closure
    pub fn from_fn<F>(tool: Tool, function: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> ToolResult<String> + Send + Sync + 'static,
    {
        Self::new(tool, Arc::new(FnExecutor(function)))
    }

    pub fn name(&self) -> &str {
        &self.tool.name
    }
}

impl Debug for ToolDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("tool", &self.tool)
            .field("executor", &"<executor>")
            .finish()
    }
}

/// The catalog of tools the model may call, keyed by name
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: ToolDefinition) -> Result<()> {
        if self.get(definition.name()).is_some() {
            return Err(anyhow!("Duplicate tool name: {}", definition.name()));
        }
        self.definitions.push(definition);
        Ok(())
    }

    pub fn with_tool(mut self, definition: ToolDefinition) -> Result<Self> {
        self.register(definition)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name() == name)
    }

    /// The schemas sent to the provider, in registration order
    pub fn describe(&self) -> Vec<Tool> {
        self.definitions.iter().map(|d| d.tool.clone()).collect()
    }

    pub async fn dispatch(&self, name: &str, arguments: &Value) -> ToolResult<String> {
        let definition = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;

        let arguments = match arguments {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            other => {
                return Err(ToolError::InvalidArgument(format!(
                    "arguments for {} must be a JSON object, got: {}",
                    name, other
                )))
            }
        };

        definition.executor.execute(&arguments).await
    }
}
