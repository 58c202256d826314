//! Tool registry: one `ToolExecutor` over many sources.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use super::r#trait::{Tool, ToolError, ToolExecutor, ToolSpec};

/// A fixed set of in-process tools.
#[derive(Default, Clone)]
pub struct BuiltinTools {
    tools: Vec<Arc<dyn Tool>>,
}

impl BuiltinTools {
    /// Create from a list of tools.
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    /// Add a tool.
    pub fn push(&mut self, tool: Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    /// Number of tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether there are no tools.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolExecutor for BuiltinTools {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        Ok(self.tools.iter().map(|t| t.spec()).collect())
    }

    async fn execute_tool(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let tool = self
            .tools
            .iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ToolError::Unknown(name.to_string()))?;

        tool.execute(args).await.map_err(|e| ToolError::Failed {
            tool: name.to_string(),
            message: format!("{:#}", e),
        })
    }
}

/// Merges several executors. When two executors list the same tool name,
/// the one registered first owns it.
#[derive(Default)]
pub struct ToolRegistry {
    executors: Vec<Arc<dyn ToolExecutor>>,

    /// Tool name -> index into `executors`, rebuilt by `list_tools`
    owners: RwLock<HashMap<String, usize>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor. Earlier registrations take precedence.
    pub fn register(&mut self, executor: Arc<dyn ToolExecutor>) {
        self.executors.push(executor);
        self.owners.get_mut().clear();
    }

    /// Number of registered executors.
    pub fn executor_count(&self) -> usize {
        self.executors.len()
    }

    async fn owner_of(&self, name: &str) -> Result<usize, ToolError> {
        if let Some(index) = self.owners.read().await.get(name) {
            return Ok(*index);
        }

        self.list_tools().await?;
        self.owners
            .read()
            .await
            .get(name)
            .copied()
            .ok_or_else(|| ToolError::Unknown(name.to_string()))
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        let mut specs = Vec::new();
        let mut owners = HashMap::new();

        for (index, executor) in self.executors.iter().enumerate() {
            let listed = match executor.list_tools().await {
                Ok(listed) => listed,
                Err(e) => {
                    warn!(error = %e, executor = index, "Failed to list tools");
                    continue;
                }
            };

            for spec in listed {
                if owners.contains_key(&spec.name) {
                    debug!(tool = %spec.name, "Tool shadowed by an earlier executor");
                    continue;
                }
                owners.insert(spec.name.clone(), index);
                specs.push(spec);
            }
        }

        *self.owners.write().await = owners;
        Ok(specs)
    }

    async fn execute_tool(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let index = self.owner_of(name).await?;
        debug!(tool = %name, executor = index, "Executing tool");
        self.executors[index].execute_tool(name, args).await
    }
}
