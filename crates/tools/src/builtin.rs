//! Built-in Node-RED flow tools (get/create/update/delete flows).

use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use wotpilot_storage::FlowStore;

use super::r#trait::Tool;

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, anyhow::Error> {
    args.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| anyhow::anyhow!("missing required string argument '{}'", key))
}

fn pretty(value: &Value) -> Result<String, anyhow::Error> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Every built-in flow tool, bound to one store.
pub fn flow_tools(store: Arc<dyn FlowStore>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(GetFlowsTool::new(store.clone())),
        Arc::new(GetFlowTool::new(store.clone())),
        Arc::new(CreateFlowTool::new(store.clone())),
        Arc::new(UpdateFlowTool::new(store.clone())),
        Arc::new(DeleteFlowTool::new(store)),
    ]
}

/// Read every deployed flow.
pub struct GetFlowsTool {
    store: Arc<dyn FlowStore>,
}

impl GetFlowsTool {
    /// Bind to a store.
    pub fn new(store: Arc<dyn FlowStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetFlowsTool {
    fn name(&self) -> &str {
        "get-flows"
    }

    fn description(&self) -> &str {
        "List every Node-RED flow currently deployed"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn execute(&self, _args: Value) -> Result<String, anyhow::Error> {
        pretty(&self.store.read_flows().await?)
    }
}

/// Read one flow tab.
pub struct GetFlowTool {
    store: Arc<dyn FlowStore>,
}

impl GetFlowTool {
    /// Bind to a store.
    pub fn new(store: Arc<dyn FlowStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for GetFlowTool {
    fn name(&self) -> &str {
        "get-flow"
    }

    fn description(&self) -> &str {
        "Read one Node-RED flow tab by id"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Flow tab id" }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, anyhow::Error> {
        let id = required_str(&args, "id")?;
        pretty(&self.store.read_flow(id).await?)
    }
}

/// Create a new flow tab.
pub struct CreateFlowTool {
    store: Arc<dyn FlowStore>,
}

impl CreateFlowTool {
    /// Bind to a store.
    pub fn new(store: Arc<dyn FlowStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for CreateFlowTool {
    fn name(&self) -> &str {
        "create-flow"
    }

    fn description(&self) -> &str {
        "Create a new Node-RED flow tab. Provide a label and the array of nodes; \
         each node needs a type, a name and its wires"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "label": { "type": "string", "description": "Name of the flow" },
                "nodes": {
                    "type": "array",
                    "description": "Node objects making up the flow",
                    "items": { "type": "object" }
                }
            },
            "required": ["label", "nodes"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, anyhow::Error> {
        let label = required_str(&args, "label")?;
        let nodes = args
            .get("nodes")
            .and_then(Value::as_array)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required array argument 'nodes'"))?;

        let reply = self.store.create_flow(label, nodes).await?;
        Ok(format!("Created flow '{}': {}", label, reply))
    }
}

/// Replace one flow tab.
pub struct UpdateFlowTool {
    store: Arc<dyn FlowStore>,
}

impl UpdateFlowTool {
    /// Bind to a store.
    pub fn new(store: Arc<dyn FlowStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for UpdateFlowTool {
    fn name(&self) -> &str {
        "update-flow"
    }

    fn description(&self) -> &str {
        "Replace an existing Node-RED flow tab with a new definition"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Flow tab id" },
                "flow": {
                    "type": "object",
                    "description": "Complete flow object (label, nodes, ...)"
                }
            },
            "required": ["id", "flow"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, anyhow::Error> {
        let id = required_str(&args, "id")?;
        let flow = args
            .get("flow")
            .filter(|f| f.is_object())
            .ok_or_else(|| anyhow::anyhow!("missing required object argument 'flow'"))?;

        let reply = self.store.update_flow(id, flow).await?;
        Ok(format!("Updated flow {}: {}", id, reply))
    }
}

/// Delete one flow tab.
pub struct DeleteFlowTool {
    store: Arc<dyn FlowStore>,
}

impl DeleteFlowTool {
    /// Bind to a store.
    pub fn new(store: Arc<dyn FlowStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Tool for DeleteFlowTool {
    fn name(&self) -> &str {
        "delete-flow"
    }

    fn description(&self) -> &str {
        "Delete a Node-RED flow tab by id"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Flow tab id" }
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, args: Value) -> Result<String, anyhow::Error> {
        let id = required_str(&args, "id")?;
        self.store.delete_flow(id).await?;
        Ok(format!("Deleted flow {}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wotpilot_storage::MemoryFlowStore;

    fn store() -> Arc<dyn FlowStore> {
        Arc::new(MemoryFlowStore::new())
    }

    #[test]
    fn test_tool_names() {
        let names: Vec<_> = flow_tools(store())
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["get-flows", "get-flow", "create-flow", "update-flow", "delete-flow"]
        );
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = store();
        let create = CreateFlowTool::new(store.clone());
        let out = create
            .execute(json!({
                "label": "Blink LEDs",
                "nodes": [{"type": "inject", "name": "Trigger", "wires": [[]]}]
            }))
            .await
            .unwrap();
        assert!(out.contains("Blink LEDs"));

        let listed = GetFlowsTool::new(store).execute(json!({})).await.unwrap();
        assert!(listed.contains("Trigger"));
    }

    #[tokio::test]
    async fn test_create_requires_nodes() {
        let create = CreateFlowTool::new(store());
        let err = create
            .execute(json!({ "label": "No nodes" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nodes"));
    }

    #[tokio::test]
    async fn test_delete_missing_flow_fails() {
        let delete = DeleteFlowTool::new(store());
        assert!(delete.execute(json!({ "id": "missing" })).await.is_err());
        assert!(delete.execute(json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_update_flow() {
        let store = store();
        let reply = store.create_flow("a", vec![]).await.unwrap();
        let id = reply["id"].as_str().unwrap().to_string();

        UpdateFlowTool::new(store.clone())
            .execute(json!({ "id": id, "flow": { "label": "b", "nodes": [] } }))
            .await
            .unwrap();

        let out = GetFlowTool::new(store)
            .execute(json!({ "id": id }))
            .await
            .unwrap();
        assert!(out.contains("\"b\""));
    }
}
