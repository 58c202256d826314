//! In-process flow store, used offline and in tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use super::{FlowNodes, FlowStore, Result, StorageError};

#[derive(Default)]
struct Inner {
    flows: BTreeMap<String, Value>,
    next_id: u64,
}

/// Flow store kept in memory. Ids are assigned sequentially.
#[derive(Default)]
pub struct MemoryFlowStore {
    inner: Mutex<Inner>,
}

impl MemoryFlowStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored flow tabs.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.flows.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl FlowStore for MemoryFlowStore {
    async fn deploy_flows(&self, flows: &Value) -> Result<Value> {
        let items = flows.as_array().ok_or_else(|| {
            StorageError::Invalid("a full deploy expects an array of flow objects".to_string())
        })?;

        let mut inner = self.inner.lock().await;
        inner.flows.clear();
        for item in items {
            let id = match item.get("id").and_then(Value::as_str) {
                Some(id) => id.to_string(),
                None => {
                    inner.next_id += 1;
                    format!("mem-{}", inner.next_id)
                }
            };
            inner.flows.insert(id, item.clone());
        }

        Ok(json!({
            "status": "success",
            "message": "Flows deployed successfully"
        }))
    }

    async fn create_flow(&self, label: &str, nodes: FlowNodes) -> Result<Value> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let id = format!("mem-{}", inner.next_id);
        inner.flows.insert(
            id.clone(),
            json!({ "id": id, "label": label, "nodes": nodes }),
        );
        Ok(json!({ "id": id }))
    }

    async fn read_flows(&self) -> Result<Value> {
        let inner = self.inner.lock().await;
        Ok(Value::Array(inner.flows.values().cloned().collect()))
    }

    async fn read_flow(&self, id: &str) -> Result<Value> {
        self.inner
            .lock()
            .await
            .flows
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn update_flow(&self, id: &str, flow: &Value) -> Result<Value> {
        let mut inner = self.inner.lock().await;
        let slot = inner
            .flows
            .get_mut(id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))?;

        let mut flow = flow.clone();
        if let Some(obj) = flow.as_object_mut() {
            obj.insert("id".to_string(), json!(id));
        }
        *slot = flow;
        Ok(json!({ "id": id }))
    }

    async fn delete_flow(&self, id: &str) -> Result<()> {
        self.inner
            .lock()
            .await
            .flows
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }
}
