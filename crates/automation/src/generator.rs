//! Node-RED flow generation from natural-language requests.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::{info, warn};
use wotpilot_ai::{AgentError, AgentInvoker};
use wotpilot_core::ThreadId;
use wotpilot_storage::{FlowStore, StorageError};

fn fenced_block() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| {
            // a fenced block whose body is a JSON array
            Regex::new(r"(?s)```[a-zA-Z]*\s*(\[.*?\])\s*```").ok()
        })
        .as_ref()
}

/// Pull a Node-RED flow (a JSON array of node objects) out of a model reply.
///
/// Accepts a bare array, an array inside a markdown code fence, or an array
/// embedded in surrounding prose.
pub fn parse_flow(reply: &str) -> Option<Vec<Value>> {
    let trimmed = reply.trim();

    let candidates = [
        Some(trimmed),
        fenced_block()
            .and_then(|re| re.captures(trimmed))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str()),
        match (trimmed.find('['), trimmed.rfind(']')) {
            (Some(start), Some(end)) if start < end => Some(&trimmed[start..=end]),
            _ => None,
        },
    ];

    candidates.into_iter().flatten().find_map(|candidate| {
        match serde_json::from_str::<Value>(candidate) {
            Ok(Value::Array(nodes)) if nodes.iter().all(Value::is_object) => Some(nodes),
            _ => None,
        }
    })
}

/// Label of the first tab object, if any.
pub fn tab_label(flow: &[Value]) -> Option<String> {
    flow.iter()
        .find(|node| node.get("type").and_then(Value::as_str) == Some("tab"))
        .and_then(|tab| tab.get("label"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Nodes to place inside a new flow tab (tab objects removed).
pub fn tab_nodes(flow: &[Value]) -> Vec<Value> {
    flow.iter()
        .filter(|node| node.get("type").and_then(Value::as_str) != Some("tab"))
        .cloned()
        .collect()
}

/// A generated flow.
#[derive(Debug, Clone)]
pub struct GeneratedFlow {
    /// Raw reply text
    pub reply: String,
    /// Parsed flow, when the reply held one
    pub flow: Option<Vec<Value>>,
}

impl GeneratedFlow {
    /// Pretty-printed flow JSON, or the raw reply when unparseable.
    pub fn render(&self) -> String {
        self.flow
            .as_ref()
            .and_then(|flow| serde_json::to_string_pretty(flow).ok())
            .unwrap_or_else(|| self.reply.clone())
    }
}

/// Turns requests into flows via the agent on the generator thread.
pub struct FlowGenerator {
    invoker: AgentInvoker,
}

impl FlowGenerator {
    /// Create a generator. The invoker's runtime should carry the flow
    /// generator system prompt.
    pub fn new(invoker: AgentInvoker) -> Self {
        Self { invoker }
    }

    /// Ask the agent for a flow.
    pub async fn generate(&self, request: &str) -> Result<GeneratedFlow, AgentError> {
        let reply = self
            .invoker
            .invoke(request, &ThreadId::workflow_generator())
            .await?;
        let flow = parse_flow(&reply);
        if flow.is_none() {
            warn!("Generated reply holds no flow JSON");
        }
        Ok(GeneratedFlow { reply, flow })
    }

    /// Create a new flow tab from a generated flow.
    pub async fn deploy(
        &self,
        store: &dyn FlowStore,
        flow: &[Value],
        label: Option<&str>,
    ) -> Result<Value, StorageError> {
        let nodes = tab_nodes(flow);
        if nodes.is_empty() {
            return Err(StorageError::Invalid("generated flow has no nodes".to_string()));
        }

        let label = label
            .map(str::to_string)
            .or_else(|| tab_label(flow))
            .unwrap_or_else(|| "Generated flow".to_string());

        let reply = store.create_flow(&label, nodes).await?;
        info!(label = %label, "Generated flow deployed");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;
    use wotpilot_ai::{AgentRequest, AgentResponse, AgentRuntime, ChatMessage};
    use wotpilot_storage::MemoryFlowStore;

    const FLOW: &str = r#"[
        {"id": "t1", "type": "tab", "label": "Washer LEDs"},
        {"id": "n1", "type": "inject", "z": "t1", "name": "Trigger", "wires": [["n2"]]},
        {"id": "n2", "type": "http request", "z": "t1", "name": "Blink", "wires": [[]]}
    ]"#;

    #[test]
    fn test_parse_bare_array() {
        assert_eq!(parse_flow(FLOW).unwrap().len(), 3);
    }

    #[test]
    fn test_parse_fenced_array() {
        let reply = format!("Here is your flow:\n```json\n{}\n```\nImport it.", FLOW);
        let flow = parse_flow(&reply).unwrap();
        assert_eq!(tab_label(&flow).as_deref(), Some("Washer LEDs"));
        assert_eq!(tab_nodes(&flow).len(), 2);
    }

    #[test]
    fn test_parse_rejects_non_flows() {
        assert!(parse_flow("I could not build that flow.").is_none());
        assert!(parse_flow("[1, 2, 3]").is_none());
        assert!(parse_flow(r#"{"id": "x"}"#).is_none());
    }

    struct Generator;

    #[async_trait]
    impl AgentRuntime for Generator {
        async fn invoke(
            &self,
            _request: AgentRequest,
            thread: &ThreadId,
        ) -> Result<AgentResponse, AgentError> {
            assert_eq!(thread.as_str(), "workflow_generator");
            Ok(AgentResponse {
                messages: vec![ChatMessage::assistant(format!("```json\n{}\n```", FLOW))],
            })
        }

        async fn release_thread(&self, _thread: &ThreadId) {}
    }

    #[tokio::test]
    async fn test_generate_and_deploy() {
        let generator = FlowGenerator::new(AgentInvoker::new(Arc::new(Generator)));
        let generated = generator.generate("blink LEDs when the washer finishes").await.unwrap();
        let flow = generated.flow.clone().unwrap();
        assert!(generated.render().contains("\"Washer LEDs\""));

        let store = MemoryFlowStore::new();
        let reply = generator.deploy(&store, &flow, None).await.unwrap();
        let stored = store.read_flow(reply["id"].as_str().unwrap()).await.unwrap();
        assert_eq!(stored["label"], "Washer LEDs");
        assert_eq!(stored["nodes"].as_array().unwrap().len(), 2);

        let only_tab = vec![json!({"id": "t", "type": "tab"})];
        assert!(generator.deploy(&store, &only_tab, Some("x")).await.is_err());
    }
}
