//! Agent runtime: a tool-calling loop with per-thread conversation memory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use wotpilot_core::ThreadId;
use wotpilot_tools::{ToolError, ToolExecutor};

use crate::llm::{LlmClient, LlmError};
use crate::message::ChatMessage;

/// Default bound on model calls per turn.
pub const DEFAULT_MAX_STEPS: usize = 25;

/// Messages submitted for one turn.
#[derive(Debug, Clone, Default)]
pub struct AgentRequest {
    /// New messages, usually a single user turn
    pub messages: Vec<ChatMessage>,
}

impl AgentRequest {
    /// A single user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(text)],
        }
    }
}

/// Conversation after a completed turn.
#[derive(Debug, Clone, Default)]
pub struct AgentResponse {
    /// Full thread history, last message being the final reply
    pub messages: Vec<ChatMessage>,
}

/// Errors from an agent turn.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Model call failed
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// Tools could not be listed
    #[error(transparent)]
    Tools(#[from] ToolError),

    /// The model kept calling tools past the step bound
    #[error("agent did not finish within {0} steps")]
    StepLimit(usize),

    /// The turn exceeded the configured timeout
    #[error("agent call timed out after {0:?}")]
    Timeout(Duration),
}

/// Conversational agent keyed by thread id.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Run one turn on `thread`. Turns on the same thread are serialized.
    async fn invoke(
        &self,
        request: AgentRequest,
        thread: &ThreadId,
    ) -> Result<AgentResponse, AgentError>;

    /// Forget a thread's history.
    async fn release_thread(&self, thread: &ThreadId);
}

type ThreadSlot = Arc<Mutex<Vec<ChatMessage>>>;

/// Tool-calling agent over an `LlmClient` and a `ToolExecutor`.
///
/// History lives in memory per thread id and is committed only when a turn
/// completes, so a failed turn leaves the thread as it was.
pub struct ToolAgent {
    llm: Arc<dyn LlmClient>,
    tools: Arc<dyn ToolExecutor>,
    system_prompt: String,
    max_steps: usize,
    threads: std::sync::Mutex<HashMap<ThreadId, ThreadSlot>>,
}

impl ToolAgent {
    /// Create an agent.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<dyn ToolExecutor>,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            llm,
            tools,
            system_prompt: system_prompt.into(),
            max_steps: DEFAULT_MAX_STEPS,
            threads: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Bound model calls per turn (at least one).
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Number of threads with stored history.
    pub fn thread_count(&self) -> usize {
        self.threads.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn slot(&self, thread: &ThreadId) -> ThreadSlot {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(thread.clone())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl AgentRuntime for ToolAgent {
    async fn invoke(
        &self,
        request: AgentRequest,
        thread: &ThreadId,
    ) -> Result<AgentResponse, AgentError> {
        let slot = self.slot(thread);
        let mut history = slot.lock().await;

        let mut working = history.clone();
        if working.is_empty() && !self.system_prompt.is_empty() {
            working.push(ChatMessage::system(self.system_prompt.clone()));
        }
        working.extend(request.messages);

        let tools = self.tools.list_tools().await?;

        for step in 0..self.max_steps {
            let reply = self.llm.complete(&working, &tools).await?;
            let calls = reply.tool_calls.clone();
            working.push(reply);

            if calls.is_empty() {
                debug!(thread = %thread, steps = step + 1, "Agent turn finished");
                *history = working;
                return Ok(AgentResponse {
                    messages: history.clone(),
                });
            }

            for call in calls {
                debug!(thread = %thread, tool = %call.name, "Calling tool");
                let result = match self.tools.execute_tool(&call.name, call.arguments).await {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(thread = %thread, tool = %call.name, error = %e, "Tool call failed");
                        format!("Error: {}", e)
                    }
                };
                working.push(ChatMessage::tool_result(call.id, result));
            }
        }

        Err(AgentError::StepLimit(self.max_steps))
    }

    async fn release_thread(&self, thread: &ThreadId) {
        self.threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(thread);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Role, ToolCall};
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use wotpilot_tools::ToolSpec;

    /// Replays scripted replies and records what it was sent.
    struct ScriptedLlm {
        replies: std::sync::Mutex<VecDeque<ChatMessage>>,
        seen: std::sync::Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedLlm {
        fn new(replies: Vec<ChatMessage>) -> Self {
            Self {
                replies: std::sync::Mutex::new(replies.into()),
                seen: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(
            &self,
            messages: &[ChatMessage],
            _tools: &[ToolSpec],
        ) -> Result<ChatMessage, LlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::InvalidResponse("script exhausted".to_string()))
        }

        fn model(&self) -> &str {
            "scripted"
        }
    }

    struct Lamp;

    #[async_trait]
    impl ToolExecutor for Lamp {
        async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
            Ok(vec![ToolSpec {
                name: "toggle".to_string(),
                description: "Toggle the lamp".to_string(),
                input_schema: json!({"type": "object"}),
            }])
        }

        async fn execute_tool(&self, name: &str, args: Value) -> Result<String, ToolError> {
            match name {
                "toggle" if args["on"] == json!(true) => Ok("lamp is on".to_string()),
                _ => Err(ToolError::Unknown(name.to_string())),
            }
        }
    }

    fn call(name: &str, args: Value) -> ChatMessage {
        ChatMessage::assistant_tool_calls(
            "",
            vec![ToolCall {
                id: format!("call_{}", name),
                name: name.to_string(),
                arguments: args,
            }],
        )
    }

    #[tokio::test]
    async fn test_tool_loop_then_answer() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            call("toggle", json!({"on": true})),
            ChatMessage::assistant("Turned the lamp on."),
        ]));
        let agent = ToolAgent::new(llm.clone(), Arc::new(Lamp), "system");

        let response = agent
            .invoke(AgentRequest::user("light on"), &ThreadId::user_query())
            .await
            .unwrap();

        let roles: Vec<_> = response.messages.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(response.messages[3].text(), "lamp is on");
        assert_eq!(response.messages[4].text(), "Turned the lamp on.");
    }

    #[tokio::test]
    async fn test_tool_errors_are_fed_back() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            call("explode", json!({})),
            ChatMessage::assistant("That tool does not exist."),
        ]));
        let agent = ToolAgent::new(llm, Arc::new(Lamp), "");

        let response = agent
            .invoke(AgentRequest::user("explode"), &ThreadId::user_query())
            .await
            .unwrap();
        let tool_msg = response.messages.iter().find(|m| m.role == Role::Tool).unwrap();
        assert!(tool_msg.text().starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_history_is_kept_per_thread() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            ChatMessage::assistant("one"),
            ChatMessage::assistant("two"),
            ChatMessage::assistant("three"),
        ]));
        let agent = ToolAgent::new(llm.clone(), Arc::new(Lamp), "system");
        let query = ThreadId::user_query();
        let cycle = ThreadId::automation_cycle(1);

        agent.invoke(AgentRequest::user("a"), &query).await.unwrap();
        agent.invoke(AgentRequest::user("b"), &query).await.unwrap();
        agent.invoke(AgentRequest::user("c"), &cycle).await.unwrap();

        let seen = llm.seen.lock().unwrap();
        // second turn on the query thread sees the first
        assert_eq!(seen[1].len(), 4);
        // the automation thread starts fresh
        assert_eq!(seen[2].len(), 2);
        drop(seen);

        assert_eq!(agent.thread_count(), 2);
        agent.release_thread(&cycle).await;
        assert_eq!(agent.thread_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_turn_leaves_history_untouched() {
        let llm = Arc::new(ScriptedLlm::new(vec![ChatMessage::assistant("first")]));
        let agent = ToolAgent::new(llm.clone(), Arc::new(Lamp), "system");
        let thread = ThreadId::user_query();

        agent.invoke(AgentRequest::user("a"), &thread).await.unwrap();
        assert!(agent.invoke(AgentRequest::user("b"), &thread).await.is_err());

        // retry sees only the committed first turn
        let _ = agent.invoke(AgentRequest::user("c"), &thread).await;
        let seen = llm.seen.lock().unwrap();
        assert_eq!(seen[2].len(), 4);
        assert_eq!(seen[2][3].text(), "c");
    }

    #[tokio::test]
    async fn test_step_limit() {
        let llm = Arc::new(ScriptedLlm::new(vec![
            call("toggle", json!({"on": true})),
            call("toggle", json!({"on": true})),
        ]));
        let agent = ToolAgent::new(llm, Arc::new(Lamp), "").with_max_steps(2);

        let err = agent
            .invoke(AgentRequest::user("loop"), &ThreadId::user_query())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::StepLimit(2)));
    }
}
