//! Agent invoker: one prompt in, final reply text out.

use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use wotpilot_core::ThreadId;

use crate::message::{ChatMessage, Role};
use crate::runtime::{AgentError, AgentRequest, AgentRuntime};

/// Default bound on a single agent call.
pub const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Timeout from a seconds setting; `0` disables it.
pub fn timeout_from_secs(secs: u64) -> Option<Duration> {
    (secs > 0).then(|| Duration::from_secs(secs))
}

/// Text of the final reply in a conversation.
///
/// Only an assistant message counts. Plain content is returned verbatim;
/// structured content yields its text parts concatenated in order and
/// trimmed. Anything else gives an empty string.
pub fn extract_text(messages: &[ChatMessage]) -> String {
    match messages.last() {
        Some(last) if last.role == Role::Assistant => match &last.content {
            crate::MessageContent::Text(text) => text.clone(),
            crate::MessageContent::Parts(_) => last.text().trim().to_string(),
        },
        _ => String::new(),
    }
}

/// Submits prompts to the agent runtime and normalizes the reply.
#[derive(Clone)]
pub struct AgentInvoker {
    runtime: Arc<dyn AgentRuntime>,
    timeout: Option<Duration>,
}

impl AgentInvoker {
    /// Wrap a runtime with the default timeout.
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self {
            runtime,
            timeout: Some(DEFAULT_AGENT_TIMEOUT),
        }
    }

    /// Set the per-call timeout (`None` waits indefinitely).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Current timeout.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run `prompt` as one user turn on `thread` and return the reply text.
    pub async fn invoke(&self, prompt: &str, thread: &ThreadId) -> Result<String, AgentError> {
        debug!(thread = %thread, "Invoking agent");

        let call = self.runtime.invoke(AgentRequest::user(prompt), thread);
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| AgentError::Timeout(limit))??,
            None => call.await?,
        };

        Ok(extract_text(&response.messages))
    }

    /// Drop a thread's history in the runtime.
    pub async fn release(&self, thread: &ThreadId) {
        self.runtime.release_thread(thread).await;
    }
}
