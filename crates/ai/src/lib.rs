//! Agent runtime boundary
//!
//! Chat message model, an OpenAI-compatible model client, a tool-calling
//! agent with per-thread memory, and the invoker the automation pipeline
//! calls.

#![warn(missing_docs)]

pub mod invoker;
pub mod llm;
pub mod message;
pub mod prompts;
pub mod runtime;

pub use invoker::{extract_text, timeout_from_secs, AgentInvoker, DEFAULT_AGENT_TIMEOUT};
pub use llm::{LlmClient, LlmError, OpenAiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use message::{ChatMessage, ContentPart, MessageContent, Role, ToolCall};
pub use runtime::{
    AgentError, AgentRequest, AgentResponse, AgentRuntime, ToolAgent, DEFAULT_MAX_STEPS,
};
