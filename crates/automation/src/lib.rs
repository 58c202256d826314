//! Event-driven automation pipeline
//!
//! Device notifications are routed into a bounded event buffer; a periodic
//! loop asks the agent whether any operator rule should fire, while an
//! interactive loop takes new rules and direct queries.

#![warn(missing_docs)]

pub mod console;
pub mod display;
pub mod engine;
pub mod generator;
pub mod host;
pub mod router;
pub mod subscription;

pub use console::{Command, CommandLoop, ExitReason, LineSource, ScriptedLines, StdinLines};
pub use display::{ConsoleDisplay, DisplayMessage, MemoryDisplay, OperatorDisplay, INPUT_PROMPT};
pub use engine::{
    automation_prompt, is_no_action_reply, AutomationLoop, CycleResult, LoopConfig,
    DEFAULT_INTERVAL,
};
pub use generator::{parse_flow, tab_label, tab_nodes, FlowGenerator, GeneratedFlow};
pub use host::AutomationHost;
pub use router::{NotificationRouter, RouteOutcome};
pub use subscription::{ResourceSubscriptionManager, SubscriptionReport};
