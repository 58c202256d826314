//! The automation loop - periodically checks new events against the rules.
//!
//! ```text
//! Wait → Drain → (Idle | Dispatch) → Wait
//! ```

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use wotpilot_ai::AgentInvoker;
use wotpilot_core::{AutomationRule, Event, RuleStore, SharedEventBuffer, ThreadId};

use crate::display::{DisplayMessage, OperatorDisplay};

/// Default time between cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);

/// Reply meaning the agent decided nothing should happen.
pub const NO_ACTION_REPLY: &str = "no actions needed";

/// Whether an agent reply should be hidden from the operator: empty, or
/// "no actions needed" in any case with trailing punctuation.
pub fn is_no_action_reply(reply: &str) -> bool {
    let normalized = reply
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .trim_end()
        .to_lowercase();
    normalized.is_empty() || normalized == NO_ACTION_REPLY
}

/// Prompt asking the agent to check `events` against `rules`.
pub fn automation_prompt(events: &[Event], rules: &[AutomationRule]) -> String {
    let events: Vec<String> = events.iter().map(|e| format!("- {}", e.name)).collect();
    let rules: Vec<String> = rules.iter().map(|r| format!("- {}", r.text)).collect();

    format!(
        "The following events just occurred:\n{}\n\n\
         Active automation rules:\n{}\n\n\
         Check if any of these events should trigger any automations. Execute them if needed.\n\
         Only report what actions you're taking now, not what was done before.\n\
         If nothing applies, reply exactly: No actions needed.",
        events.join("\n"),
        rules.join("\n")
    )
}

/// Configuration for the automation loop.
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Time between cycles
    pub interval: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleResult {
    /// Nothing new in the buffer
    NoEvents,
    /// Events arrived but no rule exists; they are consumed unseen
    NoRules {
        /// Events drained
        dropped: usize,
    },
    /// The agent found nothing to do
    Suppressed {
        /// Cycle number
        cycle: u64,
    },
    /// The agent reported actions
    Reported {
        /// Cycle number
        cycle: u64,
        /// Reply text
        text: String,
    },
    /// The agent call failed
    Failed {
        /// Cycle number
        cycle: u64,
        /// Error text
        error: String,
    },
}

/// Periodic rule evaluation over newly buffered events.
pub struct AutomationLoop {
    buffer: SharedEventBuffer,
    rules: RuleStore,
    invoker: AgentInvoker,
    display: Arc<dyn OperatorDisplay>,
    config: LoopConfig,
    cycles_run: u64,
}

impl AutomationLoop {
    /// Create a loop over shared state.
    pub fn new(
        buffer: SharedEventBuffer,
        rules: RuleStore,
        invoker: AgentInvoker,
        display: Arc<dyn OperatorDisplay>,
    ) -> Self {
        Self {
            buffer,
            rules,
            invoker,
            display,
            config: LoopConfig::default(),
            cycles_run: 0,
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    /// Dispatching cycles run so far.
    pub fn cycles_run(&self) -> u64 {
        self.cycles_run
    }

    /// Run one drain, dispatching to the agent only when there are both new
    /// events and at least one rule.
    pub async fn run_cycle(&mut self) -> CycleResult {
        let events = self.buffer.drain_new();
        if events.is_empty() {
            return CycleResult::NoEvents;
        }

        let rules = self.rules.snapshot();
        if rules.is_empty() {
            debug!(events = events.len(), "Events drained with no rules defined");
            return CycleResult::NoRules {
                dropped: events.len(),
            };
        }

        self.cycles_run += 1;
        let cycle = self.cycles_run;
        let thread = ThreadId::automation_cycle(cycle);
        info!(cycle, events = events.len(), rules = rules.len(), "Starting automation check");

        for event in &events {
            self.display.show(DisplayMessage::Event(event.name.clone()));
        }

        let prompt = automation_prompt(&events, &rules);
        let result = self.invoker.invoke(&prompt, &thread).await;
        self.invoker.release(&thread).await;

        match result {
            Ok(text) if is_no_action_reply(&text) => {
                debug!(cycle, "No actions needed");
                CycleResult::Suppressed { cycle }
            }
            Ok(text) => {
                let text = text.trim().to_string();
                self.display.show(DisplayMessage::Action(text.clone()));
                CycleResult::Reported { cycle, text }
            }
            Err(e) => {
                error!(cycle, error = %e, "Error in automation loop");
                CycleResult::Failed {
                    cycle,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Run until `cancel` fires. Cancellation is observed while waiting and
    /// while a cycle is in flight; a cancelled cycle is dropped.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(interval = ?self.config.interval, "Automation loop started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval) => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                result = self.run_cycle() => {
                    debug!(?result, "Cycle finished");
                }
            }
        }

        info!(cycles = self.cycles_run, "Automation loop stopped");
    }
}
