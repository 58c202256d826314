//! Runs the automation loop and the command loop side by side.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::console::{CommandLoop, ExitReason, LineSource};
use crate::display::{DisplayMessage, OperatorDisplay};
use crate::engine::AutomationLoop;

/// Spawns the automation loop, runs the command loop in the foreground,
/// then cancels the automation loop and waits for it before returning.
pub struct AutomationHost {
    automation: AutomationLoop,
    commands: CommandLoop,
    display: Arc<dyn OperatorDisplay>,
    cancel: CancellationToken,
}

impl AutomationHost {
    /// Create a host.
    pub fn new(
        automation: AutomationLoop,
        commands: CommandLoop,
        display: Arc<dyn OperatorDisplay>,
    ) -> Self {
        Self {
            automation,
            commands,
            display,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the automation loop, e.g. from a signal handler.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until the operator leaves. No background work survives the call.
    pub async fn run(self, input: &mut dyn LineSource) -> ExitReason {
        let Self {
            automation,
            commands,
            display,
            cancel,
        } = self;

        display.show(DisplayMessage::Banner);
        let background = tokio::spawn(automation.run(cancel.clone()));

        let reason = tokio::select! {
            reason = commands.run(input) => reason,
            _ = cancel.cancelled() => ExitReason::EndOfInput,
        };

        cancel.cancel();
        if let Err(e) = background.await {
            error!(error = %e, "Automation loop task failed");
        }

        info!(?reason, "Interactive session finished");
        display.show(DisplayMessage::Goodbye);
        reason
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::ScriptedLines;
    use crate::display::MemoryDisplay;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;
    use wotpilot_ai::{AgentError, AgentInvoker, AgentRequest, AgentResponse, AgentRuntime};
    use wotpilot_core::{RuleStore, SharedEventBuffer, ThreadId};

    struct Silent;

    #[async_trait]
    impl AgentRuntime for Silent {
        async fn invoke(
            &self,
            _request: AgentRequest,
            _thread: &ThreadId,
        ) -> Result<AgentResponse, AgentError> {
            Ok(AgentResponse::default())
        }

        async fn release_thread(&self, _thread: &ThreadId) {}
    }

    #[tokio::test(start_paused = true)]
    async fn test_bye_stops_background_loop() {
        let display = Arc::new(MemoryDisplay::new());
        let rules = RuleStore::new();
        let invoker = AgentInvoker::new(Arc::new(Silent));

        let automation = AutomationLoop::new(
            SharedEventBuffer::default(),
            rules.clone(),
            invoker.clone(),
            display.clone(),
        );
        let commands = CommandLoop::new(rules, invoker, display.clone());
        let host = AutomationHost::new(automation, commands, display.clone());
        let token = host.cancellation_token();

        let mut input = ScriptedLines::new(["bye"]);
        assert_eq!(host.run(&mut input).await, ExitReason::Bye);
        assert!(token.is_cancelled());

        let messages = display.messages();
        assert_eq!(messages.first(), Some(&DisplayMessage::Banner));
        assert_eq!(messages.last(), Some(&DisplayMessage::Goodbye));
    }

    /// Sets its flag when dropped.
    struct DropFlag(Arc<AtomicBool>);

    impl Drop for DropFlag {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Agent call that never completes.
    struct Hanging {
        started: Arc<AtomicBool>,
        dropped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl AgentRuntime for Hanging {
        async fn invoke(
            &self,
            _request: AgentRequest,
            _thread: &ThreadId,
        ) -> Result<AgentResponse, AgentError> {
            let _guard = DropFlag(self.dropped.clone());
            self.started.store(true, Ordering::SeqCst);
            std::future::pending::<Result<AgentResponse, AgentError>>().await
        }

        async fn release_thread(&self, _thread: &ThreadId) {}
    }

    /// Types `bye` once `delay` has passed.
    struct ByeAfter(Option<Duration>);

    #[async_trait]
    impl LineSource for ByeAfter {
        async fn next_line(&mut self) -> std::io::Result<Option<String>> {
            match self.0.take() {
                Some(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(Some("bye".to_string()))
                }
                None => Ok(None),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_bye_waits_for_in_flight_cycle() {
        let started = Arc::new(AtomicBool::new(false));
        let dropped = Arc::new(AtomicBool::new(false));
        let invoker = AgentInvoker::new(Arc::new(Hanging {
            started: started.clone(),
            dropped: dropped.clone(),
        }));

        let buffer = SharedEventBuffer::default();
        buffer.add_event("wot://washer/events/cycleFinished", "Washing cycle finished");
        let rules = RuleStore::new();
        rules.add("When the washer finishes, blink the LEDs");
        let display = Arc::new(MemoryDisplay::new());

        let automation =
            AutomationLoop::new(buffer, rules.clone(), invoker.clone(), display.clone());
        let commands = CommandLoop::new(rules, invoker, display.clone());
        let host = AutomationHost::new(automation, commands, display.clone());

        // the first cycle dispatches at 2 s and hangs; bye arrives at 3 s
        let mut input = ByeAfter(Some(Duration::from_secs(3)));
        assert_eq!(host.run(&mut input).await, ExitReason::Bye);

        // the loop task ran to completion before run returned, dropping the call
        assert!(started.load(Ordering::SeqCst));
        assert!(dropped.load(Ordering::SeqCst));

        let messages = display.messages();
        assert!(messages.contains(&DisplayMessage::Event("Washing cycle finished".to_string())));
        assert_eq!(messages.last(), Some(&DisplayMessage::Goodbye));
    }
}
