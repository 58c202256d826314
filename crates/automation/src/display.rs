//! Operator-facing output.

use std::io::Write;
use std::sync::{Mutex, PoisonError};
use wotpilot_core::AutomationRule;

/// Prompt shown before each line of operator input.
pub const INPUT_PROMPT: &str = "You: ";

/// Something to show the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayMessage {
    /// Startup banner with usage hints
    Banner,
    /// A device event picked up by an automation cycle
    Event(String),
    /// What the agent did in an automation cycle
    Action(String),
    /// Reply to a direct query
    Reply(String),
    /// Current rule list
    Rules(Vec<AutomationRule>),
    /// Confirmation of a new rule
    RuleAdded(String),
    /// Something failed
    Error(String),
    /// Shutdown complete
    Goodbye,
}

impl DisplayMessage {
    /// Produced by the automation loop rather than in reply to input.
    pub fn is_background(&self) -> bool {
        matches!(self, DisplayMessage::Event(_) | DisplayMessage::Action(_))
    }

    /// Text form.
    pub fn render(&self) -> String {
        match self {
            DisplayMessage::Banner => [
                "Agent ready!",
                "Examples of automation rules:",
                "  - 'Blink LEDs when washing machine cycle has finished'",
                "  - 'Turn on the main room light when motion is detected in that room'",
                "  - 'When doorbell is pressed, reduce speaker volume and alert homeowner'",
                "",
                "Type 'bye' to exit, 'rules' to see automation rules.",
                "",
            ]
            .join("\n"),
            DisplayMessage::Event(name) => format!("Event: {}", name),
            DisplayMessage::Action(text) => format!("Action: {}", text),
            DisplayMessage::Reply(text) => format!("Agent: {}\n", text),
            DisplayMessage::Rules(rules) if rules.is_empty() => {
                "No automation rules defined yet.\n".to_string()
            }
            DisplayMessage::Rules(rules) => {
                let mut out = String::from("Active automation rules:\n");
                for (i, rule) in rules.iter().enumerate() {
                    out.push_str(&format!("  {}. {}\n", i + 1, rule));
                }
                out
            }
            DisplayMessage::RuleAdded(text) => format!("Automation rule added: {}\n", text),
            DisplayMessage::Error(text) => format!("Error: {}\n", text),
            DisplayMessage::Goodbye => "Goodbye!".to_string(),
        }
    }
}

/// Where operator output goes. Shared by the automation loop and the
/// command loop.
pub trait OperatorDisplay: Send + Sync {
    /// Show one message.
    fn show(&self, message: DisplayMessage);

    /// Show the input prompt.
    fn prompt(&self) {}
}

/// Stdout display. Background output clears the pending prompt line and
/// re-prints the prompt after itself.
#[derive(Debug, Default)]
pub struct ConsoleDisplay {
    // one writer at a time
    lock: Mutex<()>,
}

impl ConsoleDisplay {
    /// Create a console display.
    pub fn new() -> Self {
        Self::default()
    }
}

impl OperatorDisplay for ConsoleDisplay {
    fn show(&self, message: DisplayMessage) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = std::io::stdout().lock();
        let text = message.render();

        // write errors on stdout are ignored
        let _ = if message.is_background() {
            write!(out, "\r\x1b[K{}\n{}", text, INPUT_PROMPT)
        } else {
            writeln!(out, "{}", text)
        };
        let _ = out.flush();
    }

    fn prompt(&self) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "{}", INPUT_PROMPT);
        let _ = out.flush();
    }
}

/// Display that records messages instead of printing them.
#[derive(Debug, Default)]
pub struct MemoryDisplay {
    messages: Mutex<Vec<DisplayMessage>>,
}

impl MemoryDisplay {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything shown so far.
    pub fn messages(&self) -> Vec<DisplayMessage> {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Texts of `Action` messages.
    pub fn actions(&self) -> Vec<String> {
        self.messages()
            .into_iter()
            .filter_map(|m| match m {
                DisplayMessage::Action(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl OperatorDisplay for MemoryDisplay {
    fn show(&self, message: DisplayMessage) {
        self.messages
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_rendering() {
        assert_eq!(
            DisplayMessage::Rules(vec![]).render(),
            "No automation rules defined yet.\n"
        );

        let rules = vec![
            AutomationRule::new("when a"),
            AutomationRule::new("when b"),
        ];
        let text = DisplayMessage::Rules(rules).render();
        assert!(text.contains("  1. when a\n"));
        assert!(text.contains("  2. when b\n"));
    }

    #[test]
    fn test_background_messages() {
        assert!(DisplayMessage::Event("Doorbell".to_string()).is_background());
        assert!(DisplayMessage::Action("Light on".to_string()).is_background());
        assert!(!DisplayMessage::Reply("ok".to_string()).is_background());
    }

    #[test]
    fn test_banner_mentions_commands() {
        let banner = DisplayMessage::Banner.render();
        assert!(banner.contains("'bye'"));
        assert!(banner.contains("'rules'"));
    }

    #[test]
    fn test_memory_display_records() {
        let display = MemoryDisplay::new();
        display.show(DisplayMessage::Action("Lamp on".to_string()));
        display.show(DisplayMessage::Goodbye);
        assert_eq!(display.actions(), vec!["Lamp on".to_string()]);
        assert_eq!(display.messages().len(), 2);
    }
}
