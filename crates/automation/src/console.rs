//! Interactive command loop.

use async_trait::async_trait;
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use wotpilot_ai::AgentInvoker;
use wotpilot_core::{is_rule_definition, RuleStore, ThreadId};

use crate::display::{DisplayMessage, OperatorDisplay};

/// One parsed line of operator input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `bye`
    Exit,
    /// `rules`
    ShowRules,
    /// Blank line
    Empty,
    /// Input that reads like a rule
    AddRule(String),
    /// Anything else, sent to the agent
    Query(String),
}

impl Command {
    /// Classify a line. `bye` and `rules` are exact, case-insensitive
    /// matches on the line without its line ending; rule and query text is
    /// kept as typed.
    pub fn parse(line: &str) -> Self {
        let text = line.trim_end_matches(['\r', '\n']);

        if text.trim().is_empty() {
            Command::Empty
        } else if text.eq_ignore_ascii_case("bye") {
            Command::Exit
        } else if text.eq_ignore_ascii_case("rules") {
            Command::ShowRules
        } else if is_rule_definition(text) {
            Command::AddRule(text.to_string())
        } else {
            Command::Query(text.to_string())
        }
    }
}

/// Why the command loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The operator typed `bye`
    Bye,
    /// Input was closed
    EndOfInput,
    /// Reading input failed
    InputError,
}

/// Line-oriented operator input.
#[async_trait]
pub trait LineSource: Send {
    /// Next line, or `None` at end of input.
    async fn next_line(&mut self) -> std::io::Result<Option<String>>;
}

/// Lines from the process's standard input.
///
/// A dedicated OS thread does the blocking reads and hands lines over a
/// channel, so waiting for input never stalls the runtime and a pending
/// read does not hold up shutdown.
pub struct StdinLines {
    lines: mpsc::Receiver<std::io::Result<String>>,
}

impl StdinLines {
    /// Start the reader thread.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel(16);
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                if tx.blocking_send(line).is_err() {
                    break;
                }
            }
        });
        Self { lines: rx }
    }
}

#[async_trait]
impl LineSource for StdinLines {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.lines.recv().await.transpose()
    }
}

/// Scripted input, mainly for tests.
#[derive(Debug, Default)]
pub struct ScriptedLines {
    lines: std::collections::VecDeque<String>,
}

impl ScriptedLines {
    /// Lines to replay in order, followed by end of input.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl LineSource for ScriptedLines {
    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        Ok(self.lines.pop_front())
    }
}

/// Reads operator commands: adds rules, shows rules, answers queries.
pub struct CommandLoop {
    rules: RuleStore,
    invoker: AgentInvoker,
    display: Arc<dyn OperatorDisplay>,
}

impl CommandLoop {
    /// Create a command loop over shared state.
    pub fn new(rules: RuleStore, invoker: AgentInvoker, display: Arc<dyn OperatorDisplay>) -> Self {
        Self {
            rules,
            invoker,
            display,
        }
    }

    /// Act on one command. Returns `false` when the loop should stop.
    pub async fn handle(&self, command: Command) -> bool {
        match command {
            Command::Exit => return false,
            Command::Empty => {}
            Command::ShowRules => {
                self.display.show(DisplayMessage::Rules(self.rules.snapshot()));
            }
            Command::AddRule(text) => {
                let rule = self.rules.add(text);
                info!(rule = %rule, total = self.rules.len(), "Automation rule added");
                self.display.show(DisplayMessage::RuleAdded(rule.text));
            }
            Command::Query(text) => {
                match self.invoker.invoke(&text, &ThreadId::user_query()).await {
                    Ok(reply) if reply.trim().is_empty() => {
                        debug!("Agent returned no text");
                    }
                    Ok(reply) => self.display.show(DisplayMessage::Reply(reply.trim().to_string())),
                    Err(e) => {
                        warn!(error = %e, "Query failed");
                        self.display.show(DisplayMessage::Error(e.to_string()));
                    }
                }
            }
        }
        true
    }

    /// Prompt, read and handle lines until `bye` or end of input.
    pub async fn run(&self, input: &mut dyn LineSource) -> ExitReason {
        loop {
            self.display.prompt();

            let line = match input.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => return ExitReason::EndOfInput,
                Err(e) => {
                    warn!(error = %e, "Failed to read input");
                    return ExitReason::InputError;
                }
            };

            if !self.handle(Command::parse(&line)).await {
                return ExitReason::Bye;
            }
        }
    }
}
