//! Operator-entered automation rules.

use serde::{Deserialize, Serialize};
use std::sync::{Arc, PoisonError, RwLock};

use crate::Time;

/// Substrings that mark operator input as a rule definition.
///
/// This is a heuristic; false positives and negatives are expected.
pub const RULE_KEYWORDS: [&str; 6] = [
    "when ",
    "if ",
    "trigger",
    "whenever",
    "every time",
    "automatically",
];

/// Whether operator input reads like an automation rule.
pub fn is_rule_definition(input: &str) -> bool {
    let lowered = input.to_lowercase();
    RULE_KEYWORDS.iter().any(|keyword| lowered.contains(keyword))
}

/// A natural-language trigger/action statement, interpreted by the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationRule {
    /// Rule text, verbatim as entered
    pub text: String,

    /// When the rule was added
    pub added_at: Time,
}

impl AutomationRule {
    /// Create a rule from operator text.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            added_at: chrono::Utc::now(),
        }
    }
}

impl std::fmt::Display for AutomationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Append-only, insertion-ordered rule list shared by the console and the
/// automation loop.
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    rules: Arc<RwLock<Vec<AutomationRule>>>,
}

impl RuleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule. Duplicates are kept.
    pub fn add(&self, text: impl Into<String>) -> AutomationRule {
        let rule = AutomationRule::new(text);
        self.rules
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(rule.clone());
        rule
    }

    /// Snapshot of all rules in insertion order.
    pub fn snapshot(&self) -> Vec<AutomationRule> {
        self.rules
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether no rules were added yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
