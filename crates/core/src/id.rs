//! Conversation thread identifiers.

use serde::{Deserialize, Serialize};

/// Prefix shared by every automation-cycle thread.
const AUTOMATION_PREFIX: &str = "automation_check_";

/// Thread used for direct operator queries.
const USER_QUERY: &str = "user_query";

/// Thread used for flow generation requests.
const WORKFLOW_GENERATOR: &str = "workflow_generator";

/// Identifier selecting an independent conversation inside the agent runtime.
///
/// Automation cycles get `automation_check_<n>`; operator queries always use
/// `user_query`. The two families never overlap, so automation reasoning is
/// invisible to the operator conversation and vice versa.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ThreadId(String);

/// Invalid thread identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ThreadIdError {
    /// Identifier was empty or whitespace only
    #[error("thread id must not be empty")]
    Empty,

    /// Identifier contained whitespace or control characters
    #[error("thread id contains invalid character: {0:?}")]
    InvalidChar(char),
}

impl ThreadId {
    /// Create a thread id from an arbitrary label.
    pub fn new(id: impl Into<String>) -> Result<Self, ThreadIdError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ThreadIdError::Empty);
        }
        if let Some(c) = id.chars().find(|c| c.is_whitespace() || c.is_control()) {
            return Err(ThreadIdError::InvalidChar(c));
        }
        Ok(Self(id))
    }

    /// Thread for one automation cycle.
    pub fn automation_cycle(cycle: u64) -> Self {
        Self(format!("{AUTOMATION_PREFIX}{cycle}"))
    }

    /// Thread for direct operator queries.
    pub fn user_query() -> Self {
        Self(USER_QUERY.to_string())
    }

    /// Thread for flow generation.
    pub fn workflow_generator() -> Self {
        Self(WORKFLOW_GENERATOR.to_string())
    }

    /// Whether this thread belongs to the automation loop.
    pub fn is_automation(&self) -> bool {
        self.0.starts_with(AUTOMATION_PREFIX)
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ThreadId {
    type Err = ThreadIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ThreadId {
    type Error = ThreadIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ThreadId> for String {
    fn from(id: ThreadId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_automation_threads_are_distinct_per_cycle() {
        let first = ThreadId::automation_cycle(1);
        let second = ThreadId::automation_cycle(2);

        assert_eq!(first.as_str(), "automation_check_1");
        assert_ne!(first, second);
        assert!(first.is_automation());
    }

    #[test]
    fn test_user_query_is_not_automation() {
        let query = ThreadId::user_query();
        assert_eq!(query.as_str(), "user_query");
        assert!(!query.is_automation());
        assert!(!ThreadId::workflow_generator().is_automation());
    }

    #[test]
    fn test_new_rejects_empty_and_whitespace() {
        assert_eq!(ThreadId::new(""), Err(ThreadIdError::Empty));
        assert_eq!(ThreadId::new("   "), Err(ThreadIdError::Empty));
        assert_eq!(ThreadId::new("a b"), Err(ThreadIdError::InvalidChar(' ')));
        assert!(ThreadId::new("session-42").is_ok());
    }

    #[test]
    fn test_serde_validates() {
        let id: ThreadId = serde_json::from_str("\"user_query\"").unwrap();
        assert_eq!(id, ThreadId::user_query());
        assert!(serde_json::from_str::<ThreadId>("\"\"").is_err());
    }
}
