//! Push notifications decoded at the session boundary.

use serde::{Deserialize, Serialize};

/// A server-initiated notification, decoded once by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionNotification {
    /// A subscribed resource changed.
    ResourceUpdated {
        /// Resource uri
        uri: String,
    },

    /// The server's resource list changed.
    ResourceListChanged,

    /// Any notification the pipeline does not act on.
    Other {
        /// Protocol method name, when known
        method: String,
    },
}

impl SessionNotification {
    /// Protocol method name of this notification.
    pub fn method(&self) -> &str {
        match self {
            SessionNotification::ResourceUpdated { .. } => "notifications/resources/updated",
            SessionNotification::ResourceListChanged => "notifications/resources/list_changed",
            SessionNotification::Other { method } => method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_names() {
        let updated = SessionNotification::ResourceUpdated {
            uri: "wot://lamp/properties/on".to_string(),
        };
        assert_eq!(updated.method(), "notifications/resources/updated");
        assert_eq!(
            SessionNotification::ResourceListChanged.method(),
            "notifications/resources/list_changed"
        );
        let other = SessionNotification::Other {
            method: "notifications/progress".to_string(),
        };
        assert_eq!(other.method(), "notifications/progress");
    }
}
