//! Session errors.

use wotpilot_tools::ToolError;

/// Errors raised by the device session.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// Transport could not be started or the handshake failed
    #[error("connection failed: {reason}")]
    ConnectionFailed {
        /// Cause
        reason: String,
    },

    /// A request failed at the protocol level
    #[error("protocol error: {message}")]
    Protocol {
        /// Cause
        message: String,
    },

    /// Subscribing to one resource failed
    #[error("subscribe to {uri} failed: {reason}")]
    SubscribeFailed {
        /// Resource uri
        uri: String,
        /// Cause
        reason: String,
    },

    /// A tool call failed or returned an error result
    #[error("tool {tool} failed: {reason}")]
    ToolCallFailed {
        /// Tool name
        tool: String,
        /// Cause
        reason: String,
    },

    /// The session was already closed
    #[error("session closed")]
    Closed,
}

impl From<McpError> for ToolError {
    fn from(e: McpError) -> Self {
        match e {
            McpError::ToolCallFailed { tool, reason } => ToolError::Failed {
                tool,
                message: reason,
            },
            other => ToolError::Transport(other.to_string()),
        }
    }
}
