//! Flow store trait abstraction.

use async_trait::async_trait;
use serde_json::Value;

/// Error type for flow store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Node objects making up one flow tab.
pub type FlowNodes = Vec<Value>;

/// Errors that can occur during flow store operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Transport-level failure talking to the store
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// The store answered with a non-success status
    #[error("flow store returned {status}: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Flow not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload rejected before it reached the store
    #[error("invalid flow: {0}")]
    Invalid(String),
}

/// CRUD access to a named flow/workflow store.
///
/// Flow payloads are passed through unmodified; this layer does not
/// interpret the node schema.
#[async_trait]
pub trait FlowStore: Send + Sync {
    /// Replace every deployed flow with `flows` (an array of tabs and nodes).
    async fn deploy_flows(&self, flows: &Value) -> Result<Value>;

    /// Create a new flow tab holding `nodes`. Returns the store's reply,
    /// which carries the new flow id.
    async fn create_flow(&self, label: &str, nodes: FlowNodes) -> Result<Value>;

    /// Read every deployed flow.
    async fn read_flows(&self) -> Result<Value>;

    /// Read one flow tab by id.
    async fn read_flow(&self, id: &str) -> Result<Value>;

    /// Replace one flow tab.
    async fn update_flow(&self, id: &str, flow: &Value) -> Result<Value>;

    /// Delete one flow tab.
    async fn delete_flow(&self, id: &str) -> Result<()>;
}
