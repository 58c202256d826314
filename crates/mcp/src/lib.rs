//! Device session boundary.
//!
//! A long-lived MCP session to the WoT device bridge: resource discovery,
//! resource subscriptions, push notifications and device tools.

#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod session;

pub use client::McpSession;
pub use config::{McpTransportConfig, DEFAULT_MCP_URL};
pub use error::McpError;
pub use session::{DeviceSession, NotificationHub, NotificationListener};
