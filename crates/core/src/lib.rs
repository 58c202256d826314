//! wotpilot core data models.
//!
//! This crate defines the state shared between the notification path,
//! the automation loop and the interactive console.

#![warn(missing_docs)]

// Identities
mod id;

// Device events
mod event;
mod notification;
mod resource;

// Operator rules
mod rule;

// Re-exports
pub use event::{Event, EventBuffer, SharedEventBuffer, DEFAULT_MAX_EVENTS};
pub use id::{ThreadId, ThreadIdError};
pub use notification::SessionNotification;
pub use resource::{
    is_event_uri, ResourceDescriptor, ResourceKind, ResourceRegistry, EVENT_PATH_MARKER,
};
pub use rule::{is_rule_definition, AutomationRule, RuleStore, RULE_KEYWORDS};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
