//! Device resources and the startup name registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Path segment marking a resource as a device event.
pub const EVENT_PATH_MARKER: &str = "/events/";

/// Whether a resource uri names a device event (as opposed to a property).
pub fn is_event_uri(uri: &str) -> bool {
    uri.contains(EVENT_PATH_MARKER)
}

/// A resource advertised by the device session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceDescriptor {
    /// Resource uri
    pub uri: String,

    /// Human-readable name
    pub name: String,

    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// MIME type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ResourceDescriptor {
    /// Create a descriptor with just a uri and name.
    pub fn new(uri: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
        }
    }

    /// Classify this resource.
    pub fn kind(&self) -> ResourceKind {
        ResourceKind::of(&self.uri)
    }
}

/// Resource classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    /// Discrete occurrence
    Event,
    /// Continuously readable state
    Property,
}

impl ResourceKind {
    /// Classify a uri.
    pub fn of(uri: &str) -> Self {
        if is_event_uri(uri) {
            ResourceKind::Event
        } else {
            ResourceKind::Property
        }
    }
}

/// Event resource uri to display name, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    names: HashMap<String, String>,
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event resource's display name.
    pub fn record(&mut self, uri: impl Into<String>, name: impl Into<String>) {
        self.names.insert(uri.into(), name.into());
    }

    /// Look up the display name for a uri.
    pub fn lookup(&self, uri: &str) -> Option<&str> {
        self.names.get(uri).map(String::as_str)
    }

    /// Display name for a uri, falling back to the uri itself.
    pub fn display_name(&self, uri: &str) -> String {
        self.lookup(uri).unwrap_or(uri).to_string()
    }

    /// Number of recorded event resources.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no event resources were recorded.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
