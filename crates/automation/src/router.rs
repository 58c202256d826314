//! Notification router: session notifications into the event buffer.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};
use tracing::{debug, error, info};
use wotpilot_core::{is_event_uri, ResourceRegistry, SessionNotification, SharedEventBuffer};
use wotpilot_mcp::NotificationListener;

/// What the router did with one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    /// An event was appended to the buffer
    Buffered {
        /// Resolved display name
        name: String,
    },
    /// A property update, logged only
    PropertyUpdate,
    /// Resource list change, logged only
    ListChanged,
    /// Not relevant to the pipeline
    Ignored,
    /// Handling panicked; nothing was buffered
    Failed,
}

/// Classifies session notifications and buffers device events.
///
/// Event classification uses the uri alone, so updates arriving before the
/// registry is installed are still buffered (named by their uri).
#[derive(Clone)]
pub struct NotificationRouter {
    buffer: SharedEventBuffer,
    registry: Arc<OnceLock<ResourceRegistry>>,
}

impl NotificationRouter {
    /// Route into `buffer`.
    pub fn new(buffer: SharedEventBuffer) -> Self {
        Self {
            buffer,
            registry: Arc::new(OnceLock::new()),
        }
    }

    /// Install the startup registry. Only the first call takes effect.
    pub fn install_registry(&self, registry: ResourceRegistry) -> bool {
        let count = registry.len();
        let installed = self.registry.set(registry).is_ok();
        if installed {
            debug!(event_resources = count, "Resource registry installed");
        }
        installed
    }

    fn display_name(&self, uri: &str) -> String {
        match self.registry.get() {
            Some(registry) => registry.display_name(uri),
            None => uri.to_string(),
        }
    }

    fn classify(&self, notification: &SessionNotification) -> RouteOutcome {
        match notification {
            SessionNotification::ResourceUpdated { uri } if is_event_uri(uri) => {
                let name = self.display_name(uri);
                debug!(uri = %uri, name = %name, "Event received");
                self.buffer.add_event(uri.clone(), name.clone());
                RouteOutcome::Buffered { name }
            }
            SessionNotification::ResourceUpdated { uri } => {
                info!(uri = %uri, "Property updated");
                RouteOutcome::PropertyUpdate
            }
            SessionNotification::ResourceListChanged => {
                info!("Resource list changed");
                RouteOutcome::ListChanged
            }
            SessionNotification::Other { method } => {
                debug!(method = %method, "Ignoring notification");
                RouteOutcome::Ignored
            }
        }
    }

    /// Handle one notification. Never panics.
    pub fn route(&self, notification: &SessionNotification) -> RouteOutcome {
        catch_unwind(AssertUnwindSafe(|| self.classify(notification))).unwrap_or_else(|_| {
            error!(method = notification.method(), "Error in notification handler");
            RouteOutcome::Failed
        })
    }
}

impl NotificationListener for NotificationRouter {
    fn on_notification(&self, notification: &SessionNotification) {
        self.route(notification);
    }
}
