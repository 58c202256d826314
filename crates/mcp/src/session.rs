//! Session boundary traits and notification fan-out.

use async_trait::async_trait;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{error, trace};
use wotpilot_core::{ResourceDescriptor, SessionNotification};

use crate::McpError;

/// Resource discovery and subscription on a live device session.
#[async_trait]
pub trait DeviceSession: Send + Sync {
    /// Every resource the session advertises.
    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError>;

    /// Subscribe to update notifications for one resource.
    async fn subscribe_resource(&self, uri: &str) -> Result<(), McpError>;
}

/// Receives decoded session notifications.
///
/// Called on the transport's dispatch task: implementations must not block.
pub trait NotificationListener: Send + Sync {
    /// Handle one notification.
    fn on_notification(&self, notification: &SessionNotification);
}

/// Registration point for notification listeners.
///
/// The transport decodes each inbound notification once and hands it to
/// `dispatch`, which calls every registered listener in registration order.
/// A panicking listener is logged and skipped.
#[derive(Clone, Default)]
pub struct NotificationHub {
    listeners: Arc<RwLock<Vec<Arc<dyn NotificationListener>>>>,
}

impl NotificationHub {
    /// Create a hub with no listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener.
    pub fn register(&self, listener: Arc<dyn NotificationListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Deliver a notification to every listener. Returns how many listeners
    /// handled it without panicking.
    pub fn dispatch(&self, notification: &SessionNotification) -> usize {
        let listeners = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        trace!(
            method = notification.method(),
            listeners = listeners.len(),
            "dispatching notification"
        );

        let mut handled = 0;
        for listener in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener.on_notification(notification))) {
                Ok(()) => handled += 1,
                Err(_) => {
                    error!(method = notification.method(), "Notification listener panicked");
                }
            }
        }
        handled
    }
}
