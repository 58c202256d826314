//! Startup resource discovery and subscription.

use std::sync::Arc;
use tracing::{info, warn};
use wotpilot_core::{is_event_uri, ResourceRegistry};
use wotpilot_mcp::DeviceSession;

/// Result of the startup subscription pass.
#[derive(Debug, Default)]
pub struct SubscriptionReport {
    /// Event resources by uri
    pub registry: ResourceRegistry,

    /// Resources the session advertised
    pub discovered: usize,

    /// Successful subscriptions
    pub subscribed: usize,

    /// Failed subscriptions as (uri, reason)
    pub failed: Vec<(String, String)>,
}

/// Subscribes to every advertised resource once at startup.
pub struct ResourceSubscriptionManager {
    session: Arc<dyn DeviceSession>,
}

impl ResourceSubscriptionManager {
    /// Create a manager over a live session.
    pub fn new(session: Arc<dyn DeviceSession>) -> Self {
        Self { session }
    }

    /// List resources, subscribe to each, and record the event resources.
    ///
    /// Failures are logged. A failed listing yields an empty report; a
    /// failed subscription does not stop the rest. Event resources are
    /// recorded whether or not their own subscription succeeded.
    pub async fn discover_and_subscribe(&self) -> SubscriptionReport {
        let mut report = SubscriptionReport::default();

        let resources = match self.session.list_resources().await {
            Ok(resources) => resources,
            Err(e) => {
                warn!(error = %e, "Error subscribing to resources");
                return report;
            }
        };

        if resources.is_empty() {
            info!("No resources found");
            return report;
        }
        report.discovered = resources.len();

        for resource in resources {
            match self.session.subscribe_resource(&resource.uri).await {
                Ok(()) => {
                    report.subscribed += 1;
                    info!(uri = %resource.uri, name = %resource.name, "Subscribed");
                }
                Err(e) => {
                    warn!(uri = %resource.uri, error = %e, "Subscribe failed");
                    report.failed.push((resource.uri.clone(), e.to_string()));
                }
            }

            if is_event_uri(&resource.uri) {
                report.registry.record(resource.uri, resource.name);
            }
        }

        info!(
            discovered = report.discovered,
            subscribed = report.subscribed,
            events = report.registry.len(),
            "Resource subscription finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use wotpilot_core::ResourceDescriptor;
    use wotpilot_mcp::McpError;

    struct FakeSession {
        resources: Option<Vec<ResourceDescriptor>>,
        reject: Vec<String>,
        attempted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl DeviceSession for FakeSession {
        async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError> {
            self.resources.clone().ok_or(McpError::Protocol {
                message: "listing failed".to_string(),
            })
        }

        async fn subscribe_resource(&self, uri: &str) -> Result<(), McpError> {
            self.attempted.lock().unwrap().push(uri.to_string());
            if self.reject.iter().any(|r| r == uri) {
                return Err(McpError::SubscribeFailed {
                    uri: uri.to_string(),
                    reason: "unsupported".to_string(),
                });
            }
            Ok(())
        }
    }

    fn devices() -> Vec<ResourceDescriptor> {
        vec![
            ResourceDescriptor::new("wot://washer/events/cycleFinished", "Cycle finished"),
            ResourceDescriptor::new("wot://washer/properties/status", "Washer status"),
            ResourceDescriptor::new("wot://doorbell/events/ring", "Doorbell ring"),
        ]
    }

    #[tokio::test]
    async fn test_partial_failure_continues() {
        let session = Arc::new(FakeSession {
            resources: Some(devices()),
            reject: vec!["wot://washer/events/cycleFinished".to_string()],
            attempted: Mutex::new(Vec::new()),
        });
        let manager = ResourceSubscriptionManager::new(session.clone());

        let report = manager.discover_and_subscribe().await;
        assert_eq!(session.attempted.lock().unwrap().len(), 3);
        assert_eq!(report.discovered, 3);
        assert_eq!(report.subscribed, 2);
        assert_eq!(report.failed.len(), 1);

        // only event resources are registered
        assert_eq!(report.registry.len(), 2);
        assert_eq!(
            report.registry.lookup("wot://doorbell/events/ring"),
            Some("Doorbell ring")
        );
        assert_eq!(report.registry.lookup("wot://washer/properties/status"), None);
    }

    #[tokio::test]
    async fn test_listing_failure_leaves_registry_empty() {
        let session = Arc::new(FakeSession {
            resources: None,
            reject: vec![],
            attempted: Mutex::new(Vec::new()),
        });
        let report = ResourceSubscriptionManager::new(session.clone())
            .discover_and_subscribe()
            .await;

        assert!(report.registry.is_empty());
        assert_eq!(report.subscribed, 0);
        assert!(session.attempted.lock().unwrap().is_empty());
    }
}
