//! rmcp-backed device session.

use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParam, Content, LoggingMessageNotificationParam, RawContent, Resource,
    ResourceUpdatedNotificationParam, SubscribeRequestParam,
};
use rmcp::service::{NotificationContext, Peer, RoleClient, RunningService, ServiceExt};
use rmcp::transport::{StreamableHttpClientTransport, TokioChildProcess};
use rmcp::ClientHandler;
use serde_json::Value;
use std::future::Future;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, info};
use wotpilot_core::{ResourceDescriptor, SessionNotification};
use wotpilot_tools::{ToolError, ToolExecutor, ToolSpec};

use crate::{DeviceSession, McpError, McpTransportConfig, NotificationHub};

/// Client handler that decodes server notifications into
/// `SessionNotification` and hands them to the hub.
#[derive(Clone)]
pub struct DeviceClientHandler {
    hub: NotificationHub,
}

impl DeviceClientHandler {
    /// Create a handler feeding `hub`.
    pub fn new(hub: NotificationHub) -> Self {
        Self { hub }
    }

    fn forward(&self, notification: SessionNotification) {
        self.hub.dispatch(&notification);
    }
}

impl ClientHandler for DeviceClientHandler {
    fn on_resource_updated(
        &self,
        params: ResourceUpdatedNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        self.forward(SessionNotification::ResourceUpdated { uri: params.uri });
        std::future::ready(())
    }

    fn on_resource_list_changed(
        &self,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        self.forward(SessionNotification::ResourceListChanged);
        std::future::ready(())
    }

    fn on_tool_list_changed(
        &self,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        self.forward(SessionNotification::Other {
            method: "notifications/tools/list_changed".to_string(),
        });
        std::future::ready(())
    }

    fn on_logging_message(
        &self,
        _params: LoggingMessageNotificationParam,
        _context: NotificationContext<RoleClient>,
    ) -> impl Future<Output = ()> + Send + '_ {
        self.forward(SessionNotification::Other {
            method: "notifications/message".to_string(),
        });
        std::future::ready(())
    }
}

/// Live MCP session to the device bridge.
pub struct McpSession {
    peer: Peer<RoleClient>,
    service: Mutex<Option<RunningService<RoleClient, DeviceClientHandler>>>,
    endpoint: String,
}

impl McpSession {
    /// Start the transport and perform the initialize handshake. Inbound
    /// notifications are delivered to `hub` from then on.
    pub async fn connect(
        config: &McpTransportConfig,
        hub: NotificationHub,
    ) -> Result<Self, McpError> {
        let handler = DeviceClientHandler::new(hub);
        let endpoint = config.describe();

        let service = match config {
            McpTransportConfig::StreamableHttp { url } => {
                let transport = StreamableHttpClientTransport::from_uri(url.clone());
                handler
                    .serve(transport)
                    .await
                    .map_err(|e| McpError::ConnectionFailed {
                        reason: format!("Failed to establish MCP connection: {}", e),
                    })?
            }
            McpTransportConfig::Stdio { command, args, env } => {
                let mut cmd = Command::new(command);
                cmd.args(args);
                for (key, value) in env {
                    cmd.env(key, value);
                }

                let transport =
                    TokioChildProcess::new(cmd).map_err(|e| McpError::ConnectionFailed {
                        reason: format!("Failed to spawn process: {}", e),
                    })?;
                handler
                    .serve(transport)
                    .await
                    .map_err(|e| McpError::ConnectionFailed {
                        reason: format!("Failed to establish MCP connection: {}", e),
                    })?
            }
        };

        info!(endpoint = %endpoint, "MCP session established");

        Ok(Self {
            peer: service.peer().clone(),
            service: Mutex::new(Some(service)),
            endpoint,
        })
    }

    /// Endpoint description.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Cancel the session. Later calls fail with `McpError::Closed`.
    pub async fn close(&self) -> Result<(), McpError> {
        let Some(service) = self.service.lock().await.take() else {
            return Ok(());
        };

        service
            .cancel()
            .await
            .map_err(|e| McpError::ConnectionFailed {
                reason: format!("Failed to close connection: {:?}", e),
            })?;
        info!(endpoint = %self.endpoint, "MCP session closed");
        Ok(())
    }

    async fn ensure_open(&self) -> Result<(), McpError> {
        if self.service.lock().await.is_none() {
            return Err(McpError::Closed);
        }
        Ok(())
    }

    /// Call a device tool and return its text content.
    pub async fn call_tool(&self, name: &str, args: &Value) -> Result<String, McpError> {
        self.ensure_open().await?;

        let result = self
            .peer
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments: args.as_object().cloned(),
            })
            .await
            .map_err(|e| McpError::ToolCallFailed {
                tool: name.to_string(),
                reason: format!("{}", e),
            })?;

        let text = extract_text(result.content);
        if result.is_error.unwrap_or(false) {
            return Err(McpError::ToolCallFailed {
                tool: name.to_string(),
                reason: if text.is_empty() {
                    "Tool returned error".to_string()
                } else {
                    text
                },
            });
        }
        Ok(text)
    }
}

fn descriptor(resource: Resource) -> ResourceDescriptor {
    let raw = resource.raw;
    ResourceDescriptor {
        uri: raw.uri,
        name: raw.name,
        description: raw.description,
        mime_type: raw.mime_type,
    }
}

/// Newline-joined text items of a tool result; other content is skipped.
fn extract_text(contents: Vec<Content>) -> String {
    contents
        .into_iter()
        .filter_map(|c| match c.raw {
            RawContent::Text(text) => Some(text.text),
            _ => None,
        })
        .fold(String::new(), |mut acc, text| {
            if !acc.is_empty() {
                acc.push('\n');
            }
            acc.push_str(&text);
            acc
        })
}

#[async_trait]
impl DeviceSession for McpSession {
    async fn list_resources(&self) -> Result<Vec<ResourceDescriptor>, McpError> {
        self.ensure_open().await?;

        let resources = self
            .peer
            .list_all_resources()
            .await
            .map_err(|e| McpError::Protocol {
                message: format!("Failed to list resources: {}", e),
            })?;

        debug!(count = resources.len(), "Listed resources");
        Ok(resources.into_iter().map(descriptor).collect())
    }

    async fn subscribe_resource(&self, uri: &str) -> Result<(), McpError> {
        self.ensure_open().await?;

        self.peer
            .subscribe(SubscribeRequestParam {
                uri: uri.to_string(),
            })
            .await
            .map_err(|e| McpError::SubscribeFailed {
                uri: uri.to_string(),
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl ToolExecutor for McpSession {
    async fn list_tools(&self) -> Result<Vec<ToolSpec>, ToolError> {
        self.ensure_open().await?;

        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(|e| ToolError::Transport(format!("Failed to list tools: {}", e)))?;

        Ok(tools
            .into_iter()
            .map(|t| ToolSpec {
                name: t.name.to_string(),
                description: t.description.unwrap_or_default().to_string(),
                input_schema: Value::Object(std::sync::Arc::unwrap_or_clone(t.input_schema)),
            })
            .collect())
    }

    async fn execute_tool(&self, name: &str, args: Value) -> Result<String, ToolError> {
        Ok(self.call_tool(name, &args).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_text_joins_lines() {
        let contents = vec![Content::text("Lamp on"), Content::text("Brightness 80")];
        assert_eq!(extract_text(contents), "Lamp on\nBrightness 80");
    }

    #[test]
    fn test_extract_text_empty() {
        assert_eq!(extract_text(Vec::new()), "");
    }

    #[test]
    fn test_tool_failure_maps_to_tool_error() {
        let err: ToolError = McpError::ToolCallFailed {
            tool: "toggle".to_string(),
            reason: "device offline".to_string(),
        }
        .into();
        assert!(matches!(err, ToolError::Failed { ref tool, .. } if tool == "toggle"));

        let err: ToolError = McpError::Closed.into();
        assert!(matches!(err, ToolError::Transport(_)));
    }
}
