//! Session transport configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default MCP endpoint of the WoT bridge.
pub const DEFAULT_MCP_URL: &str = "http://localhost:3000/mcp";

/// How to reach the MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "snake_case")]
pub enum McpTransportConfig {
    /// Streamable HTTP endpoint
    StreamableHttp {
        /// Endpoint url
        url: String,
    },

    /// Child process speaking MCP over stdio
    Stdio {
        /// Program to launch
        command: String,
        /// Program arguments
        #[serde(default)]
        args: Vec<String>,
        /// Extra environment
        #[serde(default)]
        env: HashMap<String, String>,
    },
}

impl Default for McpTransportConfig {
    fn default() -> Self {
        McpTransportConfig::StreamableHttp {
            url: DEFAULT_MCP_URL.to_string(),
        }
    }
}

impl McpTransportConfig {
    /// Build a stdio config from a shell-like command line
    /// (whitespace separated, no quoting).
    pub fn stdio_from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let command = parts.next()?;
        Some(McpTransportConfig::Stdio {
            command,
            args: parts.collect(),
            env: HashMap::new(),
        })
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            McpTransportConfig::StreamableHttp { url } => url.clone(),
            McpTransportConfig::Stdio { command, args, .. } => {
                if args.is_empty() {
                    command.clone()
                } else {
                    format!("{} {}", command, args.join(" "))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_http() {
        assert_eq!(
            McpTransportConfig::default(),
            McpTransportConfig::StreamableHttp {
                url: "http://localhost:3000/mcp".to_string()
            }
        );
    }

    #[test]
    fn test_stdio_from_command_line() {
        let config = McpTransportConfig::stdio_from_command_line("node  dist/index.js --stdio")
            .unwrap();
        match &config {
            McpTransportConfig::Stdio { command, args, .. } => {
                assert_eq!(command, "node");
                assert_eq!(args, &vec!["dist/index.js".to_string(), "--stdio".to_string()]);
            }
            other => panic!("unexpected config: {:?}", other),
        }
        assert_eq!(config.describe(), "node dist/index.js --stdio");
        assert!(McpTransportConfig::stdio_from_command_line("   ").is_none());
    }

    #[test]
    fn test_tagged_shape() {
        let config: McpTransportConfig =
            serde_json::from_str(r#"{"transport":"stdio","command":"wot-mcp"}"#).unwrap();
        assert!(matches!(config, McpTransportConfig::Stdio { ref args, .. } if args.is_empty()));
    }
}
