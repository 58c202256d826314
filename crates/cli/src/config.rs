//! Application configuration.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use wotpilot_ai::{timeout_from_secs, DEFAULT_BASE_URL, DEFAULT_MAX_STEPS, DEFAULT_MODEL};
use wotpilot_core::DEFAULT_MAX_EVENTS;
use wotpilot_mcp::{McpTransportConfig, DEFAULT_MCP_URL};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "wotpilot.toml";

/// Node-RED admin API of the reference deployment.
pub const DEFAULT_NODE_RED_URL: &str = "http://localhost:1881";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub node_red: NodeRedConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
}

/// `[mcp]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct McpConfig {
    /// Streamable HTTP endpoint
    pub url: String,
    /// Launch the bridge as a child process instead
    pub command: Option<String>,
    /// Arguments for `command`
    pub args: Vec<String>,
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_MCP_URL.to_string(),
            command: None,
            args: Vec::new(),
        }
    }
}

impl McpConfig {
    /// Transport to connect with. A configured command wins over the url.
    pub fn transport(&self) -> McpTransportConfig {
        match &self.command {
            Some(command) => McpTransportConfig::Stdio {
                command: command.clone(),
                args: self.args.clone(),
                env: Default::default(),
            },
            None => McpTransportConfig::StreamableHttp {
                url: self.url.clone(),
            },
        }
    }
}

/// `[llm]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub temperature: Option<f32>,
    pub max_steps: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            temperature: Some(0.0),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }
}

/// `[node_red]`
///
/// Flow tools are only offered to the automation agent when `url` is set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeRedConfig {
    pub url: Option<String>,
    /// Bearer token for the admin API
    pub token: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl NodeRedConfig {
    /// Configured url, or the default one.
    pub fn url_or_default(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_NODE_RED_URL)
    }
}

/// `[automation]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationConfig {
    /// Milliseconds between automation cycles
    pub interval_ms: u64,
    /// Event buffer capacity
    pub max_events: usize,
    /// Agent call timeout, `0` waits indefinitely
    pub agent_timeout_secs: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            max_events: DEFAULT_MAX_EVENTS,
            agent_timeout_secs: 300,
        }
    }
}

impl AutomationConfig {
    /// Time between automation cycles, never zero.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    /// Agent call timeout, `None` when disabled.
    pub fn agent_timeout(&self) -> Option<Duration> {
        timeout_from_secs(self.agent_timeout_secs)
    }
}

impl AppConfig {
    /// Load config: defaults, then the TOML file, then environment variables.
    ///
    /// An explicit `path` must exist; otherwise `./wotpilot.toml` is read
    /// when present.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_file(path)?,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load_from_file(&default)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse one TOML file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("WOTPILOT_MCP_URL") {
            self.mcp.url = url;
        }
        if let Some(key) = lookup("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("WOTPILOT_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(url) = lookup("WOTPILOT_LLM_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(url) = lookup("WOTPILOT_NODE_RED_URL") {
            self.node_red.url = Some(url);
        }
        if let Some(token) = lookup("WOTPILOT_NODE_RED_TOKEN") {
            self.node_red.token = Some(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.mcp.url, "http://localhost:3000/mcp");
        assert_eq!(config.llm.model, "gpt-4.1");
        assert_eq!(config.llm.temperature, Some(0.0));
        assert_eq!(config.automation.interval(), Duration::from_secs(2));
        assert_eq!(config.automation.max_events, 100);
        assert_eq!(config.automation.agent_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(config.node_red.url_or_default(), "http://localhost:1881");
        assert!(matches!(config.mcp.transport(), McpTransportConfig::StreamableHttp { .. }));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[mcp]
command = "node"
args = ["bridge.js"]

[llm]
model = "qwen2.5"
base_url = "http://localhost:1234/v1"

[automation]
agent_timeout_secs = 0
"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.llm.model, "qwen2.5");
        assert_eq!(config.llm.max_steps, DEFAULT_MAX_STEPS);
        assert_eq!(config.automation.interval_ms, 2000);
        assert_eq!(config.automation.agent_timeout(), None);
        assert_eq!(
            config.mcp.transport(),
            McpTransportConfig::Stdio {
                command: "node".to_string(),
                args: vec!["bridge.js".to_string()],
                env: Default::default(),
            }
        );
    }

    #[test]
    fn test_explicit_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(AppConfig::load(Some(&missing)).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::default();
        let env: HashMap<&str, &str> = [
            ("WOTPILOT_MCP_URL", "http://bridge:3000/mcp"),
            ("OPENAI_API_KEY", "sk-test"),
            ("WOTPILOT_NODE_RED_URL", "http://nodered:1880"),
        ]
        .into_iter()
        .collect();

        config.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.mcp.url, "http://bridge:3000/mcp");
        assert_eq!(config.llm.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.node_red.url.as_deref(), Some("http://nodered:1880"));
        assert_eq!(config.llm.model, "gpt-4.1");
    }
}
