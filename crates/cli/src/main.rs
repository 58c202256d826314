//! wotpilot CLI - event-driven home automation over a WoT MCP bridge.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wotpilot_ai::{prompts, AgentInvoker, LlmClient, OpenAiClient, ToolAgent};
use wotpilot_automation::{
    AutomationHost, AutomationLoop, CommandLoop, ConsoleDisplay, FlowGenerator, LoopConfig,
    NotificationRouter, ResourceSubscriptionManager, StdinLines,
};
use wotpilot_core::{ResourceKind, RuleStore, SharedEventBuffer};
use wotpilot_mcp::{DeviceSession, McpSession, McpTransportConfig, NotificationHub};
use wotpilot_storage::{FlowStore, MemoryFlowStore, NodeRedAuth, NodeRedClient};
use wotpilot_tools::{flow_tools, BuiltinTools, ToolExecutor, ToolRegistry};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "wotpilot")]
#[command(
    about = "Event-driven home automation agent for Web of Things devices",
    long_about = None
)]
struct Cli {
    /// Config file (default: ./wotpilot.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// MCP endpoint of the WoT bridge
    #[arg(long, global = true)]
    mcp_url: Option<String>,

    /// Launch the WoT bridge as a child process speaking MCP over stdio
    #[arg(long, global = true)]
    mcp_command: Option<String>,

    /// Model name
    #[arg(long, global = true)]
    model: Option<String>,

    /// Log filter, overrides RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Keep flows in memory instead of talking to Node-RED
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Subscribe to device events and run the automation agent interactively
    Run,
    /// List device resources
    Resources,
    /// List the tools the agent receives
    Tools,
    /// Generate a Node-RED flow from a request
    Generate {
        /// What the flow should do
        request: String,
        /// Create the flow in Node-RED
        #[arg(long)]
        deploy: bool,
        /// Flow tab label (default: the generated tab's label)
        #[arg(long)]
        label: Option<String>,
    },
    /// Manage Node-RED flows
    Flows {
        #[command(subcommand)]
        command: FlowCommands,
    },
}

#[derive(Subcommand)]
enum FlowCommands {
    /// List all flows
    List,
    /// Show one flow tab
    Show {
        /// Flow id
        id: String,
    },
    /// Replace all flows with the JSON array in a file
    Deploy {
        /// Flow file
        file: PathBuf,
    },
    /// Delete one flow tab
    Delete {
        /// Flow id
        id: String,
    },
}

/// Logs go to stderr; stdout belongs to the operator console.
fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(url) = &cli.mcp_url {
        config.mcp.url = url.clone();
        config.mcp.command = None;
    }
    if let Some(line) = &cli.mcp_command {
        if let Some(McpTransportConfig::Stdio { command, args, .. }) =
            McpTransportConfig::stdio_from_command_line(line)
        {
            config.mcp.command = Some(command);
            config.mcp.args = args;
        }
    }
    if let Some(model) = &cli.model {
        config.llm.model = model.clone();
    }

    match cli.command {
        Commands::Run => run(&config, cli.dry_run).await,
        Commands::Resources => list_resources(&config).await,
        Commands::Tools => list_tools(&config, cli.dry_run).await,
        Commands::Generate {
            request,
            deploy,
            label,
        } => generate(&config, cli.dry_run, &request, deploy, label.as_deref()).await,
        Commands::Flows { command } => flows(&config, cli.dry_run, command).await,
    }
}

fn llm_client(config: &AppConfig) -> Arc<dyn LlmClient> {
    if config.llm.api_key.is_none() {
        warn!("No API key configured; set OPENAI_API_KEY unless the endpoint needs none");
    }

    Arc::new(
        OpenAiClient::new(config.llm.model.clone())
            .with_api_key(config.llm.api_key.clone())
            .with_base_url(config.llm.base_url.clone())
            .with_temperature(config.llm.temperature),
    )
}

fn flow_store(config: &AppConfig, dry_run: bool) -> Arc<dyn FlowStore> {
    if dry_run {
        info!("Dry run: flows are kept in memory");
        return Arc::new(MemoryFlowStore::new());
    }

    let node_red = &config.node_red;
    let auth = match (&node_red.token, &node_red.username, &node_red.password) {
        (Some(token), _, _) => NodeRedAuth::Bearer(token.clone()),
        (None, Some(username), Some(password)) => NodeRedAuth::Basic {
            username: username.clone(),
            password: password.clone(),
        },
        _ => NodeRedAuth::None,
    };
    Arc::new(NodeRedClient::new(node_red.url_or_default()).with_auth(auth))
}

async fn connect(config: &AppConfig, hub: NotificationHub) -> Result<Arc<McpSession>> {
    let transport = config.mcp.transport();
    let session = McpSession::connect(&transport, hub)
        .await
        .with_context(|| format!("failed to connect to {}", transport.describe()))?;
    Ok(Arc::new(session))
}

/// Device tools plus, when Node-RED is configured or in a dry run, the
/// flow tools.
fn agent_tools(
    config: &AppConfig,
    dry_run: bool,
    session: Arc<McpSession>,
) -> (ToolRegistry, bool) {
    let mut registry = ToolRegistry::new();
    registry.register(session);

    let with_flows = dry_run || config.node_red.url.is_some();
    if with_flows {
        let store = flow_store(config, dry_run);
        registry.register(Arc::new(BuiltinTools::new(flow_tools(store))));
    }
    (registry, with_flows)
}

async fn run(config: &AppConfig, dry_run: bool) -> Result<()> {
    let buffer = SharedEventBuffer::with_capacity(config.automation.max_events);
    let hub = NotificationHub::new();
    let router = NotificationRouter::new(buffer.clone());
    hub.register(Arc::new(router.clone()));

    let session = connect(config, hub).await?;
    let report = ResourceSubscriptionManager::new(session.clone())
        .discover_and_subscribe()
        .await;
    info!(
        discovered = report.discovered,
        subscribed = report.subscribed,
        failed = report.failed.len(),
        "Resource subscriptions ready"
    );
    router.install_registry(report.registry);

    let (tools, with_flows) = agent_tools(config, dry_run, session.clone());
    let system_prompt = if with_flows {
        format!("{}\n\n{}", prompts::AUTOMATION_SYSTEM_PROMPT, prompts::FLOW_MANAGER_PROMPT)
    } else {
        prompts::AUTOMATION_SYSTEM_PROMPT.to_string()
    };
    let agent = ToolAgent::new(llm_client(config), Arc::new(tools), system_prompt)
        .with_max_steps(config.llm.max_steps);
    let invoker =
        AgentInvoker::new(Arc::new(agent)).with_timeout(config.automation.agent_timeout());

    let rules = RuleStore::new();
    let display = Arc::new(ConsoleDisplay::new());
    let automation = AutomationLoop::new(buffer, rules.clone(), invoker.clone(), display.clone())
        .with_config(LoopConfig {
            interval: config.automation.interval(),
        });
    let commands = CommandLoop::new(rules, invoker, display.clone());
    let host = AutomationHost::new(automation, commands, display);

    let cancel = host.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted");
            cancel.cancel();
        }
    });

    let mut input = StdinLines::spawn();
    let reason = host.run(&mut input).await;
    info!(?reason, "Shutting down");

    session.close().await?;
    Ok(())
}

async fn list_resources(config: &AppConfig) -> Result<()> {
    let session = connect(config, NotificationHub::new()).await?;
    let resources = session.list_resources().await?;

    println!("Resources ({})", resources.len());
    for resource in &resources {
        let kind = match resource.kind() {
            ResourceKind::Event => "EVENT",
            ResourceKind::Property => "     ",
        };
        println!("  {} | {} | {}", kind, resource.name, resource.uri);
    }

    session.close().await?;
    Ok(())
}

async fn list_tools(config: &AppConfig, dry_run: bool) -> Result<()> {
    let session = connect(config, NotificationHub::new()).await?;
    let (registry, _) = agent_tools(config, dry_run, session.clone());
    let tools = registry.list_tools().await?;

    println!("Tools ({})", tools.len());
    for tool in &tools {
        println!("  {} - {}", tool.name, tool.description);
    }

    session.close().await?;
    Ok(())
}

async fn generate(
    config: &AppConfig,
    dry_run: bool,
    request: &str,
    deploy: bool,
    label: Option<&str>,
) -> Result<()> {
    let session = connect(config, NotificationHub::new()).await?;
    let agent = ToolAgent::new(llm_client(config), session.clone(), prompts::FLOW_GENERATOR_PROMPT)
        .with_max_steps(config.llm.max_steps);
    let invoker =
        AgentInvoker::new(Arc::new(agent)).with_timeout(config.automation.agent_timeout());
    let generator = FlowGenerator::new(invoker);

    let generated = generator.generate(request).await?;
    println!("{}", generated.render());

    if deploy {
        match &generated.flow {
            Some(flow) => {
                let store = flow_store(config, dry_run);
                let reply = generator.deploy(store.as_ref(), flow, label).await?;
                println!("Deployed flow: {}", reply);
            }
            None => warn!("Nothing to deploy: the reply holds no flow"),
        }
    }

    session.close().await?;
    Ok(())
}

async fn flows(config: &AppConfig, dry_run: bool, command: FlowCommands) -> Result<()> {
    let store = flow_store(config, dry_run);

    match command {
        FlowCommands::List => {
            let flows = store.read_flows().await?;
            let nodes = flows.as_array().map(Vec::as_slice).unwrap_or_default();
            let tabs: Vec<&Value> = nodes
                .iter()
                .filter(|node| node.get("type").and_then(Value::as_str) == Some("tab"))
                .collect();

            println!("Flows ({})", tabs.len());
            for tab in tabs {
                println!(
                    "  {} | {}",
                    tab.get("id").and_then(Value::as_str).unwrap_or("?"),
                    tab.get("label").and_then(Value::as_str).unwrap_or(""),
                );
            }
        }
        FlowCommands::Show { id } => {
            let flow = store.read_flow(&id).await?;
            println!("{}", serde_json::to_string_pretty(&flow)?);
        }
        FlowCommands::Deploy { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let flows: Value = serde_json::from_str(&content)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            let reply = store.deploy_flows(&flows).await?;
            println!("{}", reply);
        }
        FlowCommands::Delete { id } => {
            store.delete_flow(&id).await?;
            println!("Deleted flow {}", id);
        }
    }

    Ok(())
}
