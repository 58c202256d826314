//! Agent tool integration
//!
//! Tools the agent can call: device tools served over MCP and built-in
//! Node-RED flow tools, merged behind one `ToolExecutor`.

#![warn(missing_docs)]

pub mod builtin;
pub mod registry;
pub mod r#trait;

pub use builtin::{
    flow_tools, CreateFlowTool, DeleteFlowTool, GetFlowTool, GetFlowsTool, UpdateFlowTool,
};
pub use r#trait::{Tool, ToolError, ToolExecutor, ToolSpec};
pub use registry::{BuiltinTools, ToolRegistry};
