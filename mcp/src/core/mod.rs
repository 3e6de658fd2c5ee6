//! Core MCP client infrastructure.

pub mod aggregate;
pub mod builtin;
pub mod config;
pub mod events;
pub mod filter;
pub mod identity;
pub mod manager;
pub mod metrics;
pub mod provider;
mod registry;

pub use aggregate::{AggregatedPrompt, AggregatedTool};
pub use builtin::{prompt_descriptor, tool_descriptor, BuiltinServer, ToolHandler};
pub use config::{
    CallToolResult, FilterConfig, JsonObject, McpConfig, McpFilters, McpServerConfig,
    McpTransport, Prompt, ServerKind, ServerStatus, Tool,
};
pub use events::{EventBus, ServerEvent};
pub use filter::{GlobPattern, NameFilter, ServerFilters};
pub use identity::{identify, prompt_id, tool_id, ItemKind};
pub use manager::{CallToolRequest, McpManager, ServerHealth};
pub use metrics::{CallOutcome, LatencySnapshot, McpMetrics, MetricsSnapshot, QualifiedToolName};
pub use provider::{create_provider, McpProvider, RmcpProvider};
