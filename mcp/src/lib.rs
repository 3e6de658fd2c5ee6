//! Model Context Protocol (MCP) client aggregation.
//!
//! Keeps a registry of MCP servers reached over different transports, merges
//! their tools and prompts into one namespace and routes tool calls to the
//! owning server.
//!
//! ## Modules
//!
//! - [`core`]: manager, configuration, providers, filtering and identity
//! - [`error`]: error taxonomy
//!
//! ## Example
//!
//! ```no_run
//! use mcp_client::{CallToolRequest, McpConfig, McpManager};
//!
//! # async fn run() -> mcp_client::McpResult<()> {
//! let config = McpConfig::from_file("mcp.yaml").await?.with_env_overrides();
//! let manager = McpManager::new(config)?;
//! manager.init().await;
//!
//! for tool in manager.list_tools(None).await {
//!     println!("{} {}/{}", tool.id, tool.server_name, tool.name());
//! }
//!
//! let result = manager
//!     .call_tool(CallToolRequest::new("files", "list_directory"))
//!     .await?;
//! println!("{:?}", result);
//! manager.cleanup().await;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod error;

pub use core::{config, manager};
pub use core::{
    AggregatedPrompt, AggregatedTool, BuiltinServer, CallToolRequest, CallToolResult,
    FilterConfig, JsonObject, McpConfig, McpFilters, McpManager, McpMetrics, McpProvider,
    McpServerConfig, McpTransport, MetricsSnapshot, Prompt, ServerEvent, ServerHealth,
    ServerKind, ServerStatus, Tool,
};
pub use error::{McpError, McpResult};
