//! MCP error types.
//!
//! Lifecycle and listing failures are contained by the manager (events, logs,
//! empty results). Call failures surface to the caller as distinct variants so
//! not-found, execution and timeout conditions can be told apart.

use std::time::Duration;

use thiserror::Error;

pub type McpResult<T> = Result<T, McpError>;

#[derive(Debug, Error)]
pub enum McpError {
    #[error("Server with name {0} already exists")]
    DuplicateServer(String),

    #[error("MCP Client {0} not found")]
    ServerNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    #[error("Tool '{tool}' on server '{server}' timed out after {timeout:?}")]
    Timeout {
        server: String,
        tool: String,
        timeout: Duration,
    },

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl McpError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, McpError::Timeout { .. })
    }

    /// True for a missing server or a missing tool.
    pub fn is_not_found(&self) -> bool {
        matches!(self, McpError::ServerNotFound(_) | McpError::ToolNotFound(_))
    }
}
