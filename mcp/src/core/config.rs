//! MCP configuration types and utilities.
//!
//! Defines manager-wide settings and per-server descriptors: activation status,
//! call timeout, tool/prompt visibility filters and the transport that backs
//! each server.

use std::{
    collections::{HashMap, HashSet},
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

pub use rmcp::model::{CallToolResult, JsonObject, Prompt, Tool};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::provider::McpProvider;
use crate::error::{McpError, McpResult};

/// Call timeout applied when neither the server nor the manager sets one.
pub const DEFAULT_TIMEOUT_SECS: f64 = 60.0;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpConfig {
    /// Servers registered at construction
    #[serde(default)]
    pub servers: Vec<McpServerConfig>,

    /// Log per-call arguments and results at info level
    #[serde(default)]
    pub debug: bool,

    /// Call timeout (seconds) for servers without their own `timeout`
    #[serde(default = "default_timeout")]
    pub default_timeout: f64,
}

fn default_timeout() -> f64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            servers: Vec::new(),
            debug: false,
            default_timeout: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl McpConfig {
    pub fn new(servers: Vec<McpServerConfig>) -> Self {
        Self {
            servers,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub fn with_default_timeout(mut self, seconds: f64) -> Self {
        self.default_timeout = seconds;
        self
    }

    /// Load configuration from a YAML file
    pub async fn from_file(path: impl AsRef<Path>) -> McpResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> McpResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `MCP_DEFAULT_TIMEOUT` and `MCP_DEBUG` from the environment.
    ///
    /// Unparseable values are logged and ignored.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(raw) = std::env::var("MCP_DEFAULT_TIMEOUT") {
            match raw.trim().parse::<f64>() {
                Ok(secs) if timeout_duration("MCP_DEFAULT_TIMEOUT", secs).is_ok() => {
                    self.default_timeout = secs
                }
                _ => warn!(value = %raw, "Ignoring invalid MCP_DEFAULT_TIMEOUT"),
            }
        }

        if let Ok(raw) = std::env::var("MCP_DEBUG") {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.debug = true,
                "0" | "false" | "no" | "off" => self.debug = false,
                _ => warn!(value = %raw, "Ignoring invalid MCP_DEBUG"),
            }
        }

        self
    }

    pub fn default_timeout_duration(&self) -> McpResult<Duration> {
        timeout_duration("default_timeout", self.default_timeout)
    }

    /// Check manager settings, every server, and name uniqueness.
    pub fn validate(&self) -> McpResult<()> {
        timeout_duration("default_timeout", self.default_timeout)?;

        let mut seen = HashSet::new();
        for server in &self.servers {
            server.validate()?;
            if !seen.insert(server.name.as_str()) {
                return Err(McpError::DuplicateServer(server.name.clone()));
            }
        }
        Ok(())
    }
}

/// Convert a timeout in seconds, rejecting values that are not positive or
/// do not fit in a [`Duration`].
pub(crate) fn timeout_duration(field: &str, seconds: f64) -> McpResult<Duration> {
    match Duration::try_from_secs_f64(seconds) {
        Ok(duration) if !duration.is_zero() => Ok(duration),
        _ => Err(McpError::Config(format!(
            "{} must be a positive number of seconds, got {}",
            field, seconds
        ))),
    }
}

/// Activation status of a registered server.
///
/// `Error` covers both a failed activation and an explicit deactivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    #[default]
    Activate,
    Error,
    Disabled,
}

impl ServerStatus {
    pub fn is_active(self) -> bool {
        matches!(self, ServerStatus::Activate)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServerStatus::Activate => "activate",
            ServerStatus::Error => "error",
            ServerStatus::Disabled => "disabled",
        };
        f.write_str(s)
    }
}

/// Glob allow/block lists for one capability type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<Vec<String>>,
}

impl FilterConfig {
    pub fn allow<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow: Some(patterns.into_iter().map(Into::into).collect()),
            block: None,
        }
    }

    pub fn block<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            allow: None,
            block: Some(patterns.into_iter().map(Into::into).collect()),
        }
    }

    #[must_use]
    pub fn with_block<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.block = Some(patterns.into_iter().map(Into::into).collect());
        self
    }
}

/// Per-server visibility filters for tools and prompts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct McpFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<FilterConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompts: Option<FilterConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct McpServerConfig {
    pub name: String,

    #[serde(default)]
    pub status: ServerStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Call timeout (seconds), overrides the manager default
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<McpFilters>,

    #[serde(flatten)]
    pub transport: McpTransport,
}

impl McpServerConfig {
    pub fn new(name: impl Into<String>, transport: McpTransport) -> Self {
        Self {
            name: name.into(),
            status: ServerStatus::default(),
            description: None,
            timeout: None,
            filters: None,
            transport,
        }
    }

    /// In-process server backed by an already constructed provider.
    pub fn builtin(name: impl Into<String>, server: Arc<dyn McpProvider>) -> Self {
        Self::new(name, McpTransport::Builtin { server })
    }

    pub fn stdio<I, S>(name: impl Into<String>, command: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            McpTransport::Stdio {
                command: command.into(),
                args: args.into_iter().map(Into::into).collect(),
                env: HashMap::new(),
                cwd: None,
            },
        )
    }

    pub fn sse(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(
            name,
            McpTransport::Sse {
                url: url.into(),
                token: None,
                headers: HashMap::new(),
            },
        )
    }

    pub fn streamable_http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self::new(
            name,
            McpTransport::StreamableHttp {
                url: url.into(),
                token: None,
                headers: HashMap::new(),
            },
        )
    }

    #[must_use]
    pub fn with_status(mut self, status: ServerStatus) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, seconds: f64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: McpFilters) -> Self {
        self.filters = Some(filters);
        self
    }

    pub fn kind(&self) -> ServerKind {
        self.transport.kind()
    }

    /// Call timeout for this server, falling back to `default` when unset or invalid.
    pub fn effective_timeout(&self, default: Duration) -> Duration {
        self.timeout
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|duration| !duration.is_zero())
            .unwrap_or(default)
    }

    /// Merge an update into this descriptor.
    ///
    /// Status and transport come from `update`. Optional fields the update
    /// leaves unset keep their current value.
    pub fn merged_with(&self, update: McpServerConfig) -> McpServerConfig {
        McpServerConfig {
            name: self.name.clone(),
            status: update.status,
            description: update.description.or_else(|| self.description.clone()),
            timeout: update.timeout.or(self.timeout),
            filters: update.filters.or_else(|| self.filters.clone()),
            transport: update.transport,
        }
    }

    pub fn validate(&self) -> McpResult<()> {
        if self.name.trim().is_empty() {
            return Err(McpError::Config("server name must not be empty".to_string()));
        }
        if let Some(timeout) = self.timeout {
            timeout_duration(&format!("timeout for '{}'", self.name), timeout)?;
        }

        match &self.transport {
            McpTransport::Stdio { command, .. } => {
                if command.trim().is_empty() {
                    return Err(McpError::Config(format!(
                        "stdio server '{}' requires a command",
                        self.name
                    )));
                }
            }
            McpTransport::Sse { url, .. } | McpTransport::StreamableHttp { url, .. } => {
                validate_url(&self.name, url)?;
            }
            McpTransport::Builtin { .. } => {}
        }
        Ok(())
    }
}

fn validate_url(server: &str, raw: &str) -> McpResult<()> {
    let parsed = url::Url::parse(raw)
        .map_err(|e| McpError::Config(format!("invalid URL for '{}': {}", server, e)))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(McpError::Config(format!(
            "unsupported URL scheme '{}' for '{}'",
            other, server
        ))),
    }
}

/// Transport kind, without connection details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ServerKind {
    Builtin,
    Stdio,
    Sse,
    StreamableHttp,
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ServerKind::Builtin => "builtin",
            ServerKind::Stdio => "stdio",
            ServerKind::Sse => "sse",
            ServerKind::StreamableHttp => "streamable-http",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum McpTransport {
    /// In-process server, same as a function call
    #[serde(skip)]
    Builtin { server: Arc<dyn McpProvider> },
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default, alias = "envs")]
        env: HashMap<String, String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<PathBuf>,
    },
    Sse {
        url: String,
        /// Bearer token for Authorization header
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
    },
    StreamableHttp {
        url: String,
        /// Bearer token for Authorization header
        #[serde(default, skip_serializing_if = "Option::is_none")]
        token: Option<String>,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        headers: HashMap<String, String>,
    },
}

impl McpTransport {
    pub fn kind(&self) -> ServerKind {
        match self {
            McpTransport::Builtin { .. } => ServerKind::Builtin,
            McpTransport::Stdio { .. } => ServerKind::Stdio,
            McpTransport::Sse { .. } => ServerKind::Sse,
            McpTransport::StreamableHttp { .. } => ServerKind::StreamableHttp,
        }
    }

    /// Whether both transports reach the same endpoint with the same credentials.
    pub fn same_endpoint(&self, other: &McpTransport) -> bool {
        match (self, other) {
            (McpTransport::Builtin { server: a }, McpTransport::Builtin { server: b }) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            (
                McpTransport::Stdio {
                    command: c1,
                    args: a1,
                    env: e1,
                    cwd: d1,
                },
                McpTransport::Stdio {
                    command: c2,
                    args: a2,
                    env: e2,
                    cwd: d2,
                },
            ) => c1 == c2 && a1 == a2 && e1 == e2 && d1 == d2,
            (
                McpTransport::Sse {
                    url: u1,
                    token: t1,
                    headers: h1,
                },
                McpTransport::Sse {
                    url: u2,
                    token: t2,
                    headers: h2,
                },
            )
            | (
                McpTransport::StreamableHttp {
                    url: u1,
                    token: t1,
                    headers: h1,
                },
                McpTransport::StreamableHttp {
                    url: u2,
                    token: t2,
                    headers: h2,
                },
            ) => u1 == u2 && t1 == t2 && h1 == h2,
            _ => false,
        }
    }
}

impl fmt::Debug for McpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            McpTransport::Builtin { .. } => f.debug_struct("Builtin").finish_non_exhaustive(),
            McpTransport::Stdio {
                command,
                args,
                env,
                cwd,
            } => f
                .debug_struct("Stdio")
                .field("command", command)
                .field("args", args)
                .field("env", &format!("{} vars", env.len()))
                .field("cwd", cwd)
                .finish(),
            McpTransport::Sse {
                url,
                token,
                headers,
            } => f
                .debug_struct("Sse")
                .field("url", url)
                .field("token", &token.as_ref().map(|_| "****"))
                .field("headers", &format!("{} headers", headers.len()))
                .finish(),
            McpTransport::StreamableHttp {
                url,
                token,
                headers,
            } => f
                .debug_struct("StreamableHttp")
                .field("url", url)
                .field("token", &token.as_ref().map(|_| "****"))
                .field("headers", &format!("{} headers", headers.len()))
                .finish(),
        }
    }
}
