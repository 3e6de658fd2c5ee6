//! Provider handles: one uniform surface over every transport kind.
//!
//! The manager only sees [`McpProvider`]. In-process servers implement it
//! directly (see [`BuiltinServer`](super::builtin::BuiltinServer)); stdio, SSE
//! and streamable HTTP servers go through [`RmcpProvider`].

use std::{borrow::Cow, collections::HashMap, sync::Arc, time::Duration};

use async_trait::async_trait;
use rmcp::{
    model::{CallToolRequestParam, ErrorCode},
    service::{RunningService, ServiceError},
    transport::{
        sse_client::SseClientConfig, streamable_http_client::StreamableHttpClientTransportConfig,
        ConfigureCommandExt, SseClientTransport, StreamableHttpClientTransport, TokioChildProcess,
    },
    RoleClient, ServiceExt,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::config::{CallToolResult, JsonObject, McpServerConfig, McpTransport, Prompt, Tool};
use crate::error::{McpError, McpResult};

/// Capability set every server handle exposes.
///
/// `connect` and `close` must both be idempotent; a closed handle may be
/// connected again.
#[async_trait]
pub trait McpProvider: Send + Sync {
    async fn connect(&self) -> McpResult<()>;

    async fn list_tools(&self) -> McpResult<Vec<Tool>>;

    async fn list_prompts(&self) -> McpResult<Vec<Prompt>>;

    async fn call_tool(&self, name: &str, arguments: Option<JsonObject>)
        -> McpResult<CallToolResult>;

    async fn close(&self) -> McpResult<()>;
}

/// Build the handle for a descriptor without connecting it.
pub fn create_provider(config: &McpServerConfig) -> Arc<dyn McpProvider> {
    match &config.transport {
        McpTransport::Builtin { server } => Arc::clone(server),
        transport => Arc::new(RmcpProvider::new(&config.name, transport.clone())),
    }
}

type McpClient = RunningService<RoleClient, ()>;

/// Handle for out-of-process servers, backed by an rmcp client session.
pub struct RmcpProvider {
    name: String,
    transport: McpTransport,
    client: RwLock<Option<Arc<McpClient>>>,
}

impl RmcpProvider {
    pub fn new(name: impl Into<String>, transport: McpTransport) -> Self {
        Self {
            name: name.into(),
            transport,
            client: RwLock::new(None),
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.client.read().await.is_some()
    }

    async fn client(&self) -> McpResult<Arc<McpClient>> {
        self.client
            .read()
            .await
            .as_ref()
            .map(Arc::clone)
            .ok_or_else(|| McpError::Transport(format!("server '{}' is not connected", self.name)))
    }

    async fn open_session(&self) -> McpResult<McpClient> {
        match &self.transport {
            McpTransport::Stdio {
                command,
                args,
                env,
                cwd,
            } => {
                let transport = TokioChildProcess::new(
                    tokio::process::Command::new(command).configure(|cmd| {
                        cmd.args(args)
                            .envs(env.iter())
                            .stderr(std::process::Stdio::inherit());
                        if let Some(dir) = cwd {
                            cmd.current_dir(dir);
                        }
                    }),
                )
                .map_err(|e| McpError::Transport(format!("create stdio transport: {}", e)))?;

                ().serve(transport).await.map_err(|e| {
                    McpError::ConnectionFailed(format!("initialize stdio client: {}", e))
                })
            }

            McpTransport::Sse {
                url,
                token,
                headers,
            } => {
                let http_client = build_http_client(token, headers)?;
                let cfg = SseClientConfig {
                    sse_endpoint: url.clone().into(),
                    ..Default::default()
                };

                let transport = SseClientTransport::start_with_client(http_client, cfg)
                    .await
                    .map_err(|e| McpError::Transport(format!("create SSE transport: {}", e)))?;

                ().serve(transport).await.map_err(|e| {
                    McpError::ConnectionFailed(format!("initialize SSE client: {}", e))
                })
            }

            McpTransport::StreamableHttp {
                url,
                token,
                headers,
            } => {
                let http_client = build_http_client(token, headers)?;
                let cfg = StreamableHttpClientTransportConfig::with_uri(url.as_str());
                let transport = StreamableHttpClientTransport::with_client(http_client, cfg);

                ().serve(transport).await.map_err(|e| {
                    McpError::ConnectionFailed(format!("initialize streamable client: {}", e))
                })
            }

            McpTransport::Builtin { .. } => Err(McpError::Config(format!(
                "server '{}' is in-process and has no remote transport",
                self.name
            ))),
        }
    }
}

#[async_trait]
impl McpProvider for RmcpProvider {
    async fn connect(&self) -> McpResult<()> {
        let mut slot = self.client.write().await;
        if slot.is_some() {
            debug!(server = %self.name, "Already connected");
            return Ok(());
        }

        info!(server = %self.name, transport = ?self.transport, "Connecting to MCP server");
        let client = self.open_session().await?;
        *slot = Some(Arc::new(client));
        info!(server = %self.name, "Connected to MCP server");
        Ok(())
    }

    async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        let client = self.client().await?;
        client
            .peer()
            .list_all_tools()
            .await
            .map_err(|e| McpError::Transport(format!("list tools: {}", e)))
    }

    async fn list_prompts(&self) -> McpResult<Vec<Prompt>> {
        let client = self.client().await?;
        client
            .peer()
            .list_all_prompts()
            .await
            .map_err(|e| McpError::Transport(format!("list prompts: {}", e)))
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> McpResult<CallToolResult> {
        let client = self.client().await?;
        let request = CallToolRequestParam {
            name: Cow::Owned(name.to_string()),
            arguments,
        };

        client
            .call_tool(request)
            .await
            .map_err(|e| map_call_error(name, e))
    }

    async fn close(&self) -> McpResult<()> {
        let Some(client) = self.client.write().await.take() else {
            return Ok(());
        };

        match Arc::try_unwrap(client) {
            Ok(client) => {
                client
                    .cancel()
                    .await
                    .map_err(|e| McpError::Transport(format!("close '{}': {}", self.name, e)))?;
            }
            Err(_) => {
                // In-flight calls still hold the session; it is cancelled on last drop.
                warn!(server = %self.name, "Closing MCP session with calls still in flight");
            }
        }
        info!(server = %self.name, "Disconnected from MCP server");
        Ok(())
    }
}

fn map_call_error(tool: &str, error: ServiceError) -> McpError {
    match error {
        ServiceError::McpError(data)
            if data.code == ErrorCode::METHOD_NOT_FOUND
                || data.message.to_ascii_lowercase().contains("not found") =>
        {
            McpError::ToolNotFound(format!("{}: {}", tool, data.message))
        }
        other => McpError::ToolExecution(format!("{}: {}", tool, other)),
    }
}

/// Build request headers from token and custom headers.
fn build_request_headers(
    token: &Option<String>,
    custom_headers: &HashMap<String, String>,
) -> McpResult<reqwest::header::HeaderMap> {
    let mut headers = reqwest::header::HeaderMap::new();

    if let Some(tok) = token {
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", tok)
                .parse()
                .map_err(|e| McpError::Transport(format!("auth token: {}", e)))?,
        );
    }

    for (key, value) in custom_headers {
        headers.insert(
            reqwest::header::HeaderName::from_bytes(key.as_bytes())
                .map_err(|e| McpError::Transport(format!("header name: {}", e)))?,
            value
                .parse()
                .map_err(|e| McpError::Transport(format!("header value: {}", e)))?,
        );
    }

    Ok(headers)
}

fn build_http_client(
    token: &Option<String>,
    custom_headers: &HashMap<String, String>,
) -> McpResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(10));

    let req_headers = build_request_headers(token, custom_headers)?;
    if !req_headers.is_empty() {
        builder = builder.default_headers(req_headers);
    }

    builder
        .build()
        .map_err(|e| McpError::Transport(format!("build HTTP client: {}", e)))
}
