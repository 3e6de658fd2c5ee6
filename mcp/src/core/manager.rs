//! MCP server lifecycle management and capability aggregation.
//!
//! [`McpManager`] owns the server registry. It activates servers lazily on
//! first use, merges the tools and prompts of every serving provider into one
//! namespace, and routes tool calls with a per-server deadline.
//!
//! Failures are contained by class:
//! - activation failures leave the server inactive and emit
//!   [`ServerEvent::Error`];
//! - listing failures drop that server's contribution and are logged;
//! - call failures are returned to the caller.

use std::{
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use futures::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex, OnceCell};
use tracing::{debug, error, info, warn};

use super::{
    aggregate::{AggregatedPrompt, AggregatedTool},
    config::{CallToolResult, JsonObject, McpConfig, McpServerConfig, ServerStatus},
    events::{EventBus, ServerEvent},
    filter::ServerFilters,
    metrics::{CallOutcome, McpMetrics, MetricsSnapshot, QualifiedToolName},
    provider::{create_provider, McpProvider},
    registry::{ActiveServer, ServerEntry, ServerRegistry},
};
use crate::error::{McpError, McpResult};

/// Per-call logging at `info` in debug mode, `debug` otherwise.
macro_rules! call_log {
    ($verbose:expr, $($arg:tt)+) => {
        if $verbose {
            info!($($arg)+)
        } else {
            debug!($($arg)+)
        }
    };
}

/// A tool invocation routed by server name.
#[derive(Debug, Clone)]
pub struct CallToolRequest {
    /// Name of the server that owns the tool
    pub client: String,
    pub name: String,
    pub args: Option<JsonObject>,
}

impl CallToolRequest {
    pub fn new(client: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            client: client.into(),
            name: name.into(),
            args: None,
        }
    }

    #[must_use]
    pub fn with_args(mut self, args: JsonObject) -> Self {
        self.args = Some(args);
        self
    }
}

/// Result of a liveness check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerHealth {
    pub name: String,
    pub reachable: bool,
    pub tool_count: Option<usize>,
    pub error: Option<String>,
}

impl ServerHealth {
    fn reachable(name: &str, tool_count: usize) -> Self {
        Self {
            name: name.to_string(),
            reachable: true,
            tool_count: Some(tool_count),
            error: None,
        }
    }

    fn unreachable(name: &str, error: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            reachable: false,
            tool_count: None,
            error: Some(error.to_string()),
        }
    }
}

pub struct McpManager {
    registry: RwLock<ServerRegistry>,
    /// Serializes every registry mutation, including the connects and closes it triggers.
    lifecycle: Mutex<()>,
    initialized: OnceCell<()>,
    events: EventBus,
    metrics: McpMetrics,
    debug: bool,
    default_timeout: Duration,
}

impl McpManager {
    /// Register the configured servers without connecting them.
    ///
    /// Fails on an invalid descriptor or a duplicated name. Connections are
    /// opened by [`init`](Self::init), which every other operation triggers.
    pub fn new(config: McpConfig) -> McpResult<Self> {
        config.validate()?;
        let default_timeout = config.default_timeout_duration()?;
        let McpConfig { servers, debug, .. } = config;

        let registry = ServerRegistry::from_configs(servers)?;
        debug!(servers = registry.len(), "Registered configured MCP servers");

        Ok(Self {
            registry: RwLock::new(registry),
            lifecycle: Mutex::new(()),
            initialized: OnceCell::new(),
            events: EventBus::new(),
            metrics: McpMetrics::new(),
            debug,
            default_timeout,
        })
    }

    pub fn with_servers(servers: Vec<McpServerConfig>) -> McpResult<Self> {
        Self::new(McpConfig::new(servers))
    }

    /// Activate every configured server whose status is `activate`.
    ///
    /// Runs once per manager. Concurrent callers wait for the same pass.
    /// A server that fails to connect is marked `error` and does not stop the
    /// others.
    pub async fn init(&self) {
        self.initialized
            .get_or_init(|| async {
                let _guard = self.lifecycle.lock().await;
                let pending = self.registry.read().pending_activation();
                info!(servers = pending.len(), "Initializing MCP servers");

                let results = join_all(pending.iter().map(|config| self.connect(config))).await;

                let mut registry = self.registry.write();
                let mut connected = 0usize;
                for (config, result) in pending.iter().zip(results) {
                    let Some(entry) = registry.get_mut(&config.name) else {
                        continue;
                    };
                    match result {
                        Ok(provider) => {
                            entry.mark_active(provider);
                            connected += 1;
                        }
                        Err(_) => {
                            entry.mark_inactive(ServerStatus::Error);
                        }
                    }
                }
                info!(
                    connected,
                    failed = pending.len() - connected,
                    "MCP servers initialized"
                );
            })
            .await;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.initialized()
    }

    /// Register a new server and connect it if its status is `activate`.
    ///
    /// A duplicate name fails with [`McpError::DuplicateServer`]. A failed
    /// connect emits [`ServerEvent::Error`], returns the error and registers
    /// nothing.
    pub async fn add_server(&self, config: McpServerConfig) -> McpResult<()> {
        self.init().await;
        config.validate()?;

        let _guard = self.lifecycle.lock().await;
        {
            let registry = self.registry.read();
            if registry.contains(&config.name) {
                return Err(McpError::DuplicateServer(config.name));
            }
            registry.ensure_handle_unshared(&config)?;
        }

        let mut entry = ServerEntry::new(config)?;
        if entry.config.status.is_active() {
            let provider = self.connect(&entry.config).await?;
            entry.mark_active(provider);
        }

        info!(
            server = %entry.config.name,
            kind = %entry.config.kind(),
            status = %entry.config.status,
            "Registered MCP server"
        );
        self.registry.write().insert(entry)
    }

    /// Merge `update` into the registered server of the same name.
    ///
    /// Status and transport are taken from `update`; unset optional fields
    /// keep their values. A status change connects or closes the provider,
    /// and a transport change on a serving server reconnects it. If the
    /// connect fails, the merged descriptor is kept with status `error` and
    /// the error is returned.
    pub async fn update_server(&self, update: McpServerConfig) -> McpResult<()> {
        self.init().await;
        update.validate()?;

        let _guard = self.lifecycle.lock().await;
        let name = update.name.clone();
        let (current, provider) = {
            let registry = self.registry.read();
            let entry = registry
                .get(&name)
                .ok_or_else(|| McpError::ServerNotFound(name.clone()))?;
            (entry.config.clone(), entry.provider.clone())
        };

        let merged = current.merged_with(update);
        self.registry.read().ensure_handle_unshared(&merged)?;
        let filters = Arc::new(ServerFilters::compile(merged.filters.as_ref())?);
        let transport_changed = !current.transport.same_endpoint(&merged.transport);

        let stale = match &provider {
            Some(_) if !merged.status.is_active() || transport_changed => provider.clone(),
            _ => None,
        };
        if let Some(stale) = stale {
            self.close(&name, stale).await;
        }

        let wants_connect = merged.status.is_active() && (provider.is_none() || transport_changed);
        let outcome = if wants_connect {
            Some(self.connect(&merged).await)
        } else {
            None
        };

        let mut registry = self.registry.write();
        let entry = registry
            .get_mut(&name)
            .ok_or_else(|| McpError::ServerNotFound(name.clone()))?;
        let status = merged.status;
        entry.config = merged;
        entry.filters = filters;

        match outcome {
            Some(Ok(provider)) => entry.mark_active(provider),
            Some(Err(e)) => {
                entry.mark_inactive(ServerStatus::Error);
                return Err(e);
            }
            None if !status.is_active() => {
                entry.mark_inactive(status);
            }
            None => {}
        }

        info!(server = %name, status = %entry.config.status, "Updated MCP server");
        Ok(())
    }

    /// Close (if serving) and unregister a server.
    ///
    /// Unknown names fail with [`McpError::ServerNotFound`].
    pub async fn delete_server(&self, name: &str) -> McpResult<()> {
        self.init().await;

        let _guard = self.lifecycle.lock().await;
        let entry = self
            .registry
            .write()
            .remove(name)
            .ok_or_else(|| McpError::ServerNotFound(name.to_string()))?;

        if let Some(provider) = entry.provider {
            self.close(name, provider).await;
        }
        info!(server = %name, "Deleted MCP server");
        Ok(())
    }

    /// Activate or deactivate a registered server.
    ///
    /// Deactivating a serving server closes it, sets its status to `error`
    /// and emits [`ServerEvent::Stopped`]. Activating follows the same path as
    /// [`add_server`](Self::add_server); on failure the status is `error`.
    pub async fn set_server_active(&self, name: &str, active: bool) -> McpResult<()> {
        self.init().await;

        let _guard = self.lifecycle.lock().await;
        let (config, serving) = {
            let registry = self.registry.read();
            let entry = registry
                .get(name)
                .ok_or_else(|| McpError::ServerNotFound(name.to_string()))?;
            (entry.config.clone(), entry.is_serving())
        };

        if active {
            if serving {
                return Ok(());
            }
            let result = self.connect(&config).await;
            let mut registry = self.registry.write();
            let entry = registry
                .get_mut(name)
                .ok_or_else(|| McpError::ServerNotFound(name.to_string()))?;
            match result {
                Ok(provider) => {
                    entry.mark_active(provider);
                    Ok(())
                }
                Err(e) => {
                    entry.mark_inactive(ServerStatus::Error);
                    Err(e)
                }
            }
        } else {
            if !serving {
                return Ok(());
            }
            let provider = self
                .registry
                .write()
                .get_mut(name)
                .and_then(|entry| entry.mark_inactive(ServerStatus::Error));
            if let Some(provider) = provider {
                self.close(name, provider).await;
            }
            Ok(())
        }
    }

    pub async fn deactivate(&self, name: &str) -> McpResult<()> {
        self.set_server_active(name, false).await
    }

    pub async fn get_server(&self, name: &str) -> Option<McpServerConfig> {
        self.init().await;
        self.registry.read().get(name).map(|entry| entry.config.clone())
    }

    /// Every registered server, whatever its status, in registration order.
    pub async fn list_available_services(&self) -> Vec<McpServerConfig> {
        self.init().await;
        self.registry.read().configs()
    }

    /// Filtered tools of one server, or of every serving server.
    ///
    /// Missing or inactive servers and failed listings contribute nothing.
    pub async fn list_tools(&self, server_name: Option<&str>) -> Vec<AggregatedTool> {
        let targets = self.targets(server_name).await;
        let lists = join_all(targets.iter().map(|target| {
            self.bounded_listing(target, "tools", target.provider.list_tools())
        }))
        .await;

        targets
            .iter()
            .zip(lists)
            .flat_map(|(target, tools)| {
                tools
                    .into_iter()
                    .filter(move |tool| target.filters.allows_tool(&tool.name))
                    .map(move |tool| AggregatedTool::new(&target.name, tool))
            })
            .collect()
    }

    /// Filtered prompts of one server, or of every serving server.
    pub async fn list_prompts(&self, server_name: Option<&str>) -> Vec<AggregatedPrompt> {
        let targets = self.targets(server_name).await;
        let lists = join_all(targets.iter().map(|target| {
            self.bounded_listing(target, "prompts", target.provider.list_prompts())
        }))
        .await;

        targets
            .iter()
            .zip(lists)
            .flat_map(|(target, prompts)| {
                prompts
                    .into_iter()
                    .filter(move |prompt| target.filters.allows_prompt(&prompt.name))
                    .map(move |prompt| AggregatedPrompt::new(&target.name, prompt))
            })
            .collect()
    }

    /// Call a tool on a serving server, bounded by the server's timeout.
    ///
    /// The deadline only releases the caller; the provider call is dropped
    /// but the transport may still finish the request.
    pub async fn call_tool(&self, request: CallToolRequest) -> McpResult<CallToolResult> {
        self.init().await;

        let CallToolRequest { client, name, args } = request;
        let target = self
            .registry
            .read()
            .active(&client)
            .ok_or_else(|| McpError::ServerNotFound(client.clone()))?;
        let timeout = target.timeout(self.default_timeout);
        let qualified = QualifiedToolName::new(&client, &name);

        call_log!(self.debug, server = %client, tool = %name, args = ?args, "Calling MCP tool");

        self.metrics.record_call_start();
        let start = Instant::now();
        let mut recorded = scopeguard::guard(CallOutcome::Failure, |outcome| {
            self.metrics.record_call_end(
                &qualified,
                outcome,
                start.elapsed().as_millis() as u64,
            );
        });

        let outcome = tokio::time::timeout(timeout, target.provider.call_tool(&name, args)).await;
        match outcome {
            Ok(Ok(result)) => {
                *recorded = CallOutcome::Success;
                call_log!(
                    self.debug,
                    server = %client,
                    tool = %name,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    result = ?result,
                    "MCP tool call completed"
                );
                Ok(result)
            }
            Ok(Err(e)) => {
                warn!(server = %client, tool = %name, error = %e, "MCP tool call failed");
                Err(e)
            }
            Err(_) => {
                *recorded = CallOutcome::Timeout;
                warn!(server = %client, tool = %name, ?timeout, "MCP tool call timed out");
                Err(McpError::Timeout {
                    server: client,
                    tool: name,
                    timeout,
                })
            }
        }
    }

    /// Check a descriptor's server without touching the registry.
    ///
    /// A serving registered server is checked through its live provider.
    /// Otherwise a temporary provider is connected, listed and closed; an
    /// in-process handle stays open only while a serving registration uses
    /// it. The check is bounded by the descriptor's timeout and never fails;
    /// problems are reported in [`ServerHealth::error`].
    pub async fn check_server_status(&self, config: &McpServerConfig) -> ServerHealth {
        if let Err(e) = config.validate() {
            return ServerHealth::unreachable(&config.name, e);
        }
        self.init().await;

        let timeout = config.effective_timeout(self.default_timeout);
        let (live, keep_open) = {
            let registry = self.registry.read();
            let live = registry
                .get(&config.name)
                .filter(|entry| entry.config.transport.same_endpoint(&config.transport))
                .and_then(|_| registry.active(&config.name));
            (live, registry.serves_handle(&config.transport))
        };

        let check = async {
            match live {
                Some(target) => target.provider.list_tools().await.map(|tools| tools.len()),
                None => count_tools_once(config, keep_open).await,
            }
        };

        let health = match tokio::time::timeout(timeout, check).await {
            Ok(Ok(count)) => ServerHealth::reachable(&config.name, count),
            Ok(Err(e)) => ServerHealth::unreachable(&config.name, e),
            Err(_) => ServerHealth::unreachable(
                &config.name,
                format!("no response within {:?}", timeout),
            ),
        };
        debug!(server = %config.name, reachable = health.reachable, "Checked MCP server status");
        health
    }

    /// Close every provider and empty the registry.
    ///
    /// Close failures are logged and skipped. The manager stays usable; later
    /// listings are empty until servers are added again.
    pub async fn cleanup(&self) {
        let _guard = self.lifecycle.lock().await;
        let entries = self.registry.write().drain();
        info!(servers = entries.len(), "Cleaning up MCP servers");

        let serving = entries
            .into_iter()
            .filter_map(|entry| entry.provider.map(|provider| (entry.config.name, provider)));
        join_all(serving.map(|(name, provider)| async move { self.close(&name, provider).await }))
            .await;
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.events.subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Per-call statistics, including latency per tool.
    pub fn metrics_handle(&self) -> &McpMetrics {
        &self.metrics
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    async fn targets(&self, server_name: Option<&str>) -> Vec<ActiveServer> {
        self.init().await;
        let registry = self.registry.read();
        match server_name {
            Some(name) => registry.active(name).into_iter().collect(),
            None => registry.active_all(),
        }
    }

    async fn bounded_listing<T>(
        &self,
        target: &ActiveServer,
        what: &'static str,
        listing: impl Future<Output = McpResult<Vec<T>>>,
    ) -> Vec<T> {
        let timeout = target.timeout(self.default_timeout);
        match tokio::time::timeout(timeout, listing).await {
            Ok(Ok(items)) => items,
            Ok(Err(e)) => {
                warn!(server = %target.name, error = %e, "Failed to list {}", what);
                Vec::new()
            }
            Err(_) => {
                warn!(server = %target.name, ?timeout, "Listing {} timed out", what);
                Vec::new()
            }
        }
    }

    async fn connect(&self, config: &McpServerConfig) -> McpResult<Arc<dyn McpProvider>> {
        let provider = create_provider(config);
        match provider.connect().await {
            Ok(()) => {
                self.metrics.record_connection_opened();
                info!(server = %config.name, kind = %config.kind(), "MCP server started");
                self.events.emit(ServerEvent::Started {
                    name: config.name.clone(),
                });
                Ok(provider)
            }
            Err(e) => {
                self.metrics.record_connection_error();
                error!(server = %config.name, error = %e, "Failed to start MCP server");
                self.events.emit(ServerEvent::Error {
                    name: config.name.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn close(&self, name: &str, provider: Arc<dyn McpProvider>) {
        if let Err(e) = provider.close().await {
            warn!(server = %name, error = %e, "Error closing MCP server");
        }
        self.metrics.record_connection_closed();
        info!(server = %name, "MCP server stopped");
        self.events.emit(ServerEvent::Stopped {
            name: name.to_string(),
        });
    }
}

/// Connect a throwaway provider for `config`, count its tools and close it.
///
/// `keep_open` is set when the provider is an in-process handle that a
/// serving registration still uses.
async fn count_tools_once(config: &McpServerConfig, keep_open: bool) -> McpResult<usize> {
    let provider = create_provider(config);
    provider.connect().await?;
    let listed = provider.list_tools().await.map(|tools| tools.len());

    if !keep_open {
        if let Err(e) = provider.close().await {
            debug!(server = %config.name, error = %e, "Error closing status check connection");
        }
    }
    listed
}
