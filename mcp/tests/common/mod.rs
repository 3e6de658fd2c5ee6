//! Common test utilities for MCP manager tests

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Once,
    },
    time::Duration,
};

use async_trait::async_trait;
use mcp_client::{
    core::{prompt_descriptor, tool_descriptor},
    BuiltinServer, CallToolResult, JsonObject, McpError, McpProvider, McpResult, Prompt, Tool,
};
use rmcp::model::Content;
use serde_json::json;
use tracing_subscriber::{
    filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

static INIT: Once = Once::new();

/// Initialize test logging infrastructure
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .with(
                EnvFilter::builder()
                    .with_default_directive(LevelFilter::INFO.into())
                    .from_env_lossy(),
            )
            .try_init();
    });
}

/// Wraps a [`BuiltinServer`] and counts lifecycle calls.
pub struct CountingProvider {
    inner: BuiltinServer,
    connects: AtomicUsize,
    closes: AtomicUsize,
    connect_delay: Duration,
    fail_connect: bool,
}

impl CountingProvider {
    pub fn new(inner: BuiltinServer) -> Self {
        Self {
            inner,
            connects: AtomicUsize::new(0),
            closes: AtomicUsize::new(0),
            connect_delay: Duration::ZERO,
            fail_connect: false,
        }
    }

    /// Slow down `connect` so concurrent callers overlap.
    #[allow(dead_code)]
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    #[allow(dead_code)]
    pub fn failing(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    #[allow(dead_code)]
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl McpProvider for CountingProvider {
    async fn connect(&self) -> McpResult<()> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if self.fail_connect {
            return Err(McpError::ConnectionFailed(format!(
                "{} refused the connection",
                self.inner.name()
            )));
        }
        self.inner.connect().await
    }

    async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        self.inner.list_tools().await
    }

    async fn list_prompts(&self) -> McpResult<Vec<Prompt>> {
        self.inner.list_prompts().await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> McpResult<CallToolResult> {
        self.inner.call_tool(name, arguments).await
    }

    async fn close(&self) -> McpResult<()> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.inner.close().await
    }
}

pub fn text_result(text: &str) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.to_string())])
}

/// A server exposing one instant tool per name, each answering with its own name.
pub fn tools_server(server: &str, tools: &[&str]) -> BuiltinServer {
    let builtin = BuiltinServer::new(server);
    for &name in tools {
        let reply = name.to_string();
        builtin.add_tool(
            tool_descriptor(name, format!("Test tool {}", name), json!({"type": "object"})),
            move |_| {
                let reply = reply.clone();
                async move { Ok(text_result(&reply)) }
            },
        );
    }
    builtin
}

#[allow(dead_code)]
pub fn prompts_server(server: &str, prompts: &[&str]) -> BuiltinServer {
    let builtin = BuiltinServer::new(server);
    for &name in prompts {
        builtin.add_prompt(prompt_descriptor(name, format!("Test prompt {}", name)));
    }
    builtin
}

/// A server with one tool that sleeps for `delay` before answering.
#[allow(dead_code)]
pub fn slow_server(server: &str, tool: &str, delay: Duration) -> BuiltinServer {
    BuiltinServer::new(server).with_tool(
        tool_descriptor(tool, "A slow tool", json!({"type": "object", "properties": {}})),
        move |_| async move {
            tokio::time::sleep(delay).await;
            Ok(text_result("Slow tool result"))
        },
    )
}

#[allow(dead_code)]
pub fn counting(server: BuiltinServer) -> Arc<CountingProvider> {
    Arc::new(CountingProvider::new(server))
}
