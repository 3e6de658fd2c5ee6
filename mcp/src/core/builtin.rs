//! In-process MCP server.
//!
//! Tools are plain async closures registered next to their descriptors, so a
//! call is a function call with no transport in between. Register the server
//! with [`McpServerConfig::builtin`](super::config::McpServerConfig::builtin).

use std::{
    borrow::Cow,
    future::Future,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use futures::{future::BoxFuture, FutureExt};
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use super::{
    config::{CallToolResult, JsonObject, Prompt, Tool},
    provider::McpProvider,
};
use crate::error::{McpError, McpResult};

pub type ToolHandler =
    Arc<dyn Fn(Option<JsonObject>) -> BoxFuture<'static, McpResult<CallToolResult>> + Send + Sync>;

#[derive(Clone)]
struct RegisteredTool {
    tool: Tool,
    handler: ToolHandler,
}

pub struct BuiltinServer {
    name: String,
    tools: RwLock<Vec<RegisteredTool>>,
    prompts: RwLock<Vec<Prompt>>,
    connected: AtomicBool,
}

impl BuiltinServer {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: RwLock::new(Vec::new()),
            prompts: RwLock::new(Vec::new()),
            connected: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_tool<F, Fut>(self, tool: Tool, handler: F) -> Self
    where
        F: Fn(Option<JsonObject>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<CallToolResult>> + Send + 'static,
    {
        self.add_tool(tool, handler);
        self
    }

    #[must_use]
    pub fn with_prompt(self, prompt: Prompt) -> Self {
        self.add_prompt(prompt);
        self
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn add_tool<F, Fut>(&self, tool: Tool, handler: F)
    where
        F: Fn(Option<JsonObject>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<CallToolResult>> + Send + 'static,
    {
        let handler: ToolHandler = Arc::new(move |args| handler(args).boxed());
        let mut tools = self.tools.write();
        match tools.iter_mut().find(|t| t.tool.name == tool.name) {
            Some(existing) => *existing = RegisteredTool { tool, handler },
            None => tools.push(RegisteredTool { tool, handler }),
        }
    }

    /// Register a prompt, replacing any prompt with the same name.
    pub fn add_prompt(&self, prompt: Prompt) {
        let mut prompts = self.prompts.write();
        match prompts.iter_mut().find(|p| p.name == prompt.name) {
            Some(existing) => *existing = prompt,
            None => prompts.push(prompt),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn ensure_connected(&self) -> McpResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(McpError::Transport(format!(
                "builtin server '{}' is not connected",
                self.name
            )))
        }
    }
}

#[async_trait]
impl McpProvider for BuiltinServer {
    async fn connect(&self) -> McpResult<()> {
        if !self.connected.swap(true, Ordering::AcqRel) {
            debug!(server = %self.name, "Builtin server connected");
        }
        Ok(())
    }

    async fn list_tools(&self) -> McpResult<Vec<Tool>> {
        self.ensure_connected()?;
        Ok(self.tools.read().iter().map(|t| t.tool.clone()).collect())
    }

    async fn list_prompts(&self) -> McpResult<Vec<Prompt>> {
        self.ensure_connected()?;
        Ok(self.prompts.read().clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> McpResult<CallToolResult> {
        self.ensure_connected()?;
        let handler = self
            .tools
            .read()
            .iter()
            .find(|t| t.tool.name == name)
            .map(|t| Arc::clone(&t.handler))
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;

        handler(arguments).await
    }

    async fn close(&self) -> McpResult<()> {
        if self.connected.swap(false, Ordering::AcqRel) {
            debug!(server = %self.name, "Builtin server closed");
        }
        Ok(())
    }
}

/// Tool descriptor with a JSON schema; non-object schemas become `{}`.
pub fn tool_descriptor(
    name: impl Into<String>,
    description: impl Into<String>,
    input_schema: Value,
) -> Tool {
    let schema = match input_schema {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    };

    Tool {
        name: Cow::Owned(name.into()),
        title: None,
        description: Some(Cow::Owned(description.into())),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: None,
        icons: None,
    }
}

pub fn prompt_descriptor(name: impl Into<String>, description: impl Into<String>) -> Prompt {
    Prompt {
        name: name.into(),
        title: None,
        description: Some(description.into()),
        arguments: None,
        icons: None,
    }
}
