//! Items surfaced by the manager's aggregated listings.

use serde::Serialize;

use super::{
    config::{Prompt, Tool},
    identity::{prompt_id, tool_id},
};

/// A provider tool tagged with its origin and a stable id.
///
/// Serializes as the provider's descriptor with `id` and `serverName` added.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedTool {
    pub id: String,
    pub server_name: String,
    #[serde(flatten)]
    pub tool: Tool,
}

impl AggregatedTool {
    pub fn new(server_name: impl Into<String>, tool: Tool) -> Self {
        let server_name = server_name.into();
        Self {
            id: tool_id(&server_name, &tool.name),
            server_name,
            tool,
        }
    }

    pub fn name(&self) -> &str {
        &self.tool.name
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPrompt {
    pub id: String,
    pub server_name: String,
    #[serde(flatten)]
    pub prompt: Prompt,
}

impl AggregatedPrompt {
    pub fn new(server_name: impl Into<String>, prompt: Prompt) -> Self {
        let server_name = server_name.into();
        Self {
            id: prompt_id(&server_name, &prompt.name),
            server_name,
            prompt,
        }
    }

    pub fn name(&self) -> &str {
        &self.prompt.name
    }
}
