//! Glob allow/block filtering for tool and prompt names.
//!
//! Patterns match the full name. `*` matches any run of characters and `?`
//! matches exactly one; everything else is literal. A block match always
//! rejects; otherwise a non-empty allow list must match.

use regex::Regex;

use super::config::{FilterConfig, McpFilters};
use crate::error::{McpError, McpResult};

/// A single compiled glob pattern.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    pub fn new(pattern: &str) -> McpResult<Self> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push('^');
        let mut literal = String::new();
        for ch in pattern.chars() {
            match ch {
                '*' | '?' => {
                    expr.push_str(&regex::escape(&literal));
                    literal.clear();
                    expr.push_str(if ch == '*' { ".*" } else { "." });
                }
                _ => literal.push(ch),
            }
        }
        expr.push_str(&regex::escape(&literal));
        expr.push('$');

        let regex = Regex::new(&expr)
            .map_err(|e| McpError::Config(format!("invalid filter pattern '{}': {}", pattern, e)))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

/// Compiled form of a [`FilterConfig`].
#[derive(Debug, Clone, Default)]
pub struct NameFilter {
    allow: Vec<GlobPattern>,
    block: Vec<GlobPattern>,
}

impl NameFilter {
    pub fn compile(config: &FilterConfig) -> McpResult<Self> {
        let compile_all = |patterns: &Option<Vec<String>>| -> McpResult<Vec<GlobPattern>> {
            patterns
                .iter()
                .flatten()
                .map(|p| GlobPattern::new(p))
                .collect()
        };

        Ok(Self {
            allow: compile_all(&config.allow)?,
            block: compile_all(&config.block)?,
        })
    }

    pub fn passes(&self, name: &str) -> bool {
        if self.block.iter().any(|p| p.matches(name)) {
            return false;
        }
        self.allow.is_empty() || self.allow.iter().any(|p| p.matches(name))
    }
}

/// Tool and prompt filters for one server. Missing configs allow everything.
#[derive(Debug, Clone, Default)]
pub struct ServerFilters {
    tools: NameFilter,
    prompts: NameFilter,
}

impl ServerFilters {
    pub fn compile(filters: Option<&McpFilters>) -> McpResult<Self> {
        let Some(filters) = filters else {
            return Ok(Self::default());
        };

        let compile = |config: &Option<FilterConfig>| -> McpResult<NameFilter> {
            config
                .as_ref()
                .map(NameFilter::compile)
                .transpose()
                .map(Option::unwrap_or_default)
        };

        Ok(Self {
            tools: compile(&filters.tools)?,
            prompts: compile(&filters.prompts)?,
        })
    }

    pub fn allows_tool(&self, name: &str) -> bool {
        self.tools.passes(name)
    }

    pub fn allows_prompt(&self, name: &str) -> bool {
        self.prompts.passes(name)
    }
}

/// Evaluate `name` against an uncompiled filter config.
pub fn passes(name: &str, config: &FilterConfig) -> McpResult<bool> {
    Ok(NameFilter::compile(config)?.passes(name))
}
