//! Ordered server registry.
//!
//! Holds every registered descriptor together with its compiled filters and,
//! while the server is serving, its connected provider. Iteration order is
//! registration order, which is also the order of aggregated listings.
//!
//! The registry is plain data. Locking and lifecycle side effects belong to
//! [`McpManager`](super::manager::McpManager).

use std::{sync::Arc, time::Duration};

use super::{
    config::{McpServerConfig, McpTransport, ServerStatus},
    filter::ServerFilters,
    provider::McpProvider,
};
use crate::error::{McpError, McpResult};

pub(crate) struct ServerEntry {
    pub(crate) config: McpServerConfig,
    pub(crate) filters: Arc<ServerFilters>,
    /// Present only while the server is connected.
    pub(crate) provider: Option<Arc<dyn McpProvider>>,
}

impl ServerEntry {
    pub(crate) fn new(config: McpServerConfig) -> McpResult<Self> {
        let filters = Arc::new(ServerFilters::compile(config.filters.as_ref())?);
        Ok(Self {
            config,
            filters,
            provider: None,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.config.name
    }

    pub(crate) fn is_serving(&self) -> bool {
        self.config.status.is_active() && self.provider.is_some()
    }

    pub(crate) fn mark_active(&mut self, provider: Arc<dyn McpProvider>) {
        self.provider = Some(provider);
        self.config.status = ServerStatus::Activate;
    }

    /// Drop the provider and record `status`. Returns the provider so the caller can close it.
    pub(crate) fn mark_inactive(&mut self, status: ServerStatus) -> Option<Arc<dyn McpProvider>> {
        self.config.status = status;
        self.provider.take()
    }

    fn snapshot(&self) -> Option<ActiveServer> {
        if !self.is_serving() {
            return None;
        }
        self.provider.as_ref().map(|provider| ActiveServer {
            name: self.config.name.clone(),
            provider: Arc::clone(provider),
            filters: Arc::clone(&self.filters),
            timeout: self.config.timeout,
        })
    }
}

/// Everything needed to talk to one serving provider, detached from the registry lock.
#[derive(Clone)]
pub(crate) struct ActiveServer {
    pub(crate) name: String,
    pub(crate) provider: Arc<dyn McpProvider>,
    pub(crate) filters: Arc<ServerFilters>,
    timeout: Option<f64>,
}

impl ActiveServer {
    pub(crate) fn timeout(&self, default: Duration) -> Duration {
        self.timeout
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|duration| !duration.is_zero())
            .unwrap_or(default)
    }
}

#[derive(Default)]
pub(crate) struct ServerRegistry {
    entries: Vec<ServerEntry>,
}

impl ServerRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an initial server list. Nothing is connected yet.
    pub(crate) fn from_configs(configs: Vec<McpServerConfig>) -> McpResult<Self> {
        let mut registry = Self::new();
        for config in configs {
            config.validate()?;
            registry.insert(ServerEntry::new(config)?)?;
        }
        Ok(registry)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub(crate) fn get(&self, name: &str) -> Option<&ServerEntry> {
        self.entries.iter().find(|e| e.name() == name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut ServerEntry> {
        self.entries.iter_mut().find(|e| e.name() == name)
    }

    /// Append an entry. Fails without touching the registry if the name is
    /// taken or its in-process handle already belongs to another entry.
    pub(crate) fn insert(&mut self, entry: ServerEntry) -> McpResult<()> {
        if self.contains(entry.name()) {
            return Err(McpError::DuplicateServer(entry.config.name));
        }
        self.ensure_handle_unshared(&entry.config)?;
        self.entries.push(entry);
        Ok(())
    }

    /// An in-process handle may back at most one registered name.
    pub(crate) fn ensure_handle_unshared(&self, config: &McpServerConfig) -> McpResult<()> {
        if !matches!(config.transport, McpTransport::Builtin { .. }) {
            return Ok(());
        }
        match self
            .entries
            .iter()
            .find(|e| e.name() != config.name && e.config.transport.same_endpoint(&config.transport))
        {
            Some(owner) => Err(McpError::Config(format!(
                "in-process server for '{}' is already registered as '{}'",
                config.name,
                owner.name()
            ))),
            None => Ok(()),
        }
    }

    /// Whether a serving entry is backed by the same in-process handle.
    pub(crate) fn serves_handle(&self, transport: &McpTransport) -> bool {
        matches!(transport, McpTransport::Builtin { .. })
            && self
                .entries
                .iter()
                .any(|e| e.is_serving() && e.config.transport.same_endpoint(transport))
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<ServerEntry> {
        self.position(name).map(|idx| self.entries.remove(idx))
    }

    pub(crate) fn drain(&mut self) -> Vec<ServerEntry> {
        std::mem::take(&mut self.entries)
    }

    pub(crate) fn configs(&self) -> Vec<McpServerConfig> {
        self.entries.iter().map(|e| e.config.clone()).collect()
    }

    /// Descriptors that want to be active but have no connected provider.
    pub(crate) fn pending_activation(&self) -> Vec<McpServerConfig> {
        self.entries
            .iter()
            .filter(|e| e.config.status.is_active() && e.provider.is_none())
            .map(|e| e.config.clone())
            .collect()
    }

    pub(crate) fn active(&self, name: &str) -> Option<ActiveServer> {
        self.get(name).and_then(ServerEntry::snapshot)
    }

    pub(crate) fn active_all(&self) -> Vec<ActiveServer> {
        self.entries.iter().filter_map(ServerEntry::snapshot).collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name() == name)
    }
}
