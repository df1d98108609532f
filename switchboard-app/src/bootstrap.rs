//! Wiring: builds every component from a `Config`.

use crate::config::Config;
use anyhow::{Context, Result};
use std::sync::Arc;
use switchboard_agents::{AgentDispatcher, ChatService};
use switchboard_core::{Clock, InMemoryKnowledgeBases, SystemClock, UuidIds};
use switchboard_memory::{spawn_sweeper, SessionStore};
use switchboard_tools::{
    builtin_tools, CatalogError, CustomTool, SandboxLimits, ToolCatalog, ToolDefinition,
    ToolPatch, ToolRegistry,
};
use tokio::task::JoinHandle;
use tracing::info;

pub struct App {
    pub chat: ChatService,
    pub catalog: ToolCatalog,
    pub knowledge: Arc<InMemoryKnowledgeBases>,
    sweeper: Option<JoinHandle<()>>,
}

impl App {
    /// Build with the system clock and random session ids.
    /// Must be called inside a tokio runtime when the sweeper is enabled.
    pub fn build(config: &Config) -> Result<Self> {
        Self::build_with_clock(config, Arc::new(SystemClock))
    }

    pub fn build_with_clock(config: &Config, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;

        let limits = SandboxLimits {
            fuel: config.handler_fuel,
        };
        let registry = Arc::new(ToolRegistry::with_builtins(
            builtin_tools(Arc::clone(&clock)),
            config.tool_timeout(),
            limits,
        )?);

        let catalog = match &config.tool_catalog {
            Some(path) => ToolCatalog::open(Arc::clone(&registry), path)
                .with_context(|| format!("Failed to load tool catalog {}", path.display()))?,
            None => ToolCatalog::new(Arc::clone(&registry)),
        };

        let knowledge = match &config.knowledge_bases {
            Some(path) => Arc::new(InMemoryKnowledgeBases::load(path).with_context(|| {
                format!("Failed to load knowledge bases {}", path.display())
            })?),
            None => Arc::new(InMemoryKnowledgeBases::new()),
        };

        let sessions = Arc::new(SessionStore::new(
            Arc::clone(&clock),
            Arc::new(UuidIds),
            config.session_expiration()?,
        ));
        let sweeper = config
            .sweep_interval()
            .map(|every| spawn_sweeper(Arc::clone(&sessions), every));

        let dispatcher = AgentDispatcher::new(registry.clone(), knowledge.clone());
        let chat = ChatService::new(sessions, registry, dispatcher, clock);

        info!(
            "Switchboard ready: {} tools, {} knowledge bases",
            chat.tools().len(),
            knowledge.list().len()
        );

        Ok(Self {
            chat,
            catalog,
            knowledge,
            sweeper,
        })
    }

    /// Create a custom tool. With a configured catalog file the change is
    /// saved before it is reported; a failed save leaves nothing behind.
    pub fn add_tool(&self, definition: ToolDefinition) -> Result<CustomTool, CatalogError> {
        self.catalog.create(definition)
    }

    pub fn update_tool(&self, id: &str, patch: &ToolPatch) -> Result<CustomTool, CatalogError> {
        self.catalog.update(id, patch)
    }

    pub fn remove_tool(&self, id: &str) -> Result<(), CatalogError> {
        self.catalog.delete(id)
    }
}

impl Drop for App {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}
