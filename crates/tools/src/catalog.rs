//! User-managed custom tools, addressed by id and mirrored into the registry.

use crate::error::ToolError;
use crate::registry::ToolRegistry;
use crate::sandbox::ToolDefinition;
use crate::schema::ParameterSpec;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Custom tool not found: {0}")]
    NotFound(String),
    #[error("Tool name already in use: {0}")]
    DuplicateName(String),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// A stored custom tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTool {
    pub id: String,
    #[serde(flatten)]
    pub definition: ToolDefinition,
}

/// Partial update. `None` keeps the stored value; `Some` replaces it, even
/// with an empty string or list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub parameters: Option<Vec<ParameterSpec>>,
}

impl ToolPatch {
    pub fn apply(&self, base: &ToolDefinition) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone().unwrap_or_else(|| base.name.clone()),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| base.description.clone()),
            code: self.code.clone().unwrap_or_else(|| base.code.clone()),
            parameters: self
                .parameters
                .clone()
                .unwrap_or_else(|| base.parameters.clone()),
        }
    }
}

/// Custom tool records backed by a registry.
///
/// The record list lock is held across the matching registry change, so the
/// catalog and the registry never disagree about which custom tools exist.
/// A catalog opened on a file writes every change back to it; if the write
/// fails the change is undone and the error returned.
pub struct ToolCatalog {
    registry: Arc<ToolRegistry>,
    tools: Mutex<Vec<CustomTool>>,
    path: Option<PathBuf>,
}

impl ToolCatalog {
    /// In-memory catalog with no backing file.
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            tools: Mutex::new(Vec::new()),
            path: None,
        }
    }

    /// Read a YAML catalog, register every entry and keep `path` as the
    /// backing file.
    ///
    /// Entries whose handler fails validation are skipped with a warning; the
    /// rest of the catalog still loads.
    pub fn load<P: AsRef<Path>>(registry: Arc<ToolRegistry>, path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let entries: Vec<CustomTool> = if content.trim().is_empty() {
            Vec::new()
        } else {
            serde_yaml::from_str(&content)?
        };

        let catalog = Self {
            path: Some(path.to_path_buf()),
            ..Self::new(registry)
        };
        let loaded = catalog.register_all(entries);
        info!("Loaded {} custom tools from {}", loaded, path.display());
        Ok(catalog)
    }

    /// Like `load`, but a missing file yields an empty catalog that will be
    /// created on the first change.
    pub fn open<P: AsRef<Path>>(registry: Arc<ToolRegistry>, path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        if path.exists() {
            return Self::load(registry, path);
        }
        Ok(Self {
            path: Some(path.to_path_buf()),
            ..Self::new(registry)
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// One registration per entry. Returns how many were accepted.
    pub fn register_all(&self, entries: Vec<CustomTool>) -> usize {
        let mut tools = self.tools.lock();
        let mut accepted = 0;
        for entry in entries {
            if tools.iter().any(|t| t.id == entry.id || t.definition.name == entry.definition.name) {
                warn!(
                    "Skipping custom tool '{}' (ID: {}): duplicate id or name",
                    entry.definition.name, entry.id
                );
                continue;
            }
            match self.registry.register(&entry.definition) {
                Ok(_) => {
                    tools.push(entry);
                    accepted += 1;
                }
                Err(e) => warn!(
                    "Failed to register custom tool '{}': {}",
                    entry.definition.name, e
                ),
            }
        }
        accepted
    }

    /// Write the catalog to `path` atomically.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CatalogError> {
        write_snapshot(path.as_ref(), &self.tools.lock())
    }

    fn persist(&self, tools: &[CustomTool]) -> Result<(), CatalogError> {
        match &self.path {
            Some(path) => write_snapshot(path, tools),
            None => Ok(()),
        }
    }

    pub fn create(&self, definition: ToolDefinition) -> Result<CustomTool, CatalogError> {
        let mut tools = self.tools.lock();
        if tools.iter().any(|t| t.definition.name == definition.name) {
            return Err(CatalogError::DuplicateName(definition.name));
        }

        self.registry.register(&definition)?;

        let tool = CustomTool {
            id: uuid::Uuid::new_v4().to_string(),
            definition,
        };
        tools.push(tool.clone());

        if let Err(e) = self.persist(&tools) {
            tools.pop();
            if let Err(undo) = self.registry.unregister(&tool.definition.name) {
                warn!("Failed to roll back tool '{}': {}", tool.definition.name, undo);
            }
            return Err(e);
        }

        info!(
            "New custom tool created: {} (ID: {})",
            tool.definition.name, tool.id
        );
        Ok(tool)
    }

    pub fn get(&self, id: &str) -> Result<CustomTool, CatalogError> {
        self.tools
            .lock()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    pub fn list(&self) -> Vec<CustomTool> {
        self.tools.lock().clone()
    }

    pub fn update(&self, id: &str, patch: &ToolPatch) -> Result<CustomTool, CatalogError> {
        let mut tools = self.tools.lock();
        let pos = tools
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        let previous = tools[pos].definition.clone();
        let updated = patch.apply(&previous);
        if updated.name != previous.name
            && tools.iter().any(|t| t.definition.name == updated.name)
        {
            return Err(CatalogError::DuplicateName(updated.name));
        }

        self.registry.replace(&previous.name, &updated)?;
        let new_name = updated.name.clone();
        tools[pos].definition = updated;

        if let Err(e) = self.persist(&tools) {
            if let Err(undo) = self.registry.replace(&new_name, &previous) {
                warn!("Failed to roll back tool '{}': {}", previous.name, undo);
            }
            tools[pos].definition = previous;
            return Err(e);
        }

        info!("Custom tool {} updated: {}", id, new_name);
        Ok(tools[pos].clone())
    }

    pub fn delete(&self, id: &str) -> Result<(), CatalogError> {
        let mut tools = self.tools.lock();
        let pos = tools
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))?;

        let mut remaining = tools.clone();
        let removed = remaining.remove(pos);
        self.persist(&remaining)?;

        if let Err(e) = self.registry.unregister(&removed.definition.name) {
            if let Err(undo) = self.persist(&tools) {
                warn!("Failed to restore catalog file: {}", undo);
            }
            return Err(e.into());
        }

        *tools = remaining;
        info!("Custom tool {} deleted: {}", id, removed.definition.name);
        Ok(())
    }
}

fn write_snapshot(path: &Path, tools: &[CustomTool]) -> Result<(), CatalogError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_yaml::to_string(tools)?;
    let temp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&temp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
    }
    fs::rename(&temp_path, path)?;
    Ok(())
}
