//! Knowledge-base records and the resolver the dispatcher reads them through.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum KnowledgeBaseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Knowledge base not found: {0}")]
    NotFound(String),
}

/// Configuration of a single knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub kb_name: String,
    pub vector_store: String,
    #[serde(default)]
    pub allowed_file_types: Vec<String>,
    pub parsing_library: String,
    pub chunking_strategy: String,
    pub chunk_size: u32,
    pub chunk_overlap: u32,
    pub metadata_strategy: String,
}

/// A knowledge base together with its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseEntry {
    pub id: String,
    #[serde(flatten)]
    pub kb: KnowledgeBase,
}

/// Read-only lookup used while answering messages.
pub trait KnowledgeBaseResolver: Send + Sync {
    fn resolve(&self, id: &str) -> Option<KnowledgeBase>;
}

/// In-process knowledge-base directory.
#[derive(Debug, Default)]
pub struct InMemoryKnowledgeBases {
    entries: RwLock<Vec<KnowledgeBaseEntry>>,
}

impl InMemoryKnowledgeBases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a YAML list of entries.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, KnowledgeBaseError> {
        let content = std::fs::read_to_string(&path)?;
        let entries: Vec<KnowledgeBaseEntry> = serde_yaml::from_str(&content)?;
        info!(
            "Loaded {} knowledge bases from {}",
            entries.len(),
            path.as_ref().display()
        );
        Ok(Self {
            entries: RwLock::new(entries),
        })
    }

    pub fn create(&self, kb: KnowledgeBase) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        info!("New knowledge base created: {} (ID: {})", kb.kb_name, id);
        self.entries.write().push(KnowledgeBaseEntry { id: id.clone(), kb });
        id
    }

    pub fn insert(&self, id: impl Into<String>, kb: KnowledgeBase) {
        let id = id.into();
        let mut entries = self.entries.write();
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => entry.kb = kb,
            None => entries.push(KnowledgeBaseEntry { id, kb }),
        }
    }

    pub fn get(&self, id: &str) -> Result<KnowledgeBase, KnowledgeBaseError> {
        self.resolve(id)
            .ok_or_else(|| KnowledgeBaseError::NotFound(id.to_string()))
    }

    pub fn list(&self) -> Vec<KnowledgeBaseEntry> {
        self.entries.read().clone()
    }

    pub fn update(&self, id: &str, kb: KnowledgeBase) -> Result<(), KnowledgeBaseError> {
        let mut entries = self.entries.write();
        let entry = entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| KnowledgeBaseError::NotFound(id.to_string()))?;
        info!("Knowledge base {} updated: {}", id, kb.kb_name);
        entry.kb = kb;
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<(), KnowledgeBaseError> {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return Err(KnowledgeBaseError::NotFound(id.to_string()));
        }
        info!("Knowledge base {} deleted", id);
        Ok(())
    }
}

impl KnowledgeBaseResolver for InMemoryKnowledgeBases {
    fn resolve(&self, id: &str) -> Option<KnowledgeBase> {
        self.entries
            .read()
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.kb.clone())
    }
}
