//! Session identifier generation.

use crate::types::SessionId;
use std::sync::atomic::{AtomicU64, Ordering};

pub trait IdGenerator: Send + Sync {
    /// Must never return the same id twice within a process.
    fn next_id(&self) -> SessionId;
}

/// Random v4 UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self) -> SessionId {
        SessionId::new(uuid::Uuid::new_v4().to_string())
    }
}

/// Predictable ids (`prefix-1`, `prefix-2`, ...) for tests and replays.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> SessionId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        SessionId::new(format!("{}-{}", self.prefix, n))
    }
}
