//! In-memory conversation sessions with a sliding expiration window.
//!
//! Expiry is checked lazily on every access. Sessions nobody touches again
//! stay in memory until `purge_expired` runs (see `spawn_sweeper`).

use chrono::{DateTime, Duration, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use switchboard_core::{Clock, IdGenerator, Message, SessionId};
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_EXPIRATION_SECS: i64 = 3600;
const MAX_ID_ATTEMPTS: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session has expired: {0}")]
    Expired(SessionId),

    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    #[error("Could not allocate a unique session id")]
    IdExhausted,
}

/// Returned when a session is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub created_at: DateTime<Utc>,
}

struct SessionState {
    messages: Vec<Message>,
    last_accessed: DateTime<Utc>,
    /// Set once the session is deleted or expired, for callers that already
    /// hold the entry.
    closed: bool,
}

type SessionEntry = Arc<Mutex<SessionState>>;

pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    expiration: Duration,
}

impl SessionStore {
    pub fn new(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>, expiration: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            clock,
            ids,
            expiration,
        }
    }

    pub fn create(&self) -> Result<SessionInfo, SessionError> {
        let now = self.clock.now();
        let mut sessions = self.sessions.write();

        for _ in 0..MAX_ID_ATTEMPTS {
            let id = self.ids.next_id();
            if sessions.contains_key(&id) {
                warn!("Session id collision: {}", id);
                continue;
            }
            sessions.insert(
                id.clone(),
                Arc::new(Mutex::new(SessionState {
                    messages: Vec::new(),
                    last_accessed: now,
                    closed: false,
                })),
            );
            info!("New session created: {}", id);
            return Ok(SessionInfo {
                session_id: id,
                created_at: now,
            });
        }

        Err(SessionError::IdExhausted)
    }

    /// Ordered history of the session. Refreshes the last-accessed time.
    pub fn get_history(&self, id: &SessionId) -> Result<Vec<Message>, SessionError> {
        self.with_session(id, |state| state.messages.clone())
    }

    /// Append a message after the same expiry check as `get_history`.
    pub fn append(&self, id: &SessionId, message: Message) -> Result<(), SessionError> {
        message.validate().map_err(SessionError::InvalidMessage)?;
        self.with_session(id, |state| state.messages.push(message))
    }

    /// Remove a session. Returns `false` if it did not exist.
    pub fn delete(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().remove(id);
        match removed {
            Some(entry) => {
                entry.lock().closed = true;
                info!("Session deleted: {}", id);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every session whose window has lapsed. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let candidates: Vec<(SessionId, SessionEntry)> = self
            .sessions
            .read()
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(entry)))
            .collect();

        let mut purged = 0;
        for (id, entry) in candidates {
            let mut state = entry.lock();
            if state.closed || !self.is_expired(&state, now) {
                continue;
            }
            state.closed = true;
            drop(state);
            self.remove_entry(&id, &entry);
            purged += 1;
        }

        if purged > 0 {
            info!("Purged {} expired sessions", purged);
        }
        purged
    }

    fn is_expired(&self, state: &SessionState, now: DateTime<Utc>) -> bool {
        now - state.last_accessed > self.expiration
    }

    fn remove_entry(&self, id: &SessionId, entry: &SessionEntry) {
        let mut sessions = self.sessions.write();
        if sessions
            .get(id)
            .is_some_and(|current| Arc::ptr_eq(current, entry))
        {
            sessions.remove(id);
        }
    }

    /// Run `f` on the session under its own lock, after the expiry check.
    fn with_session<T>(
        &self,
        id: &SessionId,
        f: impl FnOnce(&mut SessionState) -> T,
    ) -> Result<T, SessionError> {
        let entry = self
            .sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.clone()))?;

        let mut state = entry.lock();
        if state.closed {
            return Err(SessionError::NotFound(id.clone()));
        }

        let now = self.clock.now();
        if self.is_expired(&state, now) {
            state.closed = true;
            drop(state);
            self.remove_entry(id, &entry);
            info!("Session expired: {}", id);
            return Err(SessionError::Expired(id.clone()));
        }

        // Never move backwards, even if the clock does.
        if now > state.last_accessed {
            state.last_accessed = now;
        }
        debug!("Session accessed: {}", id);
        Ok(f(&mut state))
    }
}
