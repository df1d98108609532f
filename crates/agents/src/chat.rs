//! The conversational entry point: sessions, dispatch and history together.

use crate::agent::{AgentCatalog, AgentDetail};
use crate::dispatcher::{AgentDispatcher, DispatchRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use switchboard_core::{Clock, Message, SessionId, ToolCall};
use switchboard_memory::{SessionError, SessionInfo, SessionStore};
use switchboard_tools::{ToolInfo, ToolRegistry};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error(transparent)]
    Session(#[from] SessionError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub session_id: SessionId,
    pub message: String,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub selected_kbs: Vec<String>,
}

impl ChatRequest {
    pub fn new(session_id: SessionId, message: impl Into<String>) -> Self {
        Self {
            session_id,
            message: message.into(),
            agent: None,
            selected_kbs: Vec::new(),
        }
    }

    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    pub fn with_knowledge_bases(mut self, ids: Vec<String>) -> Self {
        self.selected_kbs = ids;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub reply: String,
    pub agent_used: Option<String>,
    pub tool_calls: Vec<ToolCall>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub session_id: SessionId,
    pub history: Vec<Message>,
}

pub struct ChatService {
    sessions: Arc<SessionStore>,
    registry: Arc<ToolRegistry>,
    dispatcher: AgentDispatcher,
    clock: Arc<dyn Clock>,
}

impl ChatService {
    pub fn new(
        sessions: Arc<SessionStore>,
        registry: Arc<ToolRegistry>,
        dispatcher: AgentDispatcher,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            sessions,
            registry,
            dispatcher,
            clock,
        }
    }

    pub fn new_session(&self) -> Result<SessionInfo, ChatError> {
        Ok(self.sessions.create()?)
    }

    /// Record the user message, answer it, and record the reply.
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let ChatRequest {
            session_id,
            message,
            agent,
            selected_kbs,
        } = request;

        self.sessions
            .append(&session_id, Message::user(message.clone(), self.clock.now()))?;

        let outcome = self
            .dispatcher
            .dispatch(DispatchRequest {
                message: &message,
                agent: agent.as_deref(),
                selected_kbs: &selected_kbs,
            })
            .await;

        let timestamp = self.clock.now();
        self.sessions.append(
            &session_id,
            Message::assistant(
                outcome.reply.clone(),
                outcome.agent_used.clone(),
                outcome.tool_calls.clone(),
                timestamp,
            ),
        )?;

        info!(
            "Session {}: replied via {}",
            session_id,
            outcome.agent_used.as_deref().unwrap_or("knowledge bases")
        );

        Ok(ChatResponse {
            reply: outcome.reply,
            agent_used: outcome.agent_used,
            tool_calls: outcome.tool_calls,
            timestamp,
        })
    }

    pub fn history(&self, session_id: &SessionId) -> Result<HistoryResponse, ChatError> {
        let history = self.sessions.get_history(session_id)?;
        Ok(HistoryResponse {
            session_id: session_id.clone(),
            history,
        })
    }

    /// Idempotent. Returns whether a session was removed.
    pub fn end_session(&self, session_id: &SessionId) -> bool {
        self.sessions.delete(session_id)
    }

    pub fn agents(&self) -> Vec<AgentDetail> {
        AgentCatalog::list()
    }

    pub fn tools(&self) -> Vec<ToolInfo> {
        self.registry.list()
    }
}
