//! Conversation data model shared by the session store and the dispatcher.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Message role in conversation.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// Arguments passed to a tool, keyed by parameter name.
pub type ToolArgs = serde_json::Map<String, serde_json::Value>;

/// Record of a single tool invocation made while producing a reply.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ToolCall {
    pub tool: String,
    pub args: ToolArgs,
    /// `None` when the invocation failed.
    pub result: Option<String>,
}

impl ToolCall {
    pub fn new(tool: impl Into<String>, args: ToolArgs, result: Option<String>) -> Self {
        Self {
            tool: tool.into(),
            args,
            result,
        }
    }
}

/// A single message in a session history.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_used: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a user message.
    pub fn user(content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            agent_used: None,
            tool_calls: Vec::new(),
            timestamp,
        }
    }

    /// Create an assistant reply with the agent label and the tool calls it made.
    pub fn assistant(
        content: impl Into<String>,
        agent_used: Option<String>,
        tool_calls: Vec<ToolCall>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            agent_used,
            tool_calls,
            timestamp,
        }
    }

    /// Tool calls may only be attached to assistant messages.
    pub fn validate(&self) -> Result<(), String> {
        if self.role == Role::User && !self.tool_calls.is_empty() {
            return Err("user messages cannot carry tool calls".to_string());
        }
        Ok(())
    }
}
