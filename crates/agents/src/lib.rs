//! Agents and the chat service built on top of them.

pub mod agent;
pub mod chat;
pub mod dispatcher;
pub mod expression;
pub mod rules;

pub use agent::{AgentCatalog, AgentDetail, AgentKind};
pub use chat::{ChatError, ChatRequest, ChatResponse, ChatService, HistoryResponse};
pub use dispatcher::{AgentDispatcher, DispatchOutcome, DispatchRequest, ToolInvoker};
pub use expression::{Expression, Operation};
pub use rules::{Matcher, Rule, RuleTable};
