//! The fixed set of conversational agents.

use serde::{Deserialize, Serialize};
use switchboard_tools::{CALCULATOR, CURRENT_TIME, WEB_SEARCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentKind {
    MathWhiz,
    WebResearcher,
    Generalist,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [
        AgentKind::MathWhiz,
        AgentKind::WebResearcher,
        AgentKind::Generalist,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AgentKind::MathWhiz => "MathWhiz",
            AgentKind::WebResearcher => "WebResearcher",
            AgentKind::Generalist => "Generalist",
        }
    }

    /// The one tool this agent may call.
    pub fn tool(self) -> &'static str {
        match self {
            AgentKind::MathWhiz => CALCULATOR,
            AgentKind::WebResearcher => WEB_SEARCH,
            AgentKind::Generalist => CURRENT_TIME,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            AgentKind::MathWhiz => "Solves simple arithmetic expressions with the calculator tool.",
            AgentKind::WebResearcher => "Answers research questions using web search.",
            AgentKind::Generalist => "Handles general conversation and can tell the time.",
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            AgentKind::MathWhiz => {
                "You are MathWhiz. Extract the arithmetic expression from the user's message and compute it with the calculator tool."
            }
            AgentKind::WebResearcher => {
                "You are WebResearcher. Search the web for the user's question and summarise what you find."
            }
            AgentKind::Generalist => {
                "You are the Generalist. Respond helpfully to anything, and use the current_time tool when asked about the time."
            }
        }
    }

    /// Case-insensitive lookup by agent name.
    pub fn from_name(name: &str) -> Option<AgentKind> {
        let name = name.trim();
        Self::ALL
            .into_iter()
            .find(|agent| agent.name().eq_ignore_ascii_case(name))
    }

    pub fn detail(self) -> AgentDetail {
        AgentDetail {
            name: self.name().to_string(),
            description: self.description().to_string(),
            system_prompt: self.system_prompt().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDetail {
    pub name: String,
    pub description: String,
    pub system_prompt: String,
}

/// Discovery over the fixed agent set.
pub struct AgentCatalog;

impl AgentCatalog {
    /// All agents, in a stable order.
    pub fn list() -> Vec<AgentDetail> {
        AgentKind::ALL.into_iter().map(AgentKind::detail).collect()
    }

    pub fn find(name: &str) -> Option<AgentDetail> {
        AgentKind::from_name(name).map(AgentKind::detail)
    }
}
