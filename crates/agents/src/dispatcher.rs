//! Agent selection and per-agent tool use.
//!
//! Dispatch never fails. A missing or failing tool downgrades to the agent's
//! fallback reply and a warning in the log.

use crate::agent::AgentKind;
use crate::expression;
use crate::rules::RuleTable;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use switchboard_core::{KnowledgeBaseResolver, ToolArgs, ToolCall};
use switchboard_tools::{ToolError, ToolRegistry};
use tracing::{debug, info, warn};

const MATH_HELP: &str =
    "I can help with math. Please provide a simple expression like '123 + 456'.";

/// Tool execution seam used by the dispatcher.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, name: &str, args: ToolArgs) -> Result<String, ToolError>;
}

#[async_trait]
impl ToolInvoker for ToolRegistry {
    async fn invoke(&self, name: &str, args: ToolArgs) -> Result<String, ToolError> {
        ToolRegistry::invoke(self, name, args).await
    }
}

#[derive(Debug, Clone, Default)]
pub struct DispatchRequest<'a> {
    pub message: &'a str,
    pub agent: Option<&'a str>,
    pub selected_kbs: &'a [String],
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub reply: String,
    pub agent_used: Option<String>,
    pub tool_calls: Vec<ToolCall>,
}

impl DispatchOutcome {
    fn from_agent(agent: AgentKind, reply: String, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            reply,
            agent_used: Some(agent.name().to_string()),
            tool_calls,
        }
    }
}

/// Result of one tool step: the output if it succeeded, and the call to
/// record if the tool was found.
struct ToolStep {
    output: Option<String>,
    call: Option<ToolCall>,
}

impl ToolStep {
    fn calls(self) -> (Option<String>, Vec<ToolCall>) {
        (self.output, self.call.into_iter().collect())
    }
}

pub struct AgentDispatcher {
    tools: Arc<dyn ToolInvoker>,
    knowledge: Arc<dyn KnowledgeBaseResolver>,
    rules: RuleTable,
}

impl AgentDispatcher {
    pub fn new(tools: Arc<dyn ToolInvoker>, knowledge: Arc<dyn KnowledgeBaseResolver>) -> Self {
        Self::with_rules(tools, knowledge, RuleTable::default())
    }

    pub fn with_rules(
        tools: Arc<dyn ToolInvoker>,
        knowledge: Arc<dyn KnowledgeBaseResolver>,
        rules: RuleTable,
    ) -> Self {
        Self {
            tools,
            knowledge,
            rules,
        }
    }

    /// Agent for a message: the explicit hint if it names a known agent,
    /// otherwise the rule table.
    pub fn select(&self, message: &str, hint: Option<&str>) -> AgentKind {
        if let Some(name) = hint {
            match AgentKind::from_name(name) {
                Some(agent) => return agent,
                None => warn!("Unknown agent '{}', falling back to rule selection", name),
            }
        }
        self.rules.select(message)
    }

    pub async fn dispatch(&self, request: DispatchRequest<'_>) -> DispatchOutcome {
        if !request.selected_kbs.is_empty() {
            return self.answer_from_knowledge(request.message, request.selected_kbs);
        }

        let agent = self.select(request.message, request.agent);
        debug!("Dispatching to agent {}", agent.name());

        match agent {
            AgentKind::MathWhiz => self.run_math(request.message).await,
            AgentKind::WebResearcher => self.run_research(request.message).await,
            AgentKind::Generalist => self.run_general(request.message).await,
        }
    }

    fn answer_from_knowledge(&self, message: &str, ids: &[String]) -> DispatchOutcome {
        let lines: Vec<String> = ids
            .iter()
            .filter_map(|id| {
                let kb = self.knowledge.resolve(id);
                if kb.is_none() {
                    debug!("Knowledge base not found: {}", id);
                }
                kb
            })
            .map(|kb| {
                format!(
                    "In knowledge base '{}', I found the following information about '{}': ...",
                    kb.kb_name, message
                )
            })
            .collect();

        let reply = if lines.is_empty() {
            format!(
                "I could not find any information about '{}' in the selected knowledge bases.",
                message
            )
        } else {
            lines.join("\n")
        };

        DispatchOutcome {
            reply,
            agent_used: None,
            tool_calls: Vec::new(),
        }
    }

    async fn run_math(&self, message: &str) -> DispatchOutcome {
        let agent = AgentKind::MathWhiz;
        let Some(expr) = expression::extract(message) else {
            return DispatchOutcome::from_agent(agent, MATH_HELP.to_string(), Vec::new());
        };

        let (output, calls) = self.call_tool(agent, expr.to_args()).await.calls();
        let reply = match output {
            Some(result) => format!("I've calculated that for you. {}", result),
            None => MATH_HELP.to_string(),
        };
        DispatchOutcome::from_agent(agent, reply, calls)
    }

    async fn run_research(&self, message: &str) -> DispatchOutcome {
        let agent = AgentKind::WebResearcher;
        let mut args = ToolArgs::new();
        args.insert("query".to_string(), json!(message));

        let (output, calls) = self.call_tool(agent, args).await.calls();
        let reply = match output {
            Some(result) => format!("Based on my web search: {}", result),
            None => format!(
                "I wasn't able to search the web for '{}' right now.",
                message
            ),
        };
        DispatchOutcome::from_agent(agent, reply, calls)
    }

    async fn run_general(&self, message: &str) -> DispatchOutcome {
        let agent = AgentKind::Generalist;
        let generic = format!(
            "As the Generalist, I can tell you: '{}' is an interesting topic!",
            message
        );

        if !message.to_lowercase().contains("time") {
            return DispatchOutcome::from_agent(agent, generic, Vec::new());
        }

        let (output, calls) = self.call_tool(agent, ToolArgs::new()).await.calls();
        let reply = match output {
            Some(result) => format!("You asked about the time. {}", result),
            None => generic,
        };
        DispatchOutcome::from_agent(agent, reply, calls)
    }

    async fn call_tool(&self, agent: AgentKind, args: ToolArgs) -> ToolStep {
        let tool = agent.tool();
        match self.tools.invoke(tool, args.clone()).await {
            Ok(output) => {
                info!("Agent {} used tool {}", agent.name(), tool);
                ToolStep {
                    call: Some(ToolCall::new(tool, args, Some(output.clone()))),
                    output: Some(output),
                }
            }
            Err(ToolError::NotFound(_)) => {
                warn!("Agent {}: tool '{}' is not registered", agent.name(), tool);
                ToolStep {
                    output: None,
                    call: None,
                }
            }
            Err(e) => {
                warn!("Agent {}: tool '{}' failed: {}", agent.name(), tool, e);
                ToolStep {
                    output: None,
                    call: Some(ToolCall::new(tool, args, None)),
                }
            }
        }
    }
}
