//! Interactive chat loop over a single session at a time.

use crate::bootstrap::App;
use anyhow::{Context, Result};
use std::io::{self, Write};
use switchboard_agents::ChatRequest;
use switchboard_core::{Role, SessionId};
use switchboard_tools::{ToolDefinition, ToolPatch};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    NewSession,
    EndSession,
    History,
    Agents,
    Tools,
    /// `None` returns to rule-based selection.
    UseAgent(Option<String>),
    /// Empty clears the selection.
    UseKnowledgeBases(Vec<String>),
    KnowledgeBases,
    CustomTools,
    AddTool(String),
    /// Tool id and a YAML patch file.
    UpdateTool(String, String),
    RemoveTool(String),
    Chat(String),
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Command {
        let line = line.trim();
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Chat(line.to_string());
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<String> = parts.map(str::to_string).collect();

        match (name, args.as_slice()) {
            ("help", _) => Command::Help,
            ("quit" | "exit", _) => Command::Quit,
            ("new", _) => Command::NewSession,
            ("end", _) => Command::EndSession,
            ("history", _) => Command::History,
            ("agents", _) => Command::Agents,
            ("tools", _) => Command::Tools,
            ("agent", []) => Command::UseAgent(None),
            ("agent", [name]) if name == "auto" => Command::UseAgent(None),
            ("agent", [name]) => Command::UseAgent(Some(name.clone())),
            ("kb", ids) if ids.first().is_some_and(|id| id == "off") => {
                Command::UseKnowledgeBases(Vec::new())
            }
            ("kb", ids) => Command::UseKnowledgeBases(ids.to_vec()),
            ("kbs", _) => Command::KnowledgeBases,
            ("custom", _) => Command::CustomTools,
            ("add-tool", [path]) => Command::AddTool(path.clone()),
            ("update-tool", [id, path]) => Command::UpdateTool(id.clone(), path.clone()),
            ("remove-tool", [id]) => Command::RemoveTool(id.clone()),
            _ => Command::Unknown(line.to_string()),
        }
    }
}

pub struct Repl {
    app: App,
    session: SessionId,
    agent: Option<String>,
    knowledge_bases: Vec<String>,
}

impl Repl {
    pub fn new(app: App) -> Result<Self> {
        let session = app.chat.new_session()?.session_id;
        Ok(Self {
            app,
            session,
            agent: None,
            knowledge_bases: Vec::new(),
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("Switchboard. Type /help for commands.");
        println!("Session: {}\n", self.session);

        loop {
            print!("you> ");
            io::stdout().flush()?;

            let mut input = String::new();
            if io::stdin().read_line(&mut input)? == 0 {
                break;
            }
            if input.trim().is_empty() {
                continue;
            }

            match Command::parse(&input) {
                Command::Quit => break,
                command => {
                    if let Err(e) = self.handle(command).await {
                        eprintln!("Error: {:#}\n", e);
                    }
                }
            }
        }

        self.app.chat.end_session(&self.session);
        println!("Goodbye!");
        Ok(())
    }

    async fn handle(&mut self, command: Command) -> Result<()> {
        match command {
            Command::Help => print_help(),
            Command::Quit => {}
            Command::NewSession => {
                self.app.chat.end_session(&self.session);
                self.session = self.app.chat.new_session()?.session_id;
                println!("Session: {}\n", self.session);
            }
            Command::EndSession => {
                self.app.chat.end_session(&self.session);
                println!("Session {} ended. Use /new to start another.\n", self.session);
            }
            Command::History => {
                let history = self.app.chat.history(&self.session)?.history;
                for message in history {
                    let who = match message.role {
                        Role::User => "you".to_string(),
                        Role::Assistant => message
                            .agent_used
                            .clone()
                            .unwrap_or_else(|| "assistant".to_string()),
                    };
                    println!("[{}] {}: {}", message.timestamp.format("%H:%M:%S"), who, message.content);
                    for call in &message.tool_calls {
                        println!(
                            "    {}({}) -> {}",
                            call.tool,
                            serde_json::Value::Object(call.args.clone()),
                            call.result.as_deref().unwrap_or("<failed>")
                        );
                    }
                }
                println!();
            }
            Command::Agents => {
                for agent in self.app.chat.agents() {
                    println!("  {:<14} {}", agent.name, agent.description);
                }
                println!();
            }
            Command::Tools => {
                for tool in self.app.chat.tools() {
                    println!("  {:<14} [{:?}] {}", tool.name, tool.kind, tool.description);
                }
                println!();
            }
            Command::UseAgent(agent) => {
                match &agent {
                    Some(name) => println!("Routing every message to {}\n", name),
                    None => println!("Agent selection is automatic\n"),
                }
                self.agent = agent;
            }
            Command::UseKnowledgeBases(ids) => {
                if ids.is_empty() {
                    println!("Knowledge bases cleared\n");
                } else {
                    println!("Answering from knowledge bases: {}\n", ids.join(", "));
                }
                self.knowledge_bases = ids;
            }
            Command::KnowledgeBases => {
                for entry in self.app.knowledge.list() {
                    println!("  {}  {} ({})", entry.id, entry.kb.kb_name, entry.kb.vector_store);
                }
                println!();
            }
            Command::CustomTools => {
                for tool in self.app.catalog.list() {
                    println!("  {}  {}", tool.id, tool.definition.name);
                }
                println!();
            }
            Command::AddTool(path) => {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path))?;
                let definition: ToolDefinition = serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse {}", path))?;
                let tool = self.app.add_tool(definition)?;
                println!("Tool '{}' created (ID: {})\n", tool.definition.name, tool.id);
            }
            Command::UpdateTool(id, path) => {
                let content = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path))?;
                let patch: ToolPatch = serde_yaml::from_str(&content)
                    .with_context(|| format!("Failed to parse {}", path))?;
                let tool = self.app.update_tool(&id, &patch)?;
                println!("Tool '{}' updated (ID: {})\n", tool.definition.name, tool.id);
            }
            Command::RemoveTool(id) => {
                self.app.remove_tool(&id)?;
                println!("Tool {} removed\n", id);
            }
            Command::Chat(message) => {
                let mut request = ChatRequest::new(self.session.clone(), message)
                    .with_knowledge_bases(self.knowledge_bases.clone());
                request.agent = self.agent.clone();

                let response = self.app.chat.chat(request).await?;
                let label = response.agent_used.as_deref().unwrap_or("knowledge");
                println!("\n{}> {}\n", label, response.reply);
            }
            Command::Unknown(line) => println!("Unknown command: {} (try /help)\n", line),
        }
        Ok(())
    }
}

fn print_help() {
    println!("\nCommands:");
    println!("  /new                 Start a new session");
    println!("  /end                 End the current session");
    println!("  /history             Show the conversation so far");
    println!("  /agents              List agents");
    println!("  /agent <name|auto>   Pin an agent, or return to automatic selection");
    println!("  /tools               List registered tools");
    println!("  /custom              List custom tools");
    println!("  /add-tool <file>     Create a custom tool from a YAML definition");
    println!("  /update-tool <id> <file>  Patch a custom tool from a YAML file");
    println!("  /remove-tool <id>    Delete a custom tool");
    println!("  /kbs                 List knowledge bases");
    println!("  /kb <id>... | off    Answer from knowledge bases");
    println!("  /quit                Exit\n");
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_chat() {
        assert_eq!(
            Command::parse("  what is 2 + 2 \n"),
            Command::Chat("what is 2 + 2".to_string())
        );
    }

    #[test]
    fn test_agent_commands() {
        assert_eq!(
            Command::parse("/agent MathWhiz"),
            Command::UseAgent(Some("MathWhiz".to_string()))
        );
        assert_eq!(Command::parse("/agent auto"), Command::UseAgent(None));
        assert_eq!(Command::parse("/agent"), Command::UseAgent(None));
    }

    #[test]
    fn test_knowledge_base_commands() {
        assert_eq!(
            Command::parse("/kb a b"),
            Command::UseKnowledgeBases(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(Command::parse("/kb off"), Command::UseKnowledgeBases(vec![]));
        assert_eq!(Command::parse("/kbs"), Command::KnowledgeBases);
    }

    #[test]
    fn test_tool_commands() {
        assert_eq!(
            Command::parse("/add-tool tools/echo.yaml"),
            Command::AddTool("tools/echo.yaml".to_string())
        );
        assert_eq!(
            Command::parse("/remove-tool 42"),
            Command::RemoveTool("42".to_string())
        );
        assert_eq!(
            Command::parse("/update-tool 42 patch.yaml"),
            Command::UpdateTool("42".to_string(), "patch.yaml".to_string())
        );
        assert!(matches!(Command::parse("/remove-tool"), Command::Unknown(_)));
        assert!(matches!(Command::parse("/update-tool 42"), Command::Unknown(_)));
    }

    #[test]
    fn test_quit_and_unknown() {
        assert_eq!(Command::parse("/quit"), Command::Quit);
        assert_eq!(Command::parse("/exit"), Command::Quit);
        assert_eq!(
            Command::parse("/dance"),
            Command::Unknown("/dance".to_string())
        );
    }
}
