use crate::error::ToolError;
use crate::sandbox::{self, DynamicTool, SandboxLimits, ToolDefinition};
use crate::traits::Tool;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use switchboard_core::ToolArgs;
use tokio::time::timeout;
use tracing::{error, info, warn};

/// Where a registered tool came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    Builtin,
    Dynamic,
}

/// Executable half of a registry entry.
#[derive(Clone)]
pub enum ToolHandler {
    Builtin(Arc<dyn Tool>),
    Dynamic(Arc<DynamicTool>),
}

impl ToolHandler {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolHandler::Builtin(_) => ToolKind::Builtin,
            ToolHandler::Dynamic(_) => ToolKind::Dynamic,
        }
    }

    fn as_tool(&self) -> Arc<dyn Tool> {
        match self {
            ToolHandler::Builtin(tool) => Arc::clone(tool),
            ToolHandler::Dynamic(tool) => Arc::clone(tool) as Arc<dyn Tool>,
        }
    }
}

/// Listing entry for a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub schema: serde_json::Value,
    pub kind: ToolKind,
}

/// One immutable generation of the tool set.
#[derive(Clone, Default)]
struct ToolSet {
    generation: u64,
    builtins: Vec<Arc<dyn Tool>>,
    dynamic: Vec<Arc<DynamicTool>>,
}

impl ToolSet {
    fn find(&self, name: &str) -> Option<ToolHandler> {
        if let Some(tool) = self.builtins.iter().find(|t| t.name() == name) {
            return Some(ToolHandler::Builtin(Arc::clone(tool)));
        }
        self.dynamic
            .iter()
            .find(|t| t.name() == name)
            .map(|t| ToolHandler::Dynamic(Arc::clone(t)))
    }

    fn is_builtin(&self, name: &str) -> bool {
        self.builtins.iter().any(|t| t.name() == name)
    }

    fn dynamic_position(&self, name: &str) -> Option<usize> {
        self.dynamic.iter().position(|t| t.name() == name)
    }
}

/// Registry of built-in and dynamic tools.
///
/// Every mutation publishes a new `ToolSet` generation; an invocation clones
/// the current generation once and runs entirely against it, so a concurrent
/// register or unregister is observed either fully or not at all.
pub struct ToolRegistry {
    current: RwLock<Arc<ToolSet>>,
    timeout: Duration,
    limits: SandboxLimits,
}

impl ToolRegistry {
    pub fn new(timeout: Duration, limits: SandboxLimits) -> Self {
        Self {
            current: RwLock::new(Arc::new(ToolSet::default())),
            timeout,
            limits,
        }
    }

    /// Registry preloaded with `builtins`, in the given order.
    pub fn with_builtins(
        builtins: Vec<Arc<dyn Tool>>,
        timeout: Duration,
        limits: SandboxLimits,
    ) -> Result<Self, ToolError> {
        let registry = Self::new(timeout, limits);
        for tool in builtins {
            registry.register_builtin(tool)?;
        }
        Ok(registry)
    }

    fn snapshot(&self) -> Arc<ToolSet> {
        Arc::clone(&self.current.read())
    }

    /// Apply `change` to a copy of the current set and publish it as the next
    /// generation. Nothing is published if `change` fails.
    fn publish<T>(
        &self,
        change: impl FnOnce(&mut ToolSet) -> Result<T, ToolError>,
    ) -> Result<T, ToolError> {
        let mut current = self.current.write();
        let mut next = ToolSet::clone(&current);
        let out = change(&mut next)?;
        next.generation = current.generation + 1;
        *current = Arc::new(next);
        Ok(out)
    }

    pub fn generation(&self) -> u64 {
        self.snapshot().generation
    }

    pub fn register_builtin(&self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        let name = tool.name().to_string();
        self.publish(|set| {
            if set.find(&name).is_some() {
                return Err(ToolError::Registration(format!(
                    "tool '{}' is already registered",
                    name
                )));
            }
            set.builtins.push(tool);
            Ok(())
        })?;
        info!("Registered built-in tool: {}", name);
        Ok(())
    }

    /// Add or replace a dynamic tool.
    ///
    /// The handler is compiled before the registry lock is taken; a tool that
    /// fails validation is never published. Returns `true` if an existing tool
    /// of the same name was replaced.
    pub fn register(&self, definition: &ToolDefinition) -> Result<bool, ToolError> {
        let tool = Arc::new(sandbox::compile(definition, self.limits)?);
        let name = definition.name.clone();

        let replaced = self.publish(|set| {
            if set.is_builtin(&name) {
                return Err(ToolError::Registration(format!(
                    "'{}' is a built-in tool",
                    name
                )));
            }
            match set.dynamic_position(&name) {
                Some(pos) => {
                    set.dynamic[pos] = tool;
                    Ok(true)
                }
                None => {
                    set.dynamic.push(tool);
                    Ok(false)
                }
            }
        })?;

        if replaced {
            info!("Replaced dynamic tool: {}", name);
        } else {
            info!("Registered dynamic tool: {}", name);
        }
        Ok(replaced)
    }

    /// Swap the dynamic tool `old_name` for `definition` in one generation.
    ///
    /// Used for renames: the new name takes the old entry's list position. Fails
    /// if `old_name` is not a dynamic tool or the new name belongs to a
    /// different tool.
    pub fn replace(&self, old_name: &str, definition: &ToolDefinition) -> Result<(), ToolError> {
        let tool = Arc::new(sandbox::compile(definition, self.limits)?);
        let new_name = definition.name.clone();

        self.publish(|set| {
            let pos = set
                .dynamic_position(old_name)
                .ok_or_else(|| ToolError::NotFound(old_name.to_string()))?;
            if new_name != old_name && set.find(&new_name).is_some() {
                return Err(ToolError::Registration(format!(
                    "tool '{}' is already registered",
                    new_name
                )));
            }
            set.dynamic[pos] = tool;
            Ok(())
        })?;

        info!("Replaced dynamic tool: {} -> {}", old_name, new_name);
        Ok(())
    }

    /// Remove a dynamic tool. Absent names succeed and return `false`;
    /// built-in tools cannot be removed.
    pub fn unregister(&self, name: &str) -> Result<bool, ToolError> {
        let snapshot = self.snapshot();
        if snapshot.is_builtin(name) {
            return Err(ToolError::Registration(format!(
                "built-in tool '{}' cannot be removed",
                name
            )));
        }
        if snapshot.dynamic_position(name).is_none() {
            return Ok(false);
        }

        let removed = self.publish(|set| {
            Ok(match set.dynamic_position(name) {
                Some(pos) => {
                    set.dynamic.remove(pos);
                    true
                }
                None => false,
            })
        })?;

        if removed {
            info!("Unregistered dynamic tool: {}", name);
        }
        Ok(removed)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.snapshot().find(name).is_some()
    }

    /// Built-ins first, then dynamic tools in registration order.
    pub fn list(&self) -> Vec<ToolInfo> {
        let snapshot = self.snapshot();
        let builtins = snapshot
            .builtins
            .iter()
            .map(|t| ToolHandler::Builtin(Arc::clone(t)));
        let dynamic = snapshot
            .dynamic
            .iter()
            .map(|t| ToolHandler::Dynamic(Arc::clone(t)));

        builtins
            .chain(dynamic)
            .map(|handler| {
                let tool = handler.as_tool();
                ToolInfo {
                    name: tool.name().to_string(),
                    description: tool.description().to_string(),
                    schema: tool.schema(),
                    kind: handler.kind(),
                }
            })
            .collect()
    }

    /// Look up `name` in the current generation, check `args` against its
    /// schema and run it.
    pub async fn invoke(&self, name: &str, args: ToolArgs) -> Result<String, ToolError> {
        let handler = self
            .snapshot()
            .find(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let tool = handler.as_tool();

        tool.parameters()
            .validate(&args)
            .map_err(|reason| ToolError::InvalidArguments(format!("{}: {}", name, reason)))?;

        self.execute_with_protection(name, tool, args).await
    }

    async fn execute_with_protection(
        &self,
        name: &str,
        tool: Arc<dyn Tool>,
        args: ToolArgs,
    ) -> Result<String, ToolError> {
        // Spawn task to isolate panics
        let handle = tokio::spawn(async move { tool.execute(args).await });
        let abort = handle.abort_handle();

        match timeout(self.timeout, handle).await {
            Ok(Ok(Ok(output))) => Ok(output),
            Ok(Ok(Err(ToolError::Execution(reason)))) => {
                Err(ToolError::Execution(format!("{}: {}", name, reason)))
            }
            Ok(Ok(Err(other))) => Err(ToolError::Execution(format!("{}: {}", name, other))),
            Ok(Err(join_err)) => {
                if join_err.is_panic() {
                    error!("Tool execution panicked: {}", name);
                    Err(ToolError::Execution(format!("{}: handler panicked", name)))
                } else {
                    error!("Tool execution cancelled: {}", name);
                    Err(ToolError::Execution(format!("{}: handler cancelled", name)))
                }
            }
            Err(_) => {
                abort.abort();
                warn!(
                    "Tool execution timed out after {}ms: {}",
                    self.timeout.as_millis(),
                    name
                );
                Err(ToolError::Execution(format!(
                    "{}: timed out after {}ms",
                    name,
                    self.timeout.as_millis()
                )))
            }
        }
    }
}
