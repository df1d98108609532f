//! Dynamic tool handlers.
//!
//! A handler is a MiniJinja source that defines exactly one top-level macro.
//! The template language has no filesystem, network or process access, and
//! every evaluation runs under a fuel budget, so a handler can only compute a
//! string from its arguments.
//!
//! ```text
//! {% macro greet(name, punctuation="!") %}Hello, {{ name }}{{ punctuation }}{% endmacro %}
//! ```

use crate::error::ToolError;
use crate::schema::{ParameterSchema, ParameterSpec};
use crate::traits::Tool;
use async_trait::async_trait;
use minijinja::value::{Kwargs, Value as TemplateValue, ValueKind};
use minijinja::{Environment, UndefinedBehavior};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use switchboard_core::ToolArgs;

const TEMPLATE_NAME: &str = "handler";
const MAX_SOURCE_LEN: usize = 64 * 1024;
const MAX_NAME_LEN: usize = 64;

/// Source-level description of a dynamic tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub code: String,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SandboxLimits {
    /// Instruction budget for one evaluation.
    pub fuel: u64,
}

impl Default for SandboxLimits {
    fn default() -> Self {
        Self { fuel: 50_000 }
    }
}

/// A handler that passed validation. Only `compile` can build one.
pub struct DynamicTool {
    name: String,
    description: String,
    parameters: ParameterSchema,
    macro_name: String,
    env: Environment<'static>,
}

impl std::fmt::Debug for DynamicTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicTool")
            .field("name", &self.name)
            .field("macro_name", &self.macro_name)
            .finish_non_exhaustive()
    }
}

fn validate_name(name: &str) -> Result<(), ToolError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(ToolError::Registration(format!(
            "invalid tool name '{}'",
            name
        )))
    }
}

/// Argument names of `value` if it is a macro exported under `name`.
fn macro_arguments(name: &str, value: &TemplateValue) -> Option<Vec<String>> {
    let own_name = value.get_attr("name").ok()?;
    if own_name.as_str() != Some(name) {
        return None;
    }
    let arguments = value.get_attr("arguments").ok()?;
    if arguments.kind() != ValueKind::Seq {
        return None;
    }
    arguments
        .try_iter()
        .ok()?
        .map(|arg| arg.as_str().map(str::to_string))
        .collect()
}

fn registration_error(name: &str, err: minijinja::Error) -> ToolError {
    ToolError::Registration(format!("handler for '{}' does not compile: {}", name, err))
}

/// Validate a definition and build its handler.
///
/// Pure with respect to any registry: nothing is published here, so a failure
/// leaves every registry untouched.
pub fn compile(def: &ToolDefinition, limits: SandboxLimits) -> Result<DynamicTool, ToolError> {
    validate_name(&def.name)?;

    if def.code.len() > MAX_SOURCE_LEN {
        return Err(ToolError::Registration(format!(
            "handler for '{}' exceeds {} bytes",
            def.name, MAX_SOURCE_LEN
        )));
    }

    let mut seen = HashSet::new();
    for param in &def.parameters {
        if !seen.insert(param.name.as_str()) {
            return Err(ToolError::Registration(format!(
                "duplicate parameter '{}'",
                param.name
            )));
        }
    }

    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_fuel(Some(limits.fuel));
    env.add_template_owned(TEMPLATE_NAME, def.code.clone())
        .map_err(|e| registration_error(&def.name, e))?;

    let (macro_name, macro_args) = {
        let template = env
            .get_template(TEMPLATE_NAME)
            .map_err(|e| registration_error(&def.name, e))?;
        let (_, state) = template
            .render_and_return_state(())
            .map_err(|e| registration_error(&def.name, e))?;

        let mut macros: Vec<(String, Vec<String>)> = state
            .exports()
            .into_iter()
            .filter_map(|name| {
                let value = state.lookup(name)?;
                macro_arguments(name, &value).map(|args| (name.to_string(), args))
            })
            .collect();
        if macros.len() != 1 {
            return Err(ToolError::Registration(format!(
                "handler for '{}' must define exactly one macro, found {}",
                def.name,
                macros.len()
            )));
        }
        macros.remove(0)
    };

    let macro_args: HashSet<&str> = macro_args.iter().map(String::as_str).collect();
    if let Some(param) = def
        .parameters
        .iter()
        .find(|p| !macro_args.contains(p.name.as_str()))
    {
        return Err(ToolError::Registration(format!(
            "parameter '{}' is not an argument of macro '{}'",
            param.name, macro_name
        )));
    }
    if let Some(arg) = macro_args.iter().find(|a| !seen.contains(*a)) {
        return Err(ToolError::Registration(format!(
            "macro argument '{}' is not a declared parameter",
            arg
        )));
    }

    Ok(DynamicTool {
        name: def.name.clone(),
        description: def.description.clone(),
        parameters: ParameterSchema::new(def.parameters.clone()),
        macro_name,
        env,
    })
}

#[async_trait]
impl Tool for DynamicTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> ParameterSchema {
        self.parameters.clone()
    }

    async fn execute(&self, args: ToolArgs) -> Result<String, ToolError> {
        let exec_err = |e: minijinja::Error| ToolError::Execution(e.to_string());

        let kwargs: Kwargs = args
            .iter()
            .map(|(k, v)| (k.as_str(), TemplateValue::from_serialize(v)))
            .collect();

        let template = self.env.get_template(TEMPLATE_NAME).map_err(exec_err)?;
        let (_, state) = template.render_and_return_state(()).map_err(exec_err)?;
        let rendered = state
            .call_macro(&self.macro_name, &[TemplateValue::from(kwargs)])
            .map_err(exec_err)?;

        Ok(rendered.trim().to_string())
    }
}
