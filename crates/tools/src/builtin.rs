use crate::error::ToolError;
use crate::schema::{ParamType, ParameterSchema, ParameterSpec};
use crate::traits::Tool;
use async_trait::async_trait;
use chrono::SecondsFormat;
use std::sync::Arc;
use switchboard_core::{Clock, ToolArgs};

pub const CALCULATOR: &str = "calculator";
pub const WEB_SEARCH: &str = "web_search";
pub const CURRENT_TIME: &str = "current_time";

/// The tools every registry starts with.
pub fn builtin_tools(clock: Arc<dyn Clock>) -> Vec<Arc<dyn Tool>> {
    vec![
        Arc::new(CalculatorTool),
        Arc::new(WebSearchTool),
        Arc::new(CurrentTimeTool::new(clock)),
    ]
}

/// Render a float the way the reply text has always shown it: shortest
/// round-trip digits, whole numbers with a trailing `.0`, and exponent form
/// below 1e-4 or from 1e16 up.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if value != 0.0 && !(-4..16).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }

    let plain = value.to_string();
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

fn number_arg(args: &ToolArgs, name: &str) -> Result<f64, ToolError> {
    args.get(name)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{}' field", name)))
}

fn string_arg<'a>(args: &'a ToolArgs, name: &str) -> Result<&'a str, ToolError> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ToolError::InvalidArguments(format!("Missing '{}' field", name)))
}

pub struct CalculatorTool;

#[async_trait]
impl Tool for CalculatorTool {
    fn name(&self) -> &str {
        CALCULATOR
    }

    fn description(&self) -> &str {
        "Performs a basic arithmetic calculation"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new(vec![
            ParameterSpec::required("a", ParamType::Number, "The first number"),
            ParameterSpec::required("b", ParamType::Number, "The second number"),
            ParameterSpec::required("op", ParamType::String, "The operation to perform")
                .one_of(&["add", "subtract", "multiply", "divide"]),
        ])
    }

    async fn execute(&self, args: ToolArgs) -> Result<String, ToolError> {
        let a = number_arg(&args, "a")?;
        let b = number_arg(&args, "b")?;
        let op = string_arg(&args, "op")?;

        let result = match op {
            "add" => a + b,
            "subtract" => a - b,
            "multiply" => a * b,
            "divide" => {
                if b == 0.0 {
                    return Ok("Error: Division by zero.".to_string());
                }
                a / b
            }
            other => return Ok(format!("Error: Unknown operation '{}'.", other)),
        };

        Ok(format!("The result is {}", format_number(result)))
    }
}

/// Canned search results; no network access.
pub struct WebSearchTool;

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        WEB_SEARCH
    }

    fn description(&self) -> &str {
        "Performs a mock web search and returns a summary"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::new(vec![ParameterSpec::required(
            "query",
            ParamType::String,
            "The search query",
        )])
    }

    async fn execute(&self, args: ToolArgs) -> Result<String, ToolError> {
        let query = string_arg(&args, "query")?;
        Ok(format!(
            "Mock search results for '{}': The topic is complex, with many perspectives. \
             Key findings suggest a correlation but no definitive causation.",
            query
        ))
    }
}

pub struct CurrentTimeTool {
    clock: Arc<dyn Clock>,
}

impl CurrentTimeTool {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn name(&self) -> &str {
        CURRENT_TIME
    }

    fn description(&self) -> &str {
        "Returns the current date and time as a formatted string"
    }

    fn parameters(&self) -> ParameterSchema {
        ParameterSchema::empty()
    }

    async fn execute(&self, _args: ToolArgs) -> Result<String, ToolError> {
        let now = self.clock.now().to_rfc3339_opts(SecondsFormat::Secs, true);
        Ok(format!("The current time is {}", now))
    }
}
