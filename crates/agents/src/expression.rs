//! Arithmetic extraction for MathWhiz.

use regex::Regex;
use serde_json::json;
use std::sync::OnceLock;
use switchboard_core::ToolArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "+" => Some(Operation::Add),
            "-" => Some(Operation::Subtract),
            "*" => Some(Operation::Multiply),
            "/" => Some(Operation::Divide),
            _ => None,
        }
    }

    /// The calculator's name for this operation.
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Add => "add",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Expression {
    pub a: f64,
    pub op: Operation,
    pub b: f64,
}

impl Expression {
    /// Arguments for the `calculator` tool.
    pub fn to_args(self) -> ToolArgs {
        let mut args = ToolArgs::new();
        args.insert("a".to_string(), json!(self.a));
        args.insert("b".to_string(), json!(self.b));
        args.insert("op".to_string(), json!(self.op.as_str()));
        args
    }
}

fn expression_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(\d+\.?\d*)\s*([+\-*/])\s*(\d+\.?\d*)").ok())
        .as_ref()
}

/// Whether the message contains something shaped like `<number> <op> <number>`.
pub fn contains_expression(message: &str) -> bool {
    expression_pattern().is_some_and(|re| re.is_match(message))
}

fn operand(text: &str) -> Option<f64> {
    let value: f64 = text.parse().ok()?;
    value.is_finite().then_some(value)
}

/// First `<number> <op> <number>` in the message, if any. Operands too large
/// for an `f64` yield `None`.
pub fn extract(message: &str) -> Option<Expression> {
    let caps = expression_pattern()?.captures(message)?;
    let a = operand(caps.get(1)?.as_str())?;
    let op = Operation::from_symbol(caps.get(2)?.as_str())?;
    let b = operand(caps.get(3)?.as_str())?;
    Some(Expression { a, op, b })
}
