//! Declared tool parameters and argument checking.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use switchboard_core::ToolArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamType {
    fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Number => "number",
            ParamType::Integer => "integer",
            ParamType::Boolean => "boolean",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            // Integers are valid numbers.
            ParamType::Number => value.is_number(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
    /// Allowed values for string parameters.
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<String>>,
}

fn default_required() -> bool {
    true
}

impl ParameterSpec {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: true,
            allowed: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    pub fn one_of(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|v| v.to_string()).collect());
        self
    }
}

/// Ordered list of parameters a tool accepts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema(pub Vec<ParameterSpec>);

impl ParameterSchema {
    pub fn new(params: Vec<ParameterSpec>) -> Self {
        Self(params)
    }

    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn params(&self) -> &[ParameterSpec] {
        &self.0
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.0.iter().find(|p| p.name == name)
    }

    /// JSON Schema object describing the parameters.
    pub fn to_json(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.0 {
            let mut prop = json!({
                "type": param.param_type.as_str(),
                "description": param.description,
            });
            if let Some(allowed) = &param.allowed {
                prop["enum"] = json!(allowed);
            }
            properties.insert(param.name.clone(), prop);
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check `args` against the declared parameters.
    ///
    /// Rejects missing required parameters, unknown parameter names, values of
    /// the wrong type and string values outside an `enum` list.
    pub fn validate(&self, args: &ToolArgs) -> Result<(), String> {
        for name in args.keys() {
            if self.get(name).is_none() {
                return Err(format!("unexpected argument '{}'", name));
            }
        }

        for param in &self.0 {
            let value = match args.get(&param.name) {
                Some(Value::Null) | None if param.required => {
                    return Err(format!("missing required argument '{}'", param.name));
                }
                Some(Value::Null) | None => continue,
                Some(value) => value,
            };

            if !param.param_type.accepts(value) {
                return Err(format!(
                    "argument '{}' must be of type {}",
                    param.name,
                    param.param_type.as_str()
                ));
            }

            if let (Some(allowed), Some(s)) = (&param.allowed, value.as_str()) {
                if !allowed.iter().any(|a| a == s) {
                    return Err(format!(
                        "argument '{}' must be one of: {}",
                        param.name,
                        allowed.join(", ")
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn args(value: Value) -> ToolArgs {
        value.as_object().cloned().unwrap()
    }

    fn calc_schema() -> ParameterSchema {
        ParameterSchema::new(vec![
            ParameterSpec::required("a", ParamType::Number, "First"),
            ParameterSpec::required("b", ParamType::Number, "Second"),
            ParameterSpec::required("op", ParamType::String, "Operation")
                .one_of(&["add", "subtract"]),
            ParameterSpec::optional("precision", ParamType::Integer, "Digits"),
        ])
    }

    #[test]
    fn test_valid_arguments() {
        let schema = calc_schema();
        assert!(schema
            .validate(&args(json!({"a": 1.5, "b": 2, "op": "add"})))
            .is_ok());
        assert!(schema
            .validate(&args(json!({"a": 1, "b": 2, "op": "subtract", "precision": 3})))
            .is_ok());
    }

    #[test]
    fn test_missing_required() {
        let err = calc_schema()
            .validate(&args(json!({"a": 1, "op": "add"})))
            .unwrap_err();
        assert!(err.contains("missing required argument 'b'"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let err = calc_schema()
            .validate(&args(json!({"a": 1, "b": null, "op": "add"})))
            .unwrap_err();
        assert!(err.contains("'b'"));
    }

    #[test]
    fn test_wrong_type() {
        let err = calc_schema()
            .validate(&args(json!({"a": "one", "b": 2, "op": "add"})))
            .unwrap_err();
        assert!(err.contains("type number"));

        let err = calc_schema()
            .validate(&args(json!({"a": 1, "b": 2, "op": "add", "precision": 1.5})))
            .unwrap_err();
        assert!(err.contains("type integer"));
    }

    #[test]
    fn test_enum_violation() {
        let err = calc_schema()
            .validate(&args(json!({"a": 1, "b": 2, "op": "pow"})))
            .unwrap_err();
        assert!(err.contains("one of"));
    }

    #[test]
    fn test_unknown_argument() {
        let err = calc_schema()
            .validate(&args(json!({"a": 1, "b": 2, "op": "add", "c": 3})))
            .unwrap_err();
        assert!(err.contains("unexpected argument 'c'"));
    }

    #[test]
    fn test_to_json() {
        let schema = calc_schema().to_json();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["op"]["enum"], json!(["add", "subtract"]));
        assert_eq!(schema["required"], json!(["a", "b", "op"]));
    }

    #[test]
    fn test_yaml_spec_defaults() {
        let spec: ParameterSpec = serde_yaml::from_str("name: who\ntype: string\n").unwrap();
        assert!(spec.required);
        assert!(spec.description.is_empty());
        assert!(spec.allowed.is_none());
    }
}
