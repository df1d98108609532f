use crate::error::ToolError;
use crate::schema::ParameterSchema;
use async_trait::async_trait;
use switchboard_core::ToolArgs;

/// An executable capability the registry can hand arguments to.
///
/// Arguments reach `execute` only after they passed `parameters().validate`.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> ParameterSchema;

    fn schema(&self) -> serde_json::Value {
        self.parameters().to_json()
    }

    async fn execute(&self, args: ToolArgs) -> Result<String, ToolError>;
}
