pub mod builtin;
pub mod catalog;
pub mod error;
pub mod registry;
pub mod sandbox;
pub mod schema;
pub mod traits;

pub use builtin::{builtin_tools, CALCULATOR, CURRENT_TIME, WEB_SEARCH};
pub use catalog::{CatalogError, CustomTool, ToolCatalog, ToolPatch};
pub use error::ToolError;
pub use registry::{ToolHandler, ToolInfo, ToolKind, ToolRegistry};
pub use sandbox::{DynamicTool, SandboxLimits, ToolDefinition};
pub use schema::{ParamType, ParameterSchema, ParameterSpec};
pub use traits::Tool;
