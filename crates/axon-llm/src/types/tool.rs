use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tool definition offered to a messages-protocol model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Tool name
    pub name: String,
    /// What the tool does
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the tool input
    pub input_schema: Value,
}

/// Complete tool call requested by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Tool call identifier
    pub id: String,
    /// Tool name
    pub name: String,
    /// Parsed arguments
    pub args: Value,
}
