use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::response::Usage;

/// Free-form metadata carried by a stream event
pub type Metadata = Map<String, Value>;

/// One canonical piece of a streamed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamChunk {
    /// Plain text
    Text(String),
    /// Structured content blocks tagged with their block index; empty for a
    /// structured message start
    Content(Vec<TaggedBlock>),
    /// Fragment of a tool call
    ToolCall(ToolCallChunk),
    /// Provider metadata such as stop reasons
    Metadata(Metadata),
    /// One usage observation, not a running total
    Usage(Usage),
}

impl StreamChunk {
    /// Text of a plain text chunk
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Whether this chunk carries structured content rather than plain text
    pub const fn is_structured(&self) -> bool {
        matches!(self, Self::Content(_) | Self::ToolCall(_))
    }

    pub const fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}

/// Content block delta with the index of the block it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaggedBlock {
    pub index: u32,
    #[serde(flatten)]
    pub delta: BlockDelta,
}

/// Incremental content of one block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    /// Text fragment
    Text { text: String },
    /// Thinking fragment or its closing signature
    Thinking {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        thinking: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
    },
    /// Start of a tool use block
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
}

/// Fragment of a tool call
///
/// Fragments sharing an index concatenate, in the order received, into the
/// complete arguments JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallChunk {
    /// Index of the content block carrying the call
    pub index: u32,
    /// Tool call id (first fragment only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tool name (first fragment only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Partial arguments JSON
    #[serde(default)]
    pub args: String,
}
