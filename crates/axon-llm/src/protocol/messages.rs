//! Messages protocol wire types, as streamed and returned by Claude models

use serde::Deserialize;
use serde_json::Value;

/// Anthropic API version sent with messages requests
pub const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Streamed event, discriminated by `type`
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Stream started
    MessageStart,
    /// New content block started
    ContentBlockStart {
        /// Block index
        index: u32,
        /// Initial block content
        #[serde(default)]
        content_block: Option<Value>,
    },
    /// Incremental content within a block
    ContentBlockDelta {
        /// Block index
        index: u32,
        /// Delta content, possibly empty
        #[serde(default)]
        delta: Option<Value>,
    },
    /// Content block finished
    ContentBlockStop,
    /// Message-level delta carrying the stop reason
    MessageDelta {
        #[serde(default)]
        delta: MessageDelta,
    },
    /// Stream completed
    MessageStop,
    /// Keep-alive
    Ping,
    /// Any other discriminant
    #[serde(other)]
    Unrecognized,
}

/// Initial content of a streamed block
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StartBlock {
    /// Tool use block
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

/// Delta within a `content_block_delta` event
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    ThinkingDelta { thinking: String },
    SignatureDelta { signature: String },
    #[serde(other)]
    Other,
}

/// Delta in a `message_delta` event
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDelta {
    #[serde(default)]
    pub stop_reason: Option<String>,
    #[serde(default)]
    pub stop_sequence: Option<String>,
}

/// Content block in a complete response
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseBlock {
    Text {
        text: String,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
        #[serde(default)]
        signature: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}
