use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Human turn
    User,
    /// Model turn
    Assistant,
}

/// One turn of a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Message content
    pub content: MessageContent,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
        }
    }

    pub const fn with_blocks(role: Role, blocks: Vec<ContentBlock>) -> Self {
        Self {
            role,
            content: MessageContent::Blocks(blocks),
        }
    }

    /// Whether the content carries a `tool_result` block
    pub fn has_tool_result(&self) -> bool {
        self.blocks()
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolResult { .. }))
    }

    /// Structured content blocks, empty for plain text content
    pub fn blocks(&self) -> &[ContentBlock] {
        match &self.content {
            MessageContent::Text(_) => &[],
            MessageContent::Blocks(blocks) => blocks,
        }
    }
}

/// Message content, either plain text or ordered content blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text content
    Text(String),
    /// Ordered structured blocks
    Blocks(Vec<ContentBlock>),
}

/// Structured content block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Text content
    Text {
        /// The text string
        text: String,
    },
    /// Extended thinking output
    Thinking {
        /// Reasoning text
        thinking: String,
        /// Signature returned by the model, echoed back on later turns
        #[serde(default)]
        signature: String,
    },
    /// Thinking output redacted by the provider
    RedactedThinking {
        /// Opaque encrypted payload
        data: String,
    },
    /// Tool invocation requested by the model
    ToolUse {
        /// Tool call identifier
        id: String,
        /// Tool name
        name: String,
        /// Tool arguments
        input: Value,
    },
    /// Result of a tool invocation
    ToolResult {
        /// Identifier of the `tool_use` block this answers
        tool_use_id: String,
        /// Result content
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<Value>,
        /// Whether the tool failed
        #[serde(default, skip_serializing_if = "Option::is_none")]
        is_error: Option<bool>,
    },
}

impl ContentBlock {
    /// Whether this is a thinking or redacted thinking block
    pub const fn is_thinking(&self) -> bool {
        matches!(self, Self::Thinking { .. } | Self::RedactedThinking { .. })
    }
}
