//! Canonical, provider-agnostic request, response and stream chunk types

pub mod message;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;

pub use message::{ContentBlock, Message, MessageContent, Role};
pub use request::{CanonicalRequest, GenerationInput, ModelParams};
pub use response::{CanonicalResponse, Thinking, Usage};
pub use stream::{BlockDelta, Metadata, StreamChunk, TaggedBlock, ToolCallChunk};
pub use tool::{ToolCall, ToolSpec};
