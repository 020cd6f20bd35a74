//! Reassembly of streamed tool call fragments

use indexmap::IndexMap;
use serde_json::Value;

use crate::{
    error::LlmError,
    types::{StreamChunk, ToolCall, ToolCallChunk},
};

#[derive(Debug, Default)]
struct PendingCall {
    id: Option<String>,
    name: Option<String>,
    args: String,
}

/// Collects tool call fragments by index, in the order first seen
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    calls: IndexMap<u32, PendingCall>,
}

impl ToolCallAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &ToolCallChunk) {
        let call = self.calls.entry(chunk.index).or_default();
        if call.id.is_none() {
            call.id = chunk.id.clone().filter(|id| !id.is_empty());
        }
        if call.name.is_none() {
            call.name = chunk.name.clone().filter(|name| !name.is_empty());
        }
        call.args.push_str(&chunk.args);
    }

    /// Feed any stream chunk; only tool call fragments are kept
    pub fn observe(&mut self, chunk: &StreamChunk) {
        if let StreamChunk::ToolCall(call) = chunk {
            self.push(call);
        }
    }

    /// Concatenated arguments received so far for an index
    pub fn arguments(&self, index: u32) -> Option<&str> {
        self.calls.get(&index).map(|call| call.args.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Complete tool calls in first-seen order
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Decode`] when a call never received its id or
    /// name, or its arguments are not valid JSON
    pub fn finish(self) -> Result<Vec<ToolCall>, LlmError> {
        self.calls
            .into_iter()
            .map(|(index, call)| {
                let id = call
                    .id
                    .ok_or_else(|| LlmError::Decode(format!("tool call {index} has no id")))?;
                let name = call
                    .name
                    .ok_or_else(|| LlmError::Decode(format!("tool call {index} has no name")))?;
                let args = if call.args.trim().is_empty() {
                    Value::Object(serde_json::Map::new())
                } else {
                    serde_json::from_str(&call.args)
                        .map_err(|e| LlmError::decode(&format!("tool call {index} arguments"), e))?
                };
                Ok(ToolCall { id, name, args })
            })
            .collect()
    }
}
