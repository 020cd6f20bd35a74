//! Per-event decoding shared by the blocking and async decoders

use serde_json::{Map, Value};

use crate::{
    error::LlmError,
    protocol::{
        bedrock::InvocationMetrics,
        messages::{self, StartBlock, StreamEvent},
    },
    provider::{Provider, ProviderProfile},
    types::{BlockDelta, Metadata, StreamChunk, TaggedBlock, ToolCallChunk},
};

/// Raw event keys that are never forwarded as metadata
const UNFORWARDED_KEYS: &[&str] = &["prompt_token_count", "generation_token_count", "created"];

/// Wire format of an event stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Typed messages protocol events
    Messages,
    /// Provider-specific completion payloads
    Completion,
}

/// Chunks decoded from one event
#[derive(Debug, Default)]
pub(crate) struct Decoded {
    pub chunks: Vec<StreamChunk>,
    /// No further event may be read
    pub terminal: bool,
}

impl Decoded {
    fn emit(chunks: Vec<StreamChunk>) -> Self {
        Self {
            chunks,
            terminal: false,
        }
    }

    fn finish(chunks: Vec<StreamChunk>) -> Self {
        Self { chunks, terminal: true }
    }
}

#[derive(Debug, Clone, Copy)]
enum Format {
    Messages { coerce_to_text: bool },
    Completion { output_field: &'static str },
}

/// Decodes single event payloads for one provider and wire format
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventDecoder {
    profile: &'static ProviderProfile,
    format: Format,
}

impl EventDecoder {
    /// Resolve the decoding rules, failing before any event is read
    pub fn new(provider: Provider, format: WireFormat, coerce_to_text: bool) -> Result<Self, LlmError> {
        let profile = provider.profile();
        let format = match format {
            WireFormat::Messages if profile.messages_protocol => Format::Messages { coerce_to_text },
            WireFormat::Messages => {
                return Err(LlmError::Configuration(format!(
                    "provider {provider} does not stream the messages protocol"
                )));
            }
            WireFormat::Completion => {
                let output_field = profile.output_field.ok_or_else(|| {
                    LlmError::Configuration(format!("unknown streaming output field for provider {provider}"))
                })?;
                Format::Completion { output_field }
            }
        };

        Ok(Self { profile, format })
    }

    pub fn decode(&self, payload: &[u8]) -> Result<Decoded, LlmError> {
        let payload: Value = serde_json::from_slice(payload).map_err(|e| LlmError::decode("stream event", e))?;

        match self.format {
            Format::Messages { coerce_to_text } => decode_messages(payload, coerce_to_text),
            Format::Completion { output_field } => self.decode_completion(&payload, output_field),
        }
    }

    fn decode_completion(&self, payload: &Value, output_field: &str) -> Result<Decoded, LlmError> {
        let provider = self.profile.provider;
        let termination = self.profile.termination;

        if termination.ends_before(payload, output_field) {
            return Ok(Decoded::finish(Vec::new()));
        }

        let object = payload
            .as_object()
            .ok_or_else(|| LlmError::Decode(format!("{provider} stream event is not an object")))?;

        let output = object.get(output_field);
        let text = if self.profile.output_wrapped {
            output.and_then(|v| v.get(0)).and_then(|v| v.get("text"))
        } else {
            output
        };
        let text = text.and_then(Value::as_str).ok_or_else(|| {
            LlmError::Decode(format!("{provider} stream event is missing text under {output_field}"))
        })?;

        let metadata: Metadata = object
            .iter()
            .filter(|(key, _)| key.as_str() != output_field && !UNFORWARDED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let mut chunks = vec![StreamChunk::Text(text.to_owned())];
        if !metadata.is_empty() {
            chunks.push(StreamChunk::Metadata(metadata));
        }

        if termination.ends_after(payload, output_field) {
            chunks.push(StreamChunk::Usage(InvocationMetrics::from_payload(payload).usage()));
            return Ok(Decoded::finish(chunks));
        }

        Ok(Decoded::emit(chunks))
    }
}

fn decode_messages(payload: Value, coerce_to_text: bool) -> Result<Decoded, LlmError> {
    let metrics = InvocationMetrics::from_payload(&payload);
    let event: StreamEvent = serde_json::from_value(payload).map_err(|e| LlmError::decode("messages event", e))?;

    let decoded = match event {
        StreamEvent::MessageStart => Decoded::emit(vec![if coerce_to_text {
            StreamChunk::Text(String::new())
        } else {
            StreamChunk::Content(Vec::new())
        }]),
        StreamEvent::ContentBlockStart { index, content_block } => {
            let block = content_block
                .map(serde_json::from_value::<StartBlock>)
                .transpose()
                .map_err(|e| LlmError::decode("content block start", e))?;

            match block {
                Some(StartBlock::ToolUse { id, name, input }) => Decoded::emit(vec![
                    StreamChunk::ToolCall(ToolCallChunk {
                        index,
                        id: Some(id.clone()),
                        name: Some(name.clone()),
                        args: String::new(),
                    }),
                    StreamChunk::Content(vec![TaggedBlock {
                        index,
                        delta: BlockDelta::ToolUse { id, name, input },
                    }]),
                ]),
                Some(StartBlock::Other) | None => Decoded::default(),
            }
        }
        StreamEvent::ContentBlockDelta { index, delta } => Decoded::emit(block_delta(index, delta, coerce_to_text)?),
        StreamEvent::MessageDelta { delta } => {
            let mut metadata = Map::new();
            metadata.insert("stop_reason".to_owned(), delta.stop_reason.map_or(Value::Null, Value::String));
            metadata.insert(
                "stop_sequence".to_owned(),
                delta.stop_sequence.map_or(Value::Null, Value::String),
            );
            Decoded::emit(vec![StreamChunk::Metadata(metadata)])
        }
        StreamEvent::ContentBlockStop | StreamEvent::Ping => Decoded::default(),
        StreamEvent::MessageStop | StreamEvent::Unrecognized => {
            Decoded::finish(vec![StreamChunk::Usage(metrics.usage())])
        }
    };

    Ok(decoded)
}

fn block_delta(index: u32, delta: Option<Value>, coerce_to_text: bool) -> Result<Vec<StreamChunk>, LlmError> {
    let delta = match delta {
        Some(delta) if !is_empty(&delta) => delta,
        _ => return Ok(vec![StreamChunk::Text(String::new())]),
    };

    let delta: messages::BlockDelta =
        serde_json::from_value(delta).map_err(|e| LlmError::decode("content block delta", e))?;

    let tagged = |delta| StreamChunk::Content(vec![TaggedBlock { index, delta }]);

    let chunks = match delta {
        messages::BlockDelta::TextDelta { text } if coerce_to_text => vec![StreamChunk::Text(text)],
        messages::BlockDelta::TextDelta { text } => vec![tagged(BlockDelta::Text { text })],
        messages::BlockDelta::InputJsonDelta { partial_json } => vec![StreamChunk::ToolCall(ToolCallChunk {
            index,
            id: None,
            name: None,
            args: partial_json,
        })],
        messages::BlockDelta::ThinkingDelta { thinking } => vec![tagged(BlockDelta::Thinking {
            thinking: Some(thinking),
            signature: None,
        })],
        messages::BlockDelta::SignatureDelta { signature } => vec![tagged(BlockDelta::Thinking {
            thinking: None,
            signature: Some(signature),
        })],
        messages::BlockDelta::Other => Vec::new(),
    };
    Ok(chunks)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}
