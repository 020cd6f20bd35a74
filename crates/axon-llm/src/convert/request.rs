//! Provider-shaped request bodies

use serde_json::{Map, Value};

use super::prompt::format_alternation;
use crate::{
    error::LlmError,
    protocol::messages::ANTHROPIC_VERSION,
    provider::RequestShape,
    types::{CanonicalRequest, ContentBlock, GenerationInput, Message, MessageContent, Role},
};

/// Max tokens used when neither the caller nor the extra fields set one
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

/// Build the JSON request body for a canonical request
///
/// The body starts as a copy of the extra fields, then the provider's own
/// keys are layered on top.
///
/// # Errors
///
/// Returns [`LlmError::Configuration`] when chat messages are sent to a
/// provider without the messages protocol
pub fn build_request_body(request: &CanonicalRequest) -> Result<Value, LlmError> {
    let profile = request.provider.profile();
    let params = &request.params;

    let body = match (profile.request, &request.input) {
        (RequestShape::Messages, GenerationInput::Messages(messages)) => messages_body(request, messages)?,
        (RequestShape::Messages, GenerationInput::Prompt(prompt)) => {
            let mut body = params.extra.clone();
            body.insert(
                "prompt".to_owned(),
                Value::String(format_alternation(prompt).text),
            );
            insert_max_tokens(&mut body, "max_tokens_to_sample", params.max_tokens);
            insert_temperature(&mut body, params.temperature);
            body
        }
        (RequestShape::Flat { max_tokens_field }, GenerationInput::Prompt(prompt)) => {
            let mut body = params.extra.clone();
            body.insert("prompt".to_owned(), Value::String(prompt.clone()));
            if let Some(max_tokens) = params.max_tokens.filter(|n| *n > 0) {
                match max_tokens_field {
                    Some(field) => {
                        body.insert(field.to_owned(), Value::from(max_tokens));
                    }
                    None => tracing::debug!(
                        provider = %request.provider,
                        max_tokens,
                        "provider has no max token field, dropping max_tokens"
                    ),
                }
            }
            insert_temperature(&mut body, params.temperature);
            body
        }
        (RequestShape::TextGeneration, GenerationInput::Prompt(prompt)) => {
            let mut config = params.extra.clone();
            if let Some(max_tokens) = params.max_tokens.filter(|n| *n > 0) {
                config.insert("maxTokenCount".to_owned(), Value::from(max_tokens));
            }
            insert_temperature(&mut config, params.temperature);

            let mut body = Map::new();
            body.insert("inputText".to_owned(), Value::String(prompt.clone()));
            body.insert("textGenerationConfig".to_owned(), Value::Object(config));
            body
        }
        (RequestShape::Flat { .. } | RequestShape::TextGeneration, GenerationInput::Messages(_)) => {
            return Err(LlmError::Configuration(format!(
                "provider {} does not accept chat messages, send a prompt instead",
                request.provider
            )));
        }
    };

    Ok(Value::Object(body))
}

fn messages_body(request: &CanonicalRequest, messages: &[Message]) -> Result<Map<String, Value>, LlmError> {
    let params = &request.params;
    let mut body = params.extra.clone();

    if let Some(tools) = request.tools.as_ref().filter(|tools| !tools.is_empty()) {
        body.insert(
            "tools".to_owned(),
            serde_json::to_value(tools).map_err(LlmError::Encode)?,
        );
    }
    body.insert(
        "anthropic_version".to_owned(),
        Value::String(ANTHROPIC_VERSION.to_owned()),
    );

    let messages = if params.thinking_enabled() {
        thinking_before_tool_result(messages)
    } else {
        messages.to_vec()
    };
    body.insert(
        "messages".to_owned(),
        serde_json::to_value(&messages).map_err(LlmError::Encode)?,
    );

    if let Some(system) = request.system.as_deref().filter(|s| !s.is_empty()) {
        body.insert("system".to_owned(), Value::String(system.to_owned()));
    }
    insert_max_tokens(&mut body, "max_tokens", params.max_tokens);
    insert_temperature(&mut body, params.temperature);

    Ok(body)
}

/// Explicit value, else whatever the extra fields carry, else the default
fn insert_max_tokens(body: &mut Map<String, Value>, field: &str, max_tokens: Option<u32>) {
    if let Some(max_tokens) = max_tokens.filter(|n| *n > 0) {
        body.insert(field.to_owned(), Value::from(max_tokens));
    } else if !body.contains_key(field) {
        body.insert(field.to_owned(), Value::from(DEFAULT_MAX_TOKENS));
    }
}

fn insert_temperature(body: &mut Map<String, Value>, temperature: Option<f64>) {
    if let Some(temperature) = temperature {
        body.insert("temperature".to_owned(), Value::from(temperature));
    }
}

/// Move thinking blocks to the front of the assistant turn answered by a tool result
///
/// Applies when the conversation ends with a user turn carrying a
/// `tool_result` block directly after an assistant turn. Returns a new list;
/// the input is left untouched.
pub fn thinking_before_tool_result(messages: &[Message]) -> Vec<Message> {
    let mut messages = messages.to_vec();

    if let [.., assistant, user] = messages.as_mut_slice()
        && assistant.role == Role::Assistant
        && user.role == Role::User
        && user.has_tool_result()
        && let MessageContent::Blocks(blocks) = &mut assistant.content
        && let Some(reordered) = thinking_first(blocks)
    {
        *blocks = reordered;
    }

    messages
}

/// Reorder blocks so thinking and redacted thinking come first
///
/// Returns `None` when the blocks already start with thinking or carry none.
/// Relative order within each group is preserved.
pub fn thinking_first(blocks: &[ContentBlock]) -> Option<Vec<ContentBlock>> {
    let starts_with_thinking = blocks.first().is_some_and(ContentBlock::is_thinking);
    if starts_with_thinking || !blocks.iter().any(ContentBlock::is_thinking) {
        return None;
    }

    let (thinking, rest): (Vec<_>, Vec<_>) = blocks.iter().cloned().partition(ContentBlock::is_thinking);
    Some(thinking.into_iter().chain(rest).collect())
}

/// Apply [`thinking_first`] to every assistant turn after the first message
pub fn thinking_first_in_history(messages: &[Message]) -> Vec<Message> {
    messages
        .iter()
        .enumerate()
        .map(|(position, message)| {
            if position > 0
                && message.role == Role::Assistant
                && let MessageContent::Blocks(blocks) = &message.content
                && let Some(reordered) = thinking_first(blocks)
            {
                return Message::with_blocks(Role::Assistant, reordered);
            }
            message.clone()
        })
        .collect()
}

/// Add stop sequences to the extra fields of a streaming request
///
/// # Errors
///
/// Returns [`LlmError::Configuration`] when stop sequences are given for a
/// provider that does not support them
pub fn insert_stop_sequences(request: &mut CanonicalRequest, stop: &[String]) -> Result<(), LlmError> {
    if stop.is_empty() {
        return Ok(());
    }

    let field = request.provider.profile().stop_sequence_field.ok_or_else(|| {
        LlmError::Configuration(format!(
            "stop sequences are not supported by provider {}",
            request.provider
        ))
    })?;

    request.params.extra.insert(
        field.to_owned(),
        Value::Array(stop.iter().cloned().map(Value::String).collect()),
    );
    Ok(())
}
