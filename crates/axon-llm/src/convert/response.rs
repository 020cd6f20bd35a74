//! Complete response parsing

use http::HeaderMap;
use serde_json::Value;

use crate::{
    error::LlmError,
    protocol::{
        bedrock::{
            CACHE_READ_TOKEN_COUNT_HEADER, CACHE_WRITE_TOKEN_COUNT_HEADER, INPUT_TOKEN_COUNT_HEADER,
            OUTPUT_TOKEN_COUNT_HEADER,
        },
        messages::ResponseBlock,
    },
    provider::{Provider, ResponseShape, describe, lookup},
    types::{CanonicalResponse, Thinking, ToolCall, Usage},
};

/// Parse a complete response body for a provider id
///
/// # Errors
///
/// Returns [`LlmError::UnknownProvider`] before looking at the body when the
/// id is not in the registry, otherwise see [`parse_response`]
pub fn parse_response_for(provider: &str, body: &[u8], headers: &HeaderMap) -> Result<CanonicalResponse, LlmError> {
    parse_response(Provider::resolve(provider)?, body, headers)
}

/// Parse a complete response body and its transport headers
///
/// # Errors
///
/// Returns [`LlmError::Decode`] when the body is not JSON, the provider's
/// text field is missing, or a token count header is not an integer
pub fn parse_response(provider: Provider, body: &[u8], headers: &HeaderMap) -> Result<CanonicalResponse, LlmError> {
    let raw_body: Value = serde_json::from_slice(body).map_err(|e| LlmError::decode("response body", e))?;

    let mut response = match provider.profile().response {
        ResponseShape::Messages => parse_messages(&raw_body)?,
        ResponseShape::Path(path) => {
            let text = lookup(&raw_body, path).and_then(Value::as_str).ok_or_else(|| {
                LlmError::Decode(format!(
                    "{provider} response is missing text at {}",
                    describe(path)
                ))
            })?;
            Parsed {
                text: text.to_owned(),
                ..Parsed::default()
            }
        }
    };

    let usage = usage_from_headers(headers)?;
    let stop_reason = raw_body.get("stop_reason").and_then(Value::as_str).map(str::to_owned);

    tracing::debug!(
        provider = %provider,
        prompt_tokens = usage.prompt_tokens,
        completion_tokens = usage.completion_tokens,
        tool_calls = response.tool_calls.len(),
        "parsed response"
    );

    Ok(CanonicalResponse {
        text: std::mem::take(&mut response.text),
        thinking: response.thinking,
        tool_calls: response.tool_calls,
        raw_body,
        usage,
        stop_reason,
    })
}

#[derive(Default)]
struct Parsed {
    text: String,
    thinking: Option<Thinking>,
    tool_calls: Vec<ToolCall>,
}

/// Legacy `completion` text, or the text, thinking and tool use blocks of `content`
fn parse_messages(body: &Value) -> Result<Parsed, LlmError> {
    if let Some(completion) = body.get("completion") {
        let text = completion
            .as_str()
            .ok_or_else(|| LlmError::Decode("completion is not a string".to_owned()))?;
        return Ok(Parsed {
            text: text.to_owned(),
            ..Parsed::default()
        });
    }

    let content = body
        .get("content")
        .ok_or_else(|| LlmError::Decode("anthropic response has neither completion nor content".to_owned()))?;
    let blocks: Vec<ResponseBlock> =
        serde_json::from_value(content.clone()).map_err(|e| LlmError::decode("response content", e))?;

    let mut parsed = Parsed::default();
    for block in blocks {
        match block {
            ResponseBlock::Text { text } => parsed.text.push_str(&text),
            ResponseBlock::Thinking { thinking, signature } => {
                if parsed.thinking.is_none() {
                    parsed.thinking = Some(Thinking {
                        text: thinking,
                        signature,
                    });
                }
            }
            ResponseBlock::ToolUse { id, name, input } => parsed.tool_calls.push(ToolCall { id, name, args: input }),
            ResponseBlock::Other => {}
        }
    }
    Ok(parsed)
}

/// Token counts from the service headers; total counts cache reads as prompt tokens
fn usage_from_headers(headers: &HeaderMap) -> Result<Usage, LlmError> {
    let prompt_tokens = header_count(headers, INPUT_TOKEN_COUNT_HEADER)?;
    let completion_tokens = header_count(headers, OUTPUT_TOKEN_COUNT_HEADER)?;
    let cache_read_tokens = header_count(headers, CACHE_READ_TOKEN_COUNT_HEADER)?;
    let cache_write_tokens = header_count(headers, CACHE_WRITE_TOKEN_COUNT_HEADER)?;

    Ok(Usage {
        prompt_tokens,
        completion_tokens,
        cache_read_tokens,
        cache_write_tokens,
        total_tokens: prompt_tokens.saturating_add(cache_read_tokens).saturating_add(completion_tokens),
    })
}

fn header_count(headers: &HeaderMap, name: &str) -> Result<u64, LlmError> {
    let Some(value) = headers.get(name) else {
        return Ok(0);
    };
    value
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .ok_or_else(|| LlmError::Decode(format!("header {name} is not a token count: {value:?}")))
}
