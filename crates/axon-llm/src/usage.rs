//! Folding per-chunk metadata into one usage and stop reason record

use serde_json::Value;

use crate::{
    protocol::bedrock::INVOCATION_METRICS_KEY,
    types::{Metadata, StreamChunk, Usage},
};

/// Usage and stop reason combined over a whole stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedUsage {
    pub usage: Usage,
    pub stop_reason: Option<String>,
}

/// Combine chunk metadata maps
///
/// Array-valued counts under `usage` are summed element by element and scalar
/// invocation metrics are added directly. The last non-empty value under
/// `stop_reason_field` wins. Total is prompt plus completion tokens.
pub fn combine<'a>(metadata: impl IntoIterator<Item = &'a Metadata>, stop_reason_field: &str) -> CombinedUsage {
    let mut aggregator = UsageAggregator::new(stop_reason_field);
    for map in metadata {
        aggregator.observe_metadata(map);
    }
    aggregator.finish()
}

/// Incremental usage fold over stream chunks
///
/// Metadata maps are combined as in [`combine`]. Usage chunks are summed
/// separately and only used for token counts when no metadata map carried
/// any, so counts seen through both are not added twice.
#[derive(Debug, Clone)]
pub struct UsageAggregator {
    stop_reason_field: String,
    from_metadata: Usage,
    metadata_counted: bool,
    from_chunks: Usage,
    stop_reason: Option<String>,
}

impl UsageAggregator {
    pub fn new(stop_reason_field: impl Into<String>) -> Self {
        Self {
            stop_reason_field: stop_reason_field.into(),
            from_metadata: Usage::default(),
            metadata_counted: false,
            from_chunks: Usage::default(),
            stop_reason: None,
        }
    }

    pub fn observe(&mut self, chunk: &StreamChunk) {
        match chunk {
            StreamChunk::Metadata(map) => self.observe_metadata(map),
            StreamChunk::Usage(usage) => self.from_chunks += *usage,
            StreamChunk::Text(_) | StreamChunk::Content(_) | StreamChunk::ToolCall(_) => {}
        }
    }

    pub fn observe_metadata(&mut self, map: &Metadata) {
        if let Some(usage) = map.get("usage").and_then(Value::as_object) {
            let prompt = usage.get("input_tokens").map(sum_counts);
            let completion = usage.get("output_tokens").map(sum_counts);
            if prompt.is_some() || completion.is_some() {
                self.metadata_counted = true;
            }
            self.from_metadata += Usage {
                prompt_tokens: prompt.unwrap_or(0),
                completion_tokens: completion.unwrap_or(0),
                ..Usage::default()
            };
        }

        if let Some(metrics) = map.get(INVOCATION_METRICS_KEY).and_then(Value::as_object) {
            let count = |key: &str| metrics.get(key).and_then(Value::as_u64);
            let prompt = count("inputTokenCount");
            let completion = count("outputTokenCount");
            if prompt.is_some() || completion.is_some() {
                self.metadata_counted = true;
            }
            self.from_metadata += Usage {
                prompt_tokens: prompt.unwrap_or(0),
                completion_tokens: completion.unwrap_or(0),
                cache_read_tokens: count("cacheReadInputTokenCount").unwrap_or(0),
                cache_write_tokens: count("cacheWriteInputTokenCount").unwrap_or(0),
                total_tokens: 0,
            };
        }

        if let Some(reason) = map.get(&self.stop_reason_field).and_then(stop_reason_text) {
            self.stop_reason = Some(reason);
        }
    }

    pub fn finish(self) -> CombinedUsage {
        let mut usage = if self.metadata_counted {
            self.from_metadata
        } else {
            self.from_chunks
        };
        usage.total_tokens = usage.prompt_tokens.saturating_add(usage.completion_tokens);

        CombinedUsage {
            usage,
            stop_reason: self.stop_reason,
        }
    }
}

/// Sum of an array of counts, or the count itself
fn sum_counts(value: &Value) -> u64 {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_u64)
            .fold(0, u64::saturating_add),
        other => other.as_u64().unwrap_or(0),
    }
}

fn stop_reason_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
