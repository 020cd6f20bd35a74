//! Fields and headers the invoke-model service adds around provider payloads

use serde::Deserialize;
use serde_json::Value;

use crate::types::Usage;

pub const INPUT_TOKEN_COUNT_HEADER: &str = "x-amzn-bedrock-input-token-count";
pub const OUTPUT_TOKEN_COUNT_HEADER: &str = "x-amzn-bedrock-output-token-count";
pub const CACHE_READ_TOKEN_COUNT_HEADER: &str = "x-amzn-bedrock-cache-read-input-token-count";
pub const CACHE_WRITE_TOKEN_COUNT_HEADER: &str = "x-amzn-bedrock-cache-write-input-token-count";

/// Key of the invocation metrics object attached to the final stream event
pub const INVOCATION_METRICS_KEY: &str = "amazon-bedrock-invocationMetrics";

/// Key of the guardrail action in response bodies and stream events
pub const GUARDRAIL_ACTION_KEY: &str = "amazon-bedrock-guardrailAction";

/// Key of the guardrail trace in response bodies and stream events
pub const GUARDRAIL_TRACE_KEY: &str = "amazon-bedrock-trace";

/// Guardrail action value reported when content was blocked or rewritten
pub const GUARDRAIL_INTERVENED: &str = "INTERVENED";

/// Token counts reported by the service at the end of a stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvocationMetrics {
    #[serde(default)]
    pub input_token_count: u64,
    #[serde(default)]
    pub output_token_count: u64,
    #[serde(default)]
    pub cache_read_input_token_count: u64,
    #[serde(default)]
    pub cache_write_input_token_count: u64,
    /// End-to-end latency in milliseconds
    #[serde(default)]
    pub invocation_latency: Option<u64>,
    /// Time to first byte in milliseconds
    #[serde(default)]
    pub first_byte_latency: Option<u64>,
}

impl InvocationMetrics {
    /// Metrics embedded in an event payload, zeros when absent or malformed
    pub fn from_payload(payload: &Value) -> Self {
        payload
            .get(INVOCATION_METRICS_KEY)
            .and_then(|metrics| Self::deserialize(metrics).ok())
            .unwrap_or_default()
    }

    /// Usage observation for these metrics
    pub const fn usage(&self) -> Usage {
        Usage {
            prompt_tokens: self.input_token_count,
            completion_tokens: self.output_token_count,
            cache_read_tokens: self.cache_read_input_token_count,
            cache_write_tokens: self.cache_write_input_token_count,
            total_tokens: self.input_token_count.saturating_add(self.output_token_count),
        }
    }
}
