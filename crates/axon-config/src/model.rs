use serde::Deserialize;
use serde_json::{Map, Value};

/// Target model and generation defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelConfig {
    /// Bedrock model id or ARN (e.g. `anthropic.claude-v2:1`)
    pub id: String,
    /// Base model id, used over `id` to identify the model family
    #[serde(default)]
    pub base_model_id: Option<String>,
    /// Provider override, required when `id` is an ARN
    #[serde(default)]
    pub provider: Option<String>,
    /// Stream responses instead of waiting for a complete body
    #[serde(default)]
    pub streaming: bool,
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Extra provider-specific request fields, copied into every body
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl ModelConfig {
    /// Move `temperature` and `max_tokens` out of `kwargs` into the typed fields
    ///
    /// Typed fields take precedence; the kwargs entries are removed either way
    /// so they are never sent twice.
    pub fn hoist_kwargs(&mut self) {
        if let Some(temperature) = self.kwargs.remove("temperature")
            && self.temperature.is_none()
        {
            self.temperature = temperature.as_f64();
        }

        if let Some(max_tokens) = self.kwargs.remove("max_tokens")
            && self.max_tokens.is_none()
        {
            self.max_tokens = max_tokens.as_u64().and_then(|n| u32::try_from(n).ok());
        }
    }
}
