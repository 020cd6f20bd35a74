use serde_json::{Map, Value};

use super::{message::Message, tool::ToolSpec};
use crate::{error::LlmError, provider::Provider};

/// Generation parameters shared by every provider
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelParams {
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Maximum tokens to generate, mapped to the provider's own key
    pub max_tokens: Option<u32>,
    /// Provider-specific fields copied verbatim into the request body
    pub extra: Map<String, Value>,
}

impl ModelParams {
    pub const fn new(temperature: Option<f64>, max_tokens: Option<u32>, extra: Map<String, Value>) -> Self {
        Self {
            temperature,
            max_tokens,
            extra,
        }
    }

    /// Merge per-call fields over these defaults
    #[must_use]
    pub fn merged(&self, overrides: &Map<String, Value>) -> Self {
        let mut params = self.clone();
        for (key, value) in overrides {
            params.extra.insert(key.clone(), value.clone());
        }
        params
    }

    /// Whether extended thinking is switched on (`thinking.type == "enabled"`)
    pub fn thinking_enabled(&self) -> bool {
        self.extra
            .get("thinking")
            .and_then(|thinking| thinking.get("type"))
            .and_then(Value::as_str)
            == Some("enabled")
    }

    /// Whether tools were passed through the extra fields, directly or via `extra_body`
    pub fn tools_requested(&self) -> bool {
        self.extra.contains_key("tools")
            || self
                .extra
                .get("extra_body")
                .and_then(Value::as_object)
                .is_some_and(|body| body.contains_key("tools"))
    }
}

/// Generation input: a raw prompt or a conversation, never both
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationInput {
    /// Single prompt string
    Prompt(String),
    /// Structured conversation
    Messages(Vec<Message>),
}

/// Provider-agnostic generation request
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalRequest {
    /// Target provider
    pub provider: Provider,
    /// Generation parameters
    pub params: ModelParams,
    /// Prompt or conversation
    pub input: GenerationInput,
    /// System prompt, messages protocol only
    pub system: Option<String>,
    /// Tool definitions, messages protocol only
    pub tools: Option<Vec<ToolSpec>>,
}

impl CanonicalRequest {
    /// Create a request for a provider id
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::UnknownProvider`] for ids outside the registry
    pub fn new(provider: &str, input: GenerationInput) -> Result<Self, LlmError> {
        Ok(Self::for_provider(Provider::resolve(provider)?, input))
    }

    pub fn for_provider(provider: Provider, input: GenerationInput) -> Self {
        Self {
            provider,
            params: ModelParams::default(),
            input,
            system: None,
            tools: None,
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    #[must_use]
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolSpec>) -> Self {
        self.tools = Some(tools);
        self
    }
}
