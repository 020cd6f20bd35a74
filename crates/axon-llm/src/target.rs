use axon_config::ModelConfig;

use crate::{error::LlmError, provider::Provider};

/// Region prefixes of cross-region inference profile ids
const REGION_PREFIXES: &[&str] = &["eu", "us", "us-gov", "apac", "sa"];

/// Model the invoker talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelTarget {
    /// Model id, inference profile id or ARN
    pub model_id: String,
    /// Underlying base model, required to interpret ARNs
    pub base_model_id: Option<String>,
    /// Explicit provider id, required for ARNs
    pub provider: Option<String>,
}

impl ModelTarget {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
            base_model_id: None,
            provider: None,
        }
    }

    #[must_use]
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    #[must_use]
    pub fn with_base_model(mut self, base_model_id: impl Into<String>) -> Self {
        self.base_model_id = Some(base_model_id.into());
        self
    }

    /// Provider id for this model
    ///
    /// An explicit provider wins. ARNs carry no provider segment, so they
    /// need one. Otherwise the provider is the first dot-separated segment of
    /// the model id, skipping a region prefix such as `us.` or `eu.`.
    pub fn provider_id(&self) -> Result<&str, LlmError> {
        if let Some(provider) = self.provider.as_deref() {
            return Ok(provider);
        }

        if self.model_id.starts_with("arn") {
            return Err(LlmError::Configuration(format!(
                "model id {} is an ARN, set the provider explicitly",
                self.model_id
            )));
        }

        let mut parts = self.model_id.split('.');
        let first = parts.next().unwrap_or_default();
        if REGION_PREFIXES.contains(&first.to_ascii_lowercase().as_str()) {
            return Ok(parts.next().unwrap_or_default());
        }
        Ok(first)
    }

    /// Resolved provider for this model
    pub fn provider(&self) -> Result<Provider, LlmError> {
        Provider::resolve(self.provider_id()?)
    }

    /// Base model name, used for model family checks
    pub fn base_model(&self) -> &str {
        if let Some(base) = self.base_model_id.as_deref() {
            return base;
        }
        self.model_id
            .split_once('.')
            .map_or(self.model_id.as_str(), |(_, rest)| rest)
    }

    /// Whether the base model belongs to the Claude family
    pub fn is_claude(&self) -> bool {
        self.base_model().contains("claude-")
    }
}

impl From<&ModelConfig> for ModelTarget {
    fn from(config: &ModelConfig) -> Self {
        Self {
            model_id: config.id.clone(),
            base_model_id: config.base_model_id.clone(),
            provider: config.provider.clone(),
        }
    }
}
