use thiserror::Error;

use crate::transport::TransportError;

/// Errors that can occur while adapting requests and responses
#[derive(Debug, Error)]
pub enum LlmError {
    /// Provider id is not in the registry
    #[error("unknown provider: {provider}")]
    UnknownProvider { provider: String },

    /// Request or decoder cannot be set up for the resolved provider
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The transport call itself failed
    #[error("upstream invocation failed: {0}")]
    Upstream(#[from] TransportError),

    /// Response body or stream event payload is malformed
    #[error("decode error: {0}")]
    Decode(String),

    /// Request body could not be serialized
    #[error("failed to encode request body: {0}")]
    Encode(#[source] serde_json::Error),
}

impl LlmError {
    /// Whether this error was raised before any I/O took place
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::UnknownProvider { .. } | Self::Configuration(_))
    }

    pub(crate) fn decode(context: &str, error: impl std::fmt::Display) -> Self {
        Self::Decode(format!("{context}: {error}"))
    }
}
