//! Transport boundary to the invoke-model service
//!
//! The adapter core never performs I/O itself. A [`Transport`] (blocking) or
//! [`AsyncTransport`] sends the request body and hands back either the
//! complete response with its headers or an ordered sequence of event
//! envelopes.

pub mod bedrock;
mod offload;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;
use http::HeaderMap;
use thiserror::Error;

pub use bedrock::BedrockRuntimeTransport;
pub use offload::Offload;

/// Failure of the transport call itself
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request was rejected or could not be sent
    #[error("request failed: {0}")]
    Request(String),

    /// Event stream broke after it was opened
    #[error("event stream failed: {0}")]
    Stream(String),

    /// Background task running a blocking transport failed
    #[error("background task failed: {0}")]
    Join(String),
}

/// Guardrail applied by the service to one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardrailTarget {
    pub identifier: String,
    pub version: String,
    /// Ask the service for a guardrail trace
    pub trace: bool,
}

/// One invoke-model call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeRequest {
    pub model_id: String,
    /// Serialized JSON request body
    pub body: Vec<u8>,
    pub accept: String,
    pub content_type: String,
    pub guardrail: Option<GuardrailTarget>,
}

impl InvokeRequest {
    /// JSON request with JSON response
    pub fn json(model_id: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            model_id: model_id.into(),
            body,
            accept: "application/json".to_owned(),
            content_type: "application/json".to_owned(),
            guardrail: None,
        }
    }
}

/// Complete response of a non-streaming call
#[derive(Debug, Clone, Default)]
pub struct InvokeOutput {
    pub body: Vec<u8>,
    /// HTTP response headers, carrying the token counts
    pub headers: HeaderMap,
}

/// Event of a streaming call; events without payload carry nothing to decode
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventEnvelope {
    pub payload: Option<Vec<u8>>,
}

impl EventEnvelope {
    pub const fn chunk(payload: Vec<u8>) -> Self {
        Self { payload: Some(payload) }
    }

    pub const fn empty() -> Self {
        Self { payload: None }
    }
}

/// Events pulled one at a time from a blocking transport
pub type BlockingEvents = Box<dyn Iterator<Item = Result<EventEnvelope, TransportError>> + Send>;

/// Events produced by an async transport
pub type EventStream = Pin<Box<dyn Stream<Item = Result<EventEnvelope, TransportError>> + Send>>;

/// Blocking transport
pub trait Transport: Send + Sync {
    /// Send one request and wait for the complete response
    fn invoke_model(&self, request: &InvokeRequest) -> Result<InvokeOutput, TransportError>;

    /// Open a response stream
    fn invoke_model_stream(&self, request: &InvokeRequest) -> Result<BlockingEvents, TransportError>;
}

/// Async transport
#[async_trait]
pub trait AsyncTransport: Send + Sync {
    /// Send one request and wait for the complete response
    async fn invoke_model(&self, request: &InvokeRequest) -> Result<InvokeOutput, TransportError>;

    /// Open a response stream
    async fn invoke_model_stream(&self, request: &InvokeRequest) -> Result<EventStream, TransportError>;
}
