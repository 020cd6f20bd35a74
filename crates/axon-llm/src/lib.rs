//! Bedrock invoke-model adapter for Axon
//!
//! Turns canonical generation requests into the request body each Bedrock
//! model family expects, and turns complete responses and live event streams
//! back into canonical responses, chunks and usage.

#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

pub mod accumulate;
pub mod convert;
pub mod error;
pub mod guardrail;
pub mod invoke;
pub mod protocol;
pub mod provider;
pub mod stream;
pub mod target;
pub mod transport;
pub mod types;
pub mod usage;

pub use accumulate::ToolCallAccumulator;
pub use error::LlmError;
pub use guardrail::GuardrailSignal;
pub use invoke::{GenerationCall, InvocationObserver, Invoker, PreparedInvocation};
pub use provider::{Provider, ProviderProfile};
pub use stream::{ChunkStream, DecodeOptions, DecoderState, StreamDecoder, WireFormat};
pub use target::ModelTarget;
pub use transport::{AsyncTransport, Transport, TransportError};
pub use types::{CanonicalRequest, CanonicalResponse, GenerationInput, Message, StreamChunk, Usage};
pub use usage::{CombinedUsage, UsageAggregator, combine};
