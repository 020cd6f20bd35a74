//! Conversion between canonical types and provider wire formats
//!
//! Request bodies are built from a [`CanonicalRequest`](crate::types::CanonicalRequest)
//! and complete responses are parsed into a
//! [`CanonicalResponse`](crate::types::CanonicalResponse). Streamed events are
//! handled by [`crate::stream`].

pub mod prompt;
pub mod request;
pub mod response;
pub mod stop;

pub use prompt::{AlternationWarning, FormattedPrompt, format_alternation};
pub use request::{
    build_request_body, insert_stop_sequences, thinking_before_tool_result, thinking_first, thinking_first_in_history,
};
pub use response::{parse_response, parse_response_for};
pub use stop::enforce_stop_tokens;
