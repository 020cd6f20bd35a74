//! Static per-provider profiles
//!
//! Every provider reachable through the invoke-model API has its own request
//! schema, response schema and streaming wire format. The differences are
//! captured as data in one immutable [`ProviderProfile`] per provider, so the
//! rest of the crate dispatches on a resolved [`Provider`] rather than on
//! string comparisons.

use std::str::FromStr;

use serde_json::Value;

use crate::error::LlmError;

/// Providers fronted by the invoke-model API
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display, strum::AsRefStr, strum::EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum Provider {
    Anthropic,
    Amazon,
    Ai21,
    Cohere,
    Meta,
    Mistral,
    DeepSeek,
    Writer,
}

impl Provider {
    /// Resolve a provider id
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::UnknownProvider`] for ids outside the registry
    pub fn resolve(id: &str) -> Result<Self, LlmError> {
        Self::from_str(id).map_err(|_| LlmError::UnknownProvider {
            provider: id.to_owned(),
        })
    }

    /// Profile for this provider
    pub const fn profile(self) -> &'static ProviderProfile {
        match self {
            Self::Anthropic => &ANTHROPIC,
            Self::Amazon => &AMAZON,
            Self::Ai21 => &AI21,
            Self::Cohere => &COHERE,
            Self::Meta => &META,
            Self::Mistral => &MISTRAL,
            Self::DeepSeek => &DEEPSEEK,
            Self::Writer => &WRITER,
        }
    }
}

/// Look up the profile for a provider id
///
/// # Errors
///
/// Returns [`LlmError::UnknownProvider`] for ids outside the registry
pub fn profile(id: &str) -> Result<&'static ProviderProfile, LlmError> {
    Provider::resolve(id).map(Provider::profile)
}

/// Immutable description of one provider's wire formats
#[derive(Debug)]
pub struct ProviderProfile {
    pub provider: Provider,
    /// Key carrying generated text in raw stream events
    pub output_field: Option<&'static str>,
    /// Whether `output_field` holds an array whose first element has `text`
    pub output_wrapped: bool,
    /// Request key for stop sequences
    pub stop_sequence_field: Option<&'static str>,
    /// Metadata key carrying the stop reason
    pub stop_reason_field: &'static str,
    /// Whether the provider accepts structured chat messages
    pub messages_protocol: bool,
    /// How a prompt request body is shaped
    pub request: RequestShape,
    /// Where generated text lives in a complete response
    pub response: ResponseShape,
    /// When a raw event stream is finished
    pub termination: Termination,
}

/// Request body layout for prompt input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestShape {
    /// Anthropic-style body: `messages` for chat, `prompt` with Human/Assistant turns otherwise
    Messages,
    /// `prompt` plus a provider-specific max token key, if any
    Flat { max_tokens_field: Option<&'static str> },
    /// `inputText` with a nested `textGenerationConfig`
    TextGeneration,
}

/// Location of generated text in a complete response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `completion`, falling back to the text blocks of `content`
    Messages,
    /// Fixed path into the body
    Path(&'static [Step]),
}

/// One step of a JSON path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Key(&'static str),
    Index(usize),
}

/// Follow a path into a JSON value
pub fn lookup<'a>(value: &'a Value, path: &[Step]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, step| match step {
        Step::Key(key) => current.get(key),
        Step::Index(index) => current.get(index),
    })
}

/// Render a path the way it is written in error messages, e.g. `choices[0].text`
pub fn describe(path: &[Step]) -> String {
    let mut out = String::new();
    for step in path {
        match step {
            Step::Key(key) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(key);
            }
            Step::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
    out
}

/// Stream termination rule for raw (non-messages) event streams
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Stream ends when the transport runs out of events
    Exhausted,
    /// A payload equal to this string ends the stream; nothing is emitted for it
    Sentinel(&'static str),
    /// A truthy flag, or this exact text in the output field, ends the stream
    /// before the event is emitted
    Finished { flag: &'static str, eos_text: &'static str },
    /// Matching stop or finish reasons end the stream after the event's chunks
    /// and a final usage observation
    StopReason {
        scope: ReasonScope,
        stop_reasons: &'static [&'static str],
        finish_reasons: &'static [&'static str],
    },
}

/// Where stop reasons are read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasonScope {
    /// Top level of the event payload
    Root,
    /// First element of the output array
    FirstOutput,
}

impl Termination {
    /// Whether the event ends the stream without emitting anything
    pub fn ends_before(&self, payload: &Value, output_field: &str) -> bool {
        match *self {
            Self::Sentinel(sentinel) => payload.as_str() == Some(sentinel),
            Self::Finished { flag, eos_text } => {
                payload.get(flag).and_then(Value::as_bool).unwrap_or(false)
                    || payload.get(output_field).and_then(Value::as_str) == Some(eos_text)
            }
            Self::Exhausted | Self::StopReason { .. } => false,
        }
    }

    /// Whether the event ends the stream once its chunks are emitted
    pub fn ends_after(&self, payload: &Value, output_field: &str) -> bool {
        let Self::StopReason {
            scope,
            stop_reasons,
            finish_reasons,
        } = *self
        else {
            return false;
        };

        let target = match scope {
            ReasonScope::Root => Some(payload),
            ReasonScope::FirstOutput => payload.get(output_field).and_then(|v| v.get(0)),
        };
        let Some(target) = target else {
            return false;
        };

        let matches = |key: &str, accepted: &[&str]| {
            target
                .get(key)
                .and_then(Value::as_str)
                .is_some_and(|reason| accepted.contains(&reason))
        };
        matches("stop_reason", stop_reasons) || matches("finish_reason", finish_reasons)
    }
}

static ANTHROPIC: ProviderProfile = ProviderProfile {
    provider: Provider::Anthropic,
    output_field: Some("completion"),
    output_wrapped: false,
    stop_sequence_field: Some("stop_sequences"),
    stop_reason_field: "stop_reason",
    messages_protocol: true,
    request: RequestShape::Messages,
    response: ResponseShape::Messages,
    termination: Termination::Exhausted,
};

static AMAZON: ProviderProfile = ProviderProfile {
    provider: Provider::Amazon,
    output_field: Some("outputText"),
    output_wrapped: false,
    stop_sequence_field: Some("stopSequences"),
    stop_reason_field: "completionReason",
    messages_protocol: false,
    request: RequestShape::TextGeneration,
    response: ResponseShape::Path(&[Step::Key("results"), Step::Index(0), Step::Key("outputText")]),
    termination: Termination::Exhausted,
};

// ai21 has no documented streaming output key and no max token mapping
static AI21: ProviderProfile = ProviderProfile {
    provider: Provider::Ai21,
    output_field: None,
    output_wrapped: false,
    stop_sequence_field: Some("stop_sequences"),
    stop_reason_field: "finishReason",
    messages_protocol: false,
    request: RequestShape::Flat { max_tokens_field: None },
    response: ResponseShape::Path(&[
        Step::Key("completions"),
        Step::Index(0),
        Step::Key("data"),
        Step::Key("text"),
    ]),
    termination: Termination::Exhausted,
};

static COHERE: ProviderProfile = ProviderProfile {
    provider: Provider::Cohere,
    output_field: Some("text"),
    output_wrapped: false,
    stop_sequence_field: Some("stop_sequences"),
    stop_reason_field: "finish_reason",
    messages_protocol: false,
    request: RequestShape::Flat {
        max_tokens_field: Some("max_tokens"),
    },
    response: ResponseShape::Path(&[Step::Key("generations"), Step::Index(0), Step::Key("text")]),
    termination: Termination::Finished {
        flag: "is_finished",
        eos_text: "<EOS_TOKEN>",
    },
};

static META: ProviderProfile = ProviderProfile {
    provider: Provider::Meta,
    output_field: Some("generation"),
    output_wrapped: false,
    stop_sequence_field: None,
    stop_reason_field: "stop_reason",
    messages_protocol: false,
    request: RequestShape::Flat {
        max_tokens_field: Some("max_gen_len"),
    },
    response: ResponseShape::Path(&[Step::Key("generation")]),
    termination: Termination::StopReason {
        scope: ReasonScope::Root,
        stop_reasons: &["stop"],
        finish_reasons: &[],
    },
};

static MISTRAL: ProviderProfile = ProviderProfile {
    provider: Provider::Mistral,
    output_field: Some("outputs"),
    output_wrapped: true,
    stop_sequence_field: Some("stop_sequences"),
    stop_reason_field: "stop_reason",
    messages_protocol: false,
    request: RequestShape::Flat {
        max_tokens_field: Some("max_tokens"),
    },
    response: ResponseShape::Path(&[Step::Key("outputs"), Step::Index(0), Step::Key("text")]),
    termination: Termination::StopReason {
        scope: ReasonScope::FirstOutput,
        stop_reasons: &["stop"],
        finish_reasons: &[],
    },
};

static DEEPSEEK: ProviderProfile = ProviderProfile {
    provider: Provider::DeepSeek,
    output_field: Some("choices"),
    output_wrapped: true,
    stop_sequence_field: None,
    stop_reason_field: "stop_reason",
    messages_protocol: false,
    request: RequestShape::Flat {
        max_tokens_field: Some("max_tokens"),
    },
    response: ResponseShape::Path(&[Step::Key("choices"), Step::Index(0), Step::Key("text")]),
    termination: Termination::StopReason {
        scope: ReasonScope::FirstOutput,
        stop_reasons: &["stop", "length"],
        finish_reasons: &["eos_token"],
    },
};

static WRITER: ProviderProfile = ProviderProfile {
    provider: Provider::Writer,
    output_field: Some("choices"),
    output_wrapped: true,
    stop_sequence_field: None,
    stop_reason_field: "stop_reason",
    messages_protocol: false,
    request: RequestShape::Flat {
        max_tokens_field: Some("max_tokens"),
    },
    response: ResponseShape::Path(&[Step::Key("choices"), Step::Index(0), Step::Key("text")]),
    termination: Termination::Sentinel("[DONE]"),
};
