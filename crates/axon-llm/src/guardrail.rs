//! Guardrail intervention signals

use serde::Serialize;
use serde_json::{Map, Value};

use crate::protocol::bedrock::{GUARDRAIL_ACTION_KEY, GUARDRAIL_INTERVENED, GUARDRAIL_TRACE_KEY};

/// Reason reported when a guardrail intervened
pub const GUARDRAIL_INTERVENED_REASON: &str = "GUARDRAIL_INTERVENED";

/// Outcome of checking a body or stream event for a guardrail intervention
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GuardrailSignal {
    pub intervened: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Guardrail trace, when the service returned one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Value>,
}

impl GuardrailSignal {
    /// Check a response body or stream event map
    pub fn inspect(body: &Map<String, Value>) -> Self {
        if !is_intervention(body) {
            return Self::default();
        }

        Self {
            intervened: true,
            reason: Some(GUARDRAIL_INTERVENED_REASON.to_owned()),
            trace: body.get(GUARDRAIL_TRACE_KEY).cloned(),
        }
    }

    /// Check any JSON value; non-objects never signal an intervention
    pub fn inspect_value(body: &Value) -> Self {
        body.as_object().map(Self::inspect).unwrap_or_default()
    }
}

/// Whether the guardrail action in a body is `INTERVENED`
pub fn is_intervention(body: &Map<String, Value>) -> bool {
    body.get(GUARDRAIL_ACTION_KEY).and_then(Value::as_str) == Some(GUARDRAIL_INTERVENED)
}
