use serde::Deserialize;

/// Bedrock guardrail settings attached to every invocation
///
/// Guardrails are only applied when both `identifier` and `version` are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GuardrailsConfig {
    /// Guardrail identifier
    #[serde(default)]
    pub identifier: Option<String>,
    /// Guardrail version
    #[serde(default)]
    pub version: Option<String>,
    /// Request a guardrail trace and report interventions
    #[serde(default)]
    pub trace: bool,
}

impl GuardrailsConfig {
    /// Identifier and version, when both are present and non-empty
    pub fn target(&self) -> Option<(&str, &str)> {
        let identifier = self.identifier.as_deref().filter(|s| !s.is_empty())?;
        let version = self.version.as_deref().filter(|s| !s.is_empty())?;
        Some((identifier, version))
    }

    /// Whether guardrails are applied to invocations
    pub fn is_enabled(&self) -> bool {
        self.target().is_some()
    }

    /// Whether interventions should be traced and reported
    pub fn trace_enabled(&self) -> bool {
        self.is_enabled() && self.trace
    }
}
