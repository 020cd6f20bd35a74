//! Configuration for the axon Bedrock adapter
//!
//! Loaded from TOML with `{{ env.VAR }}` placeholder expansion.

#![allow(clippy::must_use_candidate)]

pub mod aws;
mod env;
pub mod guardrails;
mod loader;
pub mod model;
pub mod telemetry;

use serde::Deserialize;

pub use aws::AwsConfig;
pub use env::ExpandError;
pub use guardrails::GuardrailsConfig;
pub use model::ModelConfig;
pub use telemetry::TelemetryConfig;

/// Top-level axon configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Target model
    pub model: ModelConfig,
    /// AWS client settings
    #[serde(default)]
    pub aws: AwsConfig,
    /// Guardrail settings
    #[serde(default)]
    pub guardrails: GuardrailsConfig,
    /// Logging settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}
