use serde::Deserialize;

/// Logging configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetryConfig {
    /// `EnvFilter` directive (e.g. `info,axon_llm=debug`)
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Emit logs as JSON lines instead of human-readable text
    #[serde(default)]
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "info".to_owned()
}
