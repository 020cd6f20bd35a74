//! Test configurations built from TOML snippets

use axon_config::Config;

/// Builder for test configurations
pub struct ConfigBuilder {
    model: String,
    model_extra: Vec<String>,
    guardrails: Option<String>,
}

impl ConfigBuilder {
    pub fn new(model_id: &str) -> Self {
        Self {
            model: model_id.to_owned(),
            model_extra: Vec::new(),
            guardrails: None,
        }
    }

    /// Add a raw `key = value` line to the `[model]` table
    pub fn with_model_line(mut self, line: &str) -> Self {
        self.model_extra.push(line.to_owned());
        self
    }

    pub fn with_guardrail(mut self, identifier: &str, version: &str, trace: bool) -> Self {
        self.guardrails = Some(format!(
            "[guardrails]\nidentifier = \"{identifier}\"\nversion = \"{version}\"\ntrace = {trace}\n"
        ));
        self
    }

    pub fn toml(&self) -> String {
        let mut raw = format!("[model]\nid = \"{}\"\n", self.model);
        for line in &self.model_extra {
            raw.push_str(line);
            raw.push('\n');
        }
        if let Some(guardrails) = &self.guardrails {
            raw.push('\n');
            raw.push_str(guardrails);
        }
        raw
    }

    pub fn build(&self) -> Config {
        Config::from_toml(&self.toml()).unwrap()
    }
}
