use std::path::Path;

use anyhow::Context as _;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, placeholder expansion
    /// fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        Self::from_toml(&raw)
    }

    /// Parse, normalize and validate configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if placeholder expansion, parsing or validation fails
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let expanded = crate::env::expand_env(raw).context("config variable expansion failed")?;

        let mut config: Self = toml::from_str(&expanded).context("failed to parse config")?;

        config.model.hoist_kwargs();
        config.validate()?;

        tracing::debug!(model = %config.model.id, "configuration loaded");

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error on incomplete credentials, a half-configured
    /// guardrail, or a model id that cannot identify its provider
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_model()?;
        self.validate_credentials()?;
        self.validate_guardrails()?;
        Ok(())
    }

    fn validate_model(&self) -> anyhow::Result<()> {
        if self.model.id.trim().is_empty() {
            anyhow::bail!("model.id must not be empty");
        }

        if self.model.id.starts_with("arn") && self.model.provider.is_none() {
            anyhow::bail!("model.provider is required when model.id is an ARN");
        }

        Ok(())
    }

    fn validate_credentials(&self) -> anyhow::Result<()> {
        let aws = &self.aws;

        match (&aws.access_key_id, &aws.secret_access_key) {
            (Some(_), None) | (None, Some(_)) => {
                anyhow::bail!("aws.access_key_id and aws.secret_access_key must be set together");
            }
            (None, None) if aws.session_token.is_some() => {
                anyhow::bail!("aws.session_token requires aws.access_key_id and aws.secret_access_key");
            }
            _ => Ok(()),
        }
    }

    fn validate_guardrails(&self) -> anyhow::Result<()> {
        let guardrails = &self.guardrails;

        if guardrails.identifier.is_some() != guardrails.version.is_some() {
            anyhow::bail!("guardrails.identifier and guardrails.version must be set together");
        }

        if guardrails.trace && !guardrails.is_enabled() {
            tracing::warn!("guardrails.trace is set but no guardrail is configured; tracing disabled");
        }

        Ok(())
    }
}
