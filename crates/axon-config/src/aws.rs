use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// AWS client settings for the Bedrock runtime
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AwsConfig {
    /// AWS region; falls back to the default provider chain when absent
    #[serde(default)]
    pub region: Option<String>,
    /// Named profile from the shared AWS config files
    #[serde(default)]
    pub profile: Option<String>,
    /// Access key ID (optional, uses default credential chain if absent)
    #[serde(default)]
    pub access_key_id: Option<SecretString>,
    /// Secret access key
    #[serde(default)]
    pub secret_access_key: Option<SecretString>,
    /// Session token for temporary credentials
    #[serde(default)]
    pub session_token: Option<SecretString>,
    /// Endpoint override (e.g. a VPC endpoint)
    #[serde(default)]
    pub endpoint_url: Option<Url>,
}
