//! Configuration for the chat core.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Environment variable holding the endpoint credential.
pub const API_KEY_ENV: &str = "LUMEN_API_KEY";
/// Environment variable overriding the public endpoint URL.
pub const API_URL_ENV: &str = "LUMEN_API_URL";

/// Default text-generation endpoint.
pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1/models/gemini-1.5-flash:generateContent";

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range or otherwise unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// The endpoint URL could not be parsed.
    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Endpoint, retry and fallback settings.
    pub ai: AiConfig,
    /// Sampling parameters sent with every request.
    pub generation: GenerationConfig,
    /// Local persistence settings.
    pub storage: StorageConfig,
}

impl ChatConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with `LUMEN_API_KEY` and `LUMEN_API_URL`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env_lookup(|key| std::env::var(key).ok())
    }

    /// Overlay credential and endpoint from an arbitrary lookup.
    #[must_use]
    pub fn with_env_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            self.ai.api_key = Some(key.trim().to_string());
        }
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.ai.endpoint = url.trim().to_string();
        }
        self
    }

    /// Set the endpoint credential.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.ai.api_key = Some(key.into());
        self
    }

    /// Set the endpoint URL.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.ai.endpoint = endpoint.into();
        self
    }

    /// Set the failure policy.
    #[must_use]
    pub const fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.ai.failure_policy = policy;
        self
    }

    /// Set the maximum number of attempts per exchange.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.ai.max_retries = max_retries;
        self
    }

    /// Set the per-attempt response timeout.
    #[must_use]
    pub const fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.ai.response_timeout = timeout;
        self
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    /// Returns an error if any values are out of range or invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ai.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "ai.max_retries must be > 0".to_string(),
            ));
        }

        if self.ai.response_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "ai.response_timeout must be > 0".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(ConfigError::Invalid(
                "generation.temperature must be within 0.0..=2.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.generation.top_p) {
            return Err(ConfigError::Invalid(
                "generation.top_p must be within 0.0..=1.0".to_string(),
            ));
        }

        if self.generation.max_output_tokens == 0 {
            return Err(ConfigError::Invalid(
                "generation.max_output_tokens must be > 0".to_string(),
            ));
        }

        if self.storage.store_name.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "storage.store_name must not be empty".to_string(),
            ));
        }

        Url::parse(&self.ai.endpoint)?;

        Ok(())
    }
}

/// Where the credential is attached on outbound requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialPlacement {
    /// `?key=<credential>` query parameter.
    #[default]
    QueryParam,
    /// `Authorization: Bearer <credential>` header.
    BearerHeader,
}

/// What the generator returns when an exchange fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// A descriptive error string shown to the user.
    #[default]
    Describe,
    /// A canned, topic-appropriate educational reply.
    Canned,
    /// Report the failure to the dispatcher, which posts its apology.
    Escalate,
}

/// Endpoint, retry and fallback settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiConfig {
    /// Text-generation endpoint URL.
    pub endpoint: String,
    /// Endpoint credential. Absent means offline canned mode.
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,
    /// How the credential is attached.
    pub credential_placement: CredentialPlacement,
    /// Behavior on failed exchanges.
    pub failure_policy: FailurePolicy,
    /// Maximum attempts per exchange (1 disables retries).
    pub max_retries: u32,
    /// Base delay between attempts; doubled after each retry.
    #[serde(with = "millis_serde")]
    pub retry_delay: Duration,
    /// Per-attempt deadline.
    #[serde(with = "millis_serde")]
    pub response_timeout: Duration,
    /// Number of prior messages included as context (0 disables history).
    pub max_history: usize,
    /// Cleaned replies shorter than this are replaced by a fallback.
    pub min_reply_chars: usize,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            credential_placement: CredentialPlacement::QueryParam,
            failure_policy: FailurePolicy::Describe,
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            response_timeout: Duration::from_secs(30),
            max_history: 6,
            min_reply_chars: 20,
        }
    }
}

impl AiConfig {
    /// Credential, if one is configured and non-blank.
    #[must_use]
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
    }
}

/// Sampling parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Top-k sampling cutoff.
    pub top_k: u32,
    /// Nucleus-sampling threshold.
    pub top_p: f32,
    /// Max output length in tokens.
    pub max_output_tokens: u32,
    /// Threshold applied to every safety category.
    pub safety_threshold: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_k: 40,
            top_p: 0.95,
            max_output_tokens: 1024,
            safety_threshold: "BLOCK_MEDIUM_AND_ABOVE".to_string(),
        }
    }
}

/// Local persistence settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `SQLite` database path.
    pub sqlite_path: PathBuf,
    /// Name under which the chat blob is stored.
    pub store_name: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            sqlite_path: PathBuf::from("chat.sqlite"),
            store_name: "chat-storage".to_string(),
        }
    }
}

/// Serde module for millisecond `Duration` fields.
mod millis_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
