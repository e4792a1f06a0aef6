//! Reply generation: classify, prompt, call, extract, clean.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::ai::envelope::extract_text;
use crate::ai::errors::{AiError, AiResult};
use crate::ai::format::ResponseFormatter;
use crate::ai::prompt::build_prompt;
use crate::ai::topic::Topic;
use crate::ai::transport::{GeminiTransport, GenerateRequest, Transport};
use crate::chat::message::Message;
use crate::config::{AiConfig, ChatConfig, ConfigError, FailurePolicy};

/// Reply shown when every attempt ran past the response deadline.
pub const TIMEOUT_MESSAGE: &str =
    "The response took too long to arrive. Please try again in a moment.";

/// Largest backoff exponent; keeps the doubling from overflowing.
const MAX_BACKOFF_SHIFT: u32 = 16;

/// Stateless reply generator over an injected [`Transport`].
pub struct ResponseGenerator {
    config: AiConfig,
    transport: Arc<dyn Transport>,
    formatter: ResponseFormatter,
}

impl ResponseGenerator {
    /// Create a generator over `transport`.
    ///
    /// # Errors
    /// Returns an error if the response formatter cannot be built.
    pub fn new(config: AiConfig, transport: Arc<dyn Transport>) -> Result<Self, ConfigError> {
        let formatter = ResponseFormatter::new(config.min_reply_chars)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Ok(Self {
            config,
            transport,
            formatter,
        })
    }

    /// Create a generator talking HTTP to the configured endpoint.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &ChatConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let transport = GeminiTransport::new(&config.ai, &config.generation)
            .map_err(|err| ConfigError::Invalid(err.to_string()))?;
        Self::new(config.ai.clone(), Arc::new(transport))
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &AiConfig {
        &self.config
    }

    /// Whether the generator will answer from canned replies only.
    #[must_use]
    pub fn is_offline(&self) -> bool {
        self.transport.requires_credential() && self.config.credential().is_none()
    }

    /// Generate a reply. Never fails: errors become a descriptive or canned
    /// string according to the failure policy.
    pub async fn generate(&self, user_text: &str, history: &[Message]) -> String {
        let topic = Topic::classify(user_text);
        match self.try_generate(user_text, history).await {
            Ok(reply) => reply,
            Err(err) => self.failure_reply(&err, topic),
        }
    }

    /// Generate a reply, surfacing any failure.
    ///
    /// # Errors
    /// Returns [`AiError::Configuration`] without a network call when no
    /// credential is set, or the last error after all attempts fail.
    pub async fn try_generate(&self, user_text: &str, history: &[Message]) -> AiResult<String> {
        let user_text = user_text.trim();
        let topic = Topic::classify(user_text);

        if self.is_offline() {
            debug!("No credential configured; answering offline");
            return Err(AiError::Configuration);
        }

        let request = GenerateRequest {
            prompt: build_prompt(user_text, topic, history, self.config.max_history),
            user_text: user_text.to_string(),
            topic,
        };

        let raw = self.send_with_retry(&request).await?;
        Ok(self.formatter.finalize(&raw, topic))
    }

    /// The reply used in place of a failed exchange.
    #[must_use]
    pub fn failure_reply(&self, err: &AiError, topic: Topic) -> String {
        if matches!(err, AiError::Configuration) {
            return topic.fallback().to_string();
        }

        error!("AI response error: {err}");
        match (self.config.failure_policy, err) {
            (FailurePolicy::Canned, _) => topic.fallback().to_string(),
            (_, AiError::Timeout(_)) => TIMEOUT_MESSAGE.to_string(),
            (FailurePolicy::Describe | FailurePolicy::Escalate, _) => format!(
                "Error: {err}. Please check your API key configuration or try again."
            ),
        }
    }

    async fn send_with_retry(&self, request: &GenerateRequest) -> AiResult<String> {
        let max_attempts = self.config.max_retries.max(1);
        let mut attempt = 1;

        loop {
            let err = match self.attempt(request).await {
                Ok(text) => {
                    if attempt > 1 {
                        info!("Generation succeeded on attempt {attempt}");
                    }
                    return Ok(text);
                }
                Err(err) => err,
            };

            if !err.is_retryable() || attempt >= max_attempts {
                return Err(err);
            }

            let delay = self.backoff(attempt);
            warn!("Attempt {attempt}/{max_attempts} failed ({err}); retrying in {delay:?}");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }

    async fn attempt(&self, request: &GenerateRequest) -> AiResult<String> {
        let timeout = self.config.response_timeout;
        match tokio::time::timeout(timeout, self.transport.send(request)).await {
            Ok(Ok(body)) => extract_text(&body),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(AiError::Timeout(timeout)),
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
        self.config.retry_delay.saturating_mul(1_u32 << shift)
    }
}
