//! Transport to the remote text-generation endpoint.
//!
//! The generator talks to the endpoint only through [`Transport`], so tests
//! and the simulated mode can substitute their own implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::ai::envelope::error_message;
use crate::ai::errors::{AiError, AiResult};
use crate::ai::topic::Topic;
use crate::config::{AiConfig, CredentialPlacement, GenerationConfig};

/// Connection timeout for the HTTP client.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Safety categories sent with every request.
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Boxed future type for transport operations.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// One outbound generation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Full prompt including topic prefix and history.
    pub prompt: String,
    /// The trimmed user text the prompt was built from.
    pub user_text: String,
    /// Topic the user text was classified as.
    pub topic: Topic,
}

/// Sends a prompt and returns the raw response envelope.
pub trait Transport: Send + Sync {
    /// Perform one request.
    ///
    /// # Errors
    /// Returns an error on network failure or non-success status.
    fn send<'a>(&'a self, request: &'a GenerateRequest) -> TransportFuture<'a, AiResult<Value>>;

    /// Whether requests need a configured credential.
    fn requires_credential(&self) -> bool {
        true
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: [GeminiContent<'a>; 1],
    generation_config: GeminiGenerationConfig,
    safety_settings: Vec<SafetySetting<'a>>,
}

#[derive(Serialize)]
struct GeminiContent<'a> {
    parts: [GeminiPart<'a>; 1],
}

#[derive(Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting<'a> {
    category: &'a str,
    threshold: &'a str,
}

/// HTTP transport for `generateContent`-style endpoints.
pub struct GeminiTransport {
    client: Client,
    endpoint: Url,
    api_key: Option<String>,
    placement: CredentialPlacement,
    generation: GenerationConfig,
}

impl GeminiTransport {
    /// Create a transport from configuration.
    ///
    /// # Errors
    /// Returns an error if the endpoint is invalid or the client cannot be built.
    pub fn new(ai: &AiConfig, generation: &GenerationConfig) -> AiResult<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(ai.response_timeout)
            .build()?;
        Ok(Self {
            client,
            endpoint: Url::parse(&ai.endpoint)?,
            api_key: ai.credential().map(str::to_string),
            placement: ai.credential_placement,
            generation: generation.clone(),
        })
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> GeminiRequest<'a> {
        GeminiRequest {
            contents: [GeminiContent {
                parts: [GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.generation.temperature,
                top_k: self.generation.top_k,
                top_p: self.generation.top_p,
                max_output_tokens: self.generation.max_output_tokens,
            },
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: &self.generation.safety_threshold,
                })
                .collect(),
        }
    }
}

impl Transport for GeminiTransport {
    fn send<'a>(&'a self, request: &'a GenerateRequest) -> TransportFuture<'a, AiResult<Value>> {
        Box::pin(async move {
            let key = self.api_key.as_deref().ok_or(AiError::Configuration)?;

            let builder = self.client.post(self.endpoint.clone());
            let builder = match self.placement {
                CredentialPlacement::QueryParam => builder.query(&[("key", key)]),
                CredentialPlacement::BearerHeader => builder.bearer_auth(key),
            };

            debug!("POST {} ({} prompt chars)", self.endpoint, request.prompt.len());
            let response = builder.json(&self.request_body(&request.prompt)).send().await?;
            let status = response.status();
            let text = response.text().await?;
            let body: Option<Value> = serde_json::from_str(&text).ok();

            if !status.is_success() {
                let message = body
                    .as_ref()
                    .and_then(error_message)
                    .or_else(|| status.canonical_reason().map(str::to_string))
                    .unwrap_or_else(|| "Unknown error".to_string());
                return Err(AiError::Status {
                    status: status.as_u16(),
                    message,
                });
            }

            body.ok_or_else(|| AiError::Envelope(text.chars().take(200).collect()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> GeminiTransport {
        let ai = AiConfig {
            api_key: Some("k".to_string()),
            ..AiConfig::default()
        };
        GeminiTransport::new(&ai, &GenerationConfig::default()).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let transport = transport();
        let body = serde_json::to_value(transport.request_body("hello")).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "hello");
        assert_eq!(body["generationConfig"]["topK"], 40);
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        let settings = body["safetySettings"].as_array().unwrap();
        assert_eq!(settings.len(), 4);
        assert!(
            settings
                .iter()
                .all(|s| s["threshold"] == "BLOCK_MEDIUM_AND_ABOVE")
        );
    }

    #[test]
    fn test_invalid_endpoint() {
        let ai = AiConfig {
            endpoint: "::not a url::".to_string(),
            ..AiConfig::default()
        };
        assert!(matches!(
            GeminiTransport::new(&ai, &GenerationConfig::default()),
            Err(AiError::Endpoint(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        let transport =
            GeminiTransport::new(&AiConfig::default(), &GenerationConfig::default()).unwrap();
        let request = GenerateRequest {
            prompt: "p".to_string(),
            user_text: "p".to_string(),
            topic: Topic::General,
        };
        assert!(matches!(
            transport.send(&request).await,
            Err(AiError::Configuration)
        ));
    }
}
