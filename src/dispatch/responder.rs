//! The reply source used by the dispatcher.

use std::future::Future;
use std::pin::Pin;

use crate::ai::errors::{AiError, AiResult};
use crate::ai::generator::ResponseGenerator;
use crate::ai::topic::Topic;
use crate::chat::message::Message;
use crate::config::FailurePolicy;

/// Boxed future type for responder operations.
pub type ResponderFuture<'a> = Pin<Box<dyn Future<Output = AiResult<String>> + Send + 'a>>;

/// Produces the ai reply for a user message.
pub trait Responder: Send + Sync {
    /// Reply to `user_text` given the messages that preceded it.
    ///
    /// # Errors
    /// Returns an error when no reply could be produced; the dispatcher then
    /// posts its apology instead.
    fn respond<'a>(&'a self, user_text: &'a str, history: &'a [Message]) -> ResponderFuture<'a>;
}

impl Responder for ResponseGenerator {
    fn respond<'a>(&'a self, user_text: &'a str, history: &'a [Message]) -> ResponderFuture<'a> {
        Box::pin(async move {
            if self.config().failure_policy != FailurePolicy::Escalate {
                return Ok(self.generate(user_text, history).await);
            }

            match self.try_generate(user_text, history).await {
                Err(AiError::Configuration) => Ok(Topic::classify(user_text).fallback().to_string()),
                other => other,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use serde_json::Value;

    use crate::ai::transport::{GenerateRequest, Transport, TransportFuture};
    use crate::config::AiConfig;

    struct DownTransport;

    impl Transport for DownTransport {
        fn send<'a>(&'a self, _request: &'a GenerateRequest) -> TransportFuture<'a, AiResult<Value>> {
            Box::pin(async {
                Err(AiError::Status {
                    status: 401,
                    message: "unauthorized".to_string(),
                })
            })
        }
    }

    fn generator(policy: FailurePolicy, key: Option<&str>) -> ResponseGenerator {
        let config = AiConfig {
            api_key: key.map(str::to_string),
            failure_policy: policy,
            ..AiConfig::default()
        };
        ResponseGenerator::new(config, Arc::new(DownTransport)).unwrap()
    }

    #[tokio::test]
    async fn test_describe_policy_answers_with_text() {
        let reply = generator(FailurePolicy::Describe, Some("k"))
            .respond("hello", &[])
            .await
            .unwrap();
        assert!(reply.starts_with("Error: "));
    }

    #[tokio::test]
    async fn test_escalate_policy_reports_error() {
        let result = generator(FailurePolicy::Escalate, Some("k"))
            .respond("hello", &[])
            .await;
        assert!(matches!(result, Err(AiError::Status { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_escalate_policy_offline_is_canned() {
        let reply = generator(FailurePolicy::Escalate, None)
            .respond("matrix algebra", &[])
            .await
            .unwrap();
        assert_eq!(reply, Topic::Math.fallback());
    }
}
