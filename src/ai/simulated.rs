//! Offline transport that imitates a live endpoint.
//!
//! Waits a fixed delay and answers with one of a handful of echo templates
//! in the single-object envelope shape.

use std::time::Duration;

use rand::Rng;
use serde_json::{Value, json};

use crate::ai::errors::AiResult;
use crate::ai::transport::{GenerateRequest, Transport, TransportFuture};

/// Default simulated response latency.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

const TEMPLATES: [&str; 5] = [
    "I understand your point about \"{}\". Let me explain further...",
    "That's an interesting perspective on \"{}\". Here's what I think...",
    "Regarding \"{}\", let me share some educational insights...",
    "Your question about \"{}\" is important. Here's what you need to know...",
    "Let's explore \"{}\" in more detail...",
];

/// Transport that never touches the network.
#[derive(Clone, Debug)]
pub struct SimulatedTransport {
    delay: Duration,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl SimulatedTransport {
    /// Create a simulated transport answering after `delay`.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// All replies this transport can produce for `user_text`.
    #[must_use]
    pub fn candidates(user_text: &str) -> Vec<String> {
        TEMPLATES
            .iter()
            .map(|template| template.replace("{}", user_text))
            .collect()
    }
}

impl Transport for SimulatedTransport {
    fn send<'a>(&'a self, request: &'a GenerateRequest) -> TransportFuture<'a, AiResult<Value>> {
        Box::pin(async move {
            tokio::time::sleep(self.delay).await;
            let idx = rand::thread_rng().gen_range(0..TEMPLATES.len());
            let reply = TEMPLATES[idx].replace("{}", &request.user_text);
            Ok(json!({ "text": reply }))
        })
    }

    fn requires_credential(&self) -> bool {
        false
    }
}
