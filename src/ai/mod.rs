//! Reply generation against a remote text-generation endpoint.
//!
//! - `topic`: keyword classification, prompt prefixes, canned fallbacks
//! - `prompt`: outbound prompt construction with bounded history
//! - `transport`: the endpoint seam and the HTTP implementation
//! - `simulated`: offline transport for demos
//! - `envelope`: text extraction from response envelopes
//! - `format`: post-processing of generated text
//! - `generator`: retrying, time-bounded orchestration of the above

pub mod envelope;
pub mod errors;
pub mod format;
pub mod generator;
pub mod prompt;
pub mod simulated;
pub mod topic;
pub mod transport;

pub use envelope::extract_text;
pub use errors::{AiError, AiResult};
pub use format::ResponseFormatter;
pub use generator::{ResponseGenerator, TIMEOUT_MESSAGE};
pub use prompt::build_prompt;
pub use simulated::SimulatedTransport;
pub use topic::Topic;
pub use transport::{GeminiTransport, GenerateRequest, Transport, TransportFuture};
