//! Submission flow: validate, record, respond, settle.
//!
//! - `responder`: the reply source seam, implemented by the generator
//! - `flow`: the dispatcher with its phase machine and request fencing

pub mod errors;
pub mod flow;
pub mod responder;

pub use errors::{SetupError, SetupResult};
pub use flow::{APOLOGY_MESSAGE, DispatchFlow, DispatchOutcome, DispatchPhase, Settlement};
pub use responder::{Responder, ResponderFuture};
