//! Chat core: conversation state, reply generation against a remote
//! text-generation endpoint, and the submission flow that ties them together.
//!
//! ```no_run
//! use lumen_chat::{ChatConfig, DispatchFlow, telemetry};
//!
//! # async fn demo() -> Result<(), lumen_chat::dispatch::SetupError> {
//! telemetry::init_tracing();
//! let flow = DispatchFlow::open(&ChatConfig::from_env()).await?;
//! flow.submit("What is photosynthesis?").await;
//! for message in flow.store().messages().await {
//!     println!("[{}] {}: {}", message.display_time(), message.sender, message.text);
//! }
//! # Ok(())
//! # }
//! ```

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(warnings)] // Tous les warnings sont des erreurs
#![deny(unsafe_code)] // Aucun bloc unsafe
#![deny(missing_docs)] // Tout item public est documenté
#![deny(dead_code)] // Pas de code mort
#![deny(unused_imports)] // Pas d'imports inutiles
#![deny(unused_variables)] // Pas de variables inutiles
#![deny(unused_must_use)] // Les Result et futures doivent être consommés
#![deny(nonstandard_style)] // Conventions de nommage Rust
#![forbid(unsafe_op_in_unsafe_fn)]

// Discipline Clippy
#![deny(clippy::all)] // Lints standard
#![deny(clippy::pedantic)] // Lints strictes
#![deny(clippy::nursery)] // Lints expérimentales
#![deny(clippy::unwrap_used)] // Pas de unwrap() hors tests
#![deny(clippy::expect_used)] // Pas de expect() hors tests
#![deny(clippy::panic)] // Pas de panic!() hors tests
#![deny(clippy::print_stdout)] // Pas de println!() dans la bibliothèque
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::unwrap_in_result)]
#![deny(clippy::redundant_clone)]
#![deny(clippy::cognitive_complexity)] // Fonctions courtes et lisibles
// Les tests peuvent échouer bruyamment
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

/// Reply generation: topics, prompts, transports, post-processing.
pub mod ai;
/// Messages, the conversation store, persistence and export.
pub mod chat;
/// Layered configuration with environment overrides.
pub mod config;
/// Submission orchestration.
pub mod dispatch;
/// Tracing subscriber setup.
pub mod telemetry;

pub use ai::{ResponseGenerator, SimulatedTransport, Topic};
pub use chat::{ChatExport, ChatState, ChatStore, Message, MessageId, Sender};
pub use config::ChatConfig;
pub use dispatch::{APOLOGY_MESSAGE, DispatchFlow, DispatchOutcome, DispatchPhase, Responder};
