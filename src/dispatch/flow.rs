//! Submission orchestration over a [`ChatStore`] and a [`Responder`].

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use tokio::sync::{Mutex, watch};
use tracing::{debug, error, info, warn};

use crate::ai::generator::ResponseGenerator;
use crate::chat::message::Message;
use crate::chat::persist::SqlitePersister;
use crate::chat::state::ChatStore;
use crate::config::ChatConfig;
use crate::dispatch::errors::SetupResult;
use crate::dispatch::responder::Responder;

/// Reply posted when the responder fails or panics.
pub const APOLOGY_MESSAGE: &str = "Sorry, I encountered an error. Please try again.";

/// How a settled exchange ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// The responder produced a reply.
    Success,
    /// The responder failed; the apology was posted.
    Failure,
}

/// Lifecycle of the most recent submission.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchPhase {
    /// Nothing in flight.
    #[default]
    Idle,
    /// User message being recorded.
    Submitting,
    /// Waiting on the responder.
    AwaitingResponse,
    /// Reply or apology recorded; about to return to idle.
    Settled(Settlement),
}

/// Result of one [`DispatchFlow::submit`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Input was blank; nothing happened.
    Ignored,
    /// The reply that was appended.
    Replied(Message),
    /// The apology that was appended.
    Failed(Message),
    /// A newer submission superseded this one; its reply was dropped.
    Stale {
        /// Request token of the dropped submission.
        token: u64,
    },
}

/// Clears the busy flag if a submission is dropped before it settles.
struct LoadingGuard {
    store: ChatStore,
    latest: Arc<AtomicU64>,
    token: u64,
    armed: bool,
}

impl LoadingGuard {
    const fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        if !self.armed || self.latest.load(Ordering::SeqCst) != self.token {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            warn!("Submission {} dropped mid-flight; clearing busy flag", self.token);
            let store = self.store.clone();
            let latest = Arc::clone(&self.latest);
            let token = self.token;
            handle.spawn(async move {
                // A newer submission may have started before this task ran.
                if latest.load(Ordering::SeqCst) == token {
                    store.set_loading(false).await;
                }
            });
        }
    }
}

/// Validates input, records the exchange and keeps the busy flag honest.
pub struct DispatchFlow {
    store: ChatStore,
    responder: Arc<dyn Responder>,
    history_window: usize,
    latest: Arc<AtomicU64>,
    phase: watch::Sender<DispatchPhase>,
    last_error: Mutex<Option<String>>,
}

impl DispatchFlow {
    /// Create a dispatcher passing up to `history_window` prior messages to
    /// the responder.
    #[must_use]
    pub fn new(store: ChatStore, responder: Arc<dyn Responder>, history_window: usize) -> Self {
        let (phase, _) = watch::channel(DispatchPhase::Idle);
        Self {
            store,
            responder,
            history_window,
            latest: Arc::new(AtomicU64::new(0)),
            phase,
            last_error: Mutex::new(None),
        }
    }

    /// Build the full stack from configuration: a `SQLite`-backed store and an
    /// HTTP generator.
    ///
    /// # Errors
    /// Returns an error if the configuration is invalid or the store cannot
    /// be opened.
    pub async fn open(config: &ChatConfig) -> SetupResult<Self> {
        let generator = ResponseGenerator::from_config(config)?;
        let persister = SqlitePersister::open(&config.storage).await?;
        let store = ChatStore::with_persister(Arc::new(persister)).await?;
        info!(
            "Chat ready (offline: {}, store: {})",
            generator.is_offline(),
            config.storage.store_name
        );
        Ok(Self::new(store, Arc::new(generator), config.ai.max_history))
    }

    /// The store this dispatcher writes to.
    #[must_use]
    pub const fn store(&self) -> &ChatStore {
        &self.store
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> DispatchPhase {
        *self.phase.borrow()
    }

    /// Watch phase transitions.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DispatchPhase> {
        self.phase.subscribe()
    }

    /// Description of the most recent failure, cleared on the next submit.
    pub async fn last_error(&self) -> Option<String> {
        self.last_error.lock().await.clone()
    }

    /// Whether a new submission would be accepted by a UI guarding on the
    /// busy flag.
    pub async fn can_submit(&self) -> bool {
        !self.store.is_loading().await
    }

    /// Run one exchange for `input`.
    pub async fn submit(&self, input: &str) -> DispatchOutcome {
        let text = input.trim();
        if text.is_empty() {
            debug!("Ignoring blank submission");
            return DispatchOutcome::Ignored;
        }

        let token = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_phase(DispatchPhase::Submitting);
        info!("Submission {token}: {} chars", text.chars().count());

        let mut guard = LoadingGuard {
            store: self.store.clone(),
            latest: Arc::clone(&self.latest),
            token,
            armed: true,
        };

        *self.last_error.lock().await = None;
        let history = self.store.recent(self.history_window).await;
        self.store.append(Message::user(text)).await;
        self.store.set_loading(true).await;

        self.set_phase(DispatchPhase::AwaitingResponse);
        let result = AssertUnwindSafe(async { self.responder.respond(text, &history).await })
            .catch_unwind()
            .await;
        let result = match result {
            Ok(Ok(reply)) if reply.trim().is_empty() => {
                Err("responder returned an empty reply".to_string())
            }
            Ok(Ok(reply)) => Ok(reply.trim().to_string()),
            Ok(Err(err)) => Err(err.to_string()),
            Err(panic) => Err(format!("responder panicked: {}", panic_message(&*panic))),
        };

        if self.latest.load(Ordering::SeqCst) != token {
            guard.disarm();
            warn!("Discarding stale reply for submission {token}");
            return DispatchOutcome::Stale { token };
        }

        let outcome = match result {
            Ok(reply) => {
                let message = Message::ai(reply);
                self.store.append(message.clone()).await;
                self.set_phase(DispatchPhase::Settled(Settlement::Success));
                DispatchOutcome::Replied(message)
            }
            Err(description) => {
                error!("Submission {token} failed: {description}");
                *self.last_error.lock().await = Some(description);
                let message = Message::ai(APOLOGY_MESSAGE);
                self.store.append(message.clone()).await;
                self.set_phase(DispatchPhase::Settled(Settlement::Failure));
                DispatchOutcome::Failed(message)
            }
        };

        self.store.set_loading(false).await;
        guard.disarm();
        self.set_phase(DispatchPhase::Idle);
        outcome
    }

    fn set_phase(&self, phase: DispatchPhase) {
        self.phase.send_replace(phase);
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
