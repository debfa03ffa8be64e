//! Conductor - The Conversation State Machine
//!
//! The Conductor owns the active conversation. It:
//! - sends prompts to the chat server and appends the replies
//! - persists every exchange exactly once, after its reply arrived
//! - opens, resets and forgets stored sessions
//! - starts the typing reveal of every fresh reply
//!
//! # Design Philosophy
//!
//! The Conductor is UI-agnostic. It doesn't know or care whether it's talking to
//! a TUI or a test harness. It communicates through:
//! - `SurfaceEvent`: Events received FROM the UI surface
//! - `ConductorMessage`: Notifications sent TO the UI surface
//! - `ConversationView`: A projection the surface renders on every frame
//!
//! # Exchanges
//!
//! ```text
//! send()  ── append User ──→ spawn task ──→ generate ──→ save
//!                                 │             │          │
//!                                 │        Generated   Saved / Failed
//!                                 ▼             ▼          ▼
//!                           poll_exchange() / await_exchange() apply them
//! ```
//!
//! Each exchange remembers the conversation epoch it started in. Outcomes
//! arriving after the conversation was replaced are dropped; the exchange
//! itself still runs to completion, so the server keeps its copy.
//!
//! Stored sessions load the same way: [`Conductor::request_session`] spawns
//! the fetch and [`Conductor::poll_load`] applies it, unless the
//! conversation changed in the meantime.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::oneshot;

use crate::animation::{RevealSet, DEFAULT_TICK};
use crate::backend::{ApiError, ChatBackend, RemoteMessage, Reply, SaveRequest, SessionSummary};
use crate::config::ClientConfig;
use crate::events::SurfaceEvent;
use crate::messages::{
    ChatMode, ConductorMessage, ConductorState, Message, NotifyLevel, SessionId,
};
use crate::session::ConversationState;
use crate::view::{self, ConversationView};

/// Capacity of the per-exchange outcome channel
const EXCHANGE_CHANNEL_SIZE: usize = 4;

/// Conductor configuration
#[derive(Clone, Debug)]
pub struct ConductorConfig {
    /// Delay between revealed characters
    pub typing_tick: Duration,
    /// Mode the first conversation starts in
    pub default_mode: ChatMode,
    /// Whether `start()` checks that the chat server answers
    pub check_health_on_start: bool,
}

impl Default for ConductorConfig {
    fn default() -> Self {
        Self {
            typing_tick: DEFAULT_TICK,
            default_mode: ChatMode::Text,
            check_health_on_start: true,
        }
    }
}

impl From<&ClientConfig> for ConductorConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            typing_tick: config.typing_tick,
            default_mode: config.default_mode,
            ..Self::default()
        }
    }
}

/// Why an exchange did not complete
///
/// Every variant shows up as the same server error reply in the
/// conversation; the variant only matters for the logs.
#[derive(Debug, Error)]
pub enum ExchangeError {
    /// The reply could not be generated
    #[error("generation failed: {0}")]
    Generation(#[source] ApiError),

    /// The reply arrived but could not be saved
    #[error("saving the exchange failed: {0}")]
    Save(#[source] ApiError),

    /// The exchange task stopped without reporting
    #[error("exchange task ended without a result")]
    Interrupted,
}

impl ExchangeError {
    /// Stage the exchange failed at
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Generation(_) => "generate",
            Self::Save(_) => "save",
            Self::Interrupted => "task",
        }
    }
}

/// What the exchange task reports back
#[derive(Debug)]
enum ExchangeOutcome {
    /// The reply to append
    Generated(Reply),
    /// The exchange is stored in this session (terminal)
    Saved(SessionId),
    /// The exchange stopped (terminal)
    Failed(ExchangeError),
}

impl ExchangeOutcome {
    fn is_terminal(&self) -> bool {
        !matches!(self, Self::Generated(_))
    }
}

/// The exchange in flight
struct InFlight {
    /// Conversation epoch at send time
    epoch: u64,
    /// Outcomes of the exchange task
    rx: mpsc::Receiver<ExchangeOutcome>,
}

/// A stored session being fetched
struct PendingLoad {
    /// Conversation epoch at request time
    epoch: u64,
    summary: SessionSummary,
    rx: oneshot::Receiver<Result<Vec<RemoteMessage>, ApiError>>,
}

/// The Conductor - headless conversation core
pub struct Conductor<B: ChatBackend> {
    /// Configuration
    config: ConductorConfig,
    /// Chat server
    backend: Arc<B>,
    /// Active conversation
    conversation: ConversationState,
    /// Typing reveals of the active conversation
    reveals: RevealSet,
    /// Current operational state
    state: ConductorState,
    /// Exchange in flight, if any
    exchange: Option<InFlight>,
    /// Session fetch in flight, if any
    load: Option<PendingLoad>,
    /// Channel to send messages to UI surface
    tx: mpsc::Sender<ConductorMessage>,
}

impl<B: ChatBackend + 'static> Conductor<B> {
    /// Create a new Conductor with the given backend
    pub fn new(backend: B, config: ConductorConfig, tx: mpsc::Sender<ConductorMessage>) -> Self {
        Self::with_shared_backend(Arc::new(backend), config, tx)
    }

    /// Create a new Conductor sharing a backend with other components
    pub fn with_shared_backend(
        backend: Arc<B>,
        config: ConductorConfig,
        tx: mpsc::Sender<ConductorMessage>,
    ) -> Self {
        Self {
            conversation: ConversationState::new(config.default_mode),
            reveals: RevealSet::new(config.typing_tick),
            config,
            backend,
            state: ConductorState::Idle,
            exchange: None,
            load: None,
            tx,
        }
    }

    /// The chat server client
    #[must_use]
    pub fn backend(&self) -> Arc<B> {
        Arc::clone(&self.backend)
    }

    /// The active conversation
    #[must_use]
    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// Typing reveals of the active conversation
    #[must_use]
    pub fn reveals(&self) -> &RevealSet {
        &self.reveals
    }

    /// Get the current state
    #[must_use]
    pub fn state(&self) -> ConductorState {
        self.state
    }

    /// Whether an exchange is in flight
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.conversation.is_generating()
    }

    /// The active session, `None` until the first exchange is saved
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.conversation.session_id()
    }

    /// Current generation mode
    #[must_use]
    pub fn mode(&self) -> ChatMode {
        self.conversation.mode()
    }

    /// Project the conversation for rendering
    #[must_use]
    pub fn view(&self) -> ConversationView {
        view::project(&self.conversation, &self.reveals)
    }

    /// Start the Conductor
    ///
    /// An unreachable server only produces a warning; sending still works
    /// once it comes up.
    pub async fn start(&mut self) -> anyhow::Result<()> {
        if self.config.check_health_on_start && !self.backend.health_check().await {
            tracing::warn!(backend = self.backend.name(), "Chat server not reachable");
            self.notify(NotifyLevel::Warning, "Chat server not reachable")
                .await;
        }

        self.replay_state().await;
        Ok(())
    }

    /// Handle an event from a UI surface
    pub async fn handle_event(&mut self, event: SurfaceEvent) -> anyhow::Result<()> {
        match event {
            SurfaceEvent::Connected => {
                tracing::info!("Surface connected");
                self.replay_state().await;
            }
            SurfaceEvent::QuitRequested => {
                self.shutdown();
            }
            SurfaceEvent::UserMessage { content } => {
                let mode = self.conversation.mode();
                self.send(&content, mode).await;
            }
            SurfaceEvent::ToggleMode => {
                self.toggle_mode().await;
            }
            SurfaceEvent::SetMode { mode } => {
                self.set_mode(mode).await;
            }
            SurfaceEvent::NewChat => {
                self.start_new_session().await;
            }
            SurfaceEvent::OpenSession { summary } => {
                self.request_session(summary);
            }
            SurfaceEvent::SessionDeleted { session_id } => {
                self.delete_session(&session_id).await;
            }
        }

        Ok(())
    }

    /// Send a prompt
    ///
    /// Blank input and input arriving while an exchange is in flight are
    /// ignored. Returns whether an exchange was started.
    pub async fn send(&mut self, input: &str, mode: ChatMode) -> bool {
        if input.trim().is_empty() {
            return false;
        }
        if self.conversation.is_generating() {
            tracing::debug!("Exchange in flight, ignoring input");
            return false;
        }

        self.conversation.set_generating(true);
        self.set_state(ConductorState::Sending).await;
        self.conversation.push(Message::user(input));

        let epoch = self.conversation.epoch();
        let (tx, rx) = mpsc::channel(EXCHANGE_CHANNEL_SIZE);
        self.exchange = Some(InFlight { epoch, rx });

        tracing::info!(
            mode = mode.as_str(),
            session_id = ?self.conversation.session_id(),
            epoch,
            "Starting exchange"
        );

        tokio::spawn(run_exchange(
            Arc::clone(&self.backend),
            input.to_string(),
            mode,
            self.conversation.session_id().cloned(),
            tx,
        ));

        true
    }

    /// Apply whatever the exchange task reported so far
    ///
    /// Call this regularly (e.g. once per frame). Returns true if there was
    /// activity.
    pub async fn poll_exchange(&mut self) -> bool {
        let (epoch, outcomes, disconnected) = {
            let Some(in_flight) = self.exchange.as_mut() else {
                return false;
            };

            let mut collected = Vec::new();
            let disconnected = loop {
                match in_flight.rx.try_recv() {
                    Ok(outcome) => {
                        let terminal = outcome.is_terminal();
                        collected.push(outcome);
                        if terminal {
                            break false;
                        }
                    }
                    Err(TryRecvError::Empty) => break false,
                    Err(TryRecvError::Disconnected) => break true,
                }
            };
            (in_flight.epoch, collected, disconnected)
        };

        let active = !outcomes.is_empty() || disconnected;

        for outcome in outcomes {
            self.apply_outcome(epoch, outcome).await;
        }

        if disconnected && self.exchange.is_some() {
            self.apply_outcome(epoch, ExchangeOutcome::Failed(ExchangeError::Interrupted))
                .await;
        }

        active
    }

    /// Wait for the exchange in flight to settle
    ///
    /// Returns immediately when there is none.
    pub async fn await_exchange(&mut self) {
        while let Some(in_flight) = self.exchange.as_mut() {
            let epoch = in_flight.epoch;
            let outcome = in_flight
                .rx
                .recv()
                .await
                .unwrap_or(ExchangeOutcome::Failed(ExchangeError::Interrupted));
            self.apply_outcome(epoch, outcome).await;
        }
    }

    /// Wait until every reveal of the conversation is complete
    pub async fn await_reveals(&mut self) {
        self.reveals.wait_all().await;
    }

    /// Reset to an empty, unsaved conversation
    pub async fn start_new_session(&mut self) {
        self.load = None;
        self.reveals.clear();
        self.conversation.reset();
        tracing::info!("Started a new chat");
        self.emit(ConductorMessage::SessionChanged { session_id: None })
            .await;
    }

    /// Load a stored session, replacing the conversation
    ///
    /// Nothing changes if the messages cannot be fetched.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure after notifying the surface.
    pub async fn open_session(&mut self, summary: &SessionSummary) -> Result<(), ApiError> {
        self.load = None;
        let epoch = self.conversation.epoch();
        let result = self.backend.fetch_messages(&summary.id).await;
        self.apply_load(epoch, summary, result).await
    }

    /// Start fetching a stored session in the background
    ///
    /// The result is applied by [`Conductor::poll_load`]. A newer request
    /// replaces this one.
    pub fn request_session(&mut self, summary: SessionSummary) {
        let (tx, rx) = oneshot::channel();
        let backend = Arc::clone(&self.backend);
        let id = summary.id.clone();
        tokio::spawn(async move {
            // Receiver gone means the load was superseded
            let _ = tx.send(backend.fetch_messages(&id).await);
        });

        tracing::debug!(session_id = %summary.id, "Loading session");
        self.load = Some(PendingLoad {
            epoch: self.conversation.epoch(),
            summary,
            rx,
        });
    }

    /// Whether a session fetch is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.load.is_some()
    }

    /// Apply the session fetch if it finished
    ///
    /// Returns true if there was activity.
    pub async fn poll_load(&mut self) -> bool {
        let result = {
            let Some(load) = self.load.as_mut() else {
                return false;
            };
            match load.rx.try_recv() {
                Ok(result) => result,
                Err(oneshot::error::TryRecvError::Empty) => return false,
                Err(oneshot::error::TryRecvError::Closed) => {
                    Err(ApiError::Other("session fetch was interrupted".into()))
                }
            }
        };

        if let Some(load) = self.load.take() {
            // Failure already reported to the surface
            let _ = self.apply_load(load.epoch, &load.summary, result).await;
        }
        true
    }

    /// Wait for the session fetch in flight, if any
    pub async fn await_load(&mut self) {
        if let Some(load) = self.load.take() {
            let result = load
                .rx
                .await
                .unwrap_or_else(|_| Err(ApiError::Other("session fetch was interrupted".into())));
            let _ = self.apply_load(load.epoch, &load.summary, result).await;
        }
    }

    /// Forget a session that was deleted on the server
    ///
    /// Resets the conversation if it is the active one; any other id has no
    /// effect. Returns whether the conversation was reset.
    pub async fn delete_session(&mut self, id: &SessionId) -> bool {
        if self.conversation.session_id() != Some(id) {
            tracing::debug!(session_id = %id, "Deleted session is not active");
            return false;
        }
        self.start_new_session().await;
        true
    }

    /// Set the generation mode
    pub async fn set_mode(&mut self, mode: ChatMode) {
        if self.conversation.mode() == mode {
            return;
        }
        self.conversation.set_mode(mode);
        tracing::debug!(mode = mode.as_str(), "Mode changed");
        self.emit(ConductorMessage::ModeChanged { mode }).await;
    }

    /// Flip between text and image mode
    pub async fn toggle_mode(&mut self) {
        let mode = self.conversation.mode().toggled();
        self.set_mode(mode).await;
    }

    /// Stop all reveals
    ///
    /// An exchange in flight still runs to completion in the background.
    pub fn shutdown(&mut self) {
        tracing::info!(generating = self.is_generating(), "Conductor shutting down");
        self.reveals.clear();
    }

    async fn apply_load(
        &mut self,
        epoch: u64,
        summary: &SessionSummary,
        result: Result<Vec<RemoteMessage>, ApiError>,
    ) -> Result<(), ApiError> {
        if epoch != self.conversation.epoch() {
            tracing::debug!(
                session_id = %summary.id,
                epoch,
                "Discarding load for a replaced conversation"
            );
            return Ok(());
        }

        let records = match result {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(session_id = %summary.id, error = %e, "Failed to load session");
                self.notify(NotifyLevel::Warning, &format!("Could not load chat: {e}"))
                    .await;
                return Err(e);
            }
        };

        let messages = records.into_iter().map(RemoteMessage::into_message).collect();
        self.reveals.clear();
        self.conversation.replace(Some(summary.id.clone()), messages);

        tracing::info!(
            session_id = %summary.id,
            messages = self.conversation.len(),
            "Session opened"
        );
        self.emit(ConductorMessage::SessionChanged {
            session_id: Some(summary.id.clone()),
        })
        .await;

        Ok(())
    }

    async fn apply_outcome(&mut self, epoch: u64, outcome: ExchangeOutcome) {
        let current = epoch == self.conversation.epoch();

        match outcome {
            ExchangeOutcome::Generated(reply) => {
                if current {
                    self.append(reply.into_message());
                } else {
                    tracing::debug!(epoch, "Discarding reply for a replaced conversation");
                }
            }
            ExchangeOutcome::Saved(chat_id) => {
                if current {
                    tracing::info!(session_id = %chat_id, "Exchange saved");
                    self.conversation.set_session_id(chat_id.clone());
                    self.emit(ConductorMessage::SessionChanged {
                        session_id: Some(chat_id),
                    })
                    .await;
                } else {
                    tracing::debug!(session_id = %chat_id, epoch, "Saved exchange belongs to a replaced conversation");
                }
                self.finish_exchange().await;
            }
            ExchangeOutcome::Failed(error) => {
                tracing::warn!(stage = error.stage(), error = %error, "Exchange failed");
                if current {
                    self.append(Message::server_error());
                }
                self.finish_exchange().await;
            }
        }
    }

    /// Append a message and start its reveal
    fn append(&mut self, message: Message) {
        let id = self.conversation.push(message);
        if let Some(entry) = self.conversation.messages().last() {
            self.reveals.start(id, &entry.message);
        }
    }

    async fn finish_exchange(&mut self) {
        self.exchange = None;
        self.conversation.set_generating(false);
        self.set_state(ConductorState::Idle).await;
        self.emit(ConductorMessage::ClearInput).await;
    }

    async fn replay_state(&mut self) {
        self.emit(ConductorMessage::State { state: self.state })
            .await;
        self.emit(ConductorMessage::ModeChanged {
            mode: self.conversation.mode(),
        })
        .await;
        self.emit(ConductorMessage::SessionChanged {
            session_id: self.conversation.session_id().cloned(),
        })
        .await;
    }

    /// Set state and notify UI
    async fn set_state(&mut self, state: ConductorState) {
        self.state = state;
        self.emit(ConductorMessage::State { state }).await;
    }

    /// Send notification
    async fn notify(&self, level: NotifyLevel, message: &str) {
        self.emit(ConductorMessage::Notify {
            level,
            message: message.to_string(),
        })
        .await;
    }

    /// Send a message to the UI surface
    async fn emit(&self, msg: ConductorMessage) {
        if let Err(e) = self.tx.send(msg).await {
            tracing::warn!("Failed to send message to surface: {}", e);
        }
    }
}

/// Generate a reply, then save the exchange
///
/// Runs to completion even if nobody listens anymore.
async fn run_exchange<B: ChatBackend + ?Sized>(
    backend: Arc<B>,
    prompt: String,
    mode: ChatMode,
    chat_id: Option<SessionId>,
    tx: mpsc::Sender<ExchangeOutcome>,
) {
    let reply = match backend.generate(&prompt, mode).await {
        Ok(reply) => reply,
        Err(e) => {
            let _ = tx
                .send(ExchangeOutcome::Failed(ExchangeError::Generation(e)))
                .await;
            return;
        }
    };

    let record = SaveRequest {
        chat_id,
        prompt,
        response: reply.payload().to_string(),
        mode,
    };
    let _ = tx.send(ExchangeOutcome::Generated(reply)).await;

    let outcome = match backend.save_exchange(&record).await {
        Ok(saved) => ExchangeOutcome::Saved(saved.chat_id),
        Err(e) => ExchangeOutcome::Failed(ExchangeError::Save(e)),
    };
    let _ = tx.send(outcome).await;
}
