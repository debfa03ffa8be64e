//! Conductor Client
//!
//! Thin wrapper around the Conductor and the history panel for TUI
//! integration. This client embeds the Conductor directly and provides a
//! convenient interface for sending events and receiving messages.
//!
//! # Architecture
//!
//! The TUI is a "thin client" - it doesn't contain any business logic.
//! All conversation logic happens in the Conductor. The TUI's job is:
//! 1. Convert terminal events to SurfaceEvents (or history panel calls)
//! 2. Send SurfaceEvents to Conductor
//! 3. Receive ConductorMessages
//! 4. Render display state based on messages and the ConversationView
//!
//! Network calls never run inside a key handler. Listing, deleting and
//! loading sessions are spawned; their results are applied by [`ConductorClient::poll`].

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;

use smartchat_core::{
    ApiError, ChatBackend, ChatMode, ClientConfig, Conductor, ConductorConfig, ConductorMessage,
    ConductorState, ConversationView, HistoryIntent, HistoryPanel, HttpBackend, NotifyLevel,
    SessionId, SessionSummary, SurfaceEvent,
};

/// Capacity of the Conductor -> TUI channel
const MESSAGE_CHANNEL_SIZE: usize = 100;

/// Capacity of the history task channel
const HISTORY_CHANNEL_SIZE: usize = 16;

/// Result of a history task
#[derive(Debug)]
enum HistoryOutcome {
    Listed(Result<Vec<SessionSummary>, ApiError>),
    Deleted {
        id: SessionId,
        result: Result<(), ApiError>,
        /// Reload after a successful delete
        listing: Option<Result<Vec<SessionSummary>, ApiError>>,
    },
}

/// Client for communicating with the embedded Conductor
pub struct ConductorClient<B: ChatBackend + 'static = HttpBackend> {
    /// The embedded Conductor instance
    conductor: Conductor<B>,
    /// Stored sessions
    history: HistoryPanel,
    /// Receiver for messages from Conductor
    rx: mpsc::Receiver<ConductorMessage>,
    /// Notifications raised by the client itself (history failures)
    local: VecDeque<ConductorMessage>,
    /// Sender handed to history tasks
    history_tx: mpsc::Sender<HistoryOutcome>,
    /// Results of history tasks
    history_rx: mpsc::Receiver<HistoryOutcome>,
    /// History tasks not applied yet
    history_pending: usize,
}

impl ConductorClient<HttpBackend> {
    /// Create a client talking to the configured chat server
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let backend = HttpBackend::from_config(&config.api)?;
        tracing::info!(base_url = backend.base_url(), "Using chat server");
        Ok(Self::with_backend(backend, ConductorConfig::from(config)))
    }
}

impl<B: ChatBackend + 'static> ConductorClient<B> {
    /// Create a client around any backend
    pub fn with_backend(backend: B, config: ConductorConfig) -> Self {
        // Create channel for Conductor -> TUI messages
        let (tx, rx) = mpsc::channel(MESSAGE_CHANNEL_SIZE);
        let conductor = Conductor::new(backend, config, tx);
        let (history_tx, history_rx) = mpsc::channel(HISTORY_CHANNEL_SIZE);

        Self {
            conductor,
            history: HistoryPanel::new(),
            rx,
            local: VecDeque::new(),
            history_tx,
            history_rx,
            history_pending: 0,
        }
    }

    /// Start the Conductor (health check and initial state)
    pub async fn start(&mut self) -> anyhow::Result<()> {
        self.conductor.start().await
    }

    /// Connect this surface to the Conductor
    pub async fn connect(&mut self) -> anyhow::Result<()> {
        self.send_event(SurfaceEvent::Connected).await
    }

    /// Send a user message to the Conductor
    pub async fn send_message(&mut self, content: String) -> anyhow::Result<()> {
        self.send_event(SurfaceEvent::UserMessage { content }).await
    }

    /// Flip between text and image mode
    pub async fn toggle_mode(&mut self) -> anyhow::Result<()> {
        self.send_event(SurfaceEvent::ToggleMode).await
    }

    /// Start an empty conversation; closes the history panel
    pub async fn new_chat(&mut self) -> anyhow::Result<()> {
        let intent = self.history.new_chat();
        self.send_event(intent.into()).await
    }

    /// Open or close the history panel
    ///
    /// Opening shows the last known list at once and reloads it in the
    /// background.
    pub fn toggle_history(&mut self) {
        if self.history.is_open() {
            self.history.close();
            return;
        }
        self.history.show();
        self.spawn_history(|backend| async move {
            HistoryOutcome::Listed(backend.list_sessions().await)
        });
    }

    /// Close the history panel
    pub fn close_history(&mut self) {
        self.history.close();
    }

    /// Move the history selection down
    pub fn history_next(&mut self) {
        self.history.select_next();
    }

    /// Move the history selection up
    pub fn history_prev(&mut self) {
        self.history.select_prev();
    }

    /// Start loading the selected session; closes the panel
    ///
    /// Returns false when nothing is selected.
    pub async fn open_selected(&mut self) -> anyhow::Result<bool> {
        let Some(intent) = self.history.choose() else {
            return Ok(false);
        };
        self.send_event(intent.into()).await?;
        Ok(true)
    }

    /// Delete the selected session on the server in the background
    pub fn delete_selected(&mut self) {
        let Some(id) = self.history.selected().map(|s| s.id.clone()) else {
            return;
        };
        self.spawn_history(move |backend| async move {
            let result = backend.delete_session(&id).await;
            let listing = if result.is_ok() {
                Some(backend.list_sessions().await)
            } else {
                None
            };
            HistoryOutcome::Deleted {
                id,
                result,
                listing,
            }
        });
    }

    /// Notify Conductor that user wants to quit
    pub async fn request_quit(&mut self) -> anyhow::Result<()> {
        self.send_event(SurfaceEvent::QuitRequested).await
    }

    /// Apply finished network work (must be called regularly)
    ///
    /// Returns true if there was activity.
    pub async fn poll(&mut self) -> bool {
        let exchange = self.conductor.poll_exchange().await;
        let load = self.conductor.poll_load().await;
        let history = self.poll_history().await;
        exchange || load || history
    }

    /// Apply finished history tasks
    pub async fn poll_history(&mut self) -> bool {
        let mut active = false;
        while let Ok(outcome) = self.history_rx.try_recv() {
            self.apply_history(outcome).await;
            active = true;
        }
        active
    }

    /// Wait for the exchange in flight to settle
    pub async fn await_exchange(&mut self) {
        self.conductor.await_exchange().await;
    }

    /// Wait until every reveal is complete
    pub async fn await_reveals(&mut self) {
        self.conductor.await_reveals().await;
    }

    /// Wait for history tasks and the session load in flight
    pub async fn await_background(&mut self) {
        while self.history_pending > 0 {
            let Some(outcome) = self.history_rx.recv().await else {
                break;
            };
            self.apply_history(outcome).await;
        }
        self.conductor.await_load().await;
    }

    /// Whether history or session work is still running
    pub fn has_background_work(&self) -> bool {
        self.history_pending > 0 || self.conductor.is_loading()
    }

    /// Try to receive a message from the Conductor (non-blocking)
    pub fn try_recv(&mut self) -> Option<ConductorMessage> {
        self.local.pop_front().or_else(|| self.rx.try_recv().ok())
    }

    /// Receive all pending messages (non-blocking)
    pub fn recv_all(&mut self) -> Vec<ConductorMessage> {
        let mut messages: Vec<_> = self.local.drain(..).collect();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// What to draw
    pub fn view(&self) -> ConversationView {
        self.conductor.view()
    }

    /// The history panel
    pub fn history(&self) -> &HistoryPanel {
        &self.history
    }

    /// Get the current Conductor state
    pub fn state(&self) -> ConductorState {
        self.conductor.state()
    }

    /// Whether an exchange is in flight
    pub fn is_generating(&self) -> bool {
        self.conductor.is_generating()
    }

    /// Current generation mode
    pub fn mode(&self) -> ChatMode {
        self.conductor.mode()
    }

    /// Send raw surface event to Conductor
    pub async fn send_event(&mut self, event: SurfaceEvent) -> anyhow::Result<()> {
        self.conductor.handle_event(event).await
    }

    fn spawn_history<F, Fut>(&mut self, work: F)
    where
        F: FnOnce(Arc<B>) -> Fut,
        Fut: Future<Output = HistoryOutcome> + Send + 'static,
    {
        let task = work(self.conductor.backend());
        let tx = self.history_tx.clone();
        self.history_pending += 1;
        tokio::spawn(async move {
            // Receiver lives as long as the client
            let _ = tx.send(task.await).await;
        });
    }

    async fn apply_history(&mut self, outcome: HistoryOutcome) {
        self.history_pending = self.history_pending.saturating_sub(1);
        match outcome {
            HistoryOutcome::Listed(listing) => {
                if let Err(e) = self.history.apply_listing(listing) {
                    self.warn(format!("Could not load history: {e}"));
                }
            }
            HistoryOutcome::Deleted {
                id,
                result,
                listing,
            } => {
                if let Err(e) = result {
                    tracing::warn!(session_id = %id, error = %e, "Failed to delete session");
                    self.warn(format!("Could not delete chat: {e}"));
                    return;
                }
                tracing::info!(session_id = %id, "Session deleted");

                if let Some(listing) = listing {
                    // Error already logged by the panel
                    let _ = self.history.apply_listing(listing);
                }
                if let Err(e) = self.send_event(HistoryIntent::Delete(id).into()).await {
                    tracing::warn!(error = %e, "Session delete event failed");
                }
            }
        }
    }

    fn warn(&mut self, message: String) {
        self.local.push_back(ConductorMessage::Notify {
            level: NotifyLevel::Warning,
            message,
        });
    }
}
