//! Conversation State
//!
//! The in-memory conversation of the active session.
//!
//! # Design Philosophy
//!
//! Messages are append-only while a conversation is live and replaced
//! wholesale when the user switches sessions. Every replacement bumps the
//! conversation epoch, so work started against an earlier message list can
//! recognise that its conversation is gone.

use serde::{Deserialize, Serialize};

use crate::messages::{ChatMode, Message, MessageId, SessionId};

/// A message in the conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Local message ID
    pub id: MessageId,
    /// The message itself
    pub message: Message,
}

impl ConversationMessage {
    /// Wrap a message with a fresh ID
    pub fn new(message: Message) -> Self {
        Self {
            id: MessageId::new(),
            message,
        }
    }
}

/// State of the active conversation
#[derive(Clone, Debug, Default)]
pub struct ConversationState {
    messages: Vec<ConversationMessage>,
    session_id: Option<SessionId>,
    generating: bool,
    mode: ChatMode,
    epoch: u64,
}

impl ConversationState {
    /// Create an empty, unsaved conversation
    #[must_use]
    pub fn new(mode: ChatMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// Messages in order
    #[must_use]
    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    /// Message values in order, without their IDs
    pub fn message_values(&self) -> impl Iterator<Item = &Message> + '_ {
        self.messages.iter().map(|m| &m.message)
    }

    /// Number of messages
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether there are no messages
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message, returning its ID
    pub fn push(&mut self, message: Message) -> MessageId {
        let entry = ConversationMessage::new(message);
        let id = entry.id.clone();
        self.messages.push(entry);
        id
    }

    /// Replace the whole conversation
    pub fn replace(&mut self, session_id: Option<SessionId>, messages: Vec<Message>) {
        self.messages = messages.into_iter().map(ConversationMessage::new).collect();
        self.session_id = session_id;
        self.epoch += 1;

        tracing::debug!(
            session_id = ?self.session_id,
            messages = self.messages.len(),
            epoch = self.epoch,
            "Conversation replaced"
        );
    }

    /// Reset to an empty, unsaved conversation
    pub fn reset(&mut self) {
        self.replace(None, Vec::new());
    }

    /// The persisted session, `None` until the first exchange is saved
    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Adopt the session the server stored an exchange in
    ///
    /// Does not touch the messages or the epoch.
    pub fn set_session_id(&mut self, session_id: SessionId) {
        self.session_id = Some(session_id);
    }

    /// Whether an exchange is in flight
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.generating
    }

    /// Set the in-flight flag
    pub fn set_generating(&mut self, generating: bool) {
        self.generating = generating;
    }

    /// Current generation mode
    #[must_use]
    pub fn mode(&self) -> ChatMode {
        self.mode
    }

    /// Set the generation mode
    pub fn set_mode(&mut self, mode: ChatMode) {
        self.mode = mode;
    }

    /// Identifies the current message list instance
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}
