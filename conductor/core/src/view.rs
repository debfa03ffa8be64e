//! Conversation View
//!
//! A render-ready projection of the conversation: every message with the
//! text it currently shows. Surfaces draw this and nothing else.

use crate::animation::RevealSet;
use crate::messages::{ChatMode, ConductorState, Message, MessageId, SessionId};
use crate::session::ConversationState;

/// Kind of a rendered message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// User prompt
    User,
    /// Text reply
    Bot,
    /// Image reply (the text is its URL)
    Image,
}

impl From<&Message> for MessageKind {
    fn from(message: &Message) -> Self {
        match message {
            Message::User { .. } => Self::User,
            Message::Bot { .. } => Self::Bot,
            Message::Image { .. } => Self::Image,
        }
    }
}

/// One message as currently visible
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageView {
    /// Message ID
    pub id: MessageId,
    /// Message kind
    pub kind: MessageKind,
    /// Visible text (a prefix of the content while revealing)
    pub text: String,
    /// Whether the text is still being typed
    pub revealing: bool,
}

/// Everything a surface needs to draw the conversation
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationView {
    /// Messages in order
    pub messages: Vec<MessageView>,
    /// Whether an exchange is in flight
    pub generating: bool,
    /// Current mode
    pub mode: ChatMode,
    /// Active session
    pub session_id: Option<SessionId>,
}

impl ConversationView {
    /// State for the status bar
    #[must_use]
    pub fn state(&self) -> ConductorState {
        if self.generating {
            ConductorState::Sending
        } else {
            ConductorState::Idle
        }
    }

    /// Input placeholder for the current mode
    #[must_use]
    pub fn placeholder(&self) -> &'static str {
        self.mode.placeholder()
    }

    /// Whether any message is still being typed
    #[must_use]
    pub fn is_revealing(&self) -> bool {
        self.messages.iter().any(|m| m.revealing)
    }
}

/// Project the conversation and its reveals into a view
#[must_use]
pub fn project(state: &ConversationState, reveals: &RevealSet) -> ConversationView {
    let messages = state
        .messages()
        .iter()
        .map(|entry| MessageView {
            id: entry.id.clone(),
            kind: MessageKind::from(&entry.message),
            text: reveals
                .visible(&entry.id)
                .unwrap_or_else(|| entry.message.content().to_string()),
            revealing: reveals.is_revealing(&entry.id),
        })
        .collect();

    ConversationView {
        messages,
        generating: state.is_generating(),
        mode: state.mode(),
        session_id: state.session_id().cloned(),
    }
}
