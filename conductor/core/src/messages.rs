//! Conductor Messages
//!
//! The conversation data model and the messages sent from the Conductor to UI
//! surfaces.
//!
//! # Design Philosophy
//!
//! The Conductor owns the conversation. UI surfaces are pure renderers that
//! display a projection of it (see [`crate::view`]) and react to the
//! [`ConductorMessage`]s it emits for everything that is not part of the
//! message list itself: state changes, session changes, notifications.

use serde::{Deserialize, Serialize};

/// Text shown in place of a reply when an exchange fails
pub const SERVER_ERROR_TEXT: &str = "❌ Server error";

/// Messages from Conductor to UI Surface
///
/// These messages tell the UI what changed and how to behave.
/// The UI should not have any business logic - just render what it's told.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConductorMessage {
    /// Conductor state change
    State {
        /// The new state
        state: ConductorState,
    },

    /// The active session changed (promoted, opened, reset or deleted)
    SessionChanged {
        /// The active session, `None` for an unsaved conversation
        session_id: Option<SessionId>,
    },

    /// The generation mode changed
    ModeChanged {
        /// The new mode
        mode: ChatMode,
    },

    /// The surface should clear its input buffer
    ///
    /// Sent once per exchange, after it settled (success or failure).
    ClearInput,

    /// System notification
    Notify {
        /// Notification level
        level: NotifyLevel,
        /// Message content
        message: String,
    },
}

/// Message identifier
///
/// Local to this process; used to key per-message display state such as
/// typing animations. Never sent to the chat server.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Session identifier
///
/// Opaque; issued by the chat server when the first exchange of a
/// conversation is saved.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    /// Wrap a server-issued identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Generation mode (the text/image toggle)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    /// Text completion
    #[default]
    Text,
    /// Image generation
    Image,
}

impl ChatMode {
    /// The other mode
    #[must_use]
    pub fn toggled(self) -> Self {
        match self {
            Self::Text => Self::Image,
            Self::Image => Self::Text,
        }
    }

    /// Wire name, as stored by the chat server
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
        }
    }

    /// Input placeholder for this mode
    #[must_use]
    pub fn placeholder(self) -> &'static str {
        match self {
            Self::Text => "Ask something...",
            Self::Image => "Describe image...",
        }
    }
}

impl std::str::FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            other => Err(format!("unknown chat mode: {other}")),
        }
    }
}

/// A conversation message
///
/// The content is fixed at creation, and so is `animate`: history loaded
/// from the server is never re-animated, fresh replies always are.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// User prompt
    User {
        /// Prompt text
        text: String,
    },
    /// Text reply
    Bot {
        /// Reply text
        text: String,
        /// Whether the reply is revealed with a typing animation
        animate: bool,
    },
    /// Generated image
    Image {
        /// Image location
        url: String,
        /// Whether the reply is revealed with a typing animation
        animate: bool,
    },
}

impl Message {
    /// Create a user message
    pub fn user(text: impl Into<String>) -> Self {
        Self::User { text: text.into() }
    }

    /// Create a text reply
    pub fn bot(text: impl Into<String>, animate: bool) -> Self {
        Self::Bot {
            text: text.into(),
            animate,
        }
    }

    /// Create an image reply
    pub fn image(url: impl Into<String>, animate: bool) -> Self {
        Self::Image {
            url: url.into(),
            animate,
        }
    }

    /// The synthetic reply appended when an exchange fails
    #[must_use]
    pub fn server_error() -> Self {
        Self::bot(SERVER_ERROR_TEXT, true)
    }

    /// Text or URL carried by the message
    #[must_use]
    pub fn content(&self) -> &str {
        match self {
            Self::User { text } | Self::Bot { text, .. } => text,
            Self::Image { url, .. } => url,
        }
    }

    /// Whether the message should be revealed with a typing animation
    #[must_use]
    pub fn animate(&self) -> bool {
        match self {
            Self::User { .. } => false,
            Self::Bot { animate, .. } | Self::Image { animate, .. } => *animate,
        }
    }

    /// Whether this is the user's side of the exchange
    #[must_use]
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }
}

/// Notification levels
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotifyLevel {
    /// Informational
    Info,
    /// Warning
    Warning,
    /// Error
    Error,
}

/// Conductor operational states
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConductorState {
    /// Ready for input
    #[default]
    Idle,
    /// An exchange is in flight
    Sending,
}

impl ConductorState {
    /// Human-readable description
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Sending => "Generating...",
        }
    }
}
