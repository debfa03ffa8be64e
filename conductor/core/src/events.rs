//! Surface Events
//!
//! Events sent from UI surfaces to the Conductor. These represent all the ways
//! a UI can report user actions to the conversation state machine.
//!
//! # Design Philosophy
//!
//! UI surfaces are "dumb" renderers that forward user actions to the Conductor.
//! They don't interpret what actions mean - they just report what happened.
//! The Conductor decides how to respond.

use serde::{Deserialize, Serialize};

use crate::backend::SessionSummary;
use crate::messages::{ChatMode, SessionId};

/// Events from UI Surface to Conductor
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceEvent {
    // ============================================
    // Lifecycle Events
    // ============================================
    /// Surface connected; the Conductor replays its state
    Connected,

    /// User wants to quit
    QuitRequested,

    // ============================================
    // Input Events
    // ============================================
    /// User submitted a prompt (sent in the current mode)
    UserMessage {
        /// The raw input
        content: String,
    },

    /// User flipped the text/image switch
    ToggleMode,

    /// User picked a mode explicitly
    SetMode {
        /// The requested mode
        mode: ChatMode,
    },

    // ============================================
    // History Events
    // ============================================
    /// User started a new chat
    NewChat,

    /// User opened a stored session
    OpenSession {
        /// The session as listed by the history panel
        summary: SessionSummary,
    },

    /// A stored session was deleted on the server
    SessionDeleted {
        /// The deleted session
        session_id: SessionId,
    },
}

impl SurfaceEvent {
    /// Create a user message event
    pub fn user_message(content: impl Into<String>) -> Self {
        Self::UserMessage {
            content: content.into(),
        }
    }

    /// Whether this event touches the network
    #[must_use]
    pub fn needs_network(&self) -> bool {
        matches!(self, Self::UserMessage { .. } | Self::OpenSession { .. })
    }
}
