//! Chat Backend Traits
//!
//! Trait definitions for the remote chat API. This abstraction lets the
//! Conductor work against the real HTTP server, or a mock in tests, without
//! changing core logic.
//!
//! # Design Philosophy
//!
//! The API is split in two seams:
//! - [`Generator`]: produce a reply (text completion or image) for a prompt
//! - [`SessionStore`]: list, fetch, save and delete persisted sessions
//!
//! Both are plain request/response: no retry, no interpretation of error
//! bodies. Any failure is handed back to the caller as an [`ApiError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messages::{ChatMode, Message, SessionId};

/// Errors from the chat API
#[derive(Debug, Error)]
pub enum ApiError {
    /// The HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced a response
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        /// Endpoint path
        endpoint: String,
        /// Underlying transport error
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        /// Endpoint path
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Response body, verbatim
        body: String,
    },

    /// The response body did not have the expected shape
    #[error("invalid response from {endpoint}: {source}")]
    Decode {
        /// Endpoint path
        endpoint: String,
        /// Parse error
        #[source]
        source: serde_json::Error,
    },

    /// Any other failure (used by non-HTTP implementations)
    #[error("{0}")]
    Other(String),
}

/// A persisted session as listed by the server
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier
    pub id: SessionId,
    /// Title (the first prompt, truncated server-side)
    #[serde(default)]
    pub title: Option<String>,
}

impl SessionSummary {
    /// Create a summary
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(id),
            title: Some(title.into()),
        }
    }
}

/// A stored message record, as returned by `/get-chat/{id}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMessage {
    /// `"user"` for prompts, anything else for replies
    pub role: String,
    /// Prompt text, reply text or image URL
    pub content: String,
    /// `"image"` for image replies
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl RemoteMessage {
    /// Map a stored record to a conversation message
    ///
    /// History is already complete, so nothing loaded here animates.
    #[must_use]
    pub fn into_message(self) -> Message {
        if self.role == "user" {
            return Message::user(self.content);
        }
        match self.kind.as_deref() {
            Some("image") => Message::image(self.content, false),
            _ => Message::bot(self.content, false),
        }
    }
}

/// One exchange to persist (`POST /save-chat`)
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveRequest {
    /// Session to append to; `None` creates a new session
    pub chat_id: Option<SessionId>,
    /// The user's prompt
    pub prompt: String,
    /// The reply text or image URL
    pub response: String,
    /// Mode the reply was generated in
    pub mode: ChatMode,
}

/// Response of `POST /save-chat`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveResponse {
    /// The authoritative session identifier
    pub chat_id: SessionId,
}

/// A generated reply
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Text completion
    Text(String),
    /// Image URL
    Image(String),
}

impl Reply {
    /// The payload persisted as the exchange's response
    #[must_use]
    pub fn payload(&self) -> &str {
        match self {
            Self::Text(text) | Self::Image(text) => text,
        }
    }

    /// Mode the reply belongs to
    #[must_use]
    pub fn mode(&self) -> ChatMode {
        match self {
            Self::Text(_) => ChatMode::Text,
            Self::Image(_) => ChatMode::Image,
        }
    }

    /// The animated conversation message for a fresh reply
    #[must_use]
    pub fn into_message(self) -> Message {
        match self {
            Self::Text(text) => Message::bot(text, true),
            Self::Image(url) => Message::image(url, true),
        }
    }
}

/// Reply generation
#[async_trait]
pub trait Generator: Send + Sync {
    /// Get the backend name
    fn name(&self) -> &str;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Text completion for a prompt
    async fn generate_text(&self, prompt: &str) -> Result<String, ApiError>;

    /// Image URL for a prompt
    async fn generate_image(&self, prompt: &str) -> Result<String, ApiError>;

    /// Generate a reply in the given mode
    async fn generate(&self, prompt: &str, mode: ChatMode) -> Result<Reply, ApiError> {
        match mode {
            ChatMode::Text => self.generate_text(prompt).await.map(Reply::Text),
            ChatMode::Image => self.generate_image(prompt).await.map(Reply::Image),
        }
    }
}

/// Persisted sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// All sessions, newest first
    async fn list_sessions(&self) -> Result<Vec<SessionSummary>, ApiError>;

    /// Every stored message of one session, in order
    async fn fetch_messages(&self, id: &SessionId) -> Result<Vec<RemoteMessage>, ApiError>;

    /// Persist one exchange, returning the session it was stored in
    async fn save_exchange(&self, record: &SaveRequest) -> Result<SaveResponse, ApiError>;

    /// Delete a session
    async fn delete_session(&self, id: &SessionId) -> Result<(), ApiError>;
}

/// A complete chat backend: generation plus persistence
pub trait ChatBackend: Generator + SessionStore {}

impl<T: Generator + SessionStore> ChatBackend for T {}
