//! Chat Backend Integration
//!
//! This module provides abstracted access to the chat server (reply
//! generation and session persistence) through a pair of traits.
//!
//! # Available Backends
//!
//! - **Http**: the SmartChat JSON API (default)
//!
//! # Usage
//!
//! ```ignore
//! use smartchat_core::backend::{ChatMode, Generator, HttpBackend, SessionStore};
//!
//! let backend = HttpBackend::new("http://localhost:5000")?;
//! let reply = backend.generate("2+2?", ChatMode::Text).await?;
//! let sessions = backend.list_sessions().await?;
//! ```

mod http;
mod traits;

pub use crate::messages::ChatMode;
pub use http::HttpBackend;
pub use traits::{
    ApiError, ChatBackend, Generator, RemoteMessage, Reply, SaveRequest, SaveResponse,
    SessionStore, SessionSummary,
};
