//! SmartChat Core - Headless Chat Client
//!
//! This crate provides the conversation logic of SmartChat, completely
//! independent of any UI framework. It can drive a TUI, or run headless for
//! testing/automation.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                        UI Surface (TUI)                          │
//! │        renders ConversationView, owns the input buffer           │
//! │                           │                                      │
//! │                    SurfaceEvent (up)                             │
//! │                  ConductorMessage (down)                         │
//! └───────────────────────────┼──────────────────────────────────────┘
//!                             │
//! ┌───────────────────────────┼──────────────────────────────────────┐
//! │                    SMARTCHAT CORE                                │
//! │  ┌────────────────────────┴─────────────────────────────────────┐│
//! │  │                      Conductor                               ││
//! │  │  ┌──────────────┐  ┌──────────────┐  ┌─────────────────────┐ ││
//! │  │  │ Conversation │  │  RevealSet   │  │ Backend (Generator  │ ││
//! │  │  │    State     │  │ (typewriter) │  │  + SessionStore)    │ ││
//! │  │  └──────────────┘  └──────────────┘  └─────────────────────┘ ││
//! │  └──────────────────────────────────────────────────────────────┘│
//! │  ┌──────────────┐                                                │
//! │  │ HistoryPanel │ ── HistoryIntent ──→ SurfaceEvent              │
//! │  └──────────────┘                                                │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Key Types
//!
//! - [`Conductor`]: The conversation state machine
//! - [`ConductorMessage`]: Messages sent from Conductor to UI surfaces
//! - [`SurfaceEvent`]: Events sent from UI surfaces to Conductor
//! - [`ConversationView`]: What a surface draws
//! - [`HistoryPanel`]: The list of stored sessions
//! - [`Typewriter`]: Typing reveal of one message
//!
//! # Quick Start
//!
//! ```ignore
//! use smartchat_core::{
//!     backend::HttpBackend, load_config, Conductor, ConductorConfig, SurfaceEvent,
//! };
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = load_config()?;
//!     let (tx, mut rx) = mpsc::channel(100);
//!
//!     let backend = HttpBackend::from_config(&config.api)?;
//!     let mut conductor = Conductor::new(backend, ConductorConfig::from(&config), tx);
//!     conductor.start().await?;
//!
//!     conductor.handle_event(SurfaceEvent::user_message("2+2?")).await?;
//!
//!     loop {
//!         // Apply finished network work
//!         conductor.poll_exchange().await;
//!
//!         // Handle messages from the Conductor
//!         while let Ok(msg) = rx.try_recv() {
//!             // Update status bar, clear input, show notifications
//!         }
//!
//!         // Render
//!         let view = conductor.view();
//!     }
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`animation`]: Typing reveal (frames, typewriter tasks)
//! - [`backend`]: Chat server abstraction and its HTTP client
//! - [`conductor`]: Main Conductor struct
//! - [`config`]: TOML + environment configuration
//! - [`events`]: Events from UI surfaces to Conductor
//! - [`history`]: History panel model
//! - [`messages`]: Conversation data model and Conductor → surface messages
//! - [`session`]: Conversation state
//! - [`view`]: Render projection
//!
//! # No TUI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any other
//! UI framework. It's pure client logic that can be used anywhere.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animation;
pub mod backend;
pub mod conductor;
pub mod config;
pub mod events;
pub mod history;
pub mod messages;
pub mod session;
pub mod view;

// Re-exports for convenience
pub use animation::{frames, RevealFrame, RevealSet, Typewriter, DEFAULT_TICK};
pub use backend::{
    ApiError, ChatBackend, Generator, HttpBackend, RemoteMessage, Reply, SaveRequest,
    SaveResponse, SessionStore, SessionSummary,
};
pub use conductor::{Conductor, ConductorConfig, ExchangeError};
pub use events::SurfaceEvent;
pub use history::{HistoryIntent, HistoryPanel};
pub use messages::{
    ChatMode, ConductorMessage, ConductorState, Message, MessageId, NotifyLevel, SessionId,
    SERVER_ERROR_TEXT,
};
pub use session::{ConversationMessage, ConversationState};
pub use view::{ConversationView, MessageKind, MessageView};

// Config exports
pub use config::{
    default_config_path, load_config, load_config_from_path, ApiConfig, ClientConfig,
    ClientToml, ConfigError, ConfigSource,
};
