//! SmartChat TUI - Terminal interface for SmartChat
//!
//! A full-screen chat client on top of `smartchat-core`.
//!
//! # Architecture
//!
//! - **App**: Event loop, key handling, rendering
//! - **ConductorClient**: Embedded Conductor plus the history panel
//! - **Display**: Display state and conversation line layout
//! - **Theme**: Colors

pub mod app;
pub mod conductor_client;
pub mod display;
pub mod theme;

pub use app::App;
pub use conductor_client::ConductorClient;
