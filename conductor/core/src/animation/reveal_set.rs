//! Reveals of the current conversation

use std::collections::HashMap;
use std::time::Duration;

use super::{Typewriter, DEFAULT_TICK};
use crate::messages::{Message, MessageId};

/// Typewriters keyed by message
///
/// Only animated messages get an entry. Clearing (or dropping) the set
/// cancels every reveal it holds.
#[derive(Debug)]
pub struct RevealSet {
    tick: Duration,
    typewriters: HashMap<MessageId, Typewriter>,
}

impl RevealSet {
    /// Create an empty set revealing one character every `tick`
    #[must_use]
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            typewriters: HashMap::new(),
        }
    }

    /// Tick used for new reveals
    #[must_use]
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Start revealing `message` if it animates
    ///
    /// Starting an id twice restarts its reveal from the empty prefix.
    pub fn start(&mut self, id: MessageId, message: &Message) {
        if !message.animate() {
            return;
        }
        let typewriter = Typewriter::spawn(message.content(), true, self.tick);
        // Replaced typewriter is cancelled on drop
        self.typewriters.insert(id, typewriter);
    }

    /// Visible text of a revealing message
    ///
    /// `None` means the message has no reveal and shows its full content.
    #[must_use]
    pub fn visible(&self, id: &MessageId) -> Option<String> {
        self.typewriters.get(id).map(Typewriter::visible)
    }

    /// Whether the message is still being typed
    #[must_use]
    pub fn is_revealing(&self, id: &MessageId) -> bool {
        self.typewriters.get(id).is_some_and(|tw| !tw.is_done())
    }

    /// Whether any message is still being typed
    #[must_use]
    pub fn any_revealing(&self) -> bool {
        self.typewriters.values().any(|tw| !tw.is_done())
    }

    /// Get a typewriter
    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&Typewriter> {
        self.typewriters.get(id)
    }

    /// Get a typewriter mutably (to await it)
    pub fn get_mut(&mut self, id: &MessageId) -> Option<&mut Typewriter> {
        self.typewriters.get_mut(id)
    }

    /// Wait until every reveal finished or was cancelled
    pub async fn wait_all(&mut self) {
        for typewriter in self.typewriters.values_mut() {
            typewriter.wait().await;
        }
    }

    /// Cancel and forget every reveal
    pub fn clear(&mut self) {
        if !self.typewriters.is_empty() {
            tracing::debug!(count = self.typewriters.len(), "Cancelling reveals");
        }
        self.typewriters.clear();
    }

    /// Number of tracked reveals
    #[must_use]
    pub fn len(&self) -> usize {
        self.typewriters.len()
    }

    /// Whether no reveal is tracked
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.typewriters.is_empty()
    }
}

impl Default for RevealSet {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}
