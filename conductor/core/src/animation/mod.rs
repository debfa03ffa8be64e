//! Typing Animation - Incremental Reveal of Replies
//!
//! Fresh bot replies are revealed one character per tick so the user sees
//! generation "happen", while already-complete history shows up at once.
//!
//! # Architecture
//!
//! ```text
//! frames(text, animate)      pure, lazy sequence of visible prefixes
//!     │
//!     └─→ Typewriter         one tokio task per message, publishes the
//!            │               current prefix on a watch channel every tick
//!            │
//!            └─→ RevealSet   typewriters of the current conversation,
//!                            keyed by MessageId; dropping it cancels all
//! ```
//!
//! Each typewriter owns a `CancellationToken`. Dropping the handle (or
//! calling [`Typewriter::cancel`]) stops the task before its next tick, so a
//! conversation that was replaced never gets written to again.

mod reveal_set;
mod typewriter;

use std::str::CharIndices;
use std::time::Duration;

pub use reveal_set::RevealSet;
pub use typewriter::{RevealFrame, Typewriter};

/// Default delay between two revealed characters
pub const DEFAULT_TICK: Duration = Duration::from_millis(12);

/// Visible prefixes of `text`, one per character, ending with `text` itself
///
/// Empty text yields nothing.
#[derive(Clone, Debug)]
pub struct Reveal<'a> {
    text: &'a str,
    chars: CharIndices<'a>,
}

impl<'a> Reveal<'a> {
    /// Reveal `text` from an empty prefix
    #[must_use]
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            chars: text.char_indices(),
        }
    }
}

impl<'a> Iterator for Reveal<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        self.chars
            .next()
            .map(|(start, c)| &self.text[..start + c.len_utf8()])
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.chars.size_hint()
    }
}

/// Observable frames of a message
#[derive(Clone, Debug)]
pub enum Frames<'a> {
    /// The whole text at once
    Whole(Option<&'a str>),
    /// Character by character
    Typed(Reveal<'a>),
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::Whole(text) => text.take(),
            Self::Typed(reveal) => reveal.next(),
        }
    }
}

/// Frames a message goes through before it is fully visible
///
/// Without animation the full text is the only frame. With animation every
/// frame adds one character.
#[must_use]
pub fn frames(text: &str, animate: bool) -> Frames<'_> {
    if animate {
        Frames::Typed(Reveal::new(text))
    } else {
        Frames::Whole(Some(text))
    }
}
