//! Typewriter
//!
//! A scoped timer task revealing one message. The task publishes frames on a
//! `watch` channel and stops as soon as its cancellation token fires.

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::Reveal;

/// Shortest tick the timer accepts
const MIN_TICK: Duration = Duration::from_millis(1);

/// What a message currently shows
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RevealFrame {
    /// Visible prefix
    pub text: String,
    /// Ticks elapsed (characters revealed by the timer)
    pub ticks: usize,
    /// Whether the full text is visible
    pub done: bool,
}

/// Handle to a running reveal
///
/// Dropping the handle cancels the reveal.
#[derive(Debug)]
pub struct Typewriter {
    frames: watch::Receiver<RevealFrame>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Typewriter {
    /// Start revealing `text`, one character every `tick`
    ///
    /// Without `animate` (or with empty text) the full text is visible
    /// immediately and no task is spawned. Otherwise this must be called
    /// from within a tokio runtime.
    pub fn spawn(text: impl Into<String>, animate: bool, tick: Duration) -> Self {
        let text = text.into();
        let cancel = CancellationToken::new();

        if !animate || text.is_empty() {
            let (_tx, frames) = watch::channel(RevealFrame {
                text,
                ticks: 0,
                done: true,
            });
            return Self {
                frames,
                cancel,
                task: None,
            };
        }

        let (tx, frames) = watch::channel(RevealFrame::default());
        let task = tokio::spawn(run(text, tick.max(MIN_TICK), tx, cancel.clone()));

        Self {
            frames,
            cancel,
            task: Some(task),
        }
    }

    /// The current frame
    #[must_use]
    pub fn frame(&self) -> RevealFrame {
        self.frames.borrow().clone()
    }

    /// The currently visible text
    #[must_use]
    pub fn visible(&self) -> String {
        self.frames.borrow().text.clone()
    }

    /// Whether the full text is visible
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.frames.borrow().done
    }

    /// A receiver observing every published frame
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RevealFrame> {
        self.frames.clone()
    }

    /// Stop revealing; the current frame stays as it is
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the timer task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait until the text is fully visible or the reveal was cancelled
    pub async fn wait(&mut self) -> RevealFrame {
        let done = self.frames.wait_for(|frame| frame.done).await.map(|f| f.clone());
        done.unwrap_or_else(|_| self.frames.borrow().clone())
    }
}

impl Drop for Typewriter {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run(
    text: String,
    tick: Duration,
    tx: watch::Sender<RevealFrame>,
    cancel: CancellationToken,
) {
    let total = text.chars().count();
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately; the first character shows one tick later
    interval.tick().await;

    for (index, prefix) in Reveal::new(&text).enumerate() {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::trace!(shown = index, total, "Reveal cancelled");
                return;
            }
            _ = interval.tick() => {}
        }

        let ticks = index + 1;
        tx.send_replace(RevealFrame {
            text: prefix.to_string(),
            ticks,
            done: ticks == total,
        });
    }
}
