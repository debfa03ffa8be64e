//! History Panel
//!
//! Model of the list of stored sessions. The panel only talks to the
//! [`SessionStore`]; it never touches the conversation. What the user picks
//! is handed upward as a [`HistoryIntent`] for the Conductor to act on.

use crate::backend::{ApiError, SessionStore, SessionSummary};
use crate::events::SurfaceEvent;
use crate::messages::SessionId;

/// Maximum characters of a row title
pub const TITLE_WIDTH: usize = 30;

/// Row title for sessions without one
pub const UNTITLED: &str = "New Chat";

/// What the user asked for in the panel
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HistoryIntent {
    /// Open a stored session
    Select(SessionSummary),
    /// Start an empty conversation
    NewChat,
    /// A session was deleted on the server
    Delete(SessionId),
}

impl From<HistoryIntent> for SurfaceEvent {
    fn from(intent: HistoryIntent) -> Self {
        match intent {
            HistoryIntent::Select(summary) => Self::OpenSession { summary },
            HistoryIntent::NewChat => Self::NewChat,
            HistoryIntent::Delete(session_id) => Self::SessionDeleted { session_id },
        }
    }
}

/// Display title of a session
///
/// Missing or empty titles show as [`UNTITLED`]; anything else is cut to
/// [`TITLE_WIDTH`] characters.
#[must_use]
pub fn row_title(summary: &SessionSummary) -> String {
    match summary.title.as_deref() {
        Some(title) if !title.is_empty() => title.chars().take(TITLE_WIDTH).collect(),
        _ => UNTITLED.to_string(),
    }
}

/// The history list with its selection cursor
#[derive(Clone, Debug, Default)]
pub struct HistoryPanel {
    entries: Vec<SessionSummary>,
    selected: usize,
    open: bool,
}

impl HistoryPanel {
    /// Create a closed, empty panel
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the panel is shown
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Show the panel with a fresh list
    ///
    /// The panel opens even if the list cannot be fetched; it then shows
    /// whatever it listed before.
    ///
    /// # Errors
    ///
    /// Returns the list failure.
    pub async fn open<S>(&mut self, store: &S) -> Result<(), ApiError>
    where
        S: SessionStore + ?Sized,
    {
        self.show();
        self.refresh(store).await
    }

    /// Show the panel with the entries it already has
    pub fn show(&mut self) {
        self.open = true;
    }

    /// Hide the panel
    pub fn close(&mut self) {
        self.open = false;
    }

    /// Open a closed panel, close an open one
    ///
    /// # Errors
    ///
    /// Returns the list failure when opening.
    pub async fn toggle<S>(&mut self, store: &S) -> Result<(), ApiError>
    where
        S: SessionStore + ?Sized,
    {
        if self.open {
            self.close();
            Ok(())
        } else {
            self.open(store).await
        }
    }

    /// Reload the list from the store
    ///
    /// # Errors
    ///
    /// On failure the previous entries are kept and the error is returned.
    pub async fn refresh<S>(&mut self, store: &S) -> Result<(), ApiError>
    where
        S: SessionStore + ?Sized,
    {
        self.apply_listing(store.list_sessions().await)
    }

    /// Take a list fetched elsewhere
    ///
    /// # Errors
    ///
    /// On failure the previous entries are kept and the error is returned.
    pub fn apply_listing(
        &mut self,
        listing: Result<Vec<SessionSummary>, ApiError>,
    ) -> Result<(), ApiError> {
        match listing {
            Ok(entries) => {
                tracing::debug!(count = entries.len(), "History refreshed");
                self.entries = entries;
                self.clamp_selection();
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to list sessions");
                Err(e)
            }
        }
    }

    /// Listed sessions, as the server ordered them
    #[must_use]
    pub fn entries(&self) -> &[SessionSummary] {
        &self.entries
    }

    /// Row titles in order
    #[must_use]
    pub fn rows(&self) -> Vec<String> {
        self.entries.iter().map(row_title).collect()
    }

    /// Index of the selected row
    #[must_use]
    pub fn selected_index(&self) -> usize {
        self.selected
    }

    /// The selected session
    #[must_use]
    pub fn selected(&self) -> Option<&SessionSummary> {
        self.entries.get(self.selected)
    }

    /// Move the cursor down, stopping at the last row
    pub fn select_next(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    /// Move the cursor up, stopping at the first row
    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Open the selected session; closes the panel
    pub fn choose(&mut self) -> Option<HistoryIntent> {
        let summary = self.selected()?.clone();
        self.close();
        Some(HistoryIntent::Select(summary))
    }

    /// Start a new chat; closes the panel
    pub fn new_chat(&mut self) -> HistoryIntent {
        self.close();
        HistoryIntent::NewChat
    }

    /// Delete a session on the server, then reload the list
    ///
    /// # Errors
    ///
    /// Returns the delete failure; the entries stay as they were. A failed
    /// reload after a successful delete is only logged.
    pub async fn delete<S>(&mut self, store: &S, id: &SessionId) -> Result<HistoryIntent, ApiError>
    where
        S: SessionStore + ?Sized,
    {
        if let Err(e) = store.delete_session(id).await {
            tracing::warn!(session_id = %id, error = %e, "Failed to delete session");
            return Err(e);
        }
        tracing::info!(session_id = %id, "Session deleted");

        // Error already logged by refresh
        let _ = self.refresh(store).await;

        Ok(HistoryIntent::Delete(id.clone()))
    }

    /// Delete the selected session
    ///
    /// # Errors
    ///
    /// Same as [`HistoryPanel::delete`].
    pub async fn delete_selected<S>(&mut self, store: &S) -> Result<Option<HistoryIntent>, ApiError>
    where
        S: SessionStore + ?Sized,
    {
        let Some(id) = self.selected().map(|s| s.id.clone()) else {
            return Ok(None);
        };
        self.delete(store, &id).await.map(Some)
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.entries.len().saturating_sub(1));
    }
}
