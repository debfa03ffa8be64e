//! Display State Types
//!
//! Types that represent the current display state for the TUI.
//! These are derived from ConductorMessages and ConversationViews and used
//! for rendering.
//!
//! # Design Philosophy
//!
//! The TUI is a "thin client" - it just renders what the Conductor tells it to.
//! Display state is the bridge between ConductorMessages and rendering.
//!
//! - DisplayState: status bar, mode, notifications
//! - DisplayLine: one wrapped line of the conversation

use std::time::Duration;

use smartchat_core::{
    ChatMode, ConductorMessage, ConductorState, ConversationView, MessageKind, NotifyLevel,
    SessionId,
};

/// How long a notification stays on screen
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(5);

/// Duration of one loading indicator step
pub const DOTS_STEP: Duration = Duration::from_millis(400);

/// Who a rendered line belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayRole {
    /// User prompt
    User,
    /// Text reply
    Bot,
    /// Image reply
    Image,
    /// Loading indicator while a reply is generated
    Loading,
}

impl From<MessageKind> for DisplayRole {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::User => Self::User,
            MessageKind::Bot => Self::Bot,
            MessageKind::Image => Self::Image,
        }
    }
}

impl DisplayRole {
    /// Get the display prefix for this role
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::User => "You: ",
            Self::Bot | Self::Loading => "SmartAI: ",
            Self::Image => "[image] ",
        }
    }
}

/// One wrapped line of the conversation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayLine {
    /// Line text
    pub text: String,
    /// Owner of the line, `None` for the spacer between messages
    pub role: Option<DisplayRole>,
}

impl DisplayLine {
    fn spacer() -> Self {
        Self {
            text: String::new(),
            role: None,
        }
    }
}

/// Number of dots (1 to 3) of the loading indicator after `elapsed`
pub fn loading_dots(elapsed: Duration) -> usize {
    let steps = elapsed.as_millis() / DOTS_STEP.as_millis();
    // Always 0..=2 before the cast
    (steps % 3) as usize + 1
}

/// Wrap the conversation into lines of at most `width` columns
///
/// Revealing messages get a trailing `_` cursor. While generating, a
/// loading indicator with `dots` dots follows the last message.
pub fn conversation_lines(view: &ConversationView, width: usize, dots: usize) -> Vec<DisplayLine> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for message in &view.messages {
        let role = DisplayRole::from(message.kind);
        let cursor = if message.revealing { "_" } else { "" };
        let content = format!("{}{}{}", role.prefix(), message.text, cursor);
        push_wrapped(&mut lines, &content, role, width);
        lines.push(DisplayLine::spacer());
    }

    if view.generating {
        let content = format!("{}{}", DisplayRole::Loading.prefix(), ".".repeat(dots));
        push_wrapped(&mut lines, &content, DisplayRole::Loading, width);
    }

    lines
}

fn push_wrapped(lines: &mut Vec<DisplayLine>, content: &str, role: DisplayRole, width: usize) {
    for line in textwrap::wrap(content, width) {
        lines.push(DisplayLine {
            text: line.into_owned(),
            role: Some(role),
        });
    }
}

/// Status bar text
pub fn status_text(state: ConductorState, mode: ChatMode, dots: usize, scroll_offset: usize) -> String {
    let state_str = match state {
        // Replace the static ellipsis with the animated one
        ConductorState::Sending => format!("Generating{}", ".".repeat(dots)),
        ConductorState::Idle => state.description().to_string(),
    };

    let scroll_info = if scroll_offset > 0 {
        format!(" [^{scroll_offset} lines - PgDn to scroll]")
    } else {
        String::new()
    };

    format!(
        " {state_str} | {} mode | Tab mode | Ctrl+H history | Ctrl+N new | Esc quit{scroll_info}",
        mode.as_str()
    )
}

/// The full display state for the TUI
#[derive(Debug, Default)]
pub struct DisplayState {
    /// Conductor state
    pub conductor_state: ConductorState,
    /// Current generation mode
    pub mode: ChatMode,
    /// Active session
    pub session_id: Option<SessionId>,
    /// Pending notification (if any)
    pub notification: Option<DisplayNotification>,
    /// Set by ClearInput until the app consumes it
    clear_input: bool,
}

impl DisplayState {
    /// Create a new display state
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a ConductorMessage to update display state
    pub fn apply_message(&mut self, msg: ConductorMessage) {
        match msg {
            ConductorMessage::State { state } => {
                self.conductor_state = state;
            }
            ConductorMessage::SessionChanged { session_id } => {
                self.session_id = session_id;
            }
            ConductorMessage::ModeChanged { mode } => {
                self.mode = mode;
            }
            ConductorMessage::ClearInput => {
                self.clear_input = true;
            }
            ConductorMessage::Notify { level, message } => {
                self.notification = Some(DisplayNotification {
                    level,
                    message,
                    remaining: NOTIFICATION_TTL,
                });
            }
        }
    }

    /// Update timers
    pub fn update(&mut self, delta: Duration) {
        if let Some(notification) = &mut self.notification {
            notification.remaining = notification.remaining.saturating_sub(delta);
            if notification.remaining.is_zero() {
                self.notification = None;
            }
        }
    }

    /// Whether the input should be cleared; resets the flag
    pub fn take_clear_input(&mut self) -> bool {
        std::mem::take(&mut self.clear_input)
    }

    /// Clear the notification
    pub fn clear_notification(&mut self) {
        self.notification = None;
    }
}

/// A notification to display
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DisplayNotification {
    /// Notification level
    pub level: NotifyLevel,
    /// Message content
    pub message: String,
    /// Time left on screen
    pub remaining: Duration,
}
