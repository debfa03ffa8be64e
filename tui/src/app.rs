//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, resize)
//! - ConductorClient for conversation and history
//! - DisplayState for rendering
//!
//! The App:
//! 1. Converts terminal events to SurfaceEvents or history panel calls
//! 2. Sends them to the embedded Conductor via ConductorClient
//! 3. Receives ConductorMessages and updates DisplayState
//! 4. Renders the ConversationView and DisplayState

use std::time::{Duration, Instant};

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use smartchat_core::{
    ChatBackend, ClientConfig, ConductorMessage, ConversationView, HttpBackend, NotifyLevel,
};

use crate::conductor_client::ConductorClient;
use crate::display::{
    conversation_lines, loading_dots, status_text, DisplayLine, DisplayRole, DisplayState,
};
use crate::theme::{
    ACCENT_YELLOW, DIM_GRAY, ERROR_RED, FADE_SHADES, IMAGE_BLUE, SELECTION_BG, SMARTAI_CYAN,
    USER_GREEN, WARNING_ORANGE,
};

/// Input box height (lines) for text wrapping
const INPUT_HEIGHT: u16 = 5;

/// Width of the history overlay
const HISTORY_WIDTH: u16 = 36;

/// Longest wait for the startup health check
const STARTUP_TIMEOUT: Duration = Duration::from_secs(3);

/// Main application state
pub struct App<B: ChatBackend + 'static = HttpBackend> {
    // === Core State ===
    /// Is the app still running?
    running: bool,

    // === Conductor Integration ===
    /// Client for communicating with the embedded Conductor
    conductor: ConductorClient<B>,
    /// Display state derived from ConductorMessages
    display: DisplayState,

    // === Input State ===
    /// User input buffer
    input_buffer: String,
    /// Scroll offset (lines from bottom, 0 = latest)
    scroll_offset: usize,
    /// Total rendered lines (for scroll bounds)
    total_lines: usize,
    /// Message count at the last frame (for auto-scroll)
    message_count: usize,

    // === Misc State ===
    /// Creation time, drives the loading indicator
    started: Instant,
    /// Last frame time
    last_frame: Instant,
    /// Terminal size
    size: (u16, u16),
}

impl App<HttpBackend> {
    /// Create a new App talking to the configured chat server
    pub fn new(config: &ClientConfig) -> anyhow::Result<Self> {
        let size = crossterm::terminal::size()?;
        let conductor = ConductorClient::new(config)?;
        Ok(Self::with_client(conductor, size))
    }
}

impl<B: ChatBackend + 'static> App<B> {
    /// Create an App around an existing client
    pub fn with_client(conductor: ConductorClient<B>, size: (u16, u16)) -> Self {
        let now = Instant::now();
        Self {
            running: true,
            conductor,
            display: DisplayState::new(),
            input_buffer: String::new(),
            scroll_offset: 0,
            total_lines: 0,
            message_count: 0,
            started: now,
            last_frame: now,
            size,
        }
    }

    /// Main event loop
    pub async fn run<T: Backend>(&mut self, terminal: &mut Terminal<T>) -> anyhow::Result<()> {
        let frame_duration = Duration::from_millis(33);

        // Create async event stream for non-blocking terminal events
        let mut event_stream = EventStream::new();

        // Track startup phases
        enum StartupPhase {
            NeedStart,
            NeedConnect,
            Done,
        }
        let mut startup_phase = StartupPhase::NeedStart;

        // Render initial frame immediately so user sees UI
        self.draw(terminal)?;

        while self.running {
            let frame_start = Instant::now();

            tokio::select! {
                biased;

                // Check for terminal events - highest priority
                maybe_event = event_stream.next() => {
                    match maybe_event {
                        Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                            self.handle_key(key).await;
                        }
                        Some(Ok(Event::Resize(w, h))) => self.size = (w, h),
                        Some(Ok(_)) => {}
                        Some(Err(e)) => tracing::warn!(error = %e, "Terminal event error"),
                        None => self.running = false,
                    }
                }

                // Frame tick - do work and render
                _ = tokio::time::sleep(Duration::from_millis(16)) => {
                    match startup_phase {
                        StartupPhase::NeedStart => {
                            match tokio::time::timeout(STARTUP_TIMEOUT, self.conductor.start()).await {
                                Ok(Ok(())) => {}
                                Ok(Err(e)) => tracing::warn!(error = %e, "Conductor start error"),
                                Err(_) => {
                                    tracing::warn!("Health check timed out");
                                    self.display.apply_message(ConductorMessage::Notify {
                                        level: NotifyLevel::Warning,
                                        message: "Chat server not reachable".to_string(),
                                    });
                                }
                            }
                            startup_phase = StartupPhase::NeedConnect;
                        }
                        StartupPhase::NeedConnect => {
                            if let Err(e) = self.conductor.connect().await {
                                tracing::warn!(error = %e, "Conductor connect error");
                            }
                            startup_phase = StartupPhase::Done;
                        }
                        StartupPhase::Done => {}
                    }
                }
            }

            self.tick().await;
            self.draw(terminal)?;

            // Frame rate limiting
            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                tokio::time::sleep(frame_duration - elapsed).await;
            }
        }

        Ok(())
    }

    /// Apply background results and Conductor messages, advance timers
    pub async fn tick(&mut self) {
        self.conductor.poll().await;
        self.process_conductor_messages();
        self.update();
    }

    /// Process all pending messages from the Conductor
    fn process_conductor_messages(&mut self) {
        for msg in self.conductor.recv_all() {
            self.display.apply_message(msg);
        }
        if self.display.take_clear_input() {
            self.input_buffer.clear();
        }
    }

    /// Update timers and scrolling
    fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;

        self.display.update(delta);

        // Follow new messages
        let count = self.conductor.view().messages.len();
        if count != self.message_count {
            self.message_count = count;
            self.scroll_offset = 0;
        }
        if self.conductor.is_generating() {
            self.scroll_offset = 0;
        }
    }

    /// Handle keyboard input
    pub async fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let panel_open = self.conductor.history().is_open();

        match key.code {
            // Quit
            KeyCode::Char('c') if ctrl => self.quit().await,
            KeyCode::Esc => {
                if panel_open {
                    self.conductor.close_history();
                } else {
                    self.quit().await;
                }
            }

            // History panel
            KeyCode::Char('h') if ctrl => self.conductor.toggle_history(),
            KeyCode::Char('n') if ctrl => {
                if let Err(e) = self.conductor.new_chat().await {
                    tracing::warn!(error = %e, "New chat failed");
                }
            }
            KeyCode::Up if panel_open => self.conductor.history_prev(),
            KeyCode::Down if panel_open => self.conductor.history_next(),
            KeyCode::Delete if panel_open => self.conductor.delete_selected(),
            KeyCode::Enter if panel_open => {
                if let Err(e) = self.conductor.open_selected().await {
                    tracing::warn!(error = %e, "Open session failed");
                }
            }

            // Mode
            KeyCode::Tab => {
                if let Err(e) = self.conductor.toggle_mode().await {
                    tracing::warn!(error = %e, "Mode toggle failed");
                }
            }

            // Submit message; the input clears once the exchange settles
            KeyCode::Enter => {
                if !self.input_buffer.trim().is_empty() && !self.conductor.is_generating() {
                    let message = self.input_buffer.clone();
                    if let Err(e) = self.conductor.send_message(message).await {
                        tracing::warn!(error = %e, "Send failed");
                    }
                    self.scroll_offset = 0;
                }
            }

            // Typing (input is read-only while generating)
            KeyCode::Char(c) if !ctrl => {
                if !self.conductor.is_generating() {
                    self.input_buffer.push(c);
                }
            }
            KeyCode::Backspace => {
                if !self.conductor.is_generating() {
                    self.input_buffer.pop();
                }
            }

            // Conversation scrolling
            KeyCode::PageUp => {
                let page_size = usize::from(self.conversation_height() / 2).max(1);
                let max_scroll = self.total_lines.saturating_sub(1);
                self.scroll_offset = (self.scroll_offset + page_size).min(max_scroll);
            }
            KeyCode::PageDown => {
                let page_size = usize::from(self.conversation_height() / 2).max(1);
                self.scroll_offset = self.scroll_offset.saturating_sub(page_size);
            }
            KeyCode::Up => {
                self.scroll_offset = (self.scroll_offset + 1).min(self.total_lines.saturating_sub(1));
            }
            KeyCode::Down => {
                self.scroll_offset = self.scroll_offset.saturating_sub(1);
            }

            _ => {}
        }
    }

    async fn quit(&mut self) {
        if let Err(e) = self.conductor.request_quit().await {
            tracing::warn!(error = %e, "Quit request failed");
        }
        self.running = false;
    }

    /// Is the app still running?
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current input buffer
    pub fn input(&self) -> &str {
        &self.input_buffer
    }

    /// The embedded client
    pub fn client(&self) -> &ConductorClient<B> {
        &self.conductor
    }

    /// The embedded client, mutably
    pub fn client_mut(&mut self) -> &mut ConductorClient<B> {
        &mut self.conductor
    }

    /// Display state
    pub fn display(&self) -> &DisplayState {
        &self.display
    }

    fn conversation_height(&self) -> u16 {
        self.size.1.saturating_sub(INPUT_HEIGHT + 1)
    }

    fn dots(&self) -> usize {
        loading_dots(self.started.elapsed())
    }

    /// Render one frame
    pub fn draw<T: Backend>(&mut self, terminal: &mut Terminal<T>) -> anyhow::Result<()> {
        let view = self.conductor.view();
        terminal.draw(|frame| self.render(frame, &view))?;
        Ok(())
    }

    fn render(&mut self, frame: &mut Frame, view: &ConversationView) {
        let area = frame.area();
        self.size = (area.width, area.height);

        let [conversation, input, status] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(1),
        ])
        .areas(area);

        self.render_conversation(frame, conversation, view);
        self.render_input(frame, input, view);
        self.render_status(frame, status);

        if self.conductor.history().is_open() {
            let width = HISTORY_WIDTH.min(conversation.width);
            let panel = Rect::new(
                conversation.x + conversation.width - width,
                conversation.y,
                width,
                conversation.height,
            );
            self.render_history(frame, panel);
        }
    }

    /// Render the conversation area
    fn render_conversation(&mut self, frame: &mut Frame, area: Rect, view: &ConversationView) {
        let width = usize::from(area.width.saturating_sub(2));
        let height = usize::from(area.height);

        if width < 10 || height < 3 {
            return;
        }

        let all_lines = conversation_lines(view, width, self.dots());
        self.total_lines = all_lines.len();

        // Clamp scroll offset
        let max_scroll = self.total_lines.saturating_sub(height);
        if self.scroll_offset > max_scroll {
            self.scroll_offset = max_scroll;
        }

        // Calculate visible range
        let visible_end = self.total_lines.saturating_sub(self.scroll_offset);
        let visible_start = visible_end.saturating_sub(height);

        let has_content_above = visible_start > 0;
        let has_content_below = self.scroll_offset > 0;

        let lines: Vec<Line> = all_lines[visible_start..visible_end]
            .iter()
            .enumerate()
            .map(|(i, line)| {
                let style = if has_content_above && i < 2 {
                    Style::default().fg(FADE_SHADES[i])
                } else if has_content_below && i >= height.saturating_sub(2) {
                    let dist_from_bottom = height.saturating_sub(1).saturating_sub(i);
                    Style::default().fg(FADE_SHADES[dist_from_bottom.min(1)])
                } else {
                    line_style(line)
                };
                Line::styled(line.text.clone(), style)
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), area);
    }

    /// Render the input box
    fn render_input(&self, frame: &mut Frame, area: Rect, view: &ConversationView) {
        let text_height = usize::from(area.height.saturating_sub(1));
        let text_width = usize::from(area.width.saturating_sub(1));

        let separator = "-".repeat(usize::from(area.width));
        let mut lines = vec![Line::styled(separator, Style::default().fg(DIM_GRAY))];

        if text_width < 5 || text_height < 1 {
            frame.render_widget(Paragraph::new(lines), area);
            return;
        }

        if self.input_buffer.is_empty() {
            lines.push(Line::from(vec![
                Span::styled("You: _", Style::default().fg(USER_GREEN)),
                Span::styled(view.placeholder(), Style::default().fg(DIM_GRAY)),
            ]));
        } else {
            let full_input = format!("You: {}_", self.input_buffer);
            let wrapped = textwrap::wrap(&full_input, text_width);
            let skip = wrapped.len().saturating_sub(text_height);
            lines.extend(
                wrapped
                    .iter()
                    .skip(skip)
                    .map(|l| Line::styled(l.to_string(), Style::default().fg(USER_GREEN))),
            );
        }

        frame.render_widget(Paragraph::new(lines), area);
    }

    /// Render the status bar
    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let line = if let Some(notification) = &self.display.notification {
            let color = match notification.level {
                NotifyLevel::Info => ACCENT_YELLOW,
                NotifyLevel::Warning => WARNING_ORANGE,
                NotifyLevel::Error => ERROR_RED,
            };
            Line::styled(format!(" {}", notification.message), Style::default().fg(color))
        } else {
            let text = status_text(
                self.display.conductor_state,
                self.display.mode,
                self.dots(),
                self.scroll_offset,
            );
            Line::styled(text, Style::default().fg(DIM_GRAY))
        };

        frame.render_widget(Paragraph::new(line), area);
    }

    /// Render the history overlay
    fn render_history(&self, frame: &mut Frame, area: Rect) {
        let history = self.conductor.history();
        let block = Block::bordered()
            .title(" History ")
            .title_bottom(" Enter open | Del delete ")
            .border_style(Style::default().fg(ACCENT_YELLOW));

        frame.render_widget(Clear, area);

        let rows = history.rows();
        if rows.is_empty() {
            let empty = Paragraph::new(Line::styled("No saved chats", Style::default().fg(DIM_GRAY)))
                .block(block);
            frame.render_widget(empty, area);
            return;
        }

        let items: Vec<ListItem> = rows.into_iter().map(ListItem::new).collect();
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(SELECTION_BG)
                .add_modifier(Modifier::BOLD),
        );
        let mut state = ListState::default().with_selected(Some(history.selected_index()));
        frame.render_stateful_widget(list, area, &mut state);
    }
}

fn line_style(line: &DisplayLine) -> Style {
    match line.role {
        Some(DisplayRole::User) => Style::default().fg(USER_GREEN),
        Some(DisplayRole::Bot) => Style::default().fg(SMARTAI_CYAN),
        Some(DisplayRole::Image) => Style::default().fg(IMAGE_BLUE),
        Some(DisplayRole::Loading) => Style::default().fg(ACCENT_YELLOW),
        None => Style::default(),
    }
}
