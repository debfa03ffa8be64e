//! SmartChat TUI Entry Point
//!
//! Launches the terminal UI for SmartChat.
//!
//! Configuration comes from `$XDG_CONFIG_HOME/smartchat/config.toml` and the
//! `SMARTCHAT_*` environment variables. Logs go to
//! `$XDG_CACHE_HOME/smartchat/smartchat.log`, filtered by `RUST_LOG`.

use std::fs::{self, File};
use std::io::{self, IsTerminal};
use std::panic;
use std::sync::Mutex;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use smartchat_core::load_config;
use smartchat_tui::App;

const DEFAULT_FILTER: &str = "smartchat_core=info,smartchat_tui=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!("Error: smartchat requires a terminal (TTY)");
        std::process::exit(1);
    }

    let config = load_config()?;
    tracing::info!(
        source = %config.source(),
        base_url = %config.api.base_url,
        mode = config.default_mode.as_str(),
        "Configuration loaded"
    );

    // Set up panic hook to restore terminal
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut app = App::new(&config)?;

    // Initialize terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let result = app.run(&mut terminal).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Log to a file; the terminal belongs to the UI
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let Some(dir) = dirs::cache_dir().map(|d| d.join("smartchat")) else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }
    let Ok(file) = File::create(dir.join("smartchat.log")) else {
        return;
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .with(filter)
        .init();
}
