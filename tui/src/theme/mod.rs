//! Theme and Colors
//!
//! SmartChat's terminal palette.

use ratatui::style::Color;

// ============================================================================
// Conversation
// ============================================================================

/// Bot replies
pub const SMARTAI_CYAN: Color = Color::Rgb(110, 200, 230);

/// User prompts
pub const USER_GREEN: Color = Color::Rgb(130, 220, 130);

/// Image URLs
pub const IMAGE_BLUE: Color = Color::Rgb(100, 180, 255);

/// Server error replies
pub const ERROR_RED: Color = Color::Rgb(255, 80, 80);

// ============================================================================
// Chrome
// ============================================================================

/// Separators, hints and placeholders
pub const DIM_GRAY: Color = Color::Rgb(100, 100, 100);

/// Loading indicator and panel accents
pub const ACCENT_YELLOW: Color = Color::Rgb(255, 223, 128);

/// Selected history row background
pub const SELECTION_BG: Color = Color::Rgb(60, 60, 90);

/// Warning notifications
pub const WARNING_ORANGE: Color = Color::Rgb(255, 170, 90);

/// Fade shades at the scroll edges, outermost first
pub const FADE_SHADES: [Color; 2] = [Color::Rgb(80, 80, 80), Color::Rgb(120, 120, 120)];
