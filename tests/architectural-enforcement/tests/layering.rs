//! Integration Test: Layering and I/O rules
//!
//! **Policy**:
//! - `smartchat-core` is headless: no ratatui, crossterm or other UI crates.
//! - All HTTP is async: no `reqwest::blocking`.
//! - No `std::thread::sleep` in production code; timing goes through tokio.
//! - Core production code propagates errors instead of unwrapping.

use architectural_enforcement::{assert_clean, find_violations, PRODUCTION_DIRS};

#[test]
fn test_core_has_no_ui_dependencies() {
    let violations = find_violations(&["conductor/core/src"], &["ratatui", "crossterm"]);
    assert_clean("UI crates used in the headless core", &violations);
}

#[test]
fn test_no_blocking_http() {
    let violations = find_violations(PRODUCTION_DIRS, &["reqwest::blocking"]);
    assert_clean("Blocking HTTP client used", &violations);
}

#[test]
fn test_no_thread_sleep() {
    let violations = find_violations(PRODUCTION_DIRS, &["thread::sleep"]);
    assert_clean("Thread sleep in production code", &violations);
}

#[test]
fn test_core_does_not_unwrap() {
    let violations = find_violations(&["conductor/core/src"], &[".unwrap()", ".expect("]);
    assert_clean("unwrap/expect in core production code", &violations);
}
