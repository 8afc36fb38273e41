/// ANSI color helper utilities for terminal output.
pub const RESET: &str = "\x1b[0m";

pub const GREY: &str = "\x1b[90m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";

pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Session state color: open → green, closed → grey, never seen → yellow.
pub fn color_for_state(state: &str) -> &'static str {
    match state {
        "active" => GREEN,
        "idle" => GREY,
        _ => YELLOW,
    }
}

/// Hours color: red when the session runs past its role limit.
pub fn color_for_elapsed(elapsed: f64, limit: Option<f64>) -> &'static str {
    match limit {
        Some(l) if elapsed > l => RED,
        _ => RESET,
    }
}
