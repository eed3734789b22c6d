//! Terminal color utilities using ANSI escape codes.
//!
//! Provides colored output for agent names, stage labels, and status lines.

/// ANSI color codes
pub mod codes {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";

    pub const RED: &str = "\x1b[31m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BLUE: &str = "\x1b[34m";
    pub const MAGENTA: &str = "\x1b[35m";
    pub const CYAN: &str = "\x1b[36m";

    pub const BRIGHT_MAGENTA: &str = "\x1b[95m";
    pub const BRIGHT_CYAN: &str = "\x1b[96m";
}

use codes::*;

/// Colors for agent names - deterministic based on the first byte of the name.
const AGENT_COLORS: &[&str] = &[CYAN, MAGENTA, YELLOW, BLUE, BRIGHT_CYAN, BRIGHT_MAGENTA, GREEN];

/// Get a deterministic color for an agent name.
pub fn agent_color(name: &str) -> &'static str {
    let byte = name.bytes().next().unwrap_or(b'a') as usize;
    AGENT_COLORS[byte % AGENT_COLORS.len()]
}

/// Color an agent name deterministically.
pub fn agent(name: &str) -> String {
    format!("{}{}{}{}", BOLD, agent_color(name), name, RESET)
}

/// Color a success message green.
pub fn success(text: &str) -> String {
    format!("{}{}{}", GREEN, text, RESET)
}

/// Color an error message red.
pub fn error(text: &str) -> String {
    format!("{}{}{}", RED, text, RESET)
}

/// Color a warning yellow.
pub fn warn(text: &str) -> String {
    format!("{}{}{}", YELLOW, text, RESET)
}

/// Dim auxiliary detail (paths, run ids).
pub fn dim(text: &str) -> String {
    format!("{}{}{}", DIM, text, RESET)
}
