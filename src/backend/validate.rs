//! Preflight validation of a CLI/model pair.
//!
//! A cheap probe run through the binary before any worktree or session is
//! allocated. Only a recognized non-retryable signal (quota exhaustion,
//! auth failure, rate limiting) excludes a CLI from the chain; timeouts,
//! spawn failures, and unrecognized errors count as available, since the
//! probe exists to catch the conditions a retry cannot fix.

use std::process::Command;
use std::time::Duration;

use super::CliId;

/// Output fragments that mark a backend as non-retryable right now.
pub const NON_RETRYABLE_SIGNALS: &[&str] = &[
    "usage limit reached",
    "quota exceeded",
    "out of quota",
    "credit balance is too low",
    "insufficient credit",
    "rate limit",
    "too many requests",
    "invalid api key",
    "authentication failed",
    "please run /login",
    "not logged in",
];

/// Minimal prompt fed to the probe on stdin.
const PROBE_PROMPT: &[u8] = b"Reply with the single word: ok\n";

/// Probe a resolved CLI binary with the given model.
///
/// Returns `false` only when the probe output carries a non-retryable
/// signal; every other outcome leaves the CLI in the chain.
pub fn validate_availability(
    id: CliId,
    binary_path: &str,
    model: &str,
    timeout: Duration,
) -> bool {
    let argv = match id.profile().build_command(binary_path, model) {
        Ok(argv) => argv,
        Err(_) => return false,
    };

    let mut cmd = Command::new(&argv[0]);
    cmd.args(&argv[1..]);

    match crate::process::run_with_timeout_stdin(&mut cmd, timeout, Some(PROBE_PROMPT)) {
        Ok(output) => {
            let stdout = String::from_utf8_lossy(&output.stdout);
            let stderr = String::from_utf8_lossy(&output.stderr);
            non_retryable_signal(&stdout).is_none() && non_retryable_signal(&stderr).is_none()
        }
        // Spawn failure or timeout: not a non-retryable signal.
        Err(_) => true,
    }
}

/// Scan probe output for a non-retryable signal, case-insensitively.
pub(crate) fn non_retryable_signal(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    NON_RETRYABLE_SIGNALS
        .iter()
        .find(|signal| lower.contains(**signal))
        .copied()
}
