//! Agent session supervision inside tmux.
//!
//! Each agent runs inside a detached tmux session whose command is a small
//! bash wrapper. The wrapper feeds the prompt file to the CLI on stdin,
//! appends all CLI output to the run log, and writes a one-line JSON result
//! when the CLI exits. Interrupt and terminate signals are recorded with
//! their conventional exit codes so the result file distinguishes an
//! operator Ctrl+C from a kill.

mod tmux;

pub use tmux::{Tmux, DEFAULT_SOCKET};

use std::path::Path;

use crate::artifacts::RunArtifacts;

/// Line the wrapper prints when the agent process is gone. Pane content
/// containing this marker means the session is a husk even if tmux keeps
/// it alive (remain-on-exit).
pub const EXIT_MARKER: &str = "[orch] agent exited";

/// Wrapper executed as `bash -c WRAPPER orch-wrapper <log> <result> <prompt> <agent> <argv...>`.
/// The prompt reaches the CLI only through stdin redirection, never argv.
const WRAPPER: &str = r#"
set -u
log_file="$1"; result_file="$2"; prompt_file="$3"; agent_name="$4"
shift 4
finish() {
  printf '{"agent":"%s","status":"%s","exit_code":%d}\n' "$agent_name" "$1" "$2" > "$result_file"
  printf '[orch] agent exited status=%s code=%d\n' "$1" "$2" | tee -a "$log_file"
  exit "$2"
}
trap 'finish interrupted 130' INT
trap 'finish terminated 143' TERM
"$@" < "$prompt_file" >> "$log_file" 2>&1
code=$?
if [ "$code" -eq 0 ]; then finish completed 0; else finish failed "$code"; fi
"#;

/// Terminal state recorded by the wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionResult {
    Completed,
    Failed(i32),
    Interrupted,
    Terminated,
}

impl SessionResult {
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionResult::Completed => 0,
            SessionResult::Failed(code) => *code,
            SessionResult::Interrupted => 130,
            SessionResult::Terminated => 143,
        }
    }
}

/// Launches and inspects agent sessions on one tmux socket.
#[derive(Debug, Clone)]
pub struct Supervisor {
    tmux: Tmux,
}

impl Supervisor {
    pub fn new(tmux: Tmux) -> Self {
        Supervisor { tmux }
    }

    pub fn tmux(&self) -> &Tmux {
        &self.tmux
    }

    /// Start `argv` for `agent` in a detached session. A leftover session
    /// with the same name is killed first so relaunch always gets a clean
    /// pane.
    pub fn launch(
        &self,
        session: &str,
        agent: &str,
        working_dir: &Path,
        artifacts: &RunArtifacts,
        argv: &[String],
    ) -> Result<(), String> {
        if argv.is_empty() {
            return Err(format!("agent '{}' has no command to run", agent));
        }
        // A crashed run can leave behind the session itself or a stale
        // variant carrying the same name as a token, so sweep both.
        for existing in self.tmux.list_sessions()? {
            if existing.contains(session) {
                self.tmux.kill_session(&existing)?;
            }
        }

        let mut command = vec![
            "bash".to_string(),
            "-c".to_string(),
            WRAPPER.to_string(),
            "orch-wrapper".to_string(),
            artifacts.log_file.to_string_lossy().to_string(),
            artifacts.result_file.to_string_lossy().to_string(),
            artifacts.prompt_file.to_string_lossy().to_string(),
            agent.to_string(),
        ];
        command.extend(argv.iter().cloned());

        self.tmux
            .new_session(session, &working_dir.to_string_lossy(), &command)
    }

    /// A session is active while it exists and its pane does not show the
    /// exit marker. A capture failure on an existing session is treated as
    /// active; the next poll settles it.
    pub fn is_active(&self, session: &str) -> Result<bool, String> {
        if !self.tmux.session_exists(session)? {
            return Ok(false);
        }
        match self.tmux.capture_pane(session) {
            Ok(pane) => Ok(!pane.contains(EXIT_MARKER)),
            Err(_) => Ok(true),
        }
    }

    pub fn kill(&self, session: &str) -> Result<(), String> {
        self.tmux.kill_session(session)
    }
}

/// Parse the wrapper's one-line JSON result.
pub fn parse_result(contents: &str) -> Option<SessionResult> {
    let status = json_str_field(contents, "status")?;
    let code: i32 = json_raw_field(contents, "exit_code")?.parse().ok()?;
    match status.as_str() {
        "completed" => Some(SessionResult::Completed),
        "interrupted" => Some(SessionResult::Interrupted),
        "terminated" => Some(SessionResult::Terminated),
        "failed" => Some(SessionResult::Failed(code)),
        _ => None,
    }
}

fn json_str_field(contents: &str, field: &str) -> Option<String> {
    let key = format!("\"{}\":\"", field);
    let start = contents.find(&key)? + key.len();
    let end = contents[start..].find('"')? + start;
    Some(contents[start..end].to_string())
}

fn json_raw_field(contents: &str, field: &str) -> Option<String> {
    let key = format!("\"{}\":", field);
    let start = contents.find(&key)? + key.len();
    let rest = &contents[start..];
    let end = rest
        .find(|c: char| c == ',' || c == '}')
        .unwrap_or(rest.len());
    Some(rest[..end].trim().to_string())
}
