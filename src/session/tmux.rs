//! Thin tmux client on a dedicated socket.
//!
//! Every invocation goes through `tmux -L <socket>` so orchestrated
//! sessions never collide with the operator's own tmux server. All calls
//! are bounded by a timeout to keep a wedged server from hanging the
//! dispatcher.

use std::process::Command;
use std::time::Duration;

use crate::process::run_with_timeout;

/// Socket name used when the config does not override it.
pub const DEFAULT_SOCKET: &str = "orch";

const TMUX_TIMEOUT: Duration = Duration::from_secs(10);

/// Handle to a tmux server on a named socket.
#[derive(Debug, Clone)]
pub struct Tmux {
    socket: String,
}

impl Tmux {
    pub fn new(socket: &str) -> Self {
        Tmux {
            socket: socket.to_string(),
        }
    }

    pub fn socket(&self) -> &str {
        &self.socket
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("tmux");
        cmd.arg("-L").arg(&self.socket);
        cmd.args(args);
        cmd
    }

    /// Whether a tmux binary is on the PATH at all.
    pub fn available(&self) -> bool {
        Command::new("tmux")
            .arg("-V")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// List session names on this socket. A socket with no running server
    /// is an empty list, not an error.
    pub fn list_sessions(&self) -> Result<Vec<String>, String> {
        let mut cmd = self.command(&["list-sessions", "-F", "#{session_name}"]);
        let output = run_with_timeout(&mut cmd, TMUX_TIMEOUT)?;
        if output.status.success() {
            let names = String::from_utf8_lossy(&output.stdout)
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            return Ok(names);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("no server running") || stderr.contains("No such file or directory") {
            return Ok(Vec::new());
        }
        Err(format!("tmux list-sessions failed: {}", stderr.trim()))
    }

    pub fn session_exists(&self, name: &str) -> Result<bool, String> {
        let mut cmd = self.command(&["has-session", "-t", name]);
        let output = run_with_timeout(&mut cmd, TMUX_TIMEOUT)?;
        Ok(output.status.success())
    }

    /// Create a detached session running `argv` in `working_dir`.
    pub fn new_session(&self, name: &str, working_dir: &str, argv: &[String]) -> Result<(), String> {
        if argv.is_empty() {
            return Err("tmux new-session requires a command".to_string());
        }
        let mut args: Vec<&str> = vec!["new-session", "-d", "-s", name, "-c", working_dir];
        for part in argv {
            args.push(part);
        }
        let mut cmd = self.command(&args);
        let output = run_with_timeout(&mut cmd, TMUX_TIMEOUT)?;
        if !output.status.success() {
            return Err(format!(
                "tmux new-session '{}' failed: {}",
                name,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }

    pub fn kill_session(&self, name: &str) -> Result<(), String> {
        let mut cmd = self.command(&["kill-session", "-t", name]);
        let output = run_with_timeout(&mut cmd, TMUX_TIMEOUT)?;
        if !output.status.success() {
            return Err(format!(
                "tmux kill-session '{}' failed: {}",
                name,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }

    /// Visible pane content of a session's active pane.
    pub fn capture_pane(&self, name: &str) -> Result<String, String> {
        let mut cmd = self.command(&["capture-pane", "-p", "-t", name]);
        let output = run_with_timeout(&mut cmd, TMUX_TIMEOUT)?;
        if !output.status.success() {
            return Err(format!(
                "tmux capture-pane '{}' failed: {}",
                name,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Argv to attach to a session from the operator's terminal.
    pub fn attach_argv(&self, name: &str) -> Vec<String> {
        vec![
            "tmux".to_string(),
            "-L".to_string(),
            self.socket.clone(),
            "attach".to_string(),
            "-t".to_string(),
            name.to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_socket() -> String {
        format!("orch-test-{}", std::process::id())
    }

    fn tmux_present() -> bool {
        Tmux::new("probe").available()
    }

    #[test]
    fn test_list_sessions_without_server_is_empty() {
        if !tmux_present() {
            return;
        }
        let tmux = Tmux::new(&test_socket());
        assert_eq!(tmux.list_sessions().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_session_lifecycle() {
        if !tmux_present() {
            return;
        }
        let socket = format!("{}-life", test_socket());
        let tmux = Tmux::new(&socket);
        let name = "orch-test-session";

        tmux.new_session(name, "/", &["sleep".to_string(), "30".to_string()])
            .unwrap();
        assert!(tmux.session_exists(name).unwrap());
        assert!(tmux.list_sessions().unwrap().contains(&name.to_string()));

        tmux.kill_session(name).unwrap();
        assert!(!tmux.session_exists(name).unwrap());
    }

    #[test]
    fn test_capture_pane_sees_output() {
        if !tmux_present() {
            return;
        }
        let socket = format!("{}-cap", test_socket());
        let tmux = Tmux::new(&socket);
        let name = "orch-test-capture";

        tmux.new_session(
            name,
            "/",
            &[
                "sh".to_string(),
                "-c".to_string(),
                "echo orch-pane-marker; sleep 30".to_string(),
            ],
        )
        .unwrap();
        // Give the pane a moment to render.
        std::thread::sleep(std::time::Duration::from_millis(300));
        let content = tmux.capture_pane(name).unwrap();
        tmux.kill_session(name).unwrap();
        assert!(content.contains("orch-pane-marker"), "pane: {}", content);
    }

    #[test]
    fn test_new_session_requires_command() {
        let tmux = Tmux::new(&test_socket());
        assert!(tmux.new_session("x", "/", &[]).is_err());
    }
}
