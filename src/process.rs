//! Bounded-timeout subprocess execution.
//!
//! Every external tool the dispatcher touches (git, tmux, agent CLIs) runs
//! through [`run_with_timeout`]: spawned in its own process group,
//! registered for shutdown cleanup, polled with `try_wait`, and killed as a
//! tree when the deadline passes. A hung external tool must never hang the
//! dispatcher.

use std::io::{self, Write};
use std::process::{Child, Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::process_registry::PROCESS_REGISTRY;

/// Poll interval while waiting on a child.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Spawn a command in a new process group when supported.
#[cfg(unix)]
pub fn spawn_in_new_process_group(cmd: &mut Command) -> io::Result<Child> {
    use std::os::unix::process::CommandExt;

    unsafe {
        cmd.pre_exec(|| {
            libc::setpgid(0, 0);
            Ok(())
        });
    }

    cmd.spawn()
}

/// Spawn a command on Windows (process groups are handled differently).
#[cfg(windows)]
pub fn spawn_in_new_process_group(cmd: &mut Command) -> io::Result<Child> {
    cmd.spawn()
}

/// Kill a process and all its children (process group).
#[cfg(unix)]
pub fn kill_process_tree(pid: u32) {
    let pgid = -(pid as i32);

    // SIGTERM the group first, then SIGKILL to make sure everything is dead.
    unsafe {
        libc::kill(pgid, libc::SIGTERM);
    }

    thread::sleep(Duration::from_millis(100));

    unsafe {
        libc::kill(pgid, libc::SIGKILL);
    }

    // Direct children that escaped the group.
    let _ = Command::new("pkill")
        .args(["-KILL", "-P", &pid.to_string()])
        .status();
}

/// Kill a process tree on Windows using taskkill.
#[cfg(windows)]
pub fn kill_process_tree(pid: u32) {
    let _ = Command::new("taskkill")
        .args(["/PID", &pid.to_string(), "/T", "/F"])
        .status();
}

/// Run a command to completion with a hard deadline, no stdin.
///
/// Returns the captured output, or an error if the command could not be
/// spawned or exceeded the timeout (in which case its process tree is
/// killed before returning).
pub fn run_with_timeout(cmd: &mut Command, timeout: Duration) -> Result<Output, String> {
    run_with_timeout_stdin(cmd, timeout, None)
}

/// Run a command to completion with a hard deadline, optionally feeding
/// `input` to its stdin.
pub fn run_with_timeout_stdin(
    cmd: &mut Command,
    timeout: Duration,
    input: Option<&[u8]>,
) -> Result<Output, String> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    if input.is_some() {
        cmd.stdin(Stdio::piped());
    } else {
        cmd.stdin(Stdio::null());
    }

    let mut child = spawn_in_new_process_group(cmd)
        .map_err(|e| format!("failed to spawn {:?}: {}", cmd.get_program(), e))?;
    let pid = child.id();
    PROCESS_REGISTRY.register(pid);

    if let (Some(bytes), Some(mut stdin)) = (input, child.stdin.take()) {
        // A closed pipe just means the child exited early.
        let _ = stdin.write_all(bytes);
    }

    let start = Instant::now();
    loop {
        match child.try_wait() {
            Ok(Some(_status)) => {
                let result = child
                    .wait_with_output()
                    .map_err(|e| format!("failed to collect output: {}", e));
                PROCESS_REGISTRY.unregister(pid);
                return result;
            }
            Ok(None) => {
                if start.elapsed() >= timeout {
                    kill_process_tree(pid);
                    let _ = child.wait();
                    PROCESS_REGISTRY.unregister(pid);
                    return Err(format!(
                        "{:?} timed out after {}s (pid {})",
                        cmd.get_program(),
                        timeout.as_secs(),
                        pid
                    ));
                }
                thread::sleep(POLL_INTERVAL);
            }
            Err(e) => {
                let _ = child.wait();
                PROCESS_REGISTRY.unregister(pid);
                return Err(format!("failed to wait for child: {}", e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_with_timeout_captures_output() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");
        let output = run_with_timeout(&mut cmd, Duration::from_secs(5)).expect("echo");
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "hello");
    }

    #[test]
    fn test_run_with_timeout_kills_on_deadline() {
        let mut cmd = Command::new("sleep");
        cmd.arg("30");
        let start = Instant::now();
        let result = run_with_timeout(&mut cmd, Duration::from_millis(300));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("timed out"));
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_run_with_timeout_stdin_feeds_input() {
        let mut cmd = Command::new("cat");
        let output = run_with_timeout_stdin(&mut cmd, Duration::from_secs(5), Some(b"ping"))
            .expect("cat");
        assert_eq!(String::from_utf8_lossy(&output.stdout), "ping");
    }

    #[test]
    fn test_run_with_timeout_spawn_failure() {
        let mut cmd = Command::new("definitely-not-a-binary-orch");
        let result = run_with_timeout(&mut cmd, Duration::from_secs(1));
        assert!(result.is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_spawn_creates_new_process_group() {
        let mut cmd = Command::new("sleep");
        cmd.arg("10")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = spawn_in_new_process_group(&mut cmd).expect("spawn sleep");
        let pid = child.id() as i32;

        let pgid = unsafe { libc::getpgid(pid) };
        assert!(pgid >= 0, "getpgid failed");
        assert_eq!(pgid, pid);

        let _ = child.kill();
        let _ = child.wait();
    }
}
