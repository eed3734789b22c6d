use std::process::Command;

use orch::artifacts;
use orch::color;
use orch::config::{CliArgs, Config};
use orch::session::{Supervisor, Tmux};

/// List agent sessions on the orchestration socket.
pub fn cmd_list(config: &Config) -> Result<(), String> {
    let tmux = Tmux::new(&config.tmux_socket);
    let supervisor = Supervisor::new(tmux.clone());
    let sessions = tmux.list_sessions()?;

    if sessions.is_empty() {
        println!("no active sessions on socket '{}'", config.tmux_socket);
        return Ok(());
    }

    let artifacts_root = match &config.artifacts_dir {
        Some(dir) => std::path::PathBuf::from(dir),
        None => artifacts::default_root(),
    };

    println!("sessions on socket '{}':", config.tmux_socket);
    for session in &sessions {
        let state = match supervisor.is_active(session) {
            Ok(true) => color::success("active"),
            Ok(false) => color::warn("exited"),
            Err(_) => color::dim("unknown"),
        };
        let log_pointer = artifacts_root.join(format!("{}.log", session));
        if log_pointer.exists() {
            println!(
                "  {} {} {}",
                color::agent(session),
                state,
                color::dim(&log_pointer.to_string_lossy()),
            );
        } else {
            println!("  {} {}", color::agent(session), state);
        }
    }
    Ok(())
}

/// Attach the operator's terminal to an agent session.
pub fn cmd_attach(config: &Config, cli: &CliArgs) -> Result<(), String> {
    let session = cli
        .session_arg
        .as_deref()
        .ok_or_else(|| "usage: orch attach <session>".to_string())?;

    let tmux = Tmux::new(&config.tmux_socket);
    if !tmux.session_exists(session)? {
        return Err(format!("no session named '{}'", session));
    }

    let argv = tmux.attach_argv(session);
    let status = Command::new(&argv[0])
        .args(&argv[1..])
        .status()
        .map_err(|e| format!("failed to attach: {}", e))?;
    // Interrupt/terminate codes from the session pass through unchanged.
    if let Some(code) = status.code().filter(|c| *c != 0) {
        std::process::exit(code);
    }
    Ok(())
}

/// Kill an agent session.
pub fn cmd_kill(config: &Config, cli: &CliArgs) -> Result<(), String> {
    let session = cli
        .session_arg
        .as_deref()
        .ok_or_else(|| "usage: orch kill <session>".to_string())?;

    let tmux = Tmux::new(&config.tmux_socket);
    if !tmux.session_exists(session)? {
        return Err(format!("no session named '{}'", session));
    }
    tmux.kill_session(session)?;
    println!("{} {}", color::success("killed"), color::agent(session));
    Ok(())
}
