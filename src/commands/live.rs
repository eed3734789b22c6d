use std::process::Command;

use orch::backend::{resolve_binary, validate_availability, CliId};
use orch::color;
use orch::config::{CliArgs, Config};
use orch::naming::slug;
use orch::session::Tmux;

use std::time::Duration;

/// Launch a single interactive CLI session in tmux.
///
/// Unlike dispatched agents there is no wrapper and no prompt file: the
/// operator drives the CLI directly in the pane.
pub fn cmd_live(config: &Config, cli: &CliArgs) -> Result<(), String> {
    let id = match cli.cli.as_deref() {
        Some(s) => CliId::parse(s).ok_or_else(|| format!("unknown CLI '{}'", s))?,
        None => *config
            .cli_chain
            .first()
            .ok_or_else(|| "empty CLI preference chain".to_string())?,
    };
    let profile = id.profile();

    let binary_path = resolve_binary(profile.binary)
        .ok_or_else(|| format!("binary '{}' not found on PATH", profile.binary))?;
    let model = profile.effective_model(cli.model.as_deref().unwrap_or(&config.model));

    let timeout = Duration::from_secs(config.probe_timeout_secs);
    if !validate_availability(id, &binary_path, &model, timeout) {
        return Err(format!(
            "{} reported a non-retryable condition (quota or auth)",
            profile.display_name
        ));
    }

    let name = match cli.name.as_deref() {
        Some(n) => slug(n),
        None => format!(
            "{}-{}",
            id.as_str(),
            chrono::Local::now().format("%H%M%S")
        ),
    };
    let dir = match cli.dir.as_deref() {
        Some(d) => d.to_string(),
        None => std::env::current_dir()
            .map_err(|e| format!("cannot determine working directory: {}", e))?
            .to_string_lossy()
            .to_string(),
    };

    let tmux = Tmux::new(&config.tmux_socket);
    if !tmux.available() {
        return Err("tmux not found on PATH".to_string());
    }
    if tmux.session_exists(&name)? {
        return Err(format!("session '{}' already exists", name));
    }

    let argv = profile.interactive_command(&binary_path, &model)?;
    tmux.new_session(&name, &dir, &argv)?;
    println!(
        "{} {} {} {}",
        color::success("live session"),
        color::agent(&name),
        profile.display_name,
        color::dim(&dir),
    );

    if cli.detached {
        println!("attach with: orch attach {}", name);
        return Ok(());
    }

    let attach = tmux.attach_argv(&name);
    let status = Command::new(&attach[0])
        .args(&attach[1..])
        .status()
        .map_err(|e| format!("failed to attach: {}", e))?;
    if let Some(code) = status.code().filter(|c| *c != 0) {
        std::process::exit(code);
    }
    Ok(())
}
