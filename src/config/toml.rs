use std::fs;
use std::path::Path;

use crate::backend::CliId;

use super::types::{Config, ConfigError};

pub(super) fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = fs::read_to_string(&path).map_err(|e| ConfigError::Io(e.to_string()))?;
    Config::parse_toml(&content)
}

pub(super) fn parse_toml(content: &str) -> Result<Config, ConfigError> {
    let mut config = Config::default();
    let mut current_section = String::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        // Handle section headers like [agents]
        if line.starts_with('[') && line.ends_with(']') {
            current_section = line[1..line.len() - 1].to_string();
            continue;
        }

        if let Some((key, value)) = parse_toml_line(line) {
            let full_key = if current_section.is_empty() {
                key.to_string()
            } else {
                format!("{}.{}", current_section, key)
            };
            let value = strip_comment(value);

            match full_key.as_str() {
                "agents.max_active" => {
                    config.max_active_agents = value.parse().map_err(|_| {
                        ConfigError::Parse(format!("invalid agents.max_active: {}", value))
                    })?;
                }
                "cli.chain" => {
                    let chain = value.trim_matches('"');
                    config.cli_chain = CliId::parse_chain(chain)
                        .ok_or_else(|| ConfigError::Parse(format!("invalid cli.chain: {}", chain)))?;
                }
                "cli.model" => {
                    config.model = value.trim_matches('"').to_string();
                }
                "workspace.root" => {
                    config.workspace_root = Some(value.trim_matches('"').to_string());
                }
                "artifacts.dir" => {
                    config.artifacts_dir = Some(value.trim_matches('"').to_string());
                }
                "tmux.socket" => {
                    config.tmux_socket = value.trim_matches('"').to_string();
                }
                "probe.timeout" => {
                    config.probe_timeout_secs = value.parse().map_err(|_| {
                        ConfigError::Parse(format!("invalid probe.timeout: {}", value))
                    })?;
                }
                "workspace.base_ref" => {
                    config.base_ref = Some(value.trim_matches('"').to_string());
                }
                _ => {} // Ignore unknown keys
            }
        }
    }

    Ok(config)
}

/// Parse a TOML line into key-value pair.
fn parse_toml_line(line: &str) -> Option<(&str, &str)> {
    let parts: Vec<&str> = line.splitn(2, '=').collect();
    if parts.len() != 2 {
        return None;
    }
    Some((parts[0].trim(), parts[1].trim()))
}

/// Drop a trailing `# comment` from an unquoted value.
fn strip_comment(value: &str) -> &str {
    if value.starts_with('"') {
        return value;
    }
    match value.find('#') {
        Some(idx) => value[..idx].trim(),
        None => value,
    }
}
