use std::path::Path;
use std::process::Command;

use crate::backend::CliId;
use crate::session::DEFAULT_SOCKET;
use crate::spec::MODEL_DEFAULT;

use super::cli::CliArgs;
use super::{env, toml};

/// Default admission ceiling for concurrently active agents.
pub const DEFAULT_MAX_ACTIVE_AGENTS: usize = 8;

/// Default timeout for CLI availability probes, in seconds.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;

/// Orch configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Maximum number of concurrently active agent sessions.
    pub max_active_agents: usize,
    /// Ordered CLI fallback chain for new agents.
    pub cli_chain: Vec<CliId>,
    /// Model override; the "default" sentinel resolves per CLI profile.
    pub model: String,
    /// Workspace root override for worktree directories.
    pub workspace_root: Option<String>,
    /// Artifact directory override.
    pub artifacts_dir: Option<String>,
    /// tmux socket name for orchestrated sessions.
    pub tmux_socket: String,
    /// CLI availability probe timeout in seconds.
    pub probe_timeout_secs: u64,
    /// Base ref for new agent branches (defaults to auto-detected main/master).
    pub base_ref: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_active_agents: DEFAULT_MAX_ACTIVE_AGENTS,
            cli_chain: vec![CliId::Claude],
            model: MODEL_DEFAULT.to_string(),
            workspace_root: None,
            artifacts_dir: None,
            tmux_socket: DEFAULT_SOCKET.to_string(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            base_ref: None,
        }
    }
}

impl Config {
    /// Load configuration from all sources with proper precedence.
    ///
    /// Precedence: CLI args > env vars > config file > defaults.
    pub fn load(cli_args: &CliArgs) -> Self {
        let mut config = Self::default();

        if let Some(ref path) = cli_args.config {
            if let Ok(file_config) = Self::load_from_file(path) {
                config.merge_from(&file_config);
            }
        } else if Path::new("orch.toml").exists() {
            if let Ok(file_config) = Self::load_from_file("orch.toml") {
                config.merge_from(&file_config);
            }
        }

        config.apply_env();
        config.apply_cli(cli_args);

        if config.base_ref.is_none() {
            config.base_ref = detect_base_ref();
        }

        config
    }

    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        toml::load_from_file(path)
    }

    pub(super) fn parse_toml(content: &str) -> Result<Self, ConfigError> {
        toml::parse_toml(content)
    }

    fn apply_env(&mut self) {
        env::apply_env(self);
    }

    pub(super) fn apply_cli(&mut self, args: &CliArgs) {
        if let Some(n) = args.max_agents {
            self.max_active_agents = n;
        }
        if let Some(ref chain) = args.cli {
            if let Some(ids) = CliId::parse_chain(chain) {
                self.cli_chain = ids;
            }
        }
        if let Some(ref model) = args.model {
            self.model = model.clone();
        }
        if let Some(ref root) = args.workspace_root {
            self.workspace_root = Some(root.clone());
        }
        if let Some(ref dir) = args.artifacts_dir {
            self.artifacts_dir = Some(dir.clone());
        }
        if let Some(ref socket) = args.socket {
            self.tmux_socket = socket.clone();
        }
        if let Some(n) = args.probe_timeout {
            self.probe_timeout_secs = n;
        }
        if let Some(ref base) = args.base_ref {
            self.base_ref = Some(base.clone());
        }
    }

    fn merge_from(&mut self, other: &Self) {
        self.max_active_agents = other.max_active_agents;
        self.cli_chain = other.cli_chain.clone();
        self.model = other.model.clone();
        self.workspace_root = other.workspace_root.clone();
        self.artifacts_dir = other.artifacts_dir.clone();
        self.tmux_socket = other.tmux_socket.clone();
        self.probe_timeout_secs = other.probe_timeout_secs;
        self.base_ref = other.base_ref.clone();
    }

    /// Generate default orch.toml content.
    pub fn default_toml() -> String {
        format!(
            r#"# Orch configuration

[agents]
max_active = {}

[cli]
chain = "claude"
model = "default"

[tmux]
socket = "{}"

[probe]
timeout = {}  # seconds

"#,
            DEFAULT_MAX_ACTIVE_AGENTS, DEFAULT_SOCKET, DEFAULT_PROBE_TIMEOUT_SECS
        )
    }

    /// Display string for the configured CLI chain.
    pub fn chain_display(&self) -> String {
        self.cli_chain
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

pub(crate) fn detect_base_ref() -> Option<String> {
    detect_base_ref_in(None)
}

pub(crate) fn detect_base_ref_in(repo_root: Option<&Path>) -> Option<String> {
    if git_branch_exists(repo_root, "main") {
        return Some("main".to_string());
    }
    if git_branch_exists(repo_root, "master") {
        return Some("master".to_string());
    }
    git_current_branch(repo_root)
}

fn git_branch_exists(repo_root: Option<&Path>, branch: &str) -> bool {
    let mut cmd = Command::new("git");
    if let Some(root) = repo_root {
        cmd.arg("-C").arg(root);
    }
    let ref_name = format!("refs/heads/{}", branch);
    cmd.args(["show-ref", "--verify", "--quiet", &ref_name]);
    match cmd.output() {
        Ok(output) => output.status.success(),
        Err(_) => false,
    }
}

fn git_current_branch(repo_root: Option<&Path>) -> Option<String> {
    let mut cmd = Command::new("git");
    if let Some(root) = repo_root {
        cmd.arg("-C").arg(root);
    }
    cmd.args(["rev-parse", "--abbrev-ref", "HEAD"]);
    let output = cmd.output().ok()?;
    if !output.status.success() {
        return None;
    }
    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() || branch == "HEAD" {
        None
    } else {
        Some(branch)
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// I/O error reading config file.
    Io(String),
    /// Parse error in config file.
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "config I/O error: {}", msg),
            Self::Parse(msg) => write!(f, "config parse error: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}
