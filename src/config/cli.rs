/// CLI arguments parsed from command line.
#[derive(Debug, Default)]
pub struct CliArgs {
    /// Subcommand to execute.
    pub command: Option<Command>,
    /// Path to config file.
    pub config: Option<String>,
    /// Maximum number of concurrently active agents.
    pub max_agents: Option<usize>,
    /// CLI fallback chain, comma-separated.
    pub cli: Option<String>,
    /// Model override.
    pub model: Option<String>,
    /// Workspace root for worktree directories.
    pub workspace_root: Option<String>,
    /// Artifact directory.
    pub artifacts_dir: Option<String>,
    /// tmux socket name.
    pub socket: Option<String>,
    /// CLI probe timeout in seconds.
    pub probe_timeout: Option<u64>,
    /// Base ref for new agent branches.
    pub base_ref: Option<String>,
    /// Agent name for `live`.
    pub name: Option<String>,
    /// Working directory for `live` (skips worktree provisioning).
    pub dir: Option<String>,
    /// Do not attach after launching a live session.
    pub detached: bool,
    /// Run a single agent in the repository itself on this checked-out
    /// branch instead of provisioning a worktree.
    pub no_worktree: Option<String>,
    /// Show help.
    pub help: bool,
    /// Show version.
    pub version: bool,
    /// Session name for `attach` / `kill` (positional arg).
    pub session_arg: Option<String>,
    /// Free-form task words (positional args after the subcommand).
    pub task_words: Vec<String>,
}

impl CliArgs {
    /// Task text assembled from the positional words.
    pub fn task(&self) -> String {
        self.task_words.join(" ")
    }
}

/// Orch subcommands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Analyze a task and dispatch the resulting agents.
    Run,
    /// Print the agent plan for a task without dispatching.
    DispatcherAnalyze,
    /// Dispatch agents for a task (same as run).
    DispatcherCreate,
    /// Launch a single interactive agent session.
    Live,
    /// List active agent sessions.
    List,
    /// Attach to an agent session.
    Attach,
    /// Kill an agent session.
    Kill,
}

impl Command {
    /// Parse a top-level command word.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "run" => Some(Self::Run),
            "live" => Some(Self::Live),
            "list" => Some(Self::List),
            "attach" => Some(Self::Attach),
            "kill" => Some(Self::Kill),
            _ => None,
        }
    }
}

/// Parse CLI arguments from an iterator.
pub fn parse_args<I>(args: I) -> CliArgs
where
    I: IntoIterator<Item = String>,
{
    let mut cli = CliArgs::default();
    let mut args = args.into_iter().peekable();

    // Skip program name
    args.next();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => cli.help = true,
            "-V" | "--version" => cli.version = true,
            "-c" | "--config" => cli.config = args.next(),
            "--max-agents" => cli.max_agents = args.next().and_then(|s| s.parse().ok()),
            "--cli" => cli.cli = args.next(),
            "--model" => cli.model = args.next(),
            "--workspace-root" => cli.workspace_root = args.next(),
            "--artifacts-dir" => cli.artifacts_dir = args.next(),
            "--socket" => cli.socket = args.next(),
            "--probe-timeout" => cli.probe_timeout = args.next().and_then(|s| s.parse().ok()),
            "--base" => cli.base_ref = args.next(),
            "--name" => cli.name = args.next(),
            "--dir" => cli.dir = args.next(),
            "--detached" => cli.detached = true,
            "--no-worktree" => cli.no_worktree = args.next(),
            _ if !arg.starts_with('-') && cli.command.is_none() => {
                // "dispatcher analyze|create" is a two-word command.
                if arg == "dispatcher" {
                    match args.peek().map(String::as_str) {
                        Some("analyze") => {
                            args.next();
                            cli.command = Some(Command::DispatcherAnalyze);
                        }
                        Some("create") => {
                            args.next();
                            cli.command = Some(Command::DispatcherCreate);
                        }
                        _ => {}
                    }
                } else {
                    cli.command = Command::from_str(&arg);
                    if matches!(cli.command, Some(Command::Attach) | Some(Command::Kill)) {
                        if let Some(next) = args.peek() {
                            if !next.starts_with('-') {
                                cli.session_arg = args.next();
                            }
                        }
                    }
                }
            }
            _ if !arg.starts_with('-') => cli.task_words.push(arg),
            _ => {} // Ignore unknown flags
        }
    }

    cli
}
