//! Agent specification: the unit of work submitted to the dispatcher.

use std::path::PathBuf;

use crate::backend::CliId;

/// Sentinel model identifier meaning "use the selected CLI's own default".
///
/// The sentinel must never appear in a launched command; the dispatcher
/// replaces it with the chosen profile's default model during CLI selection.
pub const MODEL_DEFAULT: &str = "default";

/// Optional workspace overrides carried on an [`AgentSpec`].
///
/// Absent fields fall back to computed defaults: the per-repository
/// workspace root `~/projects/orch_<repo>` and the agent name as the
/// worktree directory leaf.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceConfig {
    /// Explicit root directory for the agent's worktree.
    pub workspace_root: Option<PathBuf>,
    /// Explicit directory leaf (defaults to the agent name).
    pub workspace_name: Option<String>,
}

/// One agent to dispatch.
///
/// Constructed by [`crate::dispatcher::Dispatcher::analyze_task_and_create_agents`]
/// or hand-built by callers bypassing analysis. Mutated only during
/// provisioning (name finalized, model defaulted); consumed exactly once by
/// the session supervisor.
#[derive(Debug, Clone)]
pub struct AgentSpec {
    /// Unique identifier, assigned by the naming service before launch.
    /// Doubles as the tmux session name, the worktree directory leaf, and
    /// the artifact file stem. Empty until the naming stage runs.
    pub name: String,
    /// Classification tag (e.g. "fix", "feature", "review"). Opaque to the
    /// dispatcher; used only for naming and logging.
    pub agent_type: String,
    /// Human-readable task summary.
    pub focus: String,
    /// Declared skill tags. Informational.
    pub capabilities: Vec<String>,
    /// The literal prompt handed to the CLI backend. Owned by the caller;
    /// never placed on a command line.
    pub prompt: String,
    /// Ordered preference list of CLI backends to try.
    pub cli_chain: Vec<CliId>,
    /// Requested model, or [`MODEL_DEFAULT`].
    pub model: String,
    /// Workspace overrides.
    pub workspace: WorkspaceConfig,
    /// Run in place against an already-checked-out branch instead of
    /// provisioning a worktree.
    pub no_worktree: bool,
    /// Branch the agent runs against when `no_worktree` is set.
    pub existing_branch: Option<String>,
}

impl AgentSpec {
    /// Create a spec with the given focus and prompt, everything else
    /// defaulted. The name stays empty until the dispatcher assigns one.
    pub fn new(focus: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            agent_type: "task".to_string(),
            focus: focus.into(),
            capabilities: Vec::new(),
            prompt: prompt.into(),
            cli_chain: vec![CliId::Claude, CliId::Codex],
            model: MODEL_DEFAULT.to_string(),
            workspace: WorkspaceConfig::default(),
            no_worktree: false,
            existing_branch: None,
        }
    }

    /// Set the classification tag.
    pub fn with_type(mut self, agent_type: impl Into<String>) -> Self {
        self.agent_type = agent_type.into();
        self
    }

    /// Set the CLI preference chain.
    pub fn with_cli_chain(mut self, chain: Vec<CliId>) -> Self {
        self.cli_chain = chain;
        self
    }

    /// Set the requested model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Override the workspace root.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace.workspace_root = Some(root.into());
        self
    }

    /// Run in place against `branch` instead of provisioning a worktree.
    pub fn in_place(mut self, branch: impl Into<String>) -> Self {
        self.no_worktree = true;
        self.existing_branch = Some(branch.into());
        self
    }

    /// The base token used for naming: the classification tag.
    pub fn name_base(&self) -> &str {
        &self.agent_type
    }
}
