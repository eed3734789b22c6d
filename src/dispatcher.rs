//! Agent dispatch pipeline.
//!
//! The dispatcher is the only side-effecting entry point for launching
//! agents. Each agent passes through five stages, every one logged with
//! the agent's name so a failed batch is reconstructable afterwards:
//!
//! 1. admission: live-session count checked against the concurrency ceiling
//! 2. naming: collision-free name assigned, doubling as session and
//!    directory name
//! 3. cli: fallback chain walked, each resolvable binary probed; a
//!    non-retryable signal (quota, auth) skips that backend
//! 4. workspace: git worktree provisioned, or the repository itself for
//!    in-place agents
//! 5. launch: artifacts allocated, prompt written, tmux session started
//!
//! A failure in any stage drops only that agent; siblings in the same
//! batch proceed.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use crate::artifacts::{self, RunArtifacts};
use crate::backend::{resolve_binary_in, validate_availability, CliId};
use crate::config::Config;
use crate::log::EventLogger;
use crate::naming::NamingService;
use crate::prompt;
use crate::session::{Supervisor, Tmux};
use crate::spec::AgentSpec;
use crate::worktree::{
    self, current_branch, fallback_dir, git_repo_root, local_branch_exists, repo_name,
    resolve_workspace_root, WorktreeRequest,
};
use std::time::Duration;

/// Source of alternate base refs when the configured one does not resolve.
pub trait OperatorPrompt {
    /// Ask for a replacement for `failed`. `None` declines the retry.
    fn alternate_base(&mut self, failed: &str) -> Option<String>;
}

/// Interactive prompt on the controlling terminal.
pub struct StdinPrompt;

impl OperatorPrompt for StdinPrompt {
    fn alternate_base(&mut self, failed: &str) -> Option<String> {
        eprint!(
            "base ref '{}' did not resolve; enter an alternate ref (empty to abort): ",
            failed
        );
        let _ = io::stderr().flush();
        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                }
            }
        }
    }
}

/// Always declines. Used for detached or non-interactive dispatch.
pub struct DeclinePrompt;

impl OperatorPrompt for DeclinePrompt {
    fn alternate_base(&mut self, _failed: &str) -> Option<String> {
        None
    }
}

/// A successfully launched agent.
#[derive(Debug, Clone)]
pub struct LaunchedAgent {
    pub name: String,
    /// tmux session name (same as the agent name).
    pub session: String,
    pub cli: CliId,
    /// Resolved model, never the sentinel.
    pub model: String,
    /// Directory the agent runs in.
    pub directory: PathBuf,
    /// Branch the agent works on, when one was provisioned or named.
    pub branch: Option<String>,
    pub run_id: String,
    /// Whether the worktree landed at the temporary fallback location.
    pub used_fallback: bool,
}

/// Orchestrates agent creation end to end.
pub struct Dispatcher {
    config: Config,
    naming: NamingService,
    supervisor: Supervisor,
    logger: EventLogger,
    prompter: Box<dyn OperatorPrompt>,
    /// Operator-accepted base ref, cached only after a successful retry
    /// and reused for the rest of this dispatcher's lifetime.
    accepted_base: Option<String>,
    /// Binary search path override for tests; falls back to the process
    /// PATH at call time.
    search_path: Option<String>,
}

impl Dispatcher {
    pub fn new(config: Config) -> Self {
        let tmux = Tmux::new(&config.tmux_socket);
        let artifacts_root = artifacts_root_for(&config);
        Self {
            config,
            naming: NamingService::new(),
            supervisor: Supervisor::new(tmux),
            logger: EventLogger::new(&artifacts_root),
            prompter: Box::new(StdinPrompt),
            accepted_base: None,
            search_path: None,
        }
    }

    /// Replace the operator prompt (e.g. [`DeclinePrompt`] for detached runs).
    pub fn with_prompter(mut self, prompter: Box<dyn OperatorPrompt>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Override the binary search path. Tests inject a temp dir here.
    pub fn with_search_path(mut self, search_path: impl Into<String>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    pub fn artifacts_root(&self) -> PathBuf {
        artifacts_root_for(&self.config)
    }

    /// Analyze a task description into agent specs without dispatching.
    ///
    /// Semicolons split a task into independent sub-tasks, one agent each.
    /// Classification is keyword-based and feeds only naming and logging.
    /// `forced_cli` overrides the configured fallback chain for every
    /// planned agent.
    pub fn plan_agents(&self, task: &str, forced_cli: Option<&[CliId]>) -> Vec<AgentSpec> {
        task.split(';')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| self.plan_one(part, forced_cli))
            .collect()
    }

    fn plan_one(&self, task: &str, forced_cli: Option<&[CliId]>) -> AgentSpec {
        let lower = task.to_lowercase();
        let agent_type = if ["fix", "bug", "broken", "failing", "flaky"]
            .iter()
            .any(|k| lower.contains(k))
        {
            "fix"
        } else if ["review", "audit"].iter().any(|k| lower.contains(k)) {
            "review"
        } else if ["docs", "document", "readme"].iter().any(|k| lower.contains(k)) {
            "docs"
        } else {
            "feature"
        };

        let mut capabilities = Vec::new();
        if lower.contains("test") {
            capabilities.push("tests".to_string());
        }
        if lower.contains("rust") || lower.contains("cargo") {
            capabilities.push("rust".to_string());
        }
        if agent_type == "docs" {
            capabilities.push("docs".to_string());
        }

        let chain = forced_cli
            .map(<[CliId]>::to_vec)
            .unwrap_or_else(|| self.config.cli_chain.clone());
        let mut spec = AgentSpec::new(task, task)
            .with_type(agent_type)
            .with_cli_chain(chain)
            .with_model(self.config.model.clone());
        spec.capabilities = capabilities;
        if let Some(ref root) = self.config.workspace_root {
            spec.workspace.workspace_root = Some(PathBuf::from(root));
        }
        spec
    }

    /// Plan agents for a task and dispatch each one.
    ///
    /// One result per planned agent, in order. A failed agent never stops
    /// its siblings.
    pub fn analyze_task_and_create_agents(
        &mut self,
        task: &str,
        forced_cli: Option<&[CliId]>,
    ) -> Vec<Result<LaunchedAgent, String>> {
        let specs = self.plan_agents(task, forced_cli);
        let mut results = Vec::with_capacity(specs.len());
        for spec in specs {
            if crate::shutdown::requested() {
                results.push(Err("shutdown requested before dispatch".to_string()));
                continue;
            }
            results.push(self.create_dynamic_agent(spec));
        }
        results
    }

    /// Run one agent spec through the full pipeline.
    pub fn create_dynamic_agent(&mut self, mut spec: AgentSpec) -> Result<LaunchedAgent, String> {
        // Stage 1: admission. Counts both in-process tracked agents and
        // live sessions on the dedicated socket; enumeration failure
        // degrades to the in-process count with a logged warning.
        let live_sessions = match self.supervisor.tmux().list_sessions() {
            Ok(sessions) => sessions,
            Err(e) => {
                self.log(
                    spec.name_base(),
                    "admission",
                    &format!("session enumeration failed ({}), continuing", e),
                );
                Vec::new()
            }
        };
        let active = self.naming.active_count().max(live_sessions.len());
        if active >= self.config.max_active_agents {
            return Err(self.stage_failure(
                spec.name_base(),
                "admission",
                format!(
                    "admission denied: {} active agents at ceiling {}",
                    active, self.config.max_active_agents
                ),
            ));
        }

        // Stage 2: naming.
        let repo_root = git_repo_root().map_err(|e| {
            self.stage_failure(
                spec.name_base(),
                "naming",
                format!("not inside a git repository: {}", e),
            )
        })?;
        if spec.workspace.workspace_root.is_none() {
            if let Some(ref root) = self.config.workspace_root {
                spec.workspace.workspace_root = Some(PathBuf::from(root));
            }
        }
        let workspace_root = resolve_workspace_root(&spec.workspace, &repo_root);
        spec.name = self.naming.generate_unique_name(
            spec.name_base(),
            spec.capabilities.first().map(String::as_str),
            &live_sessions,
            &workspace_root,
        );
        let name = spec.name.clone();
        self.log(&name, "naming", &format!("assigned for focus '{}'", spec.focus));

        // Stage 3: CLI selection with preflight validation.
        let (cli, binary_path, model) = self
            .select_validated_cli(&spec)
            .map_err(|e| self.stage_failure(&name, "cli", e))?;
        self.log(
            &name,
            "cli",
            &format!("selected {} ({}) model {}", cli.as_str(), binary_path, model),
        );

        // Stage 4: workspace.
        let (directory, branch, used_fallback) = self
            .provision_workspace(&spec, &repo_root, &workspace_root)
            .map_err(|e| self.stage_failure(&name, "workspace", e))?;
        self.log(&name, "workspace", &format!("ready at {}", directory.display()));

        // Stage 5: artifacts and launch.
        let artifacts = artifacts::allocate(&self.artifacts_root(), &name).map_err(|e| {
            self.stage_failure(&name, "artifacts", format!("artifact allocation failed: {}", e))
        })?;
        self.write_prompt(&spec, &artifacts, &directory, branch.as_deref())
            .map_err(|e| self.stage_failure(&name, "launch", e))?;

        let argv = cli
            .profile()
            .build_command(&binary_path, &model)
            .map_err(|e| self.stage_failure(&name, "launch", e))?;
        self.supervisor
            .launch(&name, &name, &directory, &artifacts, &argv)
            .map_err(|e| self.stage_failure(&name, "launch", e))?;
        self.log(&name, "launch", &format!("session started, run {}", artifacts.run_id));

        Ok(LaunchedAgent {
            session: name.clone(),
            name,
            cli,
            model,
            directory,
            branch,
            run_id: artifacts.run_id,
            used_fallback,
        })
    }

    /// Walk the chain: skip unresolvable binaries outright, probe the rest,
    /// and skip any backend whose probe reports a non-retryable condition.
    fn select_validated_cli(&self, spec: &AgentSpec) -> Result<(CliId, String, String), String> {
        if spec.cli_chain.is_empty() {
            return Err("empty CLI preference chain".to_string());
        }
        let search_path = self
            .search_path
            .clone()
            .unwrap_or_else(|| std::env::var("PATH").unwrap_or_default());
        let timeout = Duration::from_secs(self.config.probe_timeout_secs);

        for id in &spec.cli_chain {
            let Some(binary_path) = resolve_binary_in(id.profile().binary, &search_path) else {
                self.log(
                    &spec.name,
                    "cli",
                    &format!("{}: binary not found, trying next", id.as_str()),
                );
                continue;
            };
            let model = id.profile().effective_model(&spec.model);
            if validate_availability(*id, &binary_path, &model, timeout) {
                return Ok((*id, binary_path, model));
            }
            self.log(
                &spec.name,
                "cli",
                &format!("{}: non-retryable probe failure, trying next", id.as_str()),
            );
        }
        let names: Vec<&str> = spec.cli_chain.iter().map(|id| id.as_str()).collect();
        Err(format!("no usable CLI in chain: {}", names.join(", ")))
    }

    /// Provision the agent's working directory and branch.
    fn provision_workspace(
        &mut self,
        spec: &AgentSpec,
        repo_root: &std::path::Path,
        workspace_root: &std::path::Path,
    ) -> Result<(PathBuf, Option<String>, bool), String> {
        if spec.no_worktree {
            let branch = spec
                .existing_branch
                .clone()
                .ok_or_else(|| "in-place agent requires an existing branch".to_string())?;
            if !local_branch_exists(repo_root, &branch) {
                return Err(format!("branch '{}' not found for in-place agent", branch));
            }
            let checked_out = current_branch(repo_root)
                .map_err(|e| format!("cannot determine checked-out branch: {}", e))?;
            if checked_out != branch {
                return Err(format!(
                    "in-place agent requires branch '{}' checked out (repository is on '{}')",
                    branch, checked_out
                ));
            }
            return Ok((repo_root.to_path_buf(), Some(branch), false));
        }

        let leaf = spec
            .workspace
            .workspace_name
            .clone()
            .unwrap_or_else(|| spec.name.clone());
        let primary_dir = workspace_root.join(&leaf);
        let repo = repo_name(repo_root);
        let fallback = fallback_dir(&repo, &spec.name);
        let branch = format!("agent/{}", spec.name);
        let base_ref = self
            .accepted_base
            .clone()
            .or_else(|| self.config.base_ref.clone())
            .unwrap_or_else(|| "main".to_string());

        let request = WorktreeRequest {
            repo_root,
            primary_dir: &primary_dir,
            fallback_dir: &fallback,
            branch: &branch,
            base_ref: &base_ref,
            create_new_branch: true,
        };
        let prompter = &mut self.prompter;
        let mut alternate = |failed: &str| prompter.alternate_base(failed);
        let (provision, accepted) = worktree::provision(&request, &mut alternate)
            .map_err(|e| format!("worktree provisioning failed: {}", e))?;
        if let Some(accepted) = accepted {
            self.log(
                &spec.name,
                "workspace",
                &format!("base ref override '{}' accepted", accepted),
            );
            self.accepted_base = Some(accepted);
        }
        if provision.used_fallback {
            self.log(
                &spec.name,
                "workspace",
                &format!("fell back to {}", provision.directory.display()),
            );
        }
        Ok((provision.directory, Some(branch), provision.used_fallback))
    }

    /// Render and persist the prompt for this run. The prompt only ever
    /// travels through the file; the session wrapper redirects it to stdin.
    fn write_prompt(
        &self,
        spec: &AgentSpec,
        artifacts: &RunArtifacts,
        directory: &std::path::Path,
        branch: Option<&str>,
    ) -> Result<(), String> {
        let template = prompt::load_template()?;
        let vars = prompt::agent_vars(
            &spec.name,
            &spec.agent_type,
            &spec.focus,
            &spec.capabilities,
            &directory.to_string_lossy(),
            branch.unwrap_or("(none)"),
            &spec.prompt,
        );
        let rendered = prompt::render(&template, &vars);
        std::fs::write(&artifacts.prompt_file, rendered)
            .map_err(|e| format!("failed to write prompt file: {}", e))
    }

    fn log(&self, agent: &str, stage: &str, message: &str) {
        let _ = self.logger.log(agent, stage, message);
    }

    /// Record a stage failure in the event log before it propagates, so
    /// every aborted agent leaves an attributable line naming the stage.
    fn stage_failure(&self, agent: &str, stage: &str, message: String) -> String {
        let _ = self.logger.log(agent, stage, &format!("failed: {}", message));
        message
    }
}

fn artifacts_root_for(config: &Config) -> PathBuf {
    match &config.artifacts_dir {
        Some(dir) => PathBuf::from(dir),
        None => artifacts::default_root(),
    }
}
