//! End-to-end dispatch tests against a stub CLI, a real git repository,
//! and (when present) a real tmux server on a test-local socket.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use orch::backend::CliId;
use orch::config::Config;
use orch::dispatcher::{Dispatcher, OperatorPrompt};
use orch::session::{parse_result, SessionResult, Supervisor, Tmux};
use orch::spec::AgentSpec;

fn run_success(cmd: &mut Command) -> Output {
    let output = cmd.output().expect("failed to run command");
    assert!(
        output.status.success(),
        "command failed\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn init_repo(repo: &Path) {
    run_success(Command::new("git").arg("-C").arg(repo).args(["init", "-b", "main"]));
    run_success(
        Command::new("git")
            .arg("-C")
            .arg(repo)
            .args(["config", "user.name", "Orch Test"]),
    );
    run_success(
        Command::new("git")
            .arg("-C")
            .arg(repo)
            .args(["config", "user.email", "orch-test@example.com"]),
    );
    fs::write(repo.join("README.md"), "init").expect("write README");
    run_success(Command::new("git").arg("-C").arg(repo).args(["add", "."]));
    run_success(
        Command::new("git")
            .arg("-C")
            .arg(repo)
            .args(["commit", "-m", "init"]),
    );
}

/// Stub CLI: drains stdin like the real backends, echoes a transcript,
/// and exits 0. Installed as `orch-stub-agent` in a temp bin dir.
#[cfg(unix)]
fn install_stub(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let path = dir.join("orch-stub-agent");
    fs::write(
        &path,
        "#!/bin/sh\nmodel=\"$1\"\nprompt=$(cat)\necho \"stub model=$model\"\necho \"$prompt\" | head -1\n",
    )
    .unwrap();
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&path, perms).unwrap();
    path
}

fn tmux_present() -> bool {
    Command::new("tmux")
        .arg("-V")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

struct Workbench {
    _temp: TempDir,
    repo: PathBuf,
    artifacts: PathBuf,
    workspace: PathBuf,
    bin: PathBuf,
    socket: String,
    orig_cwd: PathBuf,
}

impl Workbench {
    fn new(tag: &str) -> Self {
        let temp = TempDir::new().expect("temp dir");
        let repo = temp.path().join("repo");
        fs::create_dir(&repo).unwrap();
        init_repo(&repo);

        let artifacts = temp.path().join("artifacts");
        let workspace = temp.path().join("workspace");
        let bin = temp.path().join("bin");
        fs::create_dir(&bin).unwrap();
        #[cfg(unix)]
        install_stub(&bin);

        let orig_cwd = std::env::current_dir().unwrap();
        std::env::set_current_dir(&repo).unwrap();

        Workbench {
            repo,
            artifacts,
            workspace,
            bin,
            socket: format!("orch-it-{}-{}", tag, std::process::id()),
            orig_cwd,
            _temp: temp,
        }
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.cli_chain = vec![CliId::Stub];
        config.base_ref = Some("main".to_string());
        config.artifacts_dir = Some(self.artifacts.to_string_lossy().to_string());
        config.workspace_root = Some(self.workspace.to_string_lossy().to_string());
        config.tmux_socket = self.socket.clone();
        config.probe_timeout_secs = 5;
        config
    }

    fn dispatcher(&self) -> Dispatcher {
        Dispatcher::new(self.config()).with_search_path(self.bin.to_string_lossy().to_string())
    }

    fn kill_server(&self) {
        let _ = Command::new("tmux")
            .args(["-L", &self.socket, "kill-server"])
            .output();
    }
}

impl Drop for Workbench {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.orig_cwd);
        self.kill_server();
    }
}

// Dispatch mutates the process working directory via Workbench, so the
// end-to-end tests share the lock used by the unit suites.
fn cwd_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

fn wait_for_result(path: &Path, timeout: Duration) -> Option<String> {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Ok(content) = fs::read_to_string(path) {
            if !content.trim().is_empty() {
                return Some(content);
            }
        }
        std::thread::sleep(Duration::from_millis(100));
    }
    None
}

struct NeverPrompt;

impl OperatorPrompt for NeverPrompt {
    fn alternate_base(&mut self, _failed: &str) -> Option<String> {
        panic!("operator prompt should not be consulted");
    }
}

#[cfg(unix)]
#[test]
fn test_dispatch_runs_agent_to_completion() {
    if !tmux_present() {
        return;
    }
    let _guard = cwd_lock();
    let bench = Workbench::new("complete");
    let mut dispatcher = bench
        .dispatcher()
        .with_prompter(Box::new(NeverPrompt));

    let results = dispatcher.analyze_task_and_create_agents("Fix the failing login tests", None);
    assert_eq!(results.len(), 1);
    let agent = results.into_iter().next().unwrap().expect("dispatch");

    // Worktree on its own branch under the workspace root.
    assert!(agent.directory.starts_with(&bench.workspace));
    let head = run_success(
        Command::new("git")
            .arg("-C")
            .arg(&agent.directory)
            .args(["rev-parse", "--abbrev-ref", "HEAD"]),
    );
    assert_eq!(
        String::from_utf8_lossy(&head.stdout).trim(),
        agent.branch.as_deref().unwrap()
    );

    // The branch is registered in the primary repository.
    run_success(Command::new("git").arg("-C").arg(&bench.repo).args([
        "show-ref",
        "--verify",
        "--quiet",
        &format!("refs/heads/{}", agent.branch.as_deref().unwrap()),
    ]));

    // The stub exits quickly; the wrapper records a completed result.
    let result_path = bench
        .artifacts
        .join(format!("{}-{}.result.json", agent.name, agent.run_id));
    let content = wait_for_result(&result_path, Duration::from_secs(10)).expect("result file");
    assert_eq!(parse_result(&content), Some(SessionResult::Completed));

    // Output log got the stub transcript, with the prompt delivered on stdin.
    let log = fs::read_to_string(
        bench
            .artifacts
            .join(format!("{}-{}.log", agent.name, agent.run_id)),
    )
    .unwrap();
    assert!(log.contains("stub model=stub-model"), "log: {}", log);
    assert!(log.contains(&agent.name), "prompt vars rendered: {}", log);

    // Stable pointer follows the run.
    let latest = orch::artifacts::read_latest(&bench.artifacts.join(format!("{}.log", agent.name)))
        .unwrap();
    assert!(latest.ends_with(format!("{}-{}.log", agent.name, agent.run_id)));
}

#[cfg(unix)]
#[test]
fn test_sibling_isolation_one_bad_subtask() {
    if !tmux_present() {
        return;
    }
    let _guard = cwd_lock();
    let bench = Workbench::new("sibling");

    // First sub-task dispatches; second hits the admission ceiling.
    let mut config = bench.config();
    config.max_active_agents = 1;
    let mut dispatcher = Dispatcher::new(config)
        .with_search_path(bench.bin.to_string_lossy().to_string())
        .with_prompter(Box::new(NeverPrompt));

    let results =
        dispatcher.analyze_task_and_create_agents("Fix the parser bug; review the lexer", None);
    assert_eq!(results.len(), 2);
    assert!(results[0].is_ok(), "{:?}", results[0]);
    let err = results[1].as_ref().unwrap_err();
    assert!(err.contains("admission denied"), "{}", err);
}

#[cfg(unix)]
#[test]
fn test_two_agents_fully_isolated() {
    if !tmux_present() {
        return;
    }
    let _guard = cwd_lock();
    let bench = Workbench::new("isolated");
    let mut dispatcher = bench
        .dispatcher()
        .with_prompter(Box::new(NeverPrompt));

    let results = dispatcher
        .analyze_task_and_create_agents("Fix the auth bug; add docs for the config file", None);
    let agents: Vec<_> = results
        .into_iter()
        .map(|r| r.expect("dispatch"))
        .collect();
    assert_eq!(agents.len(), 2);

    assert_ne!(agents[0].name, agents[1].name);
    assert_ne!(agents[0].directory, agents[1].directory);
    assert_ne!(agents[0].branch, agents[1].branch);
    assert_ne!(agents[0].run_id, agents[1].run_id);
}

#[cfg(unix)]
#[test]
fn test_kill_active_session() {
    if !tmux_present() {
        return;
    }
    let _guard = cwd_lock();
    let bench = Workbench::new("kill");

    // Long-running stub so the session is still alive when we kill it.
    use std::os::unix::fs::PermissionsExt;
    let slow = bench.bin.join("orch-stub-agent");
    fs::write(&slow, "#!/bin/sh\ncat >/dev/null\nsleep 60\n").unwrap();
    let mut perms = fs::metadata(&slow).unwrap().permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&slow, perms).unwrap();

    let mut dispatcher = bench
        .dispatcher()
        .with_prompter(Box::new(NeverPrompt));
    let agent = dispatcher
        .create_dynamic_agent(
            AgentSpec::new("long task", "long task").with_cli_chain(vec![CliId::Stub]),
        )
        .expect("dispatch");

    let supervisor = Supervisor::new(Tmux::new(&bench.socket));
    assert!(supervisor.is_active(&agent.session).unwrap());

    supervisor.kill(&agent.session).unwrap();
    std::thread::sleep(Duration::from_millis(300));
    assert!(!supervisor.is_active(&agent.session).unwrap());
}

#[test]
fn test_dispatch_fails_cleanly_outside_repo() {
    let _guard = cwd_lock();
    let temp = TempDir::new().unwrap();
    let orig = std::env::current_dir().unwrap();
    std::env::set_current_dir(temp.path()).unwrap();

    let mut config = Config::default();
    config.cli_chain = vec![CliId::Stub];
    config.tmux_socket = format!("orch-it-norepo-{}", std::process::id());
    let mut dispatcher = Dispatcher::new(config);

    let err = dispatcher
        .create_dynamic_agent(AgentSpec::new("f", "p"))
        .unwrap_err();
    assert!(err.contains("git repository"), "{}", err);

    std::env::set_current_dir(orig).unwrap();
}
