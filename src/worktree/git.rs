//! Git invocation helpers.
//!
//! Every call goes through the bounded-timeout process runner with argv
//! lists; no shell is ever involved.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::error::{classify_git_failure, WorktreeError};
use crate::process::run_with_timeout;

/// Deadline for a single git invocation.
const GIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Run git against a repository, returning trimmed stdout.
/// Failures are reported as semantic git errors.
pub(super) fn run_git(repo_root: &Path, args: &[&str]) -> Result<String, WorktreeError> {
    let (status_ok, stdout, stderr) = run_git_raw(repo_root, args)?;
    if status_ok {
        Ok(stdout)
    } else {
        Err(WorktreeError::Git(stderr.trim().to_string()))
    }
}

/// Run git, classifying a failure against the given base ref so callers
/// can distinguish invalid-base and infrastructure errors.
pub(super) fn run_git_classified(
    repo_root: &Path,
    args: &[&str],
    base_ref: &str,
) -> Result<String, WorktreeError> {
    let (status_ok, stdout, stderr) = run_git_raw(repo_root, args)?;
    if status_ok {
        Ok(stdout)
    } else {
        Err(classify_git_failure(&stderr, base_ref))
    }
}

fn run_git_raw(repo_root: &Path, args: &[&str]) -> Result<(bool, String, String), WorktreeError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C").arg(repo_root).args(args);
    let output = run_with_timeout(&mut cmd, GIT_TIMEOUT)
        .map_err(WorktreeError::Infrastructure)?;
    Ok((
        output.status.success(),
        String::from_utf8_lossy(&output.stdout).trim().to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
    ))
}

/// Root of the repository containing the current directory.
pub fn git_repo_root() -> Result<PathBuf, WorktreeError> {
    let out = run_git(Path::new("."), &["rev-parse", "--show-toplevel"])?;
    if out.is_empty() {
        return Err(WorktreeError::Git("not inside a git repository".to_string()));
    }
    Ok(PathBuf::from(out))
}

/// Verify HEAD resolves (a repo with no commits cannot host worktrees).
pub fn ensure_head(repo_root: &Path) -> Result<(), WorktreeError> {
    run_git(repo_root, &["rev-parse", "--verify", "HEAD"])
        .map(|_| ())
        .map_err(|_| {
            WorktreeError::Git(
                "repository has no commits; cannot create worktrees".to_string(),
            )
        })
}

/// Does a local branch exist?
pub fn local_branch_exists(repo_root: &Path, branch: &str) -> bool {
    run_git(
        repo_root,
        &[
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/heads/{}", branch),
        ],
    )
    .is_ok()
}

/// Does an `origin` remote-tracking branch exist?
pub fn remote_branch_exists(repo_root: &Path, branch: &str) -> bool {
    run_git(
        repo_root,
        &[
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/remotes/origin/{}", branch),
        ],
    )
    .is_ok()
}

/// Short name of the branch checked out at `repo_root`.
pub fn current_branch(repo_root: &Path) -> Result<String, WorktreeError> {
    run_git(repo_root, &["rev-parse", "--abbrev-ref", "HEAD"])
}

/// Does `branch` descend from `base_ref` (base is an ancestor of branch)?
pub fn branch_descends_from(
    repo_root: &Path,
    branch: &str,
    base_ref: &str,
) -> Result<bool, WorktreeError> {
    let mut cmd = Command::new("git");
    cmd.arg("-C")
        .arg(repo_root)
        .args(["merge-base", "--is-ancestor", base_ref, branch]);
    let output = run_with_timeout(&mut cmd, GIT_TIMEOUT)
        .map_err(WorktreeError::Infrastructure)?;
    match output.status.code() {
        Some(0) => Ok(true),
        Some(1) => Ok(false),
        _ => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(classify_git_failure(&stderr, base_ref))
        }
    }
}

/// URL of the `origin` remote, if configured.
pub(super) fn remote_url(repo_root: &Path) -> Option<String> {
    run_git(repo_root, &["remote", "get-url", "origin"])
        .ok()
        .filter(|url| !url.is_empty())
}

/// The branch checked out in a registered worktree at `dir`, if any.
///
/// Parses `git worktree list --porcelain`, which emits one stanza per
/// worktree with `worktree <path>` and `branch refs/heads/<name>` lines.
pub fn worktree_branch_at(repo_root: &Path, dir: &Path) -> Result<Option<String>, WorktreeError> {
    let stdout = run_git(repo_root, &["worktree", "list", "--porcelain"])?;
    let target = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());

    let mut current_path: Option<PathBuf> = None;
    for line in stdout.lines() {
        if let Some(path) = line.strip_prefix("worktree ") {
            current_path = Some(PathBuf::from(path.trim()));
        } else if let Some(branch_ref) = line.strip_prefix("branch ") {
            if let Some(ref path) = current_path {
                let resolved = path.canonicalize().unwrap_or_else(|_| path.clone());
                if resolved == target || path.as_path() == dir {
                    let branch = branch_ref
                        .trim()
                        .strip_prefix("refs/heads/")
                        .unwrap_or(branch_ref.trim());
                    return Ok(Some(branch.to_string()));
                }
            }
        }
    }
    Ok(None)
}
