//! Worktree creation: branch decision table and failure recovery.
//!
//! Branch handling, for `create_new_branch = true`:
//! - branch absent: `worktree add -b <branch> <dir> <base>`
//! - branch exists, does not descend from base: `worktree add -B` (reset)
//! - branch exists, already descends from base: `worktree add <dir> <branch>`
//!   (idempotent re-entry after a partial prior failure)
//!
//! For `create_new_branch = false`:
//! - local branch exists: `worktree add <dir> <branch>`
//! - only `origin/<branch>` exists: `worktree add -b <branch> <dir> origin/<branch>`
//!
//! Recovery: infrastructure failures retry exactly once at a temporary
//! fallback directory (removed again if the retry also fails); an invalid
//! base ref runs an explicit operator-retry state machine whose alternate
//! ref is reported back to the caller only when the retry succeeds.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::WorktreeError;

use super::git::{
    branch_descends_from, ensure_head, local_branch_exists, remote_branch_exists,
    run_git_classified, worktree_branch_at,
};

/// How the branch side of provisioning was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// Fresh branch created from the base ref.
    CreatedBranch,
    /// Existing branch force-reset onto the base ref.
    ResetToBase,
    /// Existing local branch checked out as-is.
    ReusedLocal,
    /// Local branch created tracking `origin/<branch>`.
    TrackedRemote,
}

/// A successfully provisioned worktree.
#[derive(Debug, Clone)]
pub struct Provision {
    /// Directory the agent will run in.
    pub directory: PathBuf,
    pub outcome: ProvisionOutcome,
    /// True when the temporary fallback location had to be used.
    pub used_fallback: bool,
}

/// Inputs for one provisioning attempt.
#[derive(Debug)]
pub struct WorktreeRequest<'a> {
    pub repo_root: &'a Path,
    /// Primary target directory (workspace root + agent leaf).
    pub primary_dir: &'a Path,
    /// Temporary fallback directory, unique to repo + agent.
    pub fallback_dir: &'a Path,
    pub branch: &'a str,
    pub base_ref: &'a str,
    pub create_new_branch: bool,
}

/// Base-ref retry control flow, made explicit so "cache only on success"
/// is a property of the terminal transition rather than a conditional.
enum RetryState {
    Attempting(String),
    AwaitingOperatorInput(WorktreeError),
    Retrying(String),
    Succeeded(Provision, Option<String>),
    Failed(WorktreeError),
}

/// Provision a worktree with full recovery.
///
/// `alternate_base` is consulted at most once, when the base ref fails to
/// resolve; returning `None` declines the retry. On success the second
/// tuple element carries the operator-supplied ref that worked (if any),
/// for the caller to cache.
pub fn provision(
    req: &WorktreeRequest<'_>,
    alternate_base: &mut dyn FnMut(&str) -> Option<String>,
) -> Result<(Provision, Option<String>), WorktreeError> {
    ensure_head(req.repo_root)?;

    let mut state = RetryState::Attempting(req.base_ref.to_string());
    loop {
        state = match state {
            RetryState::Attempting(base) => match attempt_with_fallback(req, &base) {
                Ok(p) => RetryState::Succeeded(p, None),
                Err(e) if e.is_invalid_base() => RetryState::AwaitingOperatorInput(e),
                Err(e) => RetryState::Failed(e),
            },
            RetryState::AwaitingOperatorInput(original) => {
                match alternate_base(req.base_ref).map(|r| r.trim().to_string()) {
                    Some(new_base) if !new_base.is_empty() => RetryState::Retrying(new_base),
                    _ => RetryState::Failed(original),
                }
            }
            RetryState::Retrying(new_base) => match attempt_with_fallback(req, &new_base) {
                Ok(p) => RetryState::Succeeded(p, Some(new_base)),
                // Single-shot: a failed retry is terminal and uncached.
                Err(e) => RetryState::Failed(e),
            },
            RetryState::Succeeded(p, accepted) => return Ok((p, accepted)),
            RetryState::Failed(e) => return Err(e),
        };
    }
}

/// One location-aware attempt: primary directory first, then exactly one
/// retry at the fallback directory for infrastructure-class failures. A
/// fallback that also fails is removed before the original error surfaces.
fn attempt_with_fallback(
    req: &WorktreeRequest<'_>,
    base_ref: &str,
) -> Result<Provision, WorktreeError> {
    let primary = attempt_at(req, req.primary_dir, base_ref, false);
    let original = match primary {
        Ok(p) => return Ok(p),
        Err(e) if e.is_infrastructure() => e,
        Err(e) => return Err(e),
    };

    match attempt_at(req, req.fallback_dir, base_ref, true) {
        Ok(p) => Ok(p),
        Err(_) => {
            // No partial state: drop whatever the fallback attempt left.
            let _ = fs::remove_dir_all(req.fallback_dir);
            Err(original)
        }
    }
}

/// One worktree-add at a specific directory, per the decision table.
fn attempt_at(
    req: &WorktreeRequest<'_>,
    dir: &Path,
    base_ref: &str,
    used_fallback: bool,
) -> Result<Provision, WorktreeError> {
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent)?;
    }
    let dir_str = dir.to_string_lossy().to_string();

    // Idempotent re-entry: the directory is already a registered worktree
    // for this branch.
    if dir.exists() {
        if let Some(attached) = worktree_branch_at(req.repo_root, dir)? {
            if attached == req.branch {
                return Ok(Provision {
                    directory: dir.to_path_buf(),
                    outcome: ProvisionOutcome::ReusedLocal,
                    used_fallback,
                });
            }
            return Err(WorktreeError::Git(format!(
                "directory {} already hosts a worktree for branch '{}'",
                dir.display(),
                attached
            )));
        }
    }

    let branch_exists = local_branch_exists(req.repo_root, req.branch);
    let outcome = if req.create_new_branch {
        if !branch_exists {
            run_git_classified(
                req.repo_root,
                &["worktree", "add", "-b", req.branch, &dir_str, base_ref],
                base_ref,
            )?;
            ProvisionOutcome::CreatedBranch
        } else if branch_descends_from(req.repo_root, req.branch, base_ref)? {
            // Branch already tracks the base: plain add, no -b/-B.
            run_git_classified(
                req.repo_root,
                &["worktree", "add", &dir_str, req.branch],
                base_ref,
            )?;
            ProvisionOutcome::ReusedLocal
        } else {
            run_git_classified(
                req.repo_root,
                &["worktree", "add", "-B", req.branch, &dir_str, base_ref],
                base_ref,
            )?;
            ProvisionOutcome::ResetToBase
        }
    } else if branch_exists {
        run_git_classified(
            req.repo_root,
            &["worktree", "add", &dir_str, req.branch],
            base_ref,
        )?;
        ProvisionOutcome::ReusedLocal
    } else if remote_branch_exists(req.repo_root, req.branch) {
        let remote_ref = format!("origin/{}", req.branch);
        run_git_classified(
            req.repo_root,
            &["worktree", "add", "-b", req.branch, &dir_str, &remote_ref],
            base_ref,
        )?;
        ProvisionOutcome::TrackedRemote
    } else {
        return Err(WorktreeError::Git(format!(
            "branch '{}' not found locally or on origin",
            req.branch
        )));
    };

    Ok(Provision {
        directory: dir.to_path_buf(),
        outcome,
        used_fallback,
    })
}
