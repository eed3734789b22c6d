//! Workspace location resolution.
//!
//! Priority order for an agent's worktree root:
//! 1. explicit `workspace_config.workspace_root` on the spec
//! 2. the per-repository default `~/projects/orch_<repo>`
//! 3. a temporary fallback root, used only after the primary location
//!    fails for infrastructure reasons

use std::path::{Path, PathBuf};

use crate::spec::WorkspaceConfig;

use super::git::remote_url;

/// Derive the repository name from the `origin` remote URL, stripping
/// protocol, host, and `.git` suffix; falls back to the repo directory
/// name when no remote is configured.
pub fn repo_name(repo_root: &Path) -> String {
    if let Some(url) = remote_url(repo_root) {
        if let Some(name) = name_from_url(&url) {
            return name;
        }
    }
    repo_root
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "repo".to_string())
}

fn name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let without_git = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    let last = without_git
        .rsplit(|c| c == '/' || c == ':')
        .next()?
        .trim();
    if last.is_empty() {
        None
    } else {
        Some(last.to_string())
    }
}

/// The per-repository default workspace root: `~/projects/orch_<repo>`.
pub fn default_workspace_root(repo: &str) -> PathBuf {
    home_dir().join("projects").join(format!("orch_{}", repo))
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

/// Resolve the workspace root for a spec: explicit override or the
/// per-repository default.
pub fn resolve_workspace_root(workspace: &WorkspaceConfig, repo_root: &Path) -> PathBuf {
    match &workspace.workspace_root {
        Some(root) => root.clone(),
        None => default_workspace_root(&repo_name(repo_root)),
    }
}

/// Temporary fallback directory for one agent, unique to the repository
/// and agent name. Used exactly once, after the primary location fails
/// with an infrastructure-class error.
pub fn fallback_dir(repo: &str, agent_name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("orch-fallback-{}-{}", repo, agent_name))
}
