//! Git worktree provisioning for agents.
//!
//! Each agent gets an isolated, branch-bound working directory under the
//! workspace root. Provisioning handles branch creation vs. reuse, remote
//! tracking, a one-shot temporary-location fallback for infrastructure
//! failures, and an interactive retry when the base reference does not
//! resolve.

mod create;
mod git;
mod location;

pub use create::{provision, ProvisionOutcome, Provision, WorktreeRequest};
pub use git::{
    branch_descends_from, current_branch, ensure_head, git_repo_root, local_branch_exists,
    remote_branch_exists, worktree_branch_at,
};
pub use location::{default_workspace_root, fallback_dir, repo_name, resolve_workspace_root};
