//! Orch: dispatch autonomous coding-agent CLIs onto isolated workspaces.
//!
//! Each dispatched agent gets its own git worktree (branch-bound, isolated
//! from every other agent), its own tmux session on a dedicated socket, and
//! per-run artifact files under the artifacts root:
//! - `<artifacts>/<agent>-<run>.log` - per-run agent output
//! - `<artifacts>/<agent>-<run>.result.json` - structured completion record
//! - `<artifacts>/<agent>-<run>.prompt.md` - the exact prompt handed to the CLI
//! - `<artifacts>/<agent>.log` / `<agent>.result.json` - stable pointers to
//!   the most recent run, for tooling that tails "the latest"
//!
//! The dispatcher is the sole side-effecting entry point: it admits an
//! agent against a concurrency ceiling, assigns a collision-free name,
//! selects a CLI backend from a fallback chain, provisions the worktree,
//! allocates artifacts, and launches the supervised session.

pub mod artifacts;
pub mod backend;
pub mod color;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod log;
pub mod naming;
pub mod process;
pub mod process_registry;
pub mod prompt;
pub mod run_id;
pub mod session;
pub mod shutdown;
pub mod spec;
#[doc(hidden)]
pub mod testutil;
pub mod worktree;
