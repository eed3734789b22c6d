//! Agent naming and collision avoidance.
//!
//! The naming service is the sole authority for the invariant that no two
//! concurrently active agents share a name, worktree directory, or tmux
//! session name. A candidate combines a slugged base token, an optional
//! role suffix, and a high-resolution timestamp; it is cross-checked
//! against the in-process active set, the live session names supplied by
//! the caller, and existing workspace directories, then registered.

use std::collections::HashSet;
use std::path::Path;

use chrono::Local;

/// In-process registry of assigned agent names.
#[derive(Debug, Default)]
pub struct NamingService {
    active: HashSet<String>,
}

impl NamingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently tracked active agents.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Whether a name is currently registered.
    pub fn is_active(&self, name: &str) -> bool {
        self.active.contains(name)
    }

    /// Generate a unique name and register it for the process lifetime.
    ///
    /// `live_sessions` is the caller-enumerated list of terminal sessions;
    /// enumeration failures degrade to an empty slice upstream rather than
    /// aborting, since the timestamp component already makes collisions
    /// rare. `workspace_root` is probed for existing directories.
    pub fn generate_unique_name(
        &mut self,
        base: &str,
        role: Option<&str>,
        live_sessions: &[String],
        workspace_root: &Path,
    ) -> String {
        let stamp = Local::now().format("%H%M%S");
        let stem = match role.map(slug).filter(|r| !r.is_empty()) {
            Some(role) => format!("{}-{}-{}", slug(base), role, stamp),
            None => format!("{}-{}", slug(base), stamp),
        };

        let mut candidate = stem.clone();
        let mut suffix = 2;
        while self.collides(&candidate, live_sessions, workspace_root) {
            candidate = format!("{}-{}", stem, suffix);
            suffix += 1;
        }

        self.active.insert(candidate.clone());
        candidate
    }

    /// Register an externally chosen name (e.g. `live --name`).
    /// Returns false if the name is already active.
    pub fn register(&mut self, name: &str) -> bool {
        self.active.insert(name.to_string())
    }

    fn collides(&self, candidate: &str, live_sessions: &[String], workspace_root: &Path) -> bool {
        if self.active.contains(candidate) {
            return true;
        }
        if live_sessions.iter().any(|s| s == candidate) {
            return true;
        }
        workspace_root.join(candidate).exists()
    }
}

/// Reduce a token to lowercase alphanumerics and hyphens.
pub fn slug(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_hyphen = true;
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            out.push('-');
            last_hyphen = true;
        }
    }
    while out.ends_with('-') {
        out.pop();
    }
    if out.is_empty() {
        "agent".to_string()
    } else {
        out
    }
}
