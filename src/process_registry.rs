//! Registry of subprocess PIDs owned by this orch instance.
//!
//! Probe and git/tmux invocations register here for the duration of the
//! call so a Ctrl+C can tear down everything the dispatcher spawned.

use std::collections::HashSet;
use std::sync::Mutex;

use once_cell::sync::Lazy;

/// Thread-safe registry of subprocess PIDs.
pub struct ProcessRegistry {
    pids: Mutex<HashSet<u32>>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self {
            pids: Mutex::new(HashSet::new()),
        }
    }

    /// Register a spawned subprocess.
    pub fn register(&self, pid: u32) {
        self.pids.lock().unwrap().insert(pid);
    }

    /// Unregister a subprocess (after wait/reap).
    pub fn unregister(&self, pid: u32) {
        self.pids.lock().unwrap().remove(&pid);
    }

    /// Get all registered PIDs (for shutdown).
    pub fn all_pids(&self) -> Vec<u32> {
        self.pids.lock().unwrap().iter().copied().collect()
    }

    /// Kill all registered subprocesses.
    pub fn kill_all(&self) {
        for pid in self.all_pids() {
            crate::process::kill_process_tree(pid);
        }
    }
}

impl Default for ProcessRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Global registry for the current orch process.
pub static PROCESS_REGISTRY: Lazy<ProcessRegistry> = Lazy::new(ProcessRegistry::new);

#[cfg(test)]
mod tests {
    use super::ProcessRegistry;

    #[test]
    fn test_register_unregister_tracks_pids() {
        let registry = ProcessRegistry::new();

        registry.register(100);
        registry.register(200);

        let mut pids = registry.all_pids();
        pids.sort_unstable();
        assert_eq!(pids, vec![100, 200]);

        registry.unregister(100);
        assert_eq!(registry.all_pids(), vec![200]);
    }

    #[test]
    fn test_unregister_unknown_pid_is_noop() {
        let registry = ProcessRegistry::new();
        registry.unregister(42);
        assert!(registry.all_pids().is_empty());
    }
}
