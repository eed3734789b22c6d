//! Per-run artifact allocation.
//!
//! Each launch gets uniquely suffixed log/result/prompt paths plus two
//! stable "latest" pointers per agent name, so external tooling can tail
//! the most recent run without knowing the run suffix. Allocation never
//! overwrites a prior run's files.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::run_id::generate_run_id;

/// Artifact paths for one agent invocation.
#[derive(Debug, Clone)]
pub struct RunArtifacts {
    /// Unique per-run suffix.
    pub run_id: String,
    /// Per-run agent output log.
    pub log_file: PathBuf,
    /// Per-run structured completion record.
    pub result_file: PathBuf,
    /// Per-run prompt handed to the CLI.
    pub prompt_file: PathBuf,
    /// Stable pointer to the latest run's log.
    pub legacy_log_file: PathBuf,
    /// Stable pointer to the latest run's result.
    pub legacy_result_file: PathBuf,
}

/// Default artifacts root: `$TMPDIR/orch`.
pub fn default_root() -> PathBuf {
    std::env::temp_dir().join("orch")
}

/// Allocate artifacts for one run of `agent_name` under `root`.
///
/// Creates the root directory, picks a fresh run id (retrying in the
/// unlikely event of a suffix collision), touches the per-run files, and
/// atomically repoints the legacy pointers at this run.
pub fn allocate(root: &Path, agent_name: &str) -> io::Result<RunArtifacts> {
    fs::create_dir_all(root)?;

    let (run_id, log_file, result_file, prompt_file) = loop {
        let run_id = generate_run_id();
        let stem = format!("{}-{}", agent_name, run_id);
        let log_file = root.join(format!("{}.log", stem));
        let result_file = root.join(format!("{}.result.json", stem));
        let prompt_file = root.join(format!("{}.prompt.md", stem));
        if !log_file.exists() && !result_file.exists() && !prompt_file.exists() {
            break (run_id, log_file, result_file, prompt_file);
        }
    };

    // Touch the log so "tail latest" works before the agent writes anything.
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)?;

    let legacy_log_file = root.join(format!("{}.log", agent_name));
    let legacy_result_file = root.join(format!("{}.result.json", agent_name));
    point_latest(&legacy_log_file, &log_file)?;
    point_latest(&legacy_result_file, &result_file)?;

    Ok(RunArtifacts {
        run_id,
        log_file,
        result_file,
        prompt_file,
        legacy_log_file,
        legacy_result_file,
    })
}

/// Atomically repoint `pointer` at `target`.
///
/// On unix this is a symlink created under a temporary name and renamed
/// into place; elsewhere the pointer is a one-line file holding the target
/// path.
#[cfg(unix)]
fn point_latest(pointer: &Path, target: &Path) -> io::Result<()> {
    use std::os::unix::fs::symlink;

    let file_name = target
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target has no file name"))?;

    let tmp = pointer.with_extension("latest.tmp");
    let _ = fs::remove_file(&tmp);
    // Relative link keeps the artifacts root relocatable.
    symlink(file_name, &tmp)?;
    fs::rename(&tmp, pointer)
}

#[cfg(not(unix))]
fn point_latest(pointer: &Path, target: &Path) -> io::Result<()> {
    let tmp = pointer.with_extension("latest.tmp");
    fs::write(&tmp, target.to_string_lossy().as_bytes())?;
    fs::rename(&tmp, pointer)
}

/// Resolve where a legacy pointer currently points.
pub fn read_latest(pointer: &Path) -> io::Result<PathBuf> {
    #[cfg(unix)]
    {
        let link = fs::read_link(pointer)?;
        Ok(match pointer.parent() {
            Some(parent) if link.is_relative() => parent.join(link),
            _ => link,
        })
    }
    #[cfg(not(unix))]
    {
        Ok(PathBuf::from(fs::read_to_string(pointer)?.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_allocate_creates_unique_paths() {
        let tmp = TempDir::new().unwrap();
        let a = allocate(tmp.path(), "retry-agent").unwrap();
        let b = allocate(tmp.path(), "retry-agent").unwrap();

        assert_ne!(a.run_id, b.run_id);
        assert_ne!(a.log_file, b.log_file);
        assert_ne!(a.result_file, b.result_file);
        assert_ne!(a.prompt_file, b.prompt_file);
    }

    #[test]
    fn test_second_run_does_not_clobber_first() {
        let tmp = TempDir::new().unwrap();
        let a = allocate(tmp.path(), "retry-agent").unwrap();
        fs::write(&a.log_file, "first run output").unwrap();

        let b = allocate(tmp.path(), "retry-agent").unwrap();
        assert_eq!(
            fs::read_to_string(&a.log_file).unwrap(),
            "first run output"
        );
        assert!(b.log_file.exists());
    }

    #[test]
    fn test_legacy_pointer_tracks_latest() {
        let tmp = TempDir::new().unwrap();
        let a = allocate(tmp.path(), "retry-agent").unwrap();
        let b = allocate(tmp.path(), "retry-agent").unwrap();

        // Same stable path across runs.
        assert_eq!(a.legacy_log_file, b.legacy_log_file);
        assert_eq!(a.legacy_result_file, b.legacy_result_file);

        // After the second allocation the pointer names the second run.
        let latest = read_latest(&b.legacy_log_file).unwrap();
        assert_eq!(latest, b.log_file);

        fs::write(&b.log_file, "second run content").unwrap();
        let via_pointer = fs::read_to_string(&b.legacy_log_file).unwrap();
        assert_eq!(via_pointer, "second run content");
    }

    #[test]
    fn test_allocate_creates_root() {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("deep/artifacts");
        let art = allocate(&nested, "agent-x").unwrap();
        assert!(art.log_file.starts_with(&nested));
        assert!(nested.is_dir());
    }

    #[test]
    fn test_different_agents_do_not_share_pointers() {
        let tmp = TempDir::new().unwrap();
        let a = allocate(tmp.path(), "agent-a").unwrap();
        let b = allocate(tmp.path(), "agent-b").unwrap();
        assert_ne!(a.legacy_log_file, b.legacy_log_file);
    }
}
