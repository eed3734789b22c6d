//! Dispatcher event log with rotation.
//!
//! Every provisioning stage writes an attributable line here in the form
//! `YYYY-MM-DD HH:MM:SS | <agent> | <stage>: <message>`, so a failed batch
//! can be reconstructed after the fact. Rotates to a timestamped `.bak`
//! when the file exceeds a line limit.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::Local;

/// Default maximum number of lines before rotation.
pub const DEFAULT_MAX_LINES: usize = 2000;

/// File-backed logger for dispatcher events.
pub struct EventLogger {
    /// Path to the log file.
    pub path: PathBuf,
    /// Maximum lines before rotation.
    pub max_lines: usize,
}

impl EventLogger {
    /// Create a logger writing `dispatch.log` under the given directory.
    pub fn new(dir: &Path) -> Self {
        Self {
            path: dir.join("dispatch.log"),
            max_lines: DEFAULT_MAX_LINES,
        }
    }

    /// Override the rotation limit.
    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = max_lines;
        self
    }

    /// Write one event line attributed to an agent and stage.
    pub fn log(&self, agent: &str, stage: &str, message: &str) -> io::Result<()> {
        self.ensure_dir()?;

        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let line = format!("{} | {} | {}: {}\n", timestamp, agent, stage, message);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()?;

        self.rotate_if_needed()
    }

    fn ensure_dir(&self) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    fn rotate_if_needed(&self) -> io::Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        if count_lines(&self.path)? <= self.max_lines {
            return Ok(());
        }
        rotate_log(&self.path)
    }
}

/// Count the lines of a file.
pub fn count_lines(path: &Path) -> io::Result<usize> {
    let file = File::open(path)?;
    Ok(BufReader::new(file).lines().count())
}

/// Rotate a log file: move it to a timestamped `.bak` and start fresh.
pub fn rotate_log(path: &Path) -> io::Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let timestamp = Local::now().format("%Y%m%d-%H%M%S");
    let backup_name = format!(
        "{}.{}.bak",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("log"),
        timestamp
    );
    let backup_path = path.with_file_name(backup_name);

    fs::rename(path, &backup_path)?;
    File::create(path)?;
    Ok(())
}
