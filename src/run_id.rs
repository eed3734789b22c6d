//! Per-run identifier generation.
//!
//! Every launch of an agent gets a fresh run id that suffixes its log,
//! result, and prompt files, so rapid successive runs of the same agent
//! name never overwrite each other. The stable "latest" pointer files are
//! the only paths without a run id.

use chrono::Local;
use rand::Rng;

/// Character set for the random tail: lowercase letters and digits.
/// Keeps run ids safe for both filenames and git refs.
const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of the random tail appended after the timestamp.
const TAIL_LEN: usize = 4;

/// Generates a run id of the form `YYYYmmdd-HHMMSS-xxxx`.
///
/// The wall-clock component keeps ids sortable; the random tail
/// disambiguates runs started within the same second.
///
/// # Examples
/// ```
/// use orch::run_id::generate_run_id;
///
/// let id = generate_run_id();
/// assert_eq!(id.len(), "20240101-120000-".len() + 4);
/// ```
pub fn generate_run_id() -> String {
    let stamp = Local::now().format("%Y%m%d-%H%M%S");
    let mut rng = rand::thread_rng();
    let tail: String = (0..TAIL_LEN)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect();
    format!("{}-{}", stamp, tail)
}
