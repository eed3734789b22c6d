//! CLI backend profiles.
//!
//! Each supported agent CLI is one variant of the closed [`CliId`] enum
//! with a static profile: binary name, display name, default model, and an
//! argv template. Profiles are looked up by identifier and never built from
//! agent input, so task text can never reach a command line.
//!
//! Backends:
//! - `claude`: Claude Code CLI
//! - `codex`: Codex CLI
//! - `gemini`: Gemini CLI
//! - `stub`: deterministic test backend (no network)

use std::path::{Path, PathBuf};

use crate::spec::MODEL_DEFAULT;

mod validate;

pub use validate::{validate_availability, NON_RETRYABLE_SIGNALS};

/// Identifier of a supported CLI backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CliId {
    /// Claude Code CLI.
    #[default]
    Claude,
    /// Codex CLI.
    Codex,
    /// Gemini CLI.
    Gemini,
    /// Stubbed backend for tests (no network).
    Stub,
}

impl CliId {
    /// Parse a backend identifier.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "claude" => Some(Self::Claude),
            "codex" => Some(Self::Codex),
            "gemini" => Some(Self::Gemini),
            "stub" => Some(Self::Stub),
            _ => None,
        }
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Codex => "codex",
            Self::Gemini => "gemini",
            Self::Stub => "stub",
        }
    }

    /// Parse a comma-separated preference chain.
    /// Returns None if any identifier is invalid or the list is empty.
    pub fn parse_chain(s: &str) -> Option<Vec<Self>> {
        let chain: Vec<Self> = s
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .map(|part| Self::parse(part.trim()))
            .collect::<Option<Vec<_>>>()?;
        if chain.is_empty() {
            None
        } else {
            Some(chain)
        }
    }

    /// Static profile for this backend.
    pub fn profile(&self) -> &'static CliProfile {
        &PROFILES[*self as usize]
    }
}

/// Static descriptor of one CLI backend.
#[derive(Debug)]
pub struct CliProfile {
    pub id: CliId,
    /// Binary name looked up on PATH.
    pub binary: &'static str,
    /// Human-readable name for logs.
    pub display_name: &'static str,
    /// Model used when the spec carries the generic sentinel.
    pub default_model: &'static str,
}

/// Profile table, indexed by `CliId as usize`.
static PROFILES: [CliProfile; 4] = [
    CliProfile {
        id: CliId::Claude,
        binary: "claude",
        display_name: "Claude Code",
        default_model: "claude-sonnet-4-5",
    },
    CliProfile {
        id: CliId::Codex,
        binary: "codex",
        display_name: "Codex",
        default_model: "gpt-5-codex",
    },
    CliProfile {
        id: CliId::Gemini,
        binary: "gemini",
        display_name: "Gemini CLI",
        default_model: "gemini-2.5-pro",
    },
    CliProfile {
        id: CliId::Stub,
        binary: "orch-stub-agent",
        display_name: "Stub",
        default_model: "stub-model",
    },
];

impl CliProfile {
    /// Build the launch argv for this backend.
    ///
    /// The prompt is never part of the argv: every backend reads it from
    /// stdin, which the session wrapper redirects from the prompt file.
    /// `model` must already be resolved; the generic sentinel is rejected
    /// here as a last line of defense.
    pub fn build_command(&self, binary_path: &str, model: &str) -> Result<Vec<String>, String> {
        if model == MODEL_DEFAULT {
            return Err(format!(
                "model sentinel '{}' reached command construction for {}",
                MODEL_DEFAULT, self.display_name
            ));
        }
        let argv = match self.id {
            CliId::Claude => vec![
                binary_path.to_string(),
                "--print".to_string(),
                "--dangerously-skip-permissions".to_string(),
                "--model".to_string(),
                model.to_string(),
                "-p".to_string(),
                "-".to_string(),
            ],
            CliId::Codex => vec![
                binary_path.to_string(),
                "exec".to_string(),
                "--model".to_string(),
                model.to_string(),
                "--full-auto".to_string(),
                "-".to_string(),
            ],
            CliId::Gemini => vec![
                binary_path.to_string(),
                "--model".to_string(),
                model.to_string(),
                "--yolo".to_string(),
            ],
            CliId::Stub => vec![binary_path.to_string(), model.to_string()],
        };
        Ok(argv)
    }

    /// Build an interactive argv for this backend: no headless flags, no
    /// stdin prompt, just the binary with its model selection.
    pub fn interactive_command(&self, binary_path: &str, model: &str) -> Result<Vec<String>, String> {
        if model == MODEL_DEFAULT {
            return Err(format!(
                "model sentinel '{}' reached command construction for {}",
                MODEL_DEFAULT, self.display_name
            ));
        }
        let argv = match self.id {
            CliId::Claude | CliId::Codex | CliId::Gemini => vec![
                binary_path.to_string(),
                "--model".to_string(),
                model.to_string(),
            ],
            CliId::Stub => vec![binary_path.to_string(), model.to_string()],
        };
        Ok(argv)
    }

    /// Substitute the generic sentinel with this profile's default model.
    pub fn effective_model(&self, requested: &str) -> String {
        if requested.trim().is_empty() || requested == MODEL_DEFAULT {
            self.default_model.to_string()
        } else {
            requested.to_string()
        }
    }
}

/// Resolve a binary name against the process PATH.
pub fn resolve_binary(binary: &str) -> Option<String> {
    let path_var = std::env::var("PATH").unwrap_or_default();
    resolve_binary_in(binary, &path_var)
}

/// Resolve a binary name against an explicit PATH-style search string.
/// Tests inject a temp-dir search path here instead of mutating the
/// process environment.
pub fn resolve_binary_in(binary: &str, search_path: &str) -> Option<String> {
    // An explicit path bypasses the search.
    if binary.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(binary);
        if is_executable(&path) {
            return Some(binary.to_string());
        }
        return None;
    }

    for dir in std::env::split_paths(search_path) {
        let candidate = dir.join(binary);
        if is_executable(&candidate) {
            return Some(candidate.to_string_lossy().to_string());
        }
    }
    None
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Walk a preference chain, returning the first backend whose binary
/// resolves. Identifiers whose binary cannot be located are skipped without
/// validation; the walk fails only when the whole chain is exhausted.
pub fn select_cli(chain: &[CliId]) -> Result<(CliId, String), String> {
    let path_var = std::env::var("PATH").unwrap_or_default();
    select_cli_in(chain, &path_var)
}

/// [`select_cli`] against an explicit search path.
pub fn select_cli_in(chain: &[CliId], search_path: &str) -> Result<(CliId, String), String> {
    if chain.is_empty() {
        return Err("empty CLI preference chain".to_string());
    }
    for id in chain {
        if let Some(binary_path) = resolve_binary_in(id.profile().binary, search_path) {
            return Ok((*id, binary_path));
        }
    }
    let names: Vec<&str> = chain.iter().map(|id| id.as_str()).collect();
    Err(format!(
        "no CLI binary found for any of: {}",
        names.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn fake_binary(dir: &Path, name: &str) {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, "#!/bin/sh\nexit 0\n").unwrap();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
    }

    #[test]
    fn test_parse_roundtrip() {
        for id in [CliId::Claude, CliId::Codex, CliId::Gemini, CliId::Stub] {
            assert_eq!(CliId::parse(id.as_str()), Some(id));
        }
        assert_eq!(CliId::parse("copilot"), None);
    }

    #[test]
    fn test_parse_chain() {
        assert_eq!(
            CliId::parse_chain("claude, codex"),
            Some(vec![CliId::Claude, CliId::Codex])
        );
        assert_eq!(CliId::parse_chain("claude,nope"), None);
        assert_eq!(CliId::parse_chain(""), None);
    }

    #[test]
    fn test_profile_lookup() {
        assert_eq!(CliId::Codex.profile().binary, "codex");
        assert_eq!(CliId::Claude.profile().display_name, "Claude Code");
    }

    #[test]
    fn test_effective_model_substitutes_sentinel() {
        for id in [CliId::Claude, CliId::Codex, CliId::Gemini, CliId::Stub] {
            let profile = id.profile();
            let model = profile.effective_model(MODEL_DEFAULT);
            assert_eq!(model, profile.default_model);
            assert_ne!(model, MODEL_DEFAULT);
        }
    }

    #[test]
    fn test_effective_model_keeps_explicit() {
        assert_eq!(
            CliId::Claude.profile().effective_model("claude-opus-4-1"),
            "claude-opus-4-1"
        );
    }

    #[test]
    fn test_build_command_rejects_sentinel() {
        let err = CliId::Claude
            .profile()
            .build_command("/usr/bin/claude", MODEL_DEFAULT);
        assert!(err.is_err());
    }

    #[test]
    fn test_build_command_never_contains_sentinel() {
        for id in [CliId::Claude, CliId::Codex, CliId::Gemini, CliId::Stub] {
            let profile = id.profile();
            let model = profile.effective_model(MODEL_DEFAULT);
            let argv = profile.build_command("/bin/x", &model).unwrap();
            assert!(argv.iter().all(|a| a != MODEL_DEFAULT), "{:?}", argv);
            assert!(argv.contains(&profile.default_model.to_string()));
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_binary_in_finds_executable() {
        let tmp = tempfile::TempDir::new().unwrap();
        fake_binary(tmp.path(), "codex");
        let search = tmp.path().to_string_lossy().to_string();
        let resolved = resolve_binary_in("codex", &search).expect("resolve");
        assert!(resolved.ends_with("codex"));
        assert_eq!(resolve_binary_in("claude", &search), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_binary_in_skips_non_executable() {
        let tmp = tempfile::TempDir::new().unwrap();
        std::fs::write(tmp.path().join("claude"), "not executable").unwrap();
        let search = tmp.path().to_string_lossy().to_string();
        assert_eq!(resolve_binary_in("claude", &search), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_select_cli_skips_missing_binary() {
        // "Fix tests on PR #456" scenario: claude absent, codex present.
        let tmp = tempfile::TempDir::new().unwrap();
        fake_binary(tmp.path(), "codex");
        let search = tmp.path().to_string_lossy().to_string();

        let (id, path) = select_cli_in(&[CliId::Claude, CliId::Codex], &search).unwrap();
        assert_eq!(id, CliId::Codex);
        assert!(path.ends_with("codex"));
    }

    #[test]
    fn test_select_cli_exhausted_chain() {
        let err = select_cli_in(&[CliId::Claude, CliId::Codex], "/nonexistent-dir-orch");
        assert!(err.is_err());
        assert!(err.unwrap_err().contains("claude, codex"));
    }

    #[test]
    fn test_select_cli_empty_chain() {
        assert!(select_cli_in(&[], "/tmp").is_err());
    }
}
