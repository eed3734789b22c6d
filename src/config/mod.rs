//! Configuration loading for orch.
//!
//! Supports orch.toml, CLI flags, and environment variables.
//! Precedence (highest to lowest): CLI flags > env vars > config file > defaults.

mod cli;
mod env;
mod toml;
mod types;

pub use cli::{parse_args, CliArgs, Command};
pub use types::{Config, ConfigError, DEFAULT_MAX_ACTIVE_AGENTS, DEFAULT_PROBE_TIMEOUT_SECS};
