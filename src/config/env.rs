use std::env;

use crate::backend::CliId;

use super::types::Config;

pub(super) fn apply_env(config: &mut Config) {
    if let Ok(val) = env::var("ORCH_MAX_AGENTS") {
        if let Ok(n) = val.parse() {
            config.max_active_agents = n;
        }
    }
    if let Ok(val) = env::var("ORCH_CLI") {
        if let Some(ids) = CliId::parse_chain(&val) {
            config.cli_chain = ids;
        }
    }
    if let Ok(val) = env::var("ORCH_MODEL") {
        config.model = val;
    }
    if let Ok(val) = env::var("ORCH_WORKSPACE_ROOT") {
        config.workspace_root = Some(val);
    }
    if let Ok(val) = env::var("ORCH_ARTIFACTS_DIR") {
        config.artifacts_dir = Some(val);
    }
    if let Ok(val) = env::var("ORCH_TMUX_SOCKET") {
        config.tmux_socket = val;
    }
    if let Ok(val) = env::var("ORCH_PROBE_TIMEOUT") {
        if let Ok(n) = val.parse() {
            config.probe_timeout_secs = n;
        }
    }
    if let Ok(val) = env::var("ORCH_BASE_REF") {
        config.base_ref = Some(val);
    }
}
