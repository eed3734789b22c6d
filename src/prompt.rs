//! Prompt template rendering for dispatched agents.
//!
//! The default template is embedded so the binary works standalone; the
//! `ORCH_PROMPT_FILE` environment variable points at a replacement
//! template on disk. Variables are substituted as `{{variable_name}}`.

use std::collections::HashMap;
use std::fs;

/// Template used when no override file is configured.
const DEFAULT_TEMPLATE: &str = "\
You are {{agent_name}}, a {{agent_type}} agent.

Focus: {{focus}}
Capabilities: {{capabilities}}

Working directory: {{working_dir}}
Branch: {{branch}}

Task:
{{task}}

Work only inside your working directory. Commit your changes to your
branch when you are done.
";

/// Load the agent prompt template.
///
/// Uses the file named by `ORCH_PROMPT_FILE` when set, otherwise the
/// embedded default.
///
/// # Errors
/// Returns an error if an override file is configured but unreadable.
pub fn load_template() -> Result<String, String> {
    match std::env::var("ORCH_PROMPT_FILE") {
        Ok(path) if !path.trim().is_empty() => fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read prompt template {}: {}", path, e)),
        _ => Ok(DEFAULT_TEMPLATE.to_string()),
    }
}

/// Render a template with variable substitution.
///
/// Unknown placeholders are left intact so a bad template is visible in
/// the rendered prompt rather than silently dropped.
pub fn render(template: &str, vars: &HashMap<&str, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("{{{{{}}}}}", key);
        result = result.replace(&placeholder, value);
    }
    result
}

/// Variables for one agent dispatch.
pub fn agent_vars<'a>(
    agent_name: &str,
    agent_type: &str,
    focus: &str,
    capabilities: &[String],
    working_dir: &str,
    branch: &str,
    task: &str,
) -> HashMap<&'a str, String> {
    let mut vars = HashMap::new();
    vars.insert("agent_name", agent_name.to_string());
    vars.insert("agent_type", agent_type.to_string());
    vars.insert("focus", focus.to_string());
    vars.insert("capabilities", capabilities.join(", "));
    vars.insert("working_dir", working_dir.to_string());
    vars.insert("branch", branch.to_string());
    vars.insert("task", task.to_string());
    vars
}
