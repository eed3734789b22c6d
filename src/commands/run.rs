use orch::color;
use orch::config::{CliArgs, Config};
use orch::dispatcher::Dispatcher;
use orch::spec::AgentSpec;

/// Analyze a task and dispatch the resulting agents.
pub fn cmd_run(config: &Config, cli: &CliArgs) -> Result<(), String> {
    let task = cli.task();
    if task.is_empty() {
        return Err("usage: orch run <task description>".to_string());
    }

    let mut dispatcher = Dispatcher::new(config.clone());
    // --no-worktree bypasses task analysis: one agent, in the repository
    // itself, on the named checked-out branch.
    let results = match cli.no_worktree {
        Some(ref branch) => {
            let spec = AgentSpec::new(task.clone(), task.clone())
                .with_cli_chain(config.cli_chain.clone())
                .with_model(config.model.clone())
                .in_place(branch.clone());
            vec![dispatcher.create_dynamic_agent(spec)]
        }
        None => dispatcher.analyze_task_and_create_agents(&task, None),
    };
    if results.is_empty() {
        return Err("task analysis produced no agents".to_string());
    }

    let mut launched = 0;
    for result in &results {
        match result {
            Ok(agent) => {
                launched += 1;
                println!(
                    "{} {} {} {}",
                    color::success("launched"),
                    color::agent(&agent.name),
                    agent.cli.as_str(),
                    color::dim(&format!(
                        "{} (run {})",
                        agent.directory.display(),
                        agent.run_id
                    )),
                );
                if let Some(ref branch) = agent.branch {
                    println!("  branch: {}", branch);
                }
                if agent.used_fallback {
                    println!("  {}", color::warn("worktree at temporary fallback location"));
                }
                println!(
                    "  attach: orch attach {}",
                    agent.session
                );
            }
            Err(e) => {
                println!("{} {}", color::error("failed:"), e);
            }
        }
    }

    if launched == 0 {
        return Err("no agents launched".to_string());
    }
    println!(
        "\n{} agent(s) launched on socket '{}'",
        launched, config.tmux_socket
    );
    Ok(())
}

/// Print the agent plan for a task without dispatching anything.
pub fn cmd_analyze(config: &Config, cli: &CliArgs) -> Result<(), String> {
    let task = cli.task();
    if task.is_empty() {
        return Err("usage: orch dispatcher analyze <task description>".to_string());
    }

    let dispatcher = Dispatcher::new(config.clone());
    let specs = dispatcher.plan_agents(&task, None);
    if specs.is_empty() {
        return Err("task analysis produced no agents".to_string());
    }

    println!("plan for: {}", task);
    for spec in &specs {
        println!(
            "  {} {} {}",
            color::agent(&spec.agent_type),
            spec.focus,
            color::dim(&format!(
                "cli {} model {}",
                spec.cli_chain
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(","),
                spec.model
            )),
        );
        if !spec.capabilities.is_empty() {
            println!("    capabilities: {}", spec.capabilities.join(", "));
        }
    }
    Ok(())
}
