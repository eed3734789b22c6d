use std::env;
use std::process;

use orch::config::{self, Command, Config};
use orch::shutdown;

mod commands;

use commands::{cmd_analyze, cmd_attach, cmd_kill, cmd_list, cmd_live, cmd_run};

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() {
    let args: Vec<String> = env::args().collect();
    let cli = config::parse_args(args);

    if cli.help {
        print_help();
        return;
    }

    if cli.version {
        println!("orch {}", VERSION);
        return;
    }

    let Some(command) = cli.command.clone() else {
        print_help();
        process::exit(2);
    };

    let config = Config::load(&cli);

    // Register Ctrl+C handler for commands that dispatch agents
    if matches!(
        command,
        Command::Run | Command::DispatcherCreate | Command::Live
    ) {
        if let Err(e) = shutdown::register_handler() {
            eprintln!("warning: {}", e);
        }
    }

    let result = match command {
        Command::Run | Command::DispatcherCreate => cmd_run(&config, &cli),
        Command::DispatcherAnalyze => cmd_analyze(&config, &cli),
        Command::Live => cmd_live(&config, &cli),
        Command::List => cmd_list(&config),
        Command::Attach => cmd_attach(&config, &cli),
        Command::Kill => cmd_kill(&config, &cli),
    };

    if let Err(e) = result {
        eprintln!("error: {}", e);
        let code = if e.starts_with("usage:") { 2 } else { 1 };
        process::exit(code);
    }
}

fn print_help() {
    println!(
        r#"orch - dispatch coding-agent CLIs onto isolated git worktrees

USAGE:
    orch [OPTIONS] <COMMAND>

COMMANDS:
    run <task>                 Analyze a task and dispatch agents (one per
                               semicolon-separated sub-task)
    dispatcher analyze <task>  Print the agent plan without dispatching
    dispatcher create <task>   Same as run
    live                       Launch one interactive CLI session in tmux
    list                       List agent sessions and their liveness
    attach <session>           Attach to an agent session
    kill <session>             Kill an agent session

OPTIONS:
    -h, --help               Show this help message
    -V, --version            Show version
    -c, --config <PATH>      Path to config file (default: orch.toml)
    --max-agents <N>         Concurrency ceiling for active agents
    --cli <CHAIN>            CLI fallback chain: claude, codex, gemini, stub
    --model <MODEL>          Model override ("default" uses each CLI's own)
    --workspace-root <PATH>  Root directory for agent worktrees
    --artifacts-dir <PATH>   Directory for logs, results, and prompts
    --socket <NAME>          tmux socket name (default: orch)
    --probe-timeout <SECS>   CLI availability probe timeout
    --base <REF>             Base ref for new agent branches
    --no-worktree <BRANCH>   Run one agent in the repository itself on the
                             named checked-out branch (run only)

LIVE OPTIONS:
    --name <NAME>            Session name (default: <cli>-<time>)
    --dir <PATH>             Working directory (default: current)
    --detached               Do not attach after launching

ENVIRONMENT:
    ORCH_MAX_AGENTS, ORCH_CLI, ORCH_MODEL, ORCH_WORKSPACE_ROOT,
    ORCH_ARTIFACTS_DIR, ORCH_TMUX_SOCKET, ORCH_PROBE_TIMEOUT,
    ORCH_BASE_REF, ORCH_PROMPT_FILE

EXAMPLES:
    orch run Fix the failing auth tests
    orch run "Review the parser; document the config format"
    orch live --cli codex --dir ~/scratch
    orch list
    orch attach fix-114530
"#
    );
}
