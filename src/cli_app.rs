//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use ccusage_monitor::core::config::Config;
use ccusage_monitor::daemon::loop_main::{Monitor, MonitorArgs, spawn_stdin_reader};
use ccusage_monitor::daemon::refresh::{RefreshController, RefreshOutcome};
use ccusage_monitor::daemon::signals::SignalHandler;
use ccusage_monitor::display::options::{DisplayConfig, DisplayOption, Orientation};
use ccusage_monitor::display::state::DisplayStateMachine;
use ccusage_monitor::logger::activity::logger_for;
use ccusage_monitor::present::{RecordingPresenter, TerminalPresenter};
use ccusage_monitor::source::{CcusageCommand, FileSource, UsageSource};

/// ccmon: Claude Code usage monitor backed by `ccusage`.
#[derive(Debug, Parser)]
#[command(
    name = "ccmon",
    author,
    version,
    about = "Claude Code usage monitor",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run the monitor: refresh on a timer and accept commands on stdin.
    Run(RunArgs),
    /// Run one refresh cycle and print the status line.
    Once(OnceArgs),
    /// Print the effective configuration.
    Config,
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args, Default)]
struct RunArgs {
    /// Refresh interval in seconds (overrides config).
    #[arg(long, value_name = "SECONDS")]
    interval: Option<u64>,
    /// Read the report from a file instead of running ccusage.
    #[arg(long, value_name = "PATH")]
    from_file: Option<PathBuf>,
    /// Do not reprint the menu when it changes (`m` still prints it).
    #[arg(long)]
    no_menu: bool,
}

#[derive(Debug, Clone, Args, Default)]
struct OnceArgs {
    /// Read the report from a file instead of running ccusage.
    #[arg(long, value_name = "PATH")]
    from_file: Option<PathBuf>,
    /// Report what is left instead of what is used.
    #[arg(long)]
    left: bool,
    /// Comma-separated options to show (percentage,timeLeft,tokens,money or none).
    #[arg(long, value_delimiter = ',', value_name = "OPTS")]
    show: Vec<String>,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Json(_) => 3,
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Run(args) => run_monitor(cli, args),
        Command::Once(args) => run_once(cli, args),
        Command::Config => run_config(cli),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── run ────────────────────

fn run_monitor(cli: &Cli, args: &RunArgs) -> Result<(), CliError> {
    let mut config = load_config(cli)?;
    if let Some(secs) = args.interval {
        if secs == 0 {
            return Err(CliError::User("--interval must be at least 1".to_string()));
        }
        config.refresh.interval_secs = secs;
    }

    let source = build_source(&config, args.from_file.as_ref());
    let (logger, logger_join) = logger_for(&config);
    let monitor_args = MonitorArgs::from_config(&config, source.describe());

    let controller =
        RefreshController::new(source, DisplayStateMachine::new(), logger.clone());
    let color = !cli.no_color && io::stdout().is_terminal();
    let presenter = TerminalPresenter::stdout(color, !args.no_menu);

    let (cmd_tx, cmd_rx) = crossbeam_channel::bounded(16);
    spawn_stdin_reader(cmd_tx).map_err(|e| CliError::Runtime(e.to_string()))?;

    eprintln!(
        "[CCM-MONITOR] refreshing every {}s from {} (r refresh, 1-4 toggle, o orientation, m menu, q quit)",
        monitor_args.interval.as_secs(),
        monitor_args.source_label
    );
    let mut monitor = Monitor::new(
        controller,
        presenter,
        SignalHandler::new(),
        logger.clone(),
        monitor_args,
    );
    let summary = monitor.run(cmd_rx);

    logger.shutdown();
    if let Some(join) = logger_join {
        let _ = join.join();
    }
    eprintln!(
        "[CCM-MONITOR] stopped ({}, uptime={}s, refreshes={}, failures={})",
        summary.reason,
        summary.uptime.as_secs(),
        summary.refreshes,
        summary.failures
    );
    Ok(())
}

// ──────────────────── once ────────────────────

fn run_once(cli: &Cli, args: &OnceArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let display = parse_display(&args.show, args.left)?;
    let source = build_source(&config, args.from_file.as_ref());
    let (logger, logger_join) = logger_for(&config);

    let mut controller = RefreshController::new(
        source,
        DisplayStateMachine::with_config(display),
        logger.clone(),
    );
    let mut presenter = RecordingPresenter::new();
    let outcome = controller.refresh_cycle(&mut presenter);

    logger.shutdown();
    if let Some(join) = logger_join {
        let _ = join.join();
    }

    match output_mode(cli) {
        OutputMode::Human => {
            if cli.no_color || !io::stdout().is_terminal() {
                println!("{}", outcome.status());
            } else {
                println!("{}", outcome.status().bold());
            }
        }
        OutputMode::Json => {
            let (snapshot, error) = match &outcome {
                RefreshOutcome::Updated { snapshot, .. } => {
                    (serde_json::to_value(snapshot)?, Value::Null)
                }
                RefreshOutcome::NoData { code, message } => {
                    (Value::Null, json!({ "code": code, "message": message }))
                }
            };
            let payload = json!({
                "command": "once",
                "status": outcome.status(),
                "snapshot": snapshot,
                "display": serde_json::to_value(controller.current_config())?,
                "menu": serde_json::to_value(controller.menu())?,
                "error": error,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

/// `--show` keys plus `--left` → initial display configuration.
fn parse_display(show: &[String], left: bool) -> Result<DisplayConfig, CliError> {
    let orientation = if left {
        Orientation::Left
    } else {
        Orientation::Used
    };
    if show.is_empty() {
        let defaults: Vec<DisplayOption> = DisplayConfig::default().enabled_options().collect();
        return Ok(DisplayConfig::new(&defaults, orientation));
    }

    let mut options = Vec::new();
    for key in show {
        if key.trim().eq_ignore_ascii_case("none") {
            continue;
        }
        let option = DisplayOption::from_key(key).ok_or_else(|| {
            CliError::User(format!(
                "unknown display option {key:?} (expected percentage, timeLeft, tokens, money or none)"
            ))
        })?;
        options.push(option);
    }
    Ok(DisplayConfig::new(&options, orientation))
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let hash = config
        .stable_hash()
        .map_err(|e| CliError::Runtime(e.to_string()))?;

    match output_mode(cli) {
        OutputMode::Human => {
            let toml_str = toml::to_string_pretty(&config)
                .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
            println!("# {} (hash {hash})", config.paths.config_file.display());
            println!("{toml_str}");
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "config",
                "path": config.paths.config_file.to_string_lossy(),
                "hash": hash,
                "config": serde_json::to_value(&config)?,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

// ──────────────────── helpers ────────────────────

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    Config::load(cli.config.as_deref()).map_err(|e| CliError::User(e.to_string()))
}

fn build_source(config: &Config, from_file: Option<&PathBuf>) -> Arc<dyn UsageSource> {
    match from_file {
        Some(path) => Arc::new(FileSource::new(path)),
        None => Arc::new(CcusageCommand::from_config(&config.source)),
    }
}

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("CCMON_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }
    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        _ => OutputMode::Human,
    }
}
