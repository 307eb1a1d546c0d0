use std::io;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;

use crate::config::EffectiveConfig;
use crate::core::RunSummary;
use crate::platform::{Host, SystemHost};
use crate::reboot::IndicatorState;
use crate::runner::{Gate, LogOptions, RunOptions};
use crate::ui::{Console, UiConfig};

mod prompt;

#[derive(Debug, Parser)]
#[command(
    name = "storemaint",
    version,
    about = "Analyze the Windows component store and run the safe DISM cleanup when it is recommended"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Only analyze the component store; never clean up
    #[arg(long)]
    pub analyze_only: bool,
    /// Also run the built-in StartComponentCleanup scheduled task
    #[arg(long)]
    pub trigger_scheduled_task: bool,
    /// Also run the legacy /SPSuperseded cleanup
    #[arg(long)]
    pub include_sp_superseded: bool,
    /// Directory for the run log and transcript
    #[arg(long, value_name = "DIR")]
    pub log_path: Option<PathBuf>,
    /// Show state-changing commands without running them
    #[arg(long, conflicts_with = "confirm")]
    pub dry_run: bool,
    /// Ask before each state-changing command
    #[arg(long)]
    pub confirm: bool,
    /// Kill a servicing command after this many seconds (default: wait indefinitely)
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,
    #[arg(long)]
    pub no_transcript: bool,
}

impl RunArgs {
    fn any_set(&self) -> bool {
        self.analyze_only
            || self.trigger_scheduled_task
            || self.include_sp_superseded
            || self.log_path.is_some()
            || self.dry_run
            || self.confirm
            || self.timeout.is_some()
            || self.no_transcript
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show elevation and reboot-pending indicators without changing anything
    Status,
    Config(ConfigArgs),
    Completion(CompletionArgs),
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Serialize)]
struct RunReport<'a> {
    schema_version: &'static str,
    tool_version: &'static str,
    summary: &'a RunSummary,
    log_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    transcript_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    exit_code: i32,
}

#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    elevated: bool,
    reboot_pending: bool,
    indicators: &'a [IndicatorState],
}

pub fn run() -> Result<i32> {
    let cli = Cli::parse();

    let ui_cfg = UiConfig {
        stdin_is_tty: io::stdin().is_terminal(),
        stderr_is_tty: io::stderr().is_terminal(),
        quiet: cli.quiet,
        verbose: cli.verbose,
        json: cli.json,
    };

    if cli.command.is_some() && cli.run.any_set() {
        return Err(crate::exit::invalid_args(
            "maintenance flags cannot be combined with a subcommand",
        ));
    }

    if let Some(Commands::Completion(args)) = &cli.command {
        let shell = parse_shell(&args.shell)?;
        let mut cmd = Cli::command();
        let mut out = io::stdout().lock();
        clap_complete::generate(shell, &mut cmd, "storemaint", &mut out);
        return Ok(0);
    }

    let env_config_path = std::env::var_os("STOREMAINT_CONFIG").map(PathBuf::from);
    let cfg = crate::config::load(cli.config.as_deref().or(env_config_path.as_deref()))
        .map_err(crate::exit::invalid_args_err)?;

    match cli.command {
        None => maintain(cli.run, cfg, ui_cfg),
        Some(Commands::Status) => status(&ui_cfg),
        Some(Commands::Config(args)) => {
            if args.show {
                if ui_cfg.json {
                    crate::ui::write_json(&cfg)?;
                } else {
                    println!("{}", toml::to_string_pretty(&cfg)?);
                }
            } else if !ui_cfg.quiet {
                eprintln!("config: use `storemaint config --show`");
            }
            Ok(0)
        }
        Some(Commands::Completion(_)) => Ok(0),
    }
}

fn maintain(args: RunArgs, cfg: EffectiveConfig, ui_cfg: UiConfig) -> Result<i32> {
    if args.confirm && !(ui_cfg.stdin_is_tty && ui_cfg.stderr_is_tty) {
        return Err(crate::exit::invalid_args(
            "--confirm requires a TTY (stdin + stderr); use --dry-run to preview instead",
        ));
    }
    let timeout_secs = args.timeout.or(cfg.tools.timeout_secs);
    if timeout_secs == Some(0) {
        return Err(crate::exit::invalid_args("timeout must be greater than 0 seconds"));
    }

    let gate = if args.dry_run {
        Gate::DryRun
    } else if args.confirm {
        Gate::Confirm
    } else {
        Gate::Execute
    };

    let opts = RunOptions {
        analyze_only: args.analyze_only,
        include_sp_superseded: args.include_sp_superseded
            || cfg.maintenance.include_sp_superseded,
        trigger_scheduled_task: args.trigger_scheduled_task
            || cfg.maintenance.trigger_scheduled_task,
        gate,
        dism: cfg.tools.dism,
        schtasks: cfg.tools.schtasks,
        timeout: timeout_secs.map(Duration::from_secs),
    };
    let log_opts = LogOptions {
        dir: args.log_path.unwrap_or(cfg.log.dir),
        stem: crate::logs::run_stem(time::OffsetDateTime::now_utc()),
        transcript: cfg.log.transcript && !args.no_transcript,
    };

    let mut console = Console::new(ui_cfg.clone());
    let mut confirm = prompt::StdinConfirm;
    let outcome = crate::runner::run_maintenance(
        &SystemHost,
        &opts,
        &log_opts,
        &mut console,
        &mut confirm,
    )?;
    let exit_code = outcome.exit_code();

    if ui_cfg.json {
        crate::ui::write_json(&RunReport {
            schema_version: "1.0",
            tool_version: env!("CARGO_PKG_VERSION"),
            summary: &outcome.summary,
            log_path: outcome.log_path.display().to_string(),
            transcript_path: outcome
                .transcript_path
                .as_ref()
                .map(|p| p.display().to_string()),
            error: outcome.failure.as_ref().map(|e| format!("{e:#}")),
            exit_code,
        })?;
    } else {
        crate::ui::print_summary(
            &outcome.summary,
            &outcome.log_path,
            outcome.transcript_path.as_deref(),
            &ui_cfg,
        );
    }

    Ok(exit_code)
}

fn status(ui_cfg: &UiConfig) -> Result<i32> {
    let host = SystemHost;
    let elevated = host.is_elevated();
    let indicators = crate::reboot::probe(&host);
    let reboot_pending = crate::reboot::any_present(&indicators);

    if ui_cfg.json {
        crate::ui::write_json(&StatusReport {
            elevated,
            reboot_pending,
            indicators: &indicators,
        })?;
    } else {
        crate::ui::print_status(elevated, &indicators, ui_cfg);
    }

    Ok(if reboot_pending {
        crate::exit::ExitCode::RebootRequired.as_i32()
    } else {
        crate::exit::ExitCode::Success.as_i32()
    })
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "bash" => Ok(clap_complete::Shell::Bash),
        "zsh" => Ok(clap_complete::Shell::Zsh),
        "fish" => Ok(clap_complete::Shell::Fish),
        "powershell" | "pwsh" => Ok(clap_complete::Shell::PowerShell),
        other => Err(crate::exit::invalid_args(format!(
            "unsupported shell: {other} (expected bash|zsh|fish|powershell)"
        ))),
    }
}
