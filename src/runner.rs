use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::Serialize;

use crate::core::{ExternalToolError, PrivilegeError, RunSummary, ServicingStep, Tool};
use crate::exit::ExitCode;
use crate::logs::{CommandAttemptLog, LogRecord, RunLog, Transcript};
use crate::platform::{CommandOutput, Host};
use crate::ui::Console;

// The analysis command is read-only and always runs, whatever the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Execute,
    DryRun,
    Confirm,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub analyze_only: bool,
    pub include_sp_superseded: bool,
    pub trigger_scheduled_task: bool,
    pub gate: Gate,
    pub dism: String,
    pub schtasks: String,
    pub timeout: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct LogOptions {
    pub dir: PathBuf,
    pub stem: String,
    pub transcript: bool,
}

pub trait Confirm {
    fn confirm(&mut self, command_line: &str) -> Result<bool>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Executed(CommandOutput),
    Skipped,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub log_path: PathBuf,
    pub transcript_path: Option<PathBuf>,
    pub failure: Option<anyhow::Error>,
}

impl RunOutcome {
    pub fn exit_code(&self) -> i32 {
        if self.failure.is_some() {
            ExitCode::ExternalCommandFailed
        } else if self.summary.reboot_pending_after {
            ExitCode::RebootRequired
        } else {
            ExitCode::Success
        }
        .as_i32()
    }
}

/// `Err` only before any servicing command ran. Once the log exists every path
/// ends in finalization and the outcome carries the failure.
pub fn run_maintenance(
    host: &dyn Host,
    opts: &RunOptions,
    log_opts: &LogOptions,
    console: &mut Console,
    confirm: &mut dyn Confirm,
) -> Result<RunOutcome> {
    if !host.is_elevated() {
        return Err(PrivilegeError.into());
    }

    let stem = log_opts.stem.as_str();
    let mut log = RunLog::create(&log_opts.dir, stem).map_err(crate::exit::log_setup_err)?;
    log.append(&LogRecord::RunStarted {
        tool_version: env!("CARGO_PKG_VERSION"),
        options: serde_json::to_value(opts).unwrap_or(serde_json::Value::Null),
    })
    .map_err(crate::exit::log_setup_err)?;

    if log_opts.transcript {
        match Transcript::start(&log_opts.dir, stem) {
            Ok(transcript) => console.attach_transcript(transcript),
            Err(err) => {
                let msg = format!("transcript not started: {err:#}");
                console.warn(&msg);
                let _ = log.warning(&msg);
            }
        }
    }
    let transcript_path = console.transcript_path().map(Path::to_path_buf);

    let mut summary = RunSummary {
        reboot_pending_before: probe_reboot(host, &mut log, console, "before"),
        ..RunSummary::default()
    };

    let failure = {
        let mut runner = Runner {
            host,
            opts,
            console: &mut *console,
            confirm,
            log: &mut log,
        };
        runner.run_steps(&mut summary).err()
    };
    if let Some(err) = &failure {
        let msg = format!("{err:#}");
        console.error(&msg);
        let _ = log.error(&msg);
    }

    summary.reboot_pending_after = probe_reboot(host, &mut log, console, "after");

    let outcome = RunOutcome {
        summary,
        log_path: log.path().to_path_buf(),
        transcript_path,
        failure,
    };
    if let Err(err) = log
        .append(&LogRecord::Summary {
            summary: &outcome.summary,
        })
        .and_then(|_| {
            log.append(&LogRecord::RunFinished {
                exit_code: outcome.exit_code(),
            })
        })
    {
        console.warn(&format!("{err:#}"));
    }

    if let Some(transcript) = console.take_transcript() {
        let _ = transcript.stop();
    }

    Ok(outcome)
}

fn probe_reboot(host: &dyn Host, log: &mut RunLog, console: &mut Console, phase: &str) -> bool {
    let matched: Vec<_> = crate::reboot::probe(host)
        .into_iter()
        .filter(|s| s.present)
        .collect();
    let pending = crate::reboot::any_present(&matched);
    if pending {
        console.info(&format!("Reboot pending ({phase}): yes"));
    }
    if let Err(err) = log.append(&LogRecord::RebootProbe {
        phase,
        pending,
        matched: &matched,
    }) {
        console.warn(&format!("{err:#}"));
    }
    pending
}

struct Runner<'a> {
    host: &'a dyn Host,
    opts: &'a RunOptions,
    console: &'a mut Console,
    confirm: &'a mut dyn Confirm,
    log: &'a mut RunLog,
}

impl Runner<'_> {
    fn run_steps(&mut self, summary: &mut RunSummary) -> Result<()> {
        let analysis = match self.run_external(ServicingStep::AnalyzeComponentStore)? {
            Invocation::Executed(output) => output,
            Invocation::Skipped => return Ok(()),
        };
        summary.analyzed = true;

        summary.cleanup_recommended =
            crate::analysis::parse_cleanup_recommendation(&analysis.stdout);
        match summary.cleanup_recommended {
            Some(recommended) => {
                self.console.info(&format!(
                    "Component store cleanup recommended: {}",
                    if recommended { "Yes" } else { "No" }
                ));
            }
            None => self.warn(&format!(
                "'{}' was not found in the analysis output; cleanup will not run",
                crate::analysis::RECOMMENDATION_LABEL
            )),
        }

        if self.opts.analyze_only {
            self.console
                .info("Analyze-only mode: skipping cleanup and optional steps.");
            return Ok(());
        }

        match summary.cleanup_recommended {
            Some(true) => {
                if let Invocation::Executed(_) =
                    self.run_external(ServicingStep::StartComponentCleanup)?
                {
                    summary.cleanup_performed = true;
                }
            }
            Some(false) => self.console.info("No component cleanup needed."),
            None => {}
        }

        if self.opts.include_sp_superseded {
            match self.run_external(ServicingStep::SpSuperseded) {
                Ok(Invocation::Executed(_)) => summary.legacy_cleanup_run = true,
                Ok(Invocation::Skipped) => {}
                Err(err) => self.warn(&format!("{err:#}")),
            }
        }

        if self.opts.trigger_scheduled_task {
            match self.run_external(ServicingStep::MaintenanceTask) {
                Ok(Invocation::Executed(_)) => {
                    summary.scheduled_task_triggered = true;
                    let msg =
                        format!("scheduled task triggered: {}", crate::core::MAINTENANCE_TASK);
                    self.console.info(&msg);
                    if let Err(err) = self.log.note(&msg) {
                        self.console.warn(&format!("{err:#}"));
                    }
                }
                Ok(Invocation::Skipped) => {}
                Err(err) => self.warn(&format!("{err:#}")),
            }
        }

        Ok(())
    }

    fn run_external(&mut self, step: ServicingStep) -> Result<Invocation> {
        let opts = self.opts;
        let program = match step.tool() {
            Tool::Dism => opts.dism.as_str(),
            Tool::Schtasks => opts.schtasks.as_str(),
        };
        let args = step.args();
        if let Some(arg) = args.iter().find(|a| crate::core::is_reset_base_arg(a)) {
            return Err(anyhow!("refusing to run {program} with {arg}"));
        }
        let command_line = display_command(program, &args);

        if step.changes_system() {
            match opts.gate {
                Gate::Execute => {}
                Gate::DryRun => {
                    self.console
                        .info(&format!("dry-run: would run `{command_line}`"));
                    return Ok(Invocation::Skipped);
                }
                Gate::Confirm => {
                    if !self.confirm.confirm(&command_line)? {
                        self.console.info(&format!("Skipped: `{command_line}`"));
                        return Ok(Invocation::Skipped);
                    }
                }
            }
        }

        self.console.info(&format!("Running: {command_line}"));
        let pb = self.console.spinner(format!("{step}..."));
        let result = self.host.run(program, &args, opts.timeout);
        if let Some(pb) = pb {
            pb.finish_and_clear();
        }

        let output = match result {
            Ok(output) => output,
            Err(err) => {
                let err_s = format!("{err:#}");
                let logged = self.log.append(&LogRecord::Command(CommandAttemptLog::new(
                    step,
                    program,
                    &args,
                    None,
                    Some(&err_s),
                )));
                let err = err.context(format!(
                    "{step} could not be run; see log: {}",
                    self.log.path().display()
                ));
                return Err(match logged {
                    Ok(()) => err,
                    Err(log_err) => {
                        err.context(format!("the attempt was not logged: {log_err:#}"))
                    }
                });
            }
        };

        self.log.append(&LogRecord::Command(CommandAttemptLog::new(
            step,
            program,
            &args,
            Some(&output),
            None,
        )))?;

        let stdout = output.stdout.trim();
        if !stdout.is_empty() {
            self.console.detail(stdout);
        }
        let stderr = output.stderr.trim();
        if !stderr.is_empty() {
            self.console.detail(&format!("stderr:\n{stderr}"));
        }

        if output.exit_code != 0 {
            return Err(ExternalToolError {
                step,
                exit_code: output.exit_code,
                log_path: self.log.path().to_path_buf(),
            }
            .into());
        }
        Ok(Invocation::Executed(output))
    }

    fn warn(&mut self, message: &str) {
        self.console.warn(message);
        let _ = self.log.warning(message);
    }
}

fn display_command(program: &str, args: &[String]) -> String {
    let mut s = program.to_string();
    for arg in args {
        s.push(' ');
        if arg.contains(' ') {
            s.push('"');
            s.push_str(arg);
            s.push('"');
        } else {
            s.push_str(arg);
        }
    }
    s
}
