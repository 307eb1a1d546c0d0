use anyhow::Error;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use crate::core::RunSummary;
use crate::logs::Transcript;
use crate::reboot::IndicatorState;

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub stdin_is_tty: bool,
    pub stderr_is_tty: bool,
    pub quiet: bool,
    pub verbose: bool,
    pub json: bool,
}

// Every line shown is also copied into the attached transcript.
#[derive(Debug)]
pub struct Console {
    cfg: UiConfig,
    transcript: Option<Transcript>,
}

impl Console {
    pub fn new(cfg: UiConfig) -> Self {
        Self {
            cfg,
            transcript: None,
        }
    }

    pub fn attach_transcript(&mut self, transcript: Transcript) {
        self.transcript = Some(transcript);
    }

    pub fn transcript_path(&self) -> Option<&Path> {
        self.transcript.as_ref().map(Transcript::path)
    }

    pub fn take_transcript(&mut self) -> Option<Transcript> {
        self.transcript.take()
    }

    pub fn info(&mut self, message: &str) {
        self.tee(message);
        if self.cfg.quiet {
            return;
        }
        // stdout is reserved for the JSON document in --json mode.
        if self.cfg.json {
            let _ = writeln!(io::stderr().lock(), "{message}");
        } else {
            let _ = writeln!(io::stdout().lock(), "{message}");
        }
    }

    pub fn detail(&mut self, message: &str) {
        if self.cfg.verbose {
            self.info(message);
        } else {
            self.tee(message);
        }
    }

    pub fn warn(&mut self, message: &str) {
        let line = format!("WARNING: {message}");
        self.tee(&line);
        let _ = writeln!(io::stderr().lock(), "{line}");
    }

    pub fn error(&mut self, message: &str) {
        let line = format!("ERROR: {message}");
        self.tee(&line);
        let _ = writeln!(io::stderr().lock(), "{line}");
    }

    pub fn spinner(&self, message: String) -> Option<indicatif::ProgressBar> {
        if !self.cfg.stderr_is_tty || self.cfg.quiet {
            return None;
        }
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(120));
        Some(pb)
    }

    fn tee(&mut self, line: &str) {
        if let Some(transcript) = self.transcript.as_mut() {
            let _ = transcript.line(line);
        }
    }
}

pub fn eprintln_error(err: &Error) {
    let mut stderr = io::stderr().lock();
    let _ = writeln!(stderr, "error:");
    let _ = writeln!(stderr, "  {err}");

    let mut causes = err.chain().skip(1).peekable();
    if causes.peek().is_some() {
        let _ = writeln!(stderr, "caused by:");
        for cause in causes {
            let _ = writeln!(stderr, "  - {cause}");
        }
    }

    let _ = writeln!(stderr, "next:");
    let _ = writeln!(
        stderr,
        "  - see `storemaint --help` for the available options"
    );
}

pub fn render_summary(summary: &RunSummary) -> Vec<String> {
    summary
        .fields()
        .iter()
        .map(|(k, v)| format!("  {k}={v}"))
        .collect()
}

pub fn print_summary(
    summary: &RunSummary,
    log_path: &Path,
    transcript_path: Option<&Path>,
    cfg: &UiConfig,
) {
    let mut out = io::stdout().lock();
    let _ = writeln!(out);
    let _ = writeln!(out, "Summary:");
    for line in render_summary(summary) {
        let _ = writeln!(out, "{line}");
    }
    if !cfg.quiet {
        let _ = writeln!(out);
        let _ = writeln!(out, "Log: {}", log_path.display());
        if let Some(path) = transcript_path {
            let _ = writeln!(out, "Transcript: {}", path.display());
        }
    }
}

pub fn print_status(elevated: bool, indicators: &[IndicatorState], cfg: &UiConfig) {
    if cfg.quiet {
        return;
    }
    let mut out = io::stdout().lock();
    let _ = writeln!(out, "Elevated: {elevated}");
    let pending = crate::reboot::any_present(indicators);
    let _ = writeln!(out, "RebootPending: {pending}");
    for state in indicators {
        let mark = if state.present { "present" } else { "absent" };
        match state.indicator.value {
            Some(value) => {
                let _ = writeln!(out, "- [{mark}] {} ({value})", state.indicator.key);
            }
            None => {
                let _ = writeln!(out, "- [{mark}] {}", state.indicator.key);
            }
        }
    }
}

pub fn write_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    let buf = serde_json::to_vec_pretty(value)?;

    let mut stdout = io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}
