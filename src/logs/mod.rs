use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;

use crate::core::{RunSummary, ServicingStep};
use crate::platform::CommandOutput;
use crate::reboot::IndicatorState;

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogRecord<'a> {
    RunStarted {
        tool_version: &'static str,
        options: serde_json::Value,
    },
    RebootProbe {
        phase: &'a str,
        pending: bool,
        matched: &'a [IndicatorState],
    },
    Command(CommandAttemptLog<'a>),
    Note {
        message: &'a str,
    },
    Warning {
        message: &'a str,
    },
    Error {
        message: &'a str,
    },
    Summary {
        summary: &'a RunSummary,
    },
    RunFinished {
        exit_code: i32,
    },
}

#[derive(Debug, Serialize)]
pub struct CommandAttemptLog<'a> {
    pub step: ServicingStep,
    pub cmd: &'a str,
    pub args: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub stdout: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    pub stderr: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> CommandAttemptLog<'a> {
    pub fn new(
        step: ServicingStep,
        cmd: &'a str,
        args: &'a [String],
        output: Option<&'a CommandOutput>,
        error: Option<&'a str>,
    ) -> Self {
        Self {
            step,
            cmd,
            args,
            exit_code: output.map(|o| o.exit_code),
            stdout: output.map(|o| o.stdout.as_str()).unwrap_or(""),
            stderr: output.map(|o| o.stderr.as_str()).unwrap_or(""),
            error,
        }
    }
}

#[derive(Debug, Serialize)]
struct LogLine<'a> {
    ts: String,
    #[serde(flatten)]
    record: &'a LogRecord<'a>,
}

pub fn run_stem(started_at: OffsetDateTime) -> String {
    let stamp = started_at
        .format(format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .unwrap_or_else(|_| started_at.unix_timestamp().to_string());
    format!("storemaint-{stamp}-{}", std::process::id())
}

pub struct RunLog {
    path: PathBuf,
    out: Box<dyn Write>,
}

impl RunLog {
    pub fn create(dir: &Path, stem: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create log directory: {}", dir.display()))?;
        let path = dir.join(format!("{stem}.log"));
        let file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to create log file: {}", path.display()))?;
        Ok(Self {
            path,
            out: Box::new(file),
        })
    }

    #[cfg(test)]
    pub(crate) fn from_writer(path: PathBuf, out: Box<dyn Write>) -> Self {
        Self { path, out }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&mut self, record: &LogRecord<'_>) -> Result<()> {
        let line = LogLine {
            ts: now_rfc3339(),
            record,
        };
        let mut buf = serde_json::to_vec(&line).context("failed to serialize log record")?;
        buf.push(b'\n');
        self.out
            .write_all(&buf)
            .with_context(|| format!("failed to write log: {}", self.path.display()))
    }

    pub fn note(&mut self, message: &str) -> Result<()> {
        self.append(&LogRecord::Note { message })
    }

    pub fn warning(&mut self, message: &str) -> Result<()> {
        self.append(&LogRecord::Warning { message })
    }

    pub fn error(&mut self, message: &str) -> Result<()> {
        self.append(&LogRecord::Error { message })
    }
}

#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    file: File,
}

impl Transcript {
    pub fn start(dir: &Path, stem: &str) -> Result<Self> {
        let path = dir.join(format!("{stem}.transcript.txt"));
        let mut file = OpenOptions::new()
            .create_new(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to create transcript: {}", path.display()))?;
        writeln!(file, "**********************")
            .and_then(|_| writeln!(file, "storemaint transcript start: {}", now_rfc3339()))
            .and_then(|_| writeln!(file, "**********************"))
            .with_context(|| format!("failed to write transcript: {}", path.display()))?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line(&mut self, line: &str) -> std::io::Result<()> {
        writeln!(self.file, "{line}")
    }

    pub fn stop(mut self) -> Result<()> {
        writeln!(self.file, "**********************")
            .and_then(|_| writeln!(self.file, "storemaint transcript end: {}", now_rfc3339()))
            .and_then(|_| writeln!(self.file, "**********************"))
            .and_then(|_| self.file.flush())
            .with_context(|| format!("failed to finish transcript: {}", self.path.display()))
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}
