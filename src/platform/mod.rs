use std::io::Read;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use wait_timeout::ChildExt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

pub trait Host {
    fn is_elevated(&self) -> bool;
    /// `value: None` asks whether the key itself exists.
    fn registry_entry_exists(&self, key: &str, value: Option<&str>) -> bool;
    fn run(&self, program: &str, args: &[String], timeout: Option<Duration>)
    -> Result<CommandOutput>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemHost;

impl Host for SystemHost {
    fn is_elevated(&self) -> bool {
        is_elevated()
    }

    fn registry_entry_exists(&self, key: &str, value: Option<&str>) -> bool {
        #[cfg(windows)]
        {
            crate::platform::windows::registry_entry_exists(key, value)
        }

        #[cfg(not(windows))]
        {
            let _ = (key, value);
            false
        }
    }

    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Option<Duration>,
    ) -> Result<CommandOutput> {
        run_command(program, args, timeout)
    }
}

pub fn run_command(
    program: &str,
    args: &[String],
    timeout: Option<Duration>,
) -> Result<CommandOutput> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        command.creation_flags(crate::platform::windows::CREATE_NO_WINDOW);
    }

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start process: {program}"))?;

    // Drain both pipes while waiting; a chatty tool would otherwise block on a full pipe.
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    let status = match timeout {
        None => child
            .wait()
            .with_context(|| format!("failed to wait for process: {program}"))?,
        Some(timeout) => match child
            .wait_timeout(timeout)
            .with_context(|| format!("failed to wait for process: {program}"))?
        {
            Some(status) => status,
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(anyhow!("timed out after {timeout:?}: {program}"));
            }
        },
    };

    let stdout = stdout_reader.join().unwrap_or_default();
    let stderr = stderr_reader.join().unwrap_or_default();

    Ok(CommandOutput {
        exit_code: status.code().unwrap_or(-1),
        stdout,
        stderr,
    })
}

fn spawn_reader<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        String::from_utf8_lossy(&buf).into_owned()
    })
}

pub fn is_elevated() -> bool {
    #[cfg(windows)]
    {
        crate::platform::windows::is_elevated()
    }

    #[cfg(unix)]
    {
        unsafe { libc::geteuid() == 0 }
    }

    #[cfg(not(any(windows, unix)))]
    {
        false
    }
}

pub fn default_log_dir() -> PathBuf {
    #[cfg(windows)]
    {
        let root = std::env::var_os("SystemRoot")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\Windows"));
        root.join("Logs").join("StoreMaint")
    }

    #[cfg(not(windows))]
    {
        PathBuf::from("/var/log/storemaint")
    }
}

pub fn default_config_path() -> PathBuf {
    #[cfg(windows)]
    {
        let root = std::env::var_os("ProgramData")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(r"C:\ProgramData"));
        root.join("StoreMaint").join("config.toml")
    }

    #[cfg(not(windows))]
    {
        PathBuf::from("/etc/storemaint/config.toml")
    }
}

#[cfg(windows)]
pub mod windows;

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[test]
    fn run_command_captures_streams_separately() {
        let out = run_command("sh", &sh("echo out; echo err >&2; exit 3"), None).expect("run");
        assert_eq!(out.exit_code, 3);
        assert_eq!(out.stdout.trim(), "out");
        assert_eq!(out.stderr.trim(), "err");
    }

    #[test]
    fn run_command_handles_output_larger_than_a_pipe_buffer() {
        let out = run_command(
            "sh",
            &sh("i=0; while [ $i -lt 20000 ]; do echo 0123456789; i=$((i+1)); done"),
            Some(Duration::from_secs(30)),
        )
        .expect("run");
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout.lines().count(), 20000);
    }

    #[test]
    fn run_command_kills_on_timeout() {
        let err = run_command("sh", &sh("sleep 5"), Some(Duration::from_millis(100)))
            .expect_err("should time out");
        assert!(err.to_string().contains("timed out"), "err={err}");
    }

    #[test]
    fn run_command_reports_missing_program() {
        let err = run_command("storemaint-definitely-missing-tool", &[], None)
            .expect_err("spawn should fail");
        assert!(err.to_string().contains("failed to start"), "err={err}");
    }
}
