use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::atomic::{AtomicU64, Ordering};

fn storemaint_cmd(config: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_storemaint"));
    cmd.env("STOREMAINT_CONFIG", config);
    cmd.env_remove("STOREMAINT_LOG_DIR");
    cmd.env_remove("STOREMAINT_LOG_TRANSCRIPT");
    cmd.env_remove("STOREMAINT_INCLUDE_SP_SUPERSEDED");
    cmd.env_remove("STOREMAINT_TRIGGER_SCHEDULED_TASK");
    cmd.env_remove("STOREMAINT_DISM");
    cmd.env_remove("STOREMAINT_SCHTASKS");
    cmd.env_remove("STOREMAINT_TIMEOUT_SECS");
    cmd
}

fn run(config: &Path, args: &[&str]) -> Output {
    storemaint_cmd(config)
        .args(args)
        .output()
        .expect("run storemaint")
}

fn make_temp_dir() -> PathBuf {
    static DIR_SEQ: AtomicU64 = AtomicU64::new(0);

    let temp = std::env::temp_dir();
    let seq = DIR_SEQ.fetch_add(1, Ordering::Relaxed);
    let uniq = format!("storemaint-exit-test-{}-{seq}", std::process::id());
    let dir = temp.join(uniq);
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_config(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("config.toml");
    std::fs::write(&path, body).expect("write config");
    path
}

#[test]
fn unsupported_completion_shell_exits_2() {
    let dir = make_temp_dir();
    let config = write_config(&dir, "");

    let out = run(&config, &["completion", "nope"]);
    assert_eq!(out.status.code(), Some(2));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn powershell_completion_is_generated() {
    let dir = make_temp_dir();
    let config = write_config(&dir, "");

    let out = run(&config, &["completion", "powershell"]);
    assert!(out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("storemaint"), "stdout={stdout}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn malformed_config_exits_2() {
    let dir = make_temp_dir();
    let config = write_config(&dir, "[log\ndir = ");

    let out = run(&config, &["config", "--show"]);
    assert_eq!(out.status.code(), Some(2));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn unknown_config_key_exits_2() {
    let dir = make_temp_dir();
    let config = write_config(&dir, "[maintenance]\nreset_base = true\n");

    let out = run(&config, &["config", "--show"]);
    assert_eq!(out.status.code(), Some(2));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn missing_explicit_config_exits_2() {
    let dir = make_temp_dir();
    let config = dir.join("does-not-exist.toml");

    let out = run(&config, &["config", "--show"]);
    assert_eq!(out.status.code(), Some(2));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn dry_run_and_confirm_conflict() {
    let dir = make_temp_dir();
    let config = write_config(&dir, "");

    let out = run(&config, &["--dry-run", "--confirm"]);
    assert_eq!(out.status.code(), Some(2));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn confirm_without_tty_exits_2() {
    let dir = make_temp_dir();
    let config = write_config(&dir, "");
    let log_dir = dir.join("logs");

    let out = storemaint_cmd(&config)
        .args(["--confirm", "--log-path"])
        .arg(&log_dir)
        .stdin(std::process::Stdio::null())
        .output()
        .expect("run storemaint");
    assert_eq!(out.status.code(), Some(2));
    assert!(!log_dir.exists(), "no log should be created");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn maintenance_flag_with_subcommand_exits_2() {
    let dir = make_temp_dir();
    let config = write_config(&dir, "");

    let out = run(&config, &["--analyze-only", "status"]);
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("cannot be combined"), "stderr={stderr}");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn zero_timeout_flag_exits_2() {
    let dir = make_temp_dir();
    let config = write_config(&dir, "");
    let log_dir = dir.join("logs");

    let out = storemaint_cmd(&config)
        .args(["--timeout", "0", "--log-path"])
        .arg(&log_dir)
        .output()
        .expect("run storemaint");
    assert_eq!(out.status.code(), Some(2));
    assert!(!log_dir.exists(), "no log should be created");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn zero_timeout_in_config_exits_2() {
    let dir = make_temp_dir();
    let config = write_config(&dir, "[tools]\ntimeout_secs = 0\n");
    let log_dir = dir.join("logs");

    let out = storemaint_cmd(&config)
        .arg("--log-path")
        .arg(&log_dir)
        .output()
        .expect("run storemaint");
    assert_eq!(out.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("timeout must be greater than 0"), "stderr={stderr}");
    assert!(!log_dir.exists(), "no log should be created");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn status_json_reports_all_indicators() {
    let dir = make_temp_dir();
    let config = write_config(&dir, "");

    let out = run(&config, &["status", "--json"]);
    let code = out.status.code();
    assert!(
        code == Some(0) || code == Some(3010),
        "code={code:?} stderr={:?}",
        String::from_utf8_lossy(&out.stderr)
    );

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json");
    let indicators = v["indicators"].as_array().expect("indicators");
    assert_eq!(indicators.len(), 3);
    assert!(v["elevated"].is_boolean());
    assert_eq!(
        v["reboot_pending"].as_bool(),
        Some(code == Some(3010)),
        "v={v}"
    );

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn non_elevated_run_exits_5_without_creating_logs() {
    if storemaint::platform::is_elevated() {
        return;
    }
    let dir = make_temp_dir();
    let config = write_config(&dir, "");
    let log_dir = dir.join("logs");

    let out = storemaint_cmd(&config)
        .arg("--log-path")
        .arg(&log_dir)
        .output()
        .expect("run storemaint");
    assert_eq!(out.status.code(), Some(5));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("administrator"), "stderr={stderr}");
    assert!(!log_dir.exists(), "log dir must not be created");

    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
fn write_stub_dism(dir: &Path, calls: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let dism = dir.join("dism.sh");
    let script = format!(
        "#!/bin/sh\necho \"$@\" >> '{}'\ncase \"$*\" in\n  *AnalyzeComponentStore*) echo 'Component Store Cleanup Recommended : Yes';;\nesac\nexit 0\n",
        calls.display()
    );
    std::fs::write(&dism, script).expect("write stub");
    std::fs::set_permissions(&dism, std::fs::Permissions::from_mode(0o755)).expect("chmod");
    dism
}

#[cfg(unix)]
#[test]
fn elevated_run_with_unusable_log_dir_exits_10() {
    if !storemaint::platform::is_elevated() {
        return;
    }
    let dir = make_temp_dir();
    let calls = dir.join("calls.txt");
    let dism = write_stub_dism(&dir, &calls);
    let config = write_config(&dir, "");
    let blocker = dir.join("not-a-dir");
    std::fs::write(&blocker, b"x").expect("write blocker");

    let out = storemaint_cmd(&config)
        .env("STOREMAINT_DISM", &dism)
        .arg("--log-path")
        .arg(blocker.join("logs"))
        .output()
        .expect("run storemaint");
    assert_eq!(
        out.status.code(),
        Some(10),
        "stderr={:?}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(!calls.exists(), "dism must not be invoked");

    let _ = std::fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn elevated_dry_run_analyzes_with_a_stub_dism() {
    if !storemaint::platform::is_elevated() {
        return;
    }
    let dir = make_temp_dir();
    let calls = dir.join("calls.txt");
    let dism = write_stub_dism(&dir, &calls);
    let config = write_config(&dir, "");
    let log_dir = dir.join("logs");

    let out = storemaint_cmd(&config)
        .env("STOREMAINT_DISM", &dism)
        .arg("--dry-run")
        .arg("--log-path")
        .arg(&log_dir)
        .output()
        .expect("run storemaint");
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert_eq!(
        out.status.code(),
        Some(0),
        "stdout={stdout} stderr={:?}",
        String::from_utf8_lossy(&out.stderr)
    );
    assert!(stdout.contains("CleanupRecommended=true"), "stdout={stdout}");
    assert!(stdout.contains("CleanupPerformed=false"), "stdout={stdout}");

    let recorded = std::fs::read_to_string(&calls).expect("calls");
    assert_eq!(recorded.lines().count(), 1, "recorded={recorded}");
    assert!(recorded.contains("/AnalyzeComponentStore"));

    let logs: Vec<_> = std::fs::read_dir(&log_dir)
        .expect("log dir")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "log"))
        .collect();
    assert_eq!(logs.len(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}
