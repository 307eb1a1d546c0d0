use std::time::Duration;

use crate::platform::run_command;

pub const CREATE_NO_WINDOW: u32 = 0x0800_0000;

const QUERY_TIMEOUT: Duration = Duration::from_secs(30);

const IS_ADMIN_SCRIPT: &str = "([Security.Principal.WindowsPrincipal][Security.Principal.WindowsIdentity]::GetCurrent()).IsInRole([Security.Principal.WindowsBuiltInRole]::Administrator)";

pub fn is_elevated() -> bool {
    let args: Vec<String> = ["-NoProfile", "-NonInteractive", "-Command", IS_ADMIN_SCRIPT]
        .iter()
        .map(|s| s.to_string())
        .collect();
    match run_command("powershell.exe", &args, Some(QUERY_TIMEOUT)) {
        Ok(output) if output.exit_code == 0 => output.stdout.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

// `reg query` exits 0 only when the key (or the named value) exists.
pub fn registry_entry_exists(key: &str, value: Option<&str>) -> bool {
    let mut args = vec!["query".to_string(), key.to_string()];
    if let Some(value) = value {
        args.push("/v".to_string());
        args.push(value.to_string());
    }
    matches!(
        run_command("reg.exe", &args, Some(QUERY_TIMEOUT)),
        Ok(output) if output.exit_code == 0
    )
}
