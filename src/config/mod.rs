use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
    pub log: LogConfig,
    pub maintenance: MaintenanceConfig,
    pub tools: ToolsConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub transcript: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceConfig {
    pub include_sp_superseded: bool,
    pub trigger_scheduled_task: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolsConfig {
    pub dism: String,
    pub schtasks: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for EffectiveConfig {
    fn default() -> Self {
        Self {
            config_path: None,
            log: LogConfig {
                dir: crate::platform::default_log_dir(),
                transcript: true,
            },
            maintenance: MaintenanceConfig {
                include_sp_superseded: false,
                trigger_scheduled_task: false,
            },
            tools: ToolsConfig {
                dism: "dism.exe".to_string(),
                schtasks: "schtasks.exe".to_string(),
                timeout_secs: None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    log: Option<RawLogConfig>,
    maintenance: Option<RawMaintenanceConfig>,
    tools: Option<RawToolsConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLogConfig {
    dir: Option<PathBuf>,
    transcript: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawMaintenanceConfig {
    include_sp_superseded: Option<bool>,
    trigger_scheduled_task: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawToolsConfig {
    dism: Option<String>,
    schtasks: Option<String>,
    timeout_secs: Option<u64>,
}

pub fn load(config_path: Option<&Path>) -> Result<EffectiveConfig> {
    let mut cfg = EffectiveConfig::default();

    let path = config_path
        .map(ToOwned::to_owned)
        .unwrap_or_else(crate::platform::default_config_path);

    if path.exists() {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let raw: RawConfig = toml::from_str(&s)
            .with_context(|| format!("failed to parse config file (TOML): {}", path.display()))?;
        apply_raw_config(&mut cfg, raw);
        cfg.config_path = Some(path.display().to_string());
    } else if config_path.is_some() {
        return Err(anyhow::anyhow!(
            "config file does not exist: {}",
            path.display()
        ));
    }

    apply_env_overrides(&mut cfg)?;

    Ok(cfg)
}

fn apply_raw_config(cfg: &mut EffectiveConfig, raw: RawConfig) {
    if let Some(log) = raw.log {
        if let Some(dir) = log.dir {
            cfg.log.dir = dir;
        }
        if let Some(transcript) = log.transcript {
            cfg.log.transcript = transcript;
        }
    }

    if let Some(maintenance) = raw.maintenance {
        if let Some(v) = maintenance.include_sp_superseded {
            cfg.maintenance.include_sp_superseded = v;
        }
        if let Some(v) = maintenance.trigger_scheduled_task {
            cfg.maintenance.trigger_scheduled_task = v;
        }
    }

    if let Some(tools) = raw.tools {
        if let Some(dism) = tools.dism {
            cfg.tools.dism = dism;
        }
        if let Some(schtasks) = tools.schtasks {
            cfg.tools.schtasks = schtasks;
        }
        if tools.timeout_secs.is_some() {
            cfg.tools.timeout_secs = tools.timeout_secs;
        }
    }
}

fn apply_env_overrides(cfg: &mut EffectiveConfig) -> Result<()> {
    if let Ok(v) = std::env::var("STOREMAINT_LOG_DIR") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.log.dir = PathBuf::from(v);
        }
    }
    if let Ok(v) = std::env::var("STOREMAINT_LOG_TRANSCRIPT") {
        cfg.log.transcript = parse_bool(&v).with_context(|| "STOREMAINT_LOG_TRANSCRIPT")?;
    }
    if let Ok(v) = std::env::var("STOREMAINT_INCLUDE_SP_SUPERSEDED") {
        cfg.maintenance.include_sp_superseded =
            parse_bool(&v).with_context(|| "STOREMAINT_INCLUDE_SP_SUPERSEDED")?;
    }
    if let Ok(v) = std::env::var("STOREMAINT_TRIGGER_SCHEDULED_TASK") {
        cfg.maintenance.trigger_scheduled_task =
            parse_bool(&v).with_context(|| "STOREMAINT_TRIGGER_SCHEDULED_TASK")?;
    }
    if let Ok(v) = std::env::var("STOREMAINT_DISM") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.tools.dism = v.to_string();
        }
    }
    if let Ok(v) = std::env::var("STOREMAINT_SCHTASKS") {
        let v = v.trim();
        if !v.is_empty() {
            cfg.tools.schtasks = v.to_string();
        }
    }
    if let Ok(v) = std::env::var("STOREMAINT_TIMEOUT_SECS") {
        cfg.tools.timeout_secs = Some(
            v.trim()
                .parse::<u64>()
                .with_context(|| "STOREMAINT_TIMEOUT_SECS")?,
        );
    }

    Ok(())
}

pub fn parse_bool(s: &str) -> Result<bool> {
    let s = s.trim().to_ascii_lowercase();
    match s.as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow::anyhow!(
            "invalid boolean: {s} (expected true|false|1|0|yes|no|on|off)"
        )),
    }
}
