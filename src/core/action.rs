use serde::{Deserialize, Serialize};
use std::fmt;

pub const MAINTENANCE_TASK: &str = r"\Microsoft\Windows\Servicing\StartComponentCleanup";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Dism,
    Schtasks,
}

// No `/ResetBase` variant: it must not be reachable from any flag or configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServicingStep {
    AnalyzeComponentStore,
    StartComponentCleanup,
    SpSuperseded,
    MaintenanceTask,
}

impl ServicingStep {
    pub const ALL: [ServicingStep; 4] = [
        ServicingStep::AnalyzeComponentStore,
        ServicingStep::StartComponentCleanup,
        ServicingStep::SpSuperseded,
        ServicingStep::MaintenanceTask,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            ServicingStep::AnalyzeComponentStore => "analyze component store",
            ServicingStep::StartComponentCleanup => "start component cleanup",
            ServicingStep::SpSuperseded => "superseded package cleanup",
            ServicingStep::MaintenanceTask => "scheduled maintenance task",
        }
    }

    pub const fn tool(self) -> Tool {
        match self {
            ServicingStep::MaintenanceTask => Tool::Schtasks,
            _ => Tool::Dism,
        }
    }

    pub const fn changes_system(self) -> bool {
        !matches!(self, ServicingStep::AnalyzeComponentStore)
    }

    pub fn args(self) -> Vec<String> {
        let args: &[&str] = match self {
            // /English keeps the marker line untranslated on localized systems.
            ServicingStep::AnalyzeComponentStore => &[
                "/Online",
                "/English",
                "/Cleanup-Image",
                "/AnalyzeComponentStore",
            ],
            ServicingStep::StartComponentCleanup => {
                &["/Online", "/Cleanup-Image", "/StartComponentCleanup"]
            }
            ServicingStep::SpSuperseded => &["/Online", "/Cleanup-Image", "/SPSuperseded"],
            ServicingStep::MaintenanceTask => &["/Run", "/TN", MAINTENANCE_TASK],
        };
        args.iter().map(|s| s.to_string()).collect()
    }
}

impl fmt::Display for ServicingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn is_reset_base_arg(arg: &str) -> bool {
    arg.trim().eq_ignore_ascii_case("/resetbase")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_step_carries_reset_base() {
        for step in ServicingStep::ALL {
            assert!(
                !step.args().iter().any(|a| is_reset_base_arg(a)),
                "step={step:?}"
            );
        }
    }

    #[test]
    fn reset_base_detection_ignores_case() {
        assert!(is_reset_base_arg("/ResetBase"));
        assert!(is_reset_base_arg("/RESETBASE"));
        assert!(!is_reset_base_arg("/StartComponentCleanup"));
    }

    #[test]
    fn only_analysis_is_read_only() {
        let read_only: Vec<_> = ServicingStep::ALL
            .into_iter()
            .filter(|s| !s.changes_system())
            .collect();
        assert_eq!(read_only, vec![ServicingStep::AnalyzeComponentStore]);
    }

    #[test]
    fn maintenance_task_goes_through_schtasks() {
        assert_eq!(ServicingStep::MaintenanceTask.tool(), Tool::Schtasks);
        assert_eq!(
            ServicingStep::MaintenanceTask.args(),
            vec!["/Run", "/TN", MAINTENANCE_TASK]
        );
    }
}
