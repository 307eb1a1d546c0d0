use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub analyzed: bool,
    pub cleanup_recommended: Option<bool>,
    pub cleanup_performed: bool,
    pub legacy_cleanup_run: bool,
    pub scheduled_task_triggered: bool,
    pub reboot_pending_before: bool,
    pub reboot_pending_after: bool,
}

impl RunSummary {
    pub fn fields(&self) -> [(&'static str, String); 7] {
        [
            ("Analyzed", self.analyzed.to_string()),
            (
                "CleanupRecommended",
                format_recommendation(self.cleanup_recommended).to_string(),
            ),
            ("CleanupPerformed", self.cleanup_performed.to_string()),
            ("LegacyCleanupRun", self.legacy_cleanup_run.to_string()),
            (
                "ScheduledTaskTriggered",
                self.scheduled_task_triggered.to_string(),
            ),
            ("RebootPendingBefore", self.reboot_pending_before.to_string()),
            ("RebootPendingAfter", self.reboot_pending_after.to_string()),
        ]
    }
}

pub fn format_recommendation(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => "unknown",
    }
}
