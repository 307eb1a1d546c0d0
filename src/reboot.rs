use serde::Serialize;

use crate::platform::Host;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RebootIndicator {
    pub key: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<&'static str>,
}

pub const INDICATORS: [RebootIndicator; 3] = [
    RebootIndicator {
        key: r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Component Based Servicing\RebootPending",
        value: None,
    },
    RebootIndicator {
        key: r"HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\WindowsUpdate\Auto Update\RebootRequired",
        value: None,
    },
    RebootIndicator {
        key: r"HKLM\SYSTEM\CurrentControlSet\Control\Session Manager",
        value: Some("PendingFileRenameOperations"),
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndicatorState {
    #[serde(flatten)]
    pub indicator: RebootIndicator,
    pub present: bool,
}

pub fn probe(host: &dyn Host) -> Vec<IndicatorState> {
    INDICATORS
        .iter()
        .map(|indicator| IndicatorState {
            indicator: *indicator,
            present: host.registry_entry_exists(indicator.key, indicator.value),
        })
        .collect()
}

pub fn any_present(states: &[IndicatorState]) -> bool {
    states.iter().any(|s| s.present)
}

pub fn is_reboot_pending(host: &dyn Host) -> bool {
    any_present(&probe(host))
}
