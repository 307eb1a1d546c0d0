use std::fmt;
use std::path::PathBuf;

use crate::core::ServicingStep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivilegeError;

impl fmt::Display for PrivilegeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("administrator rights are required (run from an elevated prompt)")
    }
}

impl std::error::Error for PrivilegeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalToolError {
    pub step: ServicingStep,
    pub exit_code: i32,
    pub log_path: PathBuf,
}

impl fmt::Display for ExternalToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed (exit_code={}); see log: {}",
            self.step,
            self.exit_code,
            self.log_path.display()
        )
    }
}

impl std::error::Error for ExternalToolError {}
