mod action;
mod error;
mod summary;

pub use action::{MAINTENANCE_TASK, ServicingStep, Tool, is_reset_base_arg};
pub use error::{ExternalToolError, PrivilegeError};
pub use summary::{RunSummary, format_recommendation};
