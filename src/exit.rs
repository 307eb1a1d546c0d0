use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    Failed,
    InvalidArgs,
    PrivilegeDenied,
    LogSetupFailed,
    ExternalCommandFailed,
    RebootRequired,
}

impl ExitCode {
    pub const fn as_i32(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::Failed => 1,
            ExitCode::InvalidArgs => 2,
            ExitCode::PrivilegeDenied => 5,
            ExitCode::LogSetupFailed => 10,
            ExitCode::ExternalCommandFailed => 20,
            // Same convention as Windows installers (ERROR_SUCCESS_REBOOT_REQUIRED).
            ExitCode::RebootRequired => 3010,
        }
    }
}

#[derive(Debug)]
pub struct ExitError {
    pub code: ExitCode,
    pub err: anyhow::Error,
}

impl ExitError {
    pub fn new(code: ExitCode, err: anyhow::Error) -> Self {
        Self { code, err }
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.err.fmt(f)
    }
}

// Display already shows the wrapped error, so the chain continues below it.
impl std::error::Error for ExitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.err.source()
    }
}

pub fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(exit) = err.downcast_ref::<ExitError>() {
        return exit.code.as_i32();
    }
    if err.downcast_ref::<crate::core::PrivilegeError>().is_some() {
        return ExitCode::PrivilegeDenied.as_i32();
    }
    if err.downcast_ref::<crate::core::ExternalToolError>().is_some() {
        return ExitCode::ExternalCommandFailed.as_i32();
    }
    ExitCode::Failed.as_i32()
}

pub fn invalid_args(message: impl Into<String>) -> anyhow::Error {
    ExitError::new(ExitCode::InvalidArgs, anyhow::anyhow!(message.into())).into()
}

pub fn invalid_args_err(err: anyhow::Error) -> anyhow::Error {
    ExitError::new(ExitCode::InvalidArgs, err).into()
}

pub fn log_setup_err(err: anyhow::Error) -> anyhow::Error {
    ExitError::new(ExitCode::LogSetupFailed, err).into()
}
