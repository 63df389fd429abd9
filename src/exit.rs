use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success,
    ChecksFailed,
    InvalidArgs,
    VerifyFailed,
    ConnectionFailed,
}

impl ExitCode {
    pub const fn as_i32(self) -> i32 {
        match self {
            ExitCode::Success => 0,
            ExitCode::ChecksFailed => 1,
            ExitCode::InvalidArgs => 2,
            ExitCode::VerifyFailed => 10,
            ExitCode::ConnectionFailed => 20,
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

impl std::error::Error for ExitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.err.source()
    }
}

pub fn exit_code(err: &anyhow::Error) -> i32 {
    code_of(err).as_i32()
}

pub fn code_of(err: &anyhow::Error) -> ExitCode {
    err.downcast_ref::<ExitError>()
        .map(|e| e.code)
        .unwrap_or(ExitCode::VerifyFailed)
}

pub fn invalid_args(message: impl Into<String>) -> anyhow::Error {
    ExitError::new(ExitCode::InvalidArgs, anyhow::anyhow!(message.into())).into()
}

pub fn invalid_args_err(err: anyhow::Error) -> anyhow::Error {
    ExitError::new(ExitCode::InvalidArgs, err).into()
}

pub fn connection_failed(message: impl Into<String>) -> anyhow::Error {
    ExitError::new(ExitCode::ConnectionFailed, anyhow::anyhow!(message.into())).into()
}

pub fn connection_failed_err(err: anyhow::Error) -> anyhow::Error {
    ExitError::new(ExitCode::ConnectionFailed, err).into()
}

/// The report was produced but contains at least one FAIL.
pub fn checks_failed(failed: u32) -> anyhow::Error {
    ExitError::new(
        ExitCode::ChecksFailed,
        anyhow::anyhow!("{failed} check(s) failed"),
    )
    .into()
}
