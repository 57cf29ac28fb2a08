//! Exit codes and structured error output for the binary.

use serde::Serialize;

use crate::signal::EXIT_CODE_INTERRUPTED;

/// Exit codes for the `template-dir` binary.
///
/// - 0: the command completed
/// - 1: the command failed
/// - 130: the watch loop was stopped with Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// The command completed.
    Success = 0,
    /// The command failed.
    GeneralError = 1,
    /// Stopped by Ctrl+C.
    Interrupted = EXIT_CODE_INTERRUPTED as isize,
}

impl ExitCode {
    /// Numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "TD000",
            Self::GeneralError => "TD001",
            Self::Interrupted => "TD130",
        }
    }
}

/// Error report printed with `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g. "TD001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable message, including the cause chain
    pub message: String,
}

impl StructuredError {
    /// Build a report from an error and the exit code it maps to.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
