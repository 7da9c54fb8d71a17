//! Core merge orchestration.
//!
//! This module ties the codec, version extraction, sandbox and conflict
//! analysis together:
//!
//! - [`engine`]: the per-file merge state machine and batch driver
//! - [`report`]: batch results and their text/JSON rendering
//! - [`ExitCode`]: process exit codes derived from a batch

pub mod engine;
pub mod report;

/// Exit codes for a merge run.
///
/// These codes are designed for consumption by CI systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[repr(u8)]
pub enum ExitCode {
    /// Every file merged cleanly or the run was skipped by a guard.
    Success = 0,

    /// A fatal error on at least one file (missing file, no merge base, git failure).
    GeneralError = 1,

    /// At least one file has conflicts that need human resolution.
    Conflict = 2,
}

impl ExitCode {
    /// Returns the numeric exit code value.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Returns a human-readable description of the exit code.
    pub fn description(self) -> &'static str {
        match self {
            ExitCode::Success => "No conflicts",
            ExitCode::GeneralError => "Merge could not be completed",
            ExitCode::Conflict => "Conflicts found - resolve them manually",
        }
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.code())
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description())
    }
}
