//! Reporter for timetable validation result files.
//!
//! A validator writes a small text file: an integer status on the first
//! line, optionally followed by a message on the second. Status `0` means
//! the timetable passed.

use std::{fs, path::Path};

use anyhow::{Context, Result};

use crate::core::ExitCode;
use crate::error::ValidationError;

/// Parsed content of a validation result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub status: i64,
    pub message: Option<String>,
}

impl ValidationReport {
    pub fn parse(content: &str) -> Result<Self, ValidationError> {
        let mut lines = content.lines();
        let first = lines.next().ok_or(ValidationError::Empty)?;

        let status = first
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidStatus {
                line: first.to_string(),
            })?;
        let message = lines
            .next()
            .map(str::trim_end)
            .filter(|m| !m.is_empty())
            .map(str::to_string);

        Ok(Self { status, message })
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read validation result: {}", path.display()))?;
        Ok(Self::parse(&content)?)
    }

    pub fn passed(&self) -> bool {
        self.status == 0
    }

    /// Lines to print for this result.
    pub fn summary(&self) -> Vec<String> {
        if self.passed() {
            return vec!["Timetable Validation Passed Successfully".to_string()];
        }

        let mut lines = vec!["Timetable Validation Failed.".to_string()];
        if let Some(message) = &self.message {
            lines.push(format!("Validation returned: {}", message));
        }
        lines
    }

    pub fn exit_code(&self) -> ExitCode {
        if self.passed() {
            ExitCode::Success
        } else {
            ExitCode::GeneralError
        }
    }
}
