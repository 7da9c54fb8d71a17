//! Batch results, progress events and their rendering.
//!
//! Events are emitted while a batch runs; the [`BatchReport`] is produced at
//! the end. [`OutputWriter`] renders both according to the selected
//! [`OutputFormat`].

use std::io::{self, Write};
use std::path::PathBuf;

use serde::Serialize;

use super::ExitCode;
use super::engine::{FileOutcome, GuardReason};
use crate::conflict;
use crate::error::TtbMergeError;
use crate::models::OutputFormat;

/// Result for one file of a batch: an outcome or the error that stopped it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub file: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<FileOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileReport {
    pub fn outcome(file: PathBuf, outcome: FileOutcome) -> Self {
        Self {
            file,
            outcome: Some(outcome),
            error: None,
        }
    }

    pub fn failed(file: PathBuf, error: &TtbMergeError) -> Self {
        Self {
            file,
            outcome: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_conflicted(&self) -> bool {
        matches!(self.outcome, Some(FileOutcome::Conflicted { .. }))
    }
}

/// Per-status file counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub clean: usize,
    pub conflicted: usize,
    pub failed: usize,
}

/// Everything a batch produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub origin_branch: String,
    pub target_branch: String,
    /// Set when a guard skipped the whole batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<GuardReason>,
    /// Set when a failure stopped the batch before every file was processed.
    pub aborted: bool,
    pub files: Vec<FileReport>,
}

impl BatchReport {
    pub fn new(origin_branch: &str, target_branch: &str) -> Self {
        Self {
            origin_branch: origin_branch.to_string(),
            target_branch: target_branch.to_string(),
            skipped: None,
            aborted: false,
            files: Vec::new(),
        }
    }

    pub fn counts(&self) -> SummaryCounts {
        let mut counts = SummaryCounts::default();
        for file in &self.files {
            match (&file.outcome, &file.error) {
                (_, Some(_)) => counts.failed += 1,
                (Some(FileOutcome::Conflicted { .. }), None) => counts.conflicted += 1,
                (Some(_), None) => counts.clean += 1,
                (None, None) => {}
            }
        }
        counts
    }

    /// Exit code for the batch. Fatal errors outrank conflicts.
    pub fn exit_code(&self) -> ExitCode {
        let counts = self.counts();
        if self.aborted || counts.failed > 0 {
            ExitCode::GeneralError
        } else if counts.conflicted > 0 {
            ExitCode::Conflict
        } else {
            ExitCode::Success
        }
    }
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Start {
        origin_branch: String,
        target_branch: String,
        total_files: usize,
    },
    /// A guard stopped the batch.
    Skipped { reason: GuardReason },
    FileStart {
        file: PathBuf,
        /// 0-based position in the batch.
        index: usize,
        total: usize,
    },
    FileDone { report: FileReport },
    Complete { counts: SummaryCounts },
}

/// Writes events and the final report in the selected format.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    ours_label: String,
    theirs_label: String,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer,
            format,
            ours_label: String::new(),
            theirs_label: String::new(),
        }
    }

    pub fn write_event(&mut self, event: &ProgressEvent) -> io::Result<()> {
        if let ProgressEvent::Start {
            origin_branch,
            target_branch,
            ..
        } = event
        {
            self.ours_label = target_branch.clone();
            self.theirs_label = origin_branch.clone();
        }

        match self.format {
            OutputFormat::Text => self.write_text_event(event),
            OutputFormat::Ndjson => {
                let json = serde_json::to_string(event).map_err(io::Error::other)?;
                writeln!(self.writer, "{}", json)
            }
            // The whole report is written once at the end
            OutputFormat::Json => Ok(()),
        }
    }

    pub fn write_report(&mut self, report: &BatchReport) -> io::Result<()> {
        match self.format {
            OutputFormat::Text => {
                let code = report.exit_code();
                writeln!(self.writer, "Result: {} (exit code {})", code, code.code())?;
            }
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
                writeln!(self.writer, "{}", json)?;
            }
            OutputFormat::Ndjson => {}
        }
        self.writer.flush()
    }

    fn write_text_event(&mut self, event: &ProgressEvent) -> io::Result<()> {
        match event {
            ProgressEvent::Start {
                origin_branch,
                target_branch,
                total_files,
            } => writeln!(
                self.writer,
                "Merging '{}' into '{}' ({} file(s))",
                target_branch, origin_branch, total_files
            ),
            ProgressEvent::Skipped { reason } => {
                writeln!(self.writer, "Nothing to do: {}", reason)
            }
            ProgressEvent::FileStart { file, index, total } => writeln!(
                self.writer,
                "[{}/{}] Processing file '{}'",
                index + 1,
                total,
                file.display()
            ),
            ProgressEvent::FileDone { report } => self.write_text_file_done(report),
            ProgressEvent::Complete { counts } => writeln!(
                self.writer,
                "Done: {} clean, {} conflicted, {} failed",
                counts.clean, counts.conflicted, counts.failed
            ),
        }
    }

    fn write_text_file_done(&mut self, report: &FileReport) -> io::Result<()> {
        if let Some(error) = &report.error {
            return writeln!(self.writer, "  ✗ {}", error);
        }

        match &report.outcome {
            Some(FileOutcome::Skipped { reason }) => {
                writeln!(self.writer, "  ⊘ Skipped: {}", reason)
            }
            Some(FileOutcome::Clean {
                commit: Some(sha), ..
            }) => writeln!(self.writer, "  ✓ Clean, committed {}", short_sha(sha)),
            Some(FileOutcome::Clean { written: true, .. }) => {
                writeln!(self.writer, "  ✓ Clean, written with no changes to commit")
            }
            Some(FileOutcome::Clean { written: false, .. }) => {
                writeln!(self.writer, "  ✓ Clean, file not modified")
            }
            Some(FileOutcome::Conflicted { sections }) => {
                writeln!(
                    self.writer,
                    "  ⚠ {} conflict(s) in '{}'",
                    sections.len(),
                    report.file.display()
                )?;
                let table = conflict::render_table(sections, &self.ours_label, &self.theirs_label);
                writeln!(self.writer, "{}", table)
            }
            None => Ok(()),
        }
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..8).unwrap_or(sha)
}
