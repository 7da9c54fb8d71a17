//! Unified error handling for the ttb-merge library.
//!
//! This module provides the error hierarchy using `thiserror` so callers can
//! tell a per-file failure from one that must stop the whole batch.
//!
//! ## Error Categories
//!
//! - [`TtbMergeError`]: Everything a single file's merge can fail with
//! - [`GitError`]: Errors from git subprocesses (the real repository or the sandbox)
//! - [`MarkerError`]: Malformed conflict-marker structure in merged output
//! - [`CodecError`]: Encoded text that does not decode
//! - [`ConfigError`]: Errors from configuration loading and validation
//! - [`ValidationError`]: Unreadable timetable validation results
//!
//! ## Example
//!
//! ```rust,no_run
//! use ttb_merge::error::{TtbMergeError, GitError};
//!
//! fn example() -> Result<(), TtbMergeError> {
//!     // Errors are automatically converted via From trait
//!     Err(GitError::NotARepository { path: "/tmp".into() })?;
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for a single file's merge run.
#[derive(Error, Debug)]
pub enum TtbMergeError {
    /// The timetable file does not exist at a revision the merge needs.
    #[error("Could not find file '{}' on branch '{branch}'", file.display())]
    MissingFile {
        /// Repository-relative path of the file.
        file: PathBuf,
        /// Branch (or revision) the file was looked up on.
        branch: String,
    },

    /// The run's branch and the target branch share no history.
    #[error("No common ancestor between '{branch}' and '{target}'")]
    NoCommonAncestor {
        /// The branch being merged.
        branch: String,
        /// The protected target branch.
        target: String,
    },

    /// The real repository could not be put back on its original branch.
    #[error("Failed to restore checkout to '{branch}': {message}")]
    CheckoutRestoration {
        /// The ref that should have been restored.
        branch: String,
        /// Error message from git.
        message: String,
    },

    /// A git subprocess failed.
    #[error("Git error: {0}")]
    Git(#[from] GitError),

    /// The merged text has broken conflict-marker structure.
    #[error("Conflict marker error: {0}")]
    Marker(#[from] MarkerError),

    /// The merged text could not be decoded back into file bytes.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl TtbMergeError {
    /// Whether this error leaves the working tree in a state where no
    /// further file may be processed.
    pub fn aborts_batch(&self) -> bool {
        matches!(self, Self::CheckoutRestoration { .. })
    }
}

/// Errors that can occur during git operations.
#[derive(Error, Debug, Clone)]
pub enum GitError {
    /// The git binary could not be started.
    #[error("Failed to run '{command}': {message}")]
    Spawn {
        /// The git command that could not be started.
        command: String,
        /// Error message from the OS.
        message: String,
    },

    /// A git command exited with a failure status.
    #[error("Git command failed: {command} - {message}")]
    CommandFailed {
        /// The git command that failed.
        command: String,
        /// Error message from git.
        message: String,
    },

    /// The specified path is not inside a git work tree.
    #[error("Not a valid git repository: {}", path.display())]
    NotARepository {
        /// Path that was expected to be a repository.
        path: PathBuf,
    },
}

/// Structural problems in conflict-marker syntax.
///
/// Line numbers are 1-based.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkerError {
    /// A begin marker appeared inside an open region.
    #[error("line {line}: conflict begins inside another conflict")]
    NestedBegin { line: usize },

    /// A separator appeared outside any region.
    #[error("line {line}: separator outside a conflict")]
    StraySeparator { line: usize },

    /// A second separator appeared in the same region.
    #[error("line {line}: duplicate separator in conflict")]
    DuplicateSeparator { line: usize },

    /// An end marker closed a region that had no separator.
    #[error("line {line}: conflict ends before its separator")]
    MissingSeparator { line: usize },

    /// An end marker appeared outside any region.
    #[error("line {line}: conflict end without a matching begin")]
    StrayEnd { line: usize },

    /// The text ended with a region still open.
    #[error("line {line}: conflict is never closed")]
    Unterminated { line: usize },
}

/// Errors raised when decoding encoded timetable text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// An escape sequence the encoder never produces.
    #[error("unknown escape '\\{escape}' at offset {offset}")]
    UnknownEscape { escape: char, offset: usize },

    /// The text ends in the middle of an escape sequence.
    #[error("truncated escape at offset {offset}")]
    TruncatedEscape { offset: usize },

    /// A `\x` escape whose payload is not two hex digits.
    #[error("invalid byte escape at offset {offset}")]
    InvalidByteEscape { offset: usize },
}

/// Errors that can occur during configuration loading and validation.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file at {}: {message}", path.display())]
    FileReadError {
        /// Path to the config file.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Failed to parse the configuration file.
    #[error("Failed to parse config file at {}: {message}", path.display())]
    ParseError {
        /// Path to the config file.
        path: PathBuf,
        /// Parse error message.
        message: String,
    },

    /// An invalid value was provided for a configuration field.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue {
        /// Name of the field with invalid value.
        field: String,
        /// Description of why the value is invalid.
        message: String,
    },

    /// The home directory could not be determined.
    #[error("Could not determine the configuration directory")]
    NoConfigDir,
}

/// Problems reading a timetable validation result file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The result file has no lines.
    #[error("Output of Validation was empty, cannot deduce result.")]
    Empty,

    /// The first line is not an integer status.
    #[error("Invalid validation status '{line}'")]
    InvalidStatus {
        /// The offending first line.
        line: String,
    },
}
