//! # TTB Merge Library
//!
//! Three-way merging of single-line TTB timetable files between git branches.
//!
//! A TTB file is one physical line of comma-separated fields whose subfields
//! are NUL-separated, so a plain `git merge` sees every edit as touching the
//! same line. This library:
//!
//! - Encodes the record one field per line ([`codec`])
//! - Reads the file at the merge base and on both branches ([`extract`])
//! - Replays the three versions in a throwaway repository and merges there ([`sandbox`])
//! - Classifies the result as clean or conflicted ([`conflict`])
//! - Writes clean results back, commits and pushes ([`core::engine`])
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use ttb_merge::{Config, GitContext, MergeOrchestrator, discover_files};
//!
//! # fn main() -> anyhow::Result<()> {
//! let ctx = GitContext::open(Path::new("."))?;
//! let config = Config::default();
//! let files = discover_files(ctx.root(), &config.pattern())?;
//! let options = config.into_options("feature/new-stops")?;
//!
//! let report = MergeOrchestrator::new(&ctx, options).run_batch(&files, |_| {})?;
//! println!("{} file(s) processed", report.files.len());
//! # Ok(())
//! # }
//! ```

pub mod check;
pub mod codec;
pub mod config;
pub mod conflict;
pub mod core;
pub mod error;
pub mod extract;
pub mod git;
pub mod logging;
pub mod models;
pub mod parsed_property;
pub mod sandbox;

// Re-export commonly used types for convenience
pub use config::Config;
pub use crate::core::engine::{FileOutcome, MergeOptions, MergeOrchestrator, discover_files};
pub use git::GitContext;
pub use models::Args;

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
