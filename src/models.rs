use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::config::Config;

/// Output format for run results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress lines and conflict tables.
    #[default]
    Text,
    /// One JSON report at the end.
    Json,
    /// Newline-delimited JSON (one event per line).
    Ndjson,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Ndjson => write!(f, "ndjson"),
        }
    }
}

#[derive(Parser, Clone, Debug)]
#[command(
    name = "ttb-merge",
    author,
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")"),
    about = "Merge timetable (.ttb) files from a protected branch into a feature branch",
    long_about = "Merges every timetable file from the target branch into the current branch.\n\n\
        Each file is merged field by field in a throwaway repository, so edits to\n\
        different fields of the single-line record combine cleanly. Conflicts are\n\
        printed as a table and leave the file untouched.\n\n\
        Configuration can be provided via CLI arguments, environment variables (TTB_MERGE_*)\n\
        or a config file (~/.config/ttb-merge/config.toml).",
    after_help = "EXAMPLES:\n    \
        # Merge master into the CI branch and push the result\n    \
        ttb-merge feature/new-stops\n\n    \
        # Only report what would happen for one directory\n    \
        ttb-merge feature/new-stops --soft --ttb-path Program_Timetables\n\n    \
        # Machine-readable report, commit without pushing\n    \
        ttb-merge feature/new-stops --output json --no-push\n\n    \
        # Create sample config file\n    \
        ttb-merge --create-config"
)]
pub struct Args {
    /// Branch the run was triggered for; merge results are pushed here
    #[arg(required_unless_present = "create_config")]
    pub origin_branch: Option<String>,

    /// Directory holding timetable files, or a glob ending in .ttb, relative to
    /// the repository root [default: **/*.ttb]
    #[arg(long = "ttb-path", help_heading = "Merge Options")]
    pub ttb_path: Option<String>,

    /// Report the merge outcome without writing, committing or pushing
    #[arg(long, help_heading = "Merge Options")]
    pub soft: bool,

    /// Protected branch merged into the origin branch [default: master]
    #[arg(long, help_heading = "Merge Options")]
    pub target_branch: Option<String>,

    /// Remote receiving the merge commit [default: origin]
    #[arg(long, help_heading = "Merge Options")]
    pub remote: Option<String>,

    /// Commit the merge result locally without pushing
    #[arg(long, help_heading = "Merge Options")]
    pub no_push: bool,

    /// Author name for merge commits [default: Automated Commit: ROS CI]
    #[arg(long, help_heading = "Identity")]
    pub committer_name: Option<String>,

    /// Author email for merge commits [default: noreply@unreal-email.com]
    #[arg(long, help_heading = "Identity")]
    pub committer_email: Option<String>,

    /// Path inside the repository to operate on
    #[arg(long, default_value = ".", help_heading = "Repository Options")]
    pub repo: PathBuf,

    /// Output format: text, json, ndjson
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, help_heading = "Output Options")]
    pub output: OutputFormat,

    /// Log level (trace, debug, info, warn, error); logging is off when unset
    #[arg(long, help_heading = "Logging")]
    pub log_level: Option<String>,

    /// Write logs to this file instead of stderr
    #[arg(long, help_heading = "Logging")]
    pub log_file: Option<PathBuf>,

    /// Log format: text or json
    #[arg(long, help_heading = "Logging")]
    pub log_format: Option<String>,

    /// Create a sample configuration file at ~/.config/ttb-merge/config.toml
    #[arg(long)]
    pub create_config: bool,
}

/// Arguments of the `ttb-check` validation reporter.
#[derive(Parser, Clone, Debug)]
#[command(
    name = "ttb-check",
    version,
    about = "Report the outcome of a timetable validation run",
    long_about = "Reads a validation result file (integer status on the first line, optional\n\
        message on the second), prints a verdict and exits 0 only when the status is 0."
)]
pub struct CheckArgs {
    /// Result file written by the validator
    pub input_file: PathBuf,
}

impl Args {
    /// Resolves configuration from the config file, environment and these arguments.
    ///
    /// Precedence: CLI > environment > config file > defaults.
    pub fn resolve_config(&self) -> Result<Config> {
        let file_config = Config::load_from_file()?;
        let env_config = Config::load_from_env();
        let cli_config = Config::from_args(self);

        Ok(Config::default()
            .merge(file_config)
            .merge(env_config)
            .merge(cli_config))
    }
}
