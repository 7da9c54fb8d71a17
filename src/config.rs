//! Configuration management for ttb-merge.
//!
//! Values come from four sources, highest precedence first:
//! - Command line arguments
//! - Environment variables (`TTB_MERGE_*`)
//! - A TOML file following the XDG Base Directory specification
//! - Built-in defaults
//!
//! ## Example
//!
//! ```rust,no_run
//! use ttb_merge::Config;
//!
//! let config = Config::default()
//!     .merge(Config::load_from_file().unwrap())
//!     .merge(Config::load_from_env());
//! let options = config.into_options("feature/new-stops").unwrap();
//! assert!(options.write_back);
//! ```

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    core::engine::{DEFAULT_PATTERN, MergeOptions},
    error::ConfigError,
    git::Identity,
    models::Args,
    parsed_property::ParsedProperty,
};

pub const DEFAULT_TARGET_BRANCH: &str = "master";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_COMMITTER_NAME: &str = "Automated Commit: ROS CI";
pub const DEFAULT_COMMITTER_EMAIL: &str = "noreply@unreal-email.com";

/// Temporary struct for deserializing TOML configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    pub target_branch: Option<String>,
    pub remote: Option<String>,
    pub pattern: Option<String>,
    pub committer_name: Option<String>,
    pub committer_email: Option<String>,
    pub soft: Option<bool>,
    pub push: Option<bool>,
}

/// Run configuration assembled from CLI arguments, environment variables, config file, and defaults.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Protected branch merged into the run's branch.
    pub target_branch: Option<ParsedProperty<String>>,
    /// Remote receiving write-back commits.
    pub remote: Option<ParsedProperty<String>>,
    /// Directory or glob locating timetable files.
    pub pattern: Option<ParsedProperty<String>>,
    /// Author name of write-back commits, also used by the loop guard.
    pub committer_name: Option<ParsedProperty<String>>,
    pub committer_email: Option<ParsedProperty<String>>,
    /// Report-only mode.
    pub soft: Option<ParsedProperty<bool>>,
    /// Push write-back commits.
    pub push: Option<ParsedProperty<bool>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target_branch: Some(ParsedProperty::Default(DEFAULT_TARGET_BRANCH.to_string())),
            remote: Some(ParsedProperty::Default(DEFAULT_REMOTE.to_string())),
            pattern: Some(ParsedProperty::Default(DEFAULT_PATTERN.to_string())),
            committer_name: Some(ParsedProperty::Default(DEFAULT_COMMITTER_NAME.to_string())),
            committer_email: Some(ParsedProperty::Default(
                DEFAULT_COMMITTER_EMAIL.to_string(),
            )),
            soft: Some(ParsedProperty::Default(false)),
            push: Some(ParsedProperty::Default(true)),
        }
    }
}

fn string_or(prop: &Option<ParsedProperty<String>>, default: &str) -> String {
    prop.as_ref()
        .map(|p| p.value().clone())
        .unwrap_or_else(|| default.to_string())
}

fn env_string(name: &str) -> Option<ParsedProperty<String>> {
    std::env::var(name)
        .ok()
        .map(|v| ParsedProperty::Env(v.clone(), v))
}

fn env_bool(name: &str) -> Option<ParsedProperty<bool>> {
    std::env::var(name).ok().and_then(|s| {
        s.to_lowercase()
            .parse::<bool>()
            .ok()
            .map(|v| ParsedProperty::Env(v, s.clone()))
    })
}

impl Config {
    /// A config with every field unset.
    pub fn empty() -> Self {
        Self {
            target_branch: None,
            remote: None,
            pattern: None,
            committer_name: None,
            committer_email: None,
            soft: None,
            push: None,
        }
    }

    /// Load configuration from the XDG config directory.
    ///
    /// A missing file yields an empty config.
    #[must_use = "this returns the loaded configuration which should be used"]
    pub fn load_from_file() -> Result<Self> {
        let config_path = Self::get_config_path()?;

        if !config_path.exists() {
            return Ok(Self::empty());
        }

        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            ConfigError::FileReadError {
                path: config_path.clone(),
                message: e.to_string(),
            }
        })?;

        let config_file: ConfigFile =
            toml::from_str(&config_content).map_err(|e| ConfigError::ParseError {
                path: config_path.clone(),
                message: e.to_string(),
            })?;

        let file_string =
            |v: Option<String>| v.map(|v| ParsedProperty::File(v.clone(), config_path.clone(), v));
        let file_bool =
            |v: Option<bool>| v.map(|v| ParsedProperty::File(v, config_path.clone(), v.to_string()));

        Ok(Self {
            target_branch: file_string(config_file.target_branch),
            remote: file_string(config_file.remote),
            pattern: file_string(config_file.pattern),
            committer_name: file_string(config_file.committer_name),
            committer_email: file_string(config_file.committer_email),
            soft: file_bool(config_file.soft),
            push: file_bool(config_file.push),
        })
    }

    /// Load configuration from `TTB_MERGE_*` environment variables.
    ///
    /// Boolean variables that do not parse are ignored.
    pub fn load_from_env() -> Self {
        Self {
            target_branch: env_string("TTB_MERGE_TARGET_BRANCH"),
            remote: env_string("TTB_MERGE_REMOTE"),
            pattern: env_string("TTB_MERGE_PATTERN"),
            committer_name: env_string("TTB_MERGE_COMMITTER_NAME"),
            committer_email: env_string("TTB_MERGE_COMMITTER_EMAIL"),
            soft: env_bool("TTB_MERGE_SOFT"),
            push: env_bool("TTB_MERGE_PUSH"),
        }
    }

    /// Converts command line arguments into `ParsedProperty::Cli` values.
    ///
    /// Boolean flags only override lower sources when they are given.
    pub fn from_args(args: &Args) -> Self {
        let cli = |v: &Option<String>| {
            v.as_ref()
                .map(|v| ParsedProperty::Cli(v.clone(), v.clone()))
        };

        Self {
            target_branch: cli(&args.target_branch),
            remote: cli(&args.remote),
            pattern: cli(&args.ttb_path),
            committer_name: cli(&args.committer_name),
            committer_email: cli(&args.committer_email),
            soft: args
                .soft
                .then(|| ParsedProperty::Cli(true, "--soft".to_string())),
            push: args
                .no_push
                .then(|| ParsedProperty::Cli(false, "--no-push".to_string())),
        }
    }

    /// Get the config file path, honouring `XDG_CONFIG_HOME`.
    fn get_config_path() -> Result<PathBuf> {
        let config_dir = match std::env::var("XDG_CONFIG_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => dirs::home_dir()
                .ok_or(ConfigError::NoConfigDir)?
                .join(".config"),
        };

        Ok(config_dir.join("ttb-merge").join("config.toml"))
    }

    /// Merge this config with another, preferring values from other when they exist
    pub fn merge(self, other: Self) -> Self {
        Self {
            target_branch: other.target_branch.or(self.target_branch),
            remote: other.remote.or(self.remote),
            pattern: other.pattern.or(self.pattern),
            committer_name: other.committer_name.or(self.committer_name),
            committer_email: other.committer_email.or(self.committer_email),
            soft: other.soft.or(self.soft),
            push: other.push.or(self.push),
        }
    }

    /// Create a sample config file for user reference
    #[must_use = "this operation can fail and the result should be checked"]
    pub fn create_sample_config() -> Result<PathBuf> {
        let config_path = Self::get_config_path()?;

        // Don't overwrite existing config
        if config_path.exists() {
            return Ok(config_path);
        }

        if let Some(dir) = config_path.parent() {
            fs::create_dir_all(dir).with_context(|| {
                format!("Failed to create config directory: {}", dir.display())
            })?;
        }

        let sample_config = r#"# ttb-merge Configuration File
# This file follows the XDG Base Directory specification
# Location: ~/.config/ttb-merge/config.toml

# Protected branch merged into the run's branch (optional, defaults to "master")
target_branch = "master"

# Remote receiving merge commits (optional, defaults to "origin")
remote = "origin"

# Directory holding timetable files, or a glob ending in .ttb,
# relative to the repository root
# (optional, defaults to "**/*.ttb")
pattern = "**/*.ttb"

# Identity used for merge commits. Runs whose latest commit has this author
# are skipped, so it must differ from every human contributor.
committer_name = "Automated Commit: ROS CI"
committer_email = "noreply@unreal-email.com"

# Report-only mode: never write, commit or push (optional, defaults to false)
# soft = false

# Push merge commits to the remote (optional, defaults to true)
# push = true
"#;

        fs::write(&config_path, sample_config).with_context(|| {
            format!(
                "Failed to write sample config to: {}",
                config_path.display()
            )
        })?;

        Ok(config_path)
    }

    /// The glob used to discover timetable files.
    pub fn pattern(&self) -> String {
        string_or(&self.pattern, DEFAULT_PATTERN)
    }

    /// Logs every value with its source at debug level.
    pub fn log_sources(&self) {
        fn log<T: std::fmt::Debug>(field: &str, prop: &Option<ParsedProperty<T>>) {
            match prop {
                Some(p) => debug!(field, value = ?p.value(), source = p.source_name(), "Config value"),
                None => debug!(field, "Config value unset"),
            }
        }

        log("target_branch", &self.target_branch);
        log("remote", &self.remote);
        log("pattern", &self.pattern);
        log("committer_name", &self.committer_name);
        log("committer_email", &self.committer_email);
        log("soft", &self.soft);
        log("push", &self.push);
    }

    /// Builds the orchestrator options for a run on `origin_branch`.
    pub fn into_options(self, origin_branch: &str) -> Result<MergeOptions, ConfigError> {
        let origin_branch = origin_branch.trim();
        if origin_branch.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "origin_branch".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let target_branch = string_or(&self.target_branch, DEFAULT_TARGET_BRANCH);
        let committer_name = string_or(&self.committer_name, DEFAULT_COMMITTER_NAME);
        for (field, value) in [
            ("target_branch", &target_branch),
            ("committer_name", &committer_name),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        }

        let soft = self.soft.map(|p| p.into_value()).unwrap_or(false);
        let push = self.push.map(|p| p.into_value()).unwrap_or(true);

        Ok(MergeOptions {
            origin_branch: origin_branch.to_string(),
            target_branch,
            identity: Identity::new(
                committer_name,
                string_or(&self.committer_email, DEFAULT_COMMITTER_EMAIL),
            ),
            remote: string_or(&self.remote, DEFAULT_REMOTE),
            write_back: !soft,
            push: !soft && push,
        })
    }
}
