//! Diagnostic logging for ttb-merge runs.
//!
//! Off unless a level is requested with `--log-level` or
//! `TTB_MERGE_LOG_LEVEL`. Events from this crate go to stderr or are appended
//! to a file, as text or JSON. Stdout carries only the run report.
//!
//! Logging has to be up before clap parses the command line, so the three
//! logging flags are picked out of the raw arguments by [`parse_early_log_config`].

use std::{fs::OpenOptions, io, path::PathBuf, str::FromStr};

use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const LEVEL_ENV: &str = "TTB_MERGE_LOG_LEVEL";
const FILE_ENV: &str = "TTB_MERGE_LOG_FILE";
const FORMAT_ENV: &str = "TTB_MERGE_LOG_FORMAT";

/// Verbosity of diagnostic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// Shape of each log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

/// Where and how much to log. A `None` level disables logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogConfig {
    pub level: Option<LogLevel>,
    /// Append to this file instead of writing to stderr.
    pub file: Option<PathBuf>,
    pub format: LogFormat,
}

impl LogConfig {
    /// Resolves each setting from its flag in `args`, falling back to `env`.
    ///
    /// Unparseable levels and formats are ignored rather than rejected; clap
    /// reports bad flags once logging is up.
    pub fn from_args_and_env<E>(args: &[String], env: E) -> Self
    where
        E: Fn(&str) -> Option<String>,
    {
        let setting = |flag: &str, var: &str| flag_value(args, flag).or_else(|| env(var));

        Self {
            level: setting("--log-level", LEVEL_ENV).and_then(|s| s.parse().ok()),
            file: setting("--log-file", FILE_ENV).map(PathBuf::from),
            format: setting("--log-format", FORMAT_ENV)
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
        }
    }
}

/// Keeps the background log writer alive; pending records flush on drop.
pub struct LogGuard {
    _worker: WorkerGuard,
}

/// Reads the logging settings from the raw process arguments and `TTB_MERGE_LOG_*`.
#[must_use]
pub fn parse_early_log_config(args: &[String]) -> LogConfig {
    LogConfig::from_args_and_env(args, |var| std::env::var(var).ok())
}

/// Installs the global subscriber described by `config`.
///
/// Returns `None` when logging is disabled, the log file cannot be opened,
/// or a subscriber is already installed.
///
/// ```rust,no_run
/// use ttb_merge::logging::{LogConfig, LogLevel, init_logging};
///
/// let _guard = init_logging(LogConfig {
///     level: Some(LogLevel::Debug),
///     ..LogConfig::default()
/// });
/// ```
#[must_use = "the returned guard must be held until application exit"]
pub fn init_logging(config: LogConfig) -> Option<LogGuard> {
    let level = config.level?;

    let (writer, worker) = match &config.file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path).ok()?;
            tracing_appender::non_blocking(file)
        }
        None => tracing_appender::non_blocking(io::stderr()),
    };

    tracing_subscriber::registry()
        .with(output_layer(writer, config.format, config.file.is_some()))
        .with(EnvFilter::new(format!("ttb_merge={}", LevelFilter::from(level))))
        .try_init()
        .ok()?;

    Some(LogGuard { _worker: worker })
}

fn output_layer(
    writer: NonBlocking,
    format: LogFormat,
    to_file: bool,
) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Json => fmt::layer()
            .with_writer(writer)
            .json()
            .with_span_events(FmtSpan::CLOSE)
            .with_file(to_file)
            .with_line_number(to_file)
            .boxed(),
        LogFormat::Text if to_file => fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Text => fmt::layer().with_writer(writer).compact().boxed(),
    }
}

/// Value of `--flag value` or `--flag=value`.
fn flag_value(args: &[String], flag: &str) -> Option<String> {
    args.iter().enumerate().find_map(|(i, arg)| {
        if arg == flag {
            args.get(i + 1).cloned()
        } else {
            arg.strip_prefix(flag)
                .and_then(|rest| rest.strip_prefix('='))
                .map(str::to_string)
        }
    })
}
