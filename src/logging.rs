//! Logging setup
//!
//! One global `tracing-subscriber` per process. Output goes to stderr unless
//! a log file is given; stdout is reserved for the CLI's JSON envelopes.
//!
//! An explicit [`LogLevel`] applies to this crate only and beats `RUST_LOG`.
//! With neither, only this crate's warnings are shown.

use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, OnceLock};

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INSTALLED: OnceLock<()> = OnceLock::new();

const CRATE_TARGET: &str = "athena_adapter";

/// Verbosity accepted by `--log-level`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    #[must_use]
    pub fn as_filter(self) -> LevelFilter {
        match self {
            Self::Off => LevelFilter::OFF,
            Self::Error => LevelFilter::ERROR,
            Self::Warn => LevelFilter::WARN,
            Self::Info => LevelFilter::INFO,
            Self::Debug => LevelFilter::DEBUG,
            Self::Trace => LevelFilter::TRACE,
        }
    }
}

/// Where and how much to log
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub level: Option<LogLevel>,
    /// Append to this file instead of writing to stderr
    pub file: Option<PathBuf>,
}

impl LogConfig {
    fn filter(&self) -> EnvFilter {
        let crate_only = |level: LevelFilter| EnvFilter::new(format!("{CRATE_TARGET}={level}"));

        match self.level {
            Some(level) => crate_only(level.as_filter()),
            None => {
                EnvFilter::try_from_default_env().unwrap_or_else(|_| crate_only(LevelFilter::WARN))
            }
        }
    }
}

/// Install the global subscriber
///
/// Returns `Ok(false)` when an earlier call already installed one. A log file
/// that cannot be opened is an error rather than a silent switch to stderr.
pub fn init_logging(config: &LogConfig) -> io::Result<bool> {
    let file = config
        .file
        .as_ref()
        .map(|path| OpenOptions::new().create(true).append(true).open(path))
        .transpose()?;

    if INSTALLED.set(()).is_err() {
        return Ok(false);
    }
    if config.level == Some(LogLevel::Off) {
        return Ok(true);
    }

    let (to_file, to_stderr) = match file {
        Some(file) => (
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_target(false)
                    .with_ansi(false),
            ),
            None,
        ),
        None => (
            None,
            Some(fmt::layer().with_writer(io::stderr).with_target(false)),
        ),
    };

    let installed = tracing_subscriber::registry()
        .with(config.filter())
        .with(to_file)
        .with(to_stderr)
        .try_init()
        .is_ok();
    Ok(installed)
}
