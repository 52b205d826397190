//! # Logging Module / 日志模块
//!
//! Prova's log levels and the `tracing` subscriber setup.
//!
//! Prova 的日志级别以及 `tracing` 订阅器的初始化。

use std::fmt;
use std::str::FromStr;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt as tracing_fmt, prelude::*, EnvFilter};

use crate::core::error::{ProvaError, Result};

/// Log level names accepted by `prova.log.level` and `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Fatal = 0,
    Error = 1,
    Warn = 2,
    Info = 3,
    Debug = 4,
    Trace = 5,
}

impl LogLevel {
    pub const ALL: [LogLevel; 6] = [
        LogLevel::Fatal,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Info,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    /// Numeric value, `Fatal` = 0 up to `Trace` = 5.
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Fatal => "FATAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
        }
    }

    /// Case-insensitive lookup by name.
    ///
    /// # Errors
    /// `InvalidArgument` for an unknown name.
    pub fn lookup(name: &str) -> Result<LogLevel> {
        LogLevel::ALL
            .into_iter()
            .find(|level| level.name().eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ProvaError::invalid(format!("{name} not found in LogLevel")))
    }

    /// `tracing` has no fatal level; fatal messages are logged as errors.
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Fatal | LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogLevel {
    type Err = ProvaError;

    fn from_str(s: &str) -> Result<Self> {
        LogLevel::lookup(s)
    }
}

/// Installs the global subscriber, writing diagnostics to stderr.
///
/// `RUST_LOG` takes precedence over `level`. Returns `false` when a subscriber
/// was already installed (e.g. by a test harness), in which case nothing changes.
pub fn init_logging(level: LogLevel) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(level.to_level_filter().into()));

    tracing_subscriber::registry()
        .with(tracing_fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init()
        .is_ok()
}
