/// Structured logging for the flood risk service
///
/// Provides context-rich logging with component tags, sensor/barangay
/// identifiers, timestamps, and severity levels. Supports both console
/// output and file-based logging.
///
/// The `Logger` is a plain value handed to whoever needs it (usually
/// `FloodService`); there is no process-wide logger.

use chrono::Utc;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ingest::StoreError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Window,
    Aggregate,
    Classify,
    Store,
    Config,
    System,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Component::Window => write!(f, "WINDOW"),
            Component::Aggregate => write!(f, "AGG"),
            Component::Classify => write!(f, "RISK"),
            Component::Store => write!(f, "STORE"),
            Component::Config => write!(f, "CFG"),
            Component::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - sensor unknown or not yet registered
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Classify a reading store failure
pub fn classify_store_failure(err: &StoreError) -> FailureType {
    match err {
        StoreError::UnknownSource(_) | StoreError::Http(404) => FailureType::Expected,
        StoreError::Http(code) if *code >= 500 => FailureType::Unexpected,
        StoreError::Database(_) | StoreError::Parse(_) => FailureType::Unexpected,
        StoreError::Http(_) | StoreError::Request(_) => FailureType::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleStream {
    Stdout,
    Stderr,
}

#[derive(Debug, Clone)]
pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<PathBuf>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
    /// Whether to write to the console at all
    console: bool,
    /// Send every console line to stderr, keeping stdout for command output
    stderr_only: bool,
}

impl Logger {
    pub fn new(min_level: LogLevel, log_file: Option<PathBuf>, console_timestamps: bool) -> Self {
        Logger {
            min_level,
            log_file,
            console_timestamps,
            console: true,
            stderr_only: false,
        }
    }

    /// Routes all console output to stderr.
    pub fn with_stderr_console(mut self) -> Self {
        self.stderr_only = true;
        self
    }

    /// Which console stream a line at `level` goes to.
    pub fn console_stream(&self, level: LogLevel) -> ConsoleStream {
        match level {
            _ if self.stderr_only => ConsoleStream::Stderr,
            LogLevel::Error | LogLevel::Warning => ConsoleStream::Stderr,
            LogLevel::Info | LogLevel::Debug => ConsoleStream::Stdout,
        }
    }

    /// A logger that drops everything. Used by tests and library callers
    /// that have their own logging.
    pub fn silent() -> Self {
        Logger {
            min_level: LogLevel::Error,
            log_file: None,
            console_timestamps: false,
            console: false,
            stderr_only: false,
        }
    }

    pub fn enabled(&self, level: LogLevel) -> bool {
        (self.console || self.log_file.is_some()) && level >= self.min_level
    }

    fn log(&self, level: LogLevel, component: Component, site_id: Option<&str>, message: &str) {
        if !self.enabled(level) {
            return;
        }

        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let log_entry = format_entry(&timestamp.to_string(), level, component, site_id, message);

        if self.console {
            let site_part = site_id.map(|s| format!(" [{}]", s)).unwrap_or_default();
            let line = if self.console_timestamps {
                log_entry.clone()
            } else {
                match level {
                    LogLevel::Error => format!("   ✗ {}{}: {}", component, site_part, message),
                    LogLevel::Warning => format!("   ⚠ {}{}: {}", component, site_part, message),
                    LogLevel::Info => format!("   {}", message),
                    LogLevel::Debug => format!("   [DEBUG] {}", message),
                }
            };
            match self.console_stream(level) {
                ConsoleStream::Stdout => println!("{}", line),
                ConsoleStream::Stderr => eprintln!("{}", line),
            }
        }

        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path.display(), e);
            }
        }
    }

    fn append_to_file(path: &PathBuf, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }

    pub fn info(&self, component: Component, site_id: Option<&str>, message: &str) {
        self.log(LogLevel::Info, component, site_id, message);
    }

    pub fn warn(&self, component: Component, site_id: Option<&str>, message: &str) {
        self.log(LogLevel::Warning, component, site_id, message);
    }

    pub fn error(&self, component: Component, site_id: Option<&str>, message: &str) {
        self.log(LogLevel::Error, component, site_id, message);
    }

    pub fn debug(&self, component: Component, site_id: Option<&str>, message: &str) {
        self.log(LogLevel::Debug, component, site_id, message);
    }

    /// Log a reading store failure with automatic classification
    pub fn log_store_failure(&self, source_id: &str, operation: &str, err: &StoreError) {
        let failure_type = classify_store_failure(err);
        let message = format!("{} failed [{}]: {}", operation, failure_type, err);

        match failure_type {
            FailureType::Expected => self.debug(Component::Store, Some(source_id), &message),
            FailureType::Unexpected => self.error(Component::Store, Some(source_id), &message),
            FailureType::Unknown => self.warn(Component::Store, Some(source_id), &message),
        }
    }
}

/// One log line as written to the log file.
pub fn format_entry(
    timestamp: &str,
    level: LogLevel,
    component: Component,
    site_id: Option<&str>,
    message: &str,
) -> String {
    let site_part = site_id.map(|s| format!(" [{}]", s)).unwrap_or_default();
    format!("{} {} {}{}: {}", timestamp, level, component, site_part, message)
}
