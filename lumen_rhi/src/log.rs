//! Logging for the Lumen render hardware interface
//!
//! - Customizable logger via the `Logger` trait
//! - Severity levels (Trace, Debug, Info, Warn, Error)
//! - Colored console output by default, with a minimum severity filter
//! - File and line information for ERROR logs

use colored::*;
use std::time::SystemTime;
use chrono::{DateTime, Local};

/// Logger trait for custom logging implementations
///
/// Install one with [`Runtime::set_logger`](crate::lumen::Runtime::set_logger).
///
/// # Example
///
/// ```no_run
/// use lumen_rhi::lumen::log::{Logger, LogEntry};
///
/// struct FileLogger {
///     file: std::fs::File,
/// }
///
/// impl Logger for FileLogger {
///     fn log(&self, entry: &LogEntry) {
///         // Write to file...
///     }
/// }
/// ```
pub trait Logger: Send + Sync {
    /// Log an entry
    fn log(&self, entry: &LogEntry);
}

/// Log entry containing all information about a log message
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Severity level
    pub severity: LogSeverity,

    /// Timestamp when the log was created
    pub timestamp: SystemTime,

    /// Source module (e.g., "lumen::RenderSystem", "lumen::vulkan")
    pub source: String,

    /// Log message
    pub message: String,

    /// Source file (only for ERROR logs)
    pub file: Option<&'static str>,

    /// Source line (only for ERROR logs)
    pub line: Option<u32>,
}

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    /// Very verbose information (command recording, handle churn)
    Trace,

    /// Development information
    Debug,

    /// Object creation, device selection
    Info,

    /// Rejected descriptors, clamped values
    Warn,

    /// Backend failures (with file:line)
    Error,
}

impl LogSeverity {
    /// Fixed-width label used in console output
    pub fn label(self) -> &'static str {
        match self {
            LogSeverity::Trace => "TRACE",
            LogSeverity::Debug => "DEBUG",
            LogSeverity::Info => "INFO ",
            LogSeverity::Warn => "WARN ",
            LogSeverity::Error => "ERROR",
        }
    }
}

/// Format an entry as `[timestamp] [SEVERITY] [source] message (file:line)`
///
/// Colors are applied only when `colorize` is set.
pub fn format_entry(entry: &LogEntry, colorize: bool) -> String {
    let datetime: DateTime<Local> = entry.timestamp.into();
    let timestamp = datetime.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

    let (severity, source) = if colorize {
        let severity = match entry.severity {
            LogSeverity::Trace => entry.severity.label().bright_black(),
            LogSeverity::Debug => entry.severity.label().cyan(),
            LogSeverity::Info => entry.severity.label().green(),
            LogSeverity::Warn => entry.severity.label().yellow(),
            LogSeverity::Error => entry.severity.label().red().bold(),
        };
        (severity.to_string(), entry.source.bright_blue().to_string())
    } else {
        (entry.severity.label().to_string(), entry.source.clone())
    };

    match (entry.file, entry.line) {
        (Some(file), Some(line)) => format!(
            "[{}] [{}] [{}] {} ({}:{})",
            timestamp, severity, source, entry.message, file, line
        ),
        _ => format!("[{}] [{}] [{}] {}", timestamp, severity, source, entry.message),
    }
}

/// Default logger: colored console output
///
/// Entries below `min_severity` are dropped. Errors go to stderr, everything
/// else to stdout.
#[derive(Debug, Clone, Copy)]
pub struct DefaultLogger {
    pub min_severity: LogSeverity,
}

impl DefaultLogger {
    pub fn with_min_severity(min_severity: LogSeverity) -> Self {
        Self { min_severity }
    }
}

impl Default for DefaultLogger {
    fn default() -> Self {
        Self { min_severity: LogSeverity::Debug }
    }
}

impl Logger for DefaultLogger {
    fn log(&self, entry: &LogEntry) {
        if entry.severity < self.min_severity {
            return;
        }
        let line = format_entry(entry, true);
        if entry.severity == LogSeverity::Error {
            eprintln!("{}", line);
        } else {
            println!("{}", line);
        }
    }
}

// ===== LOGGING MACROS =====

/// Log a TRACE message
///
/// # Example
///
/// ```no_run
/// # use lumen_rhi::lumen_trace;
/// lumen_trace!("lumen::CommandBuffer", "recorded {} commands", 12);
/// ```
#[macro_export]
macro_rules! lumen_trace {
    ($source:expr, $($arg:tt)*) => {
        $crate::lumen::Runtime::log(
            $crate::lumen::log::LogSeverity::Trace,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a DEBUG message
#[macro_export]
macro_rules! lumen_debug {
    ($source:expr, $($arg:tt)*) => {
        $crate::lumen::Runtime::log(
            $crate::lumen::log::LogSeverity::Debug,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an INFO message
///
/// # Example
///
/// ```no_run
/// # use lumen_rhi::lumen_info;
/// lumen_info!("lumen::RenderSystem", "Null render system loaded");
/// ```
#[macro_export]
macro_rules! lumen_info {
    ($source:expr, $($arg:tt)*) => {
        $crate::lumen::Runtime::log(
            $crate::lumen::log::LogSeverity::Info,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log a WARN message
#[macro_export]
macro_rules! lumen_warn {
    ($source:expr, $($arg:tt)*) => {
        $crate::lumen::Runtime::log(
            $crate::lumen::log::LogSeverity::Warn,
            $source,
            format!($($arg)*)
        )
    };
}

/// Log an ERROR message with file:line information
///
/// # Example
///
/// ```no_run
/// # use lumen_rhi::lumen_error;
/// lumen_error!("lumen::vulkan", "Failed to create device: {}", "ERROR_INITIALIZATION_FAILED");
/// ```
#[macro_export]
macro_rules! lumen_error {
    ($source:expr, $($arg:tt)*) => {
        $crate::lumen::Runtime::log_detailed(
            $crate::lumen::log::LogSeverity::Error,
            $source,
            format!($($arg)*),
            file!(),
            line!()
        )
    };
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
