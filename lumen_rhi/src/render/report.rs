/// Diagnostic report attached to shaders and pipeline states

use std::fmt;

/// Severity of a report entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportSeverity {
    Info,
    Warning,
    Error,
}

/// Single diagnostic line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub severity: ReportSeverity,
    pub message: String,
}

/// Diagnostics collected while creating an object
///
/// A report never changes the outcome of the creation call: an object that
/// carries a report with errors still exists and must still be released.
/// Callers inspect [`Report::has_errors`] themselves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    entries: Vec<ReportEntry>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ReportSeverity::Info, message.into());
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(ReportSeverity::Warning, message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ReportSeverity::Error, message.into());
    }

    fn push(&mut self, severity: ReportSeverity, message: String) {
        self.entries.push(ReportEntry { severity, message });
    }

    /// Append all entries of another report, prefixing each message
    pub fn merge(&mut self, prefix: &str, other: &Report) {
        for entry in &other.entries {
            self.entries.push(ReportEntry {
                severity: entry.severity,
                message: format!("{}{}", prefix, entry.message),
            });
        }
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.severity == ReportSeverity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.entries.iter().any(|e| e.severity == ReportSeverity::Warning)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ReportEntry] {
        &self.entries
    }

    /// Full report text, one line per entry
    pub fn text(&self) -> String {
        self.to_string()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let prefix = match entry.severity {
                ReportSeverity::Info => "",
                ReportSeverity::Warning => "warning: ",
                ReportSeverity::Error => "error: ",
            };
            writeln!(f, "{}{}", prefix, entry.message)?;
        }
        Ok(())
    }
}
