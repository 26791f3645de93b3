//! Integration tests for the Lumen logging system
//!
//! These tests verify logger replacement and what the render system logs.
//! No GPU required.
//!
//! Run with: cargo test --test logging_integration_tests

use lumen_rhi::lumen::log::{LogEntry, LogSeverity, Logger};
use lumen_rhi::lumen::render::{load_render_system, Backend, BufferDescriptor, RenderSystemDescriptor};
use lumen_rhi::lumen::Runtime;
use serial_test::serial;
use std::sync::{Arc, Mutex};

// ============================================================================
// TEST LOGGER IMPLEMENTATION
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl TestLogger {
    fn new() -> (Self, Arc<Mutex<Vec<LogEntry>>>) {
        let entries = Arc::new(Mutex::new(Vec::new()));
        (Self { entries: entries.clone() }, entries)
    }
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// LOGGING TESTS
// ============================================================================

#[test]
#[serial]
fn test_integration_custom_logger() {
    let (test_logger, entries) = TestLogger::new();
    Runtime::set_logger(test_logger);

    Runtime::log(LogSeverity::Info, "test::module", "Test info message".to_string());
    Runtime::log(LogSeverity::Warn, "test::module", "Test warning message".to_string());
    Runtime::log(LogSeverity::Error, "test::module", "Test error message".to_string());

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 3);
        assert_eq!(captured[0].severity, LogSeverity::Info);
        assert_eq!(captured[0].source, "test::module");
        assert_eq!(captured[0].message, "Test info message");
        assert_eq!(captured[1].severity, LogSeverity::Warn);
        assert_eq!(captured[2].severity, LogSeverity::Error);
        assert_eq!(captured[2].message, "Test error message");
    }

    Runtime::reset_logger();
}

#[test]
#[serial]
fn test_integration_error_logging_with_location() {
    let (test_logger, entries) = TestLogger::new();
    Runtime::set_logger(test_logger);

    Runtime::log_detailed(
        LogSeverity::Error,
        "test::error",
        "Critical error occurred".to_string(),
        "test_file.rs",
        42,
    );

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 1);
        assert_eq!(captured[0].file, Some("test_file.rs"));
        assert_eq!(captured[0].line, Some(42));
    }

    Runtime::reset_logger();
}

#[test]
#[serial]
fn test_integration_logger_reset() {
    let (test_logger, entries) = TestLogger::new();
    Runtime::set_logger(test_logger);
    Runtime::log(LogSeverity::Info, "test", "Message 1".to_string());

    Runtime::reset_logger();
    Runtime::log(LogSeverity::Info, "test", "Message 2".to_string());

    assert_eq!(entries.lock().unwrap().len(), 1);
}

#[test]
#[serial]
fn test_integration_render_system_lifecycle_is_logged() {
    let (test_logger, entries) = TestLogger::new();
    Runtime::set_logger(test_logger);

    let system = load_render_system(&RenderSystemDescriptor::new(Backend::Null)).unwrap();
    drop(system);

    {
        let captured = entries.lock().unwrap();
        let null_entries: Vec<_> = captured.iter().filter(|e| e.source == "lumen::null").collect();
        assert!(null_entries.iter().any(|e| e.message.contains("created")));
        assert!(null_entries.iter().any(|e| e.message.contains("destroyed")));
    }

    Runtime::reset_logger();
}

#[test]
#[serial]
fn test_integration_rejected_descriptor_logs_warning() {
    let (test_logger, entries) = TestLogger::new();
    Runtime::set_logger(test_logger);

    let mut system = load_render_system(&RenderSystemDescriptor::new(Backend::Null)).unwrap();
    let result = system.create_buffer(&BufferDescriptor::default(), None);
    assert!(result.is_err());

    {
        let captured = entries.lock().unwrap();
        assert!(captured
            .iter()
            .any(|e| e.severity == LogSeverity::Warn && e.message.contains("non-zero")));
    }

    drop(system);
    Runtime::reset_logger();
}
