//! Unit tests for the runtime: backend registry, backend leases and logging
//!
//! RUNTIME_STATE and LOGGER are process-wide, so every test is #[serial].

use std::sync::{Arc, Mutex};

use serial_test::serial;

use crate::error::{Error, Result};
use crate::lumen::log::{LogEntry, LogSeverity, Logger};
use crate::render::{Backend, RenderSystem, RenderSystemDescriptor};
use crate::runtime::Runtime;

// ============================================================================
// TEST HELPERS
// ============================================================================

/// Test logger that captures log entries for verification
struct TestLogger {
    entries: Arc<Mutex<Vec<(LogSeverity, String)>>>,
}

impl Logger for TestLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push((entry.severity, entry.message.clone()));
    }
}

fn failing_loader(_desc: &RenderSystemDescriptor) -> Result<Box<dyn RenderSystem>> {
    Err(Error::InitializationFailed("no device".to_string()))
}

fn setup() {
    Runtime::reset_for_testing();
    Runtime::reset_logger();
}

// ============================================================================
// BACKEND REGISTRY
// ============================================================================

#[test]
#[serial]
fn test_null_backend_is_preregistered() {
    setup();
    assert!(Runtime::is_backend_registered(Backend::Null));
    assert!(!Runtime::is_backend_registered(Backend::Metal));
    assert_eq!(Runtime::registered_backends(), vec![Backend::Null]);
}

#[test]
#[serial]
fn test_unregistered_backend_fails_to_load() {
    setup();
    for backend in [Backend::Direct3D11, Backend::Direct3D12, Backend::Metal, Backend::OpenGL, Backend::OpenGLES] {
        match Runtime::load_render_system(&RenderSystemDescriptor::new(backend)) {
            Err(Error::InitializationFailed(msg)) => assert!(msg.contains(backend.name())),
            Err(other) => panic!("expected InitializationFailed, got {:?}", other),
            Ok(_) => panic!("{} should not load", backend),
        }
    }
}

#[test]
#[serial]
fn test_loader_error_is_propagated() {
    setup();
    Runtime::register_backend(Backend::OpenGL, failing_loader);
    assert!(Runtime::is_backend_registered(Backend::OpenGL));
    let result = Runtime::load_render_system(&RenderSystemDescriptor::new(Backend::OpenGL));
    assert!(matches!(result, Err(Error::InitializationFailed(_))));
    setup();
    assert!(!Runtime::is_backend_registered(Backend::OpenGL));
}

#[test]
#[serial]
fn test_load_null_render_system() {
    setup();
    let render_system = Runtime::load_render_system(&RenderSystemDescriptor::new(Backend::Null)).unwrap();
    assert_eq!(render_system.backend(), Backend::Null);
    assert!(Runtime::is_backend_active(Backend::Null));
    drop(render_system);
    assert!(!Runtime::is_backend_active(Backend::Null));
}

// ============================================================================
// BACKEND LEASES
// ============================================================================

#[test]
#[serial]
fn test_one_render_system_per_backend() {
    setup();
    let desc = RenderSystemDescriptor::new(Backend::Null);
    let first = Runtime::load_render_system(&desc).unwrap();
    assert!(matches!(
        Runtime::load_render_system(&desc),
        Err(Error::InitializationFailed(_))
    ));
    drop(first);
    assert!(Runtime::load_render_system(&desc).is_ok());
}

#[test]
#[serial]
fn test_lease_released_on_drop() {
    setup();
    let lease = Runtime::acquire_backend(Backend::Vulkan).unwrap();
    assert_eq!(lease.backend(), Backend::Vulkan);
    assert!(Runtime::acquire_backend(Backend::Vulkan).is_err());
    drop(lease);
    assert!(Runtime::acquire_backend(Backend::Vulkan).is_ok());
}

// ============================================================================
// LOGGING
// ============================================================================

#[test]
#[serial]
fn test_custom_logger_receives_entries() {
    setup();
    let entries = Arc::new(Mutex::new(Vec::new()));
    Runtime::set_logger(TestLogger { entries: entries.clone() });

    crate::lumen_info!("test", "hello {}", 42);
    crate::lumen_error!("test", "broken");

    {
        let captured = entries.lock().unwrap();
        assert_eq!(captured.len(), 2);
        assert_eq!(captured[0], (LogSeverity::Info, "hello 42".to_string()));
        assert_eq!(captured[1].0, LogSeverity::Error);
    }

    Runtime::reset_logger();
    crate::lumen_info!("test", "after reset");
    assert_eq!(entries.lock().unwrap().len(), 2);
}

#[test]
#[serial]
fn test_failed_load_is_logged_as_error() {
    setup();
    let entries = Arc::new(Mutex::new(Vec::new()));
    Runtime::set_logger(TestLogger { entries: entries.clone() });

    let _ = Runtime::load_render_system(&RenderSystemDescriptor::new(Backend::Metal));
    let has_error = entries
        .lock()
        .unwrap()
        .iter()
        .any(|(severity, msg)| *severity == LogSeverity::Error && msg.contains("Metal"));
    assert!(has_error);
    Runtime::reset_logger();
}
