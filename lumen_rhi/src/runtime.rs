/// Lumen runtime - process-wide logger and backend registry
///
/// Backends register a loader function per `Backend` value. At most one
/// render system per backend is alive at a time; backend constructors take a
/// [`BackendLease`] that frees the slot when the render system is dropped.

use std::sync::{Mutex, OnceLock, RwLock};
use std::time::SystemTime;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
use crate::render::{Backend, RenderSystem, RenderSystemDescriptor};

/// Function that creates a render system for one backend
pub type BackendLoader = fn(&RenderSystemDescriptor) -> Result<Box<dyn RenderSystem>>;

// ===== INTERNAL STATE =====

static RUNTIME_STATE: OnceLock<RuntimeState> = OnceLock::new();

static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

struct RuntimeState {
    loaders: RwLock<FxHashMap<Backend, BackendLoader>>,
    /// Backends with a live render system
    active: Mutex<FxHashSet<Backend>>,
}

impl RuntimeState {
    fn new() -> Self {
        let mut loaders: FxHashMap<Backend, BackendLoader> = FxHashMap::default();
        loaders.insert(Backend::Null, crate::null::NullRenderSystem::load);
        Self {
            loaders: RwLock::new(loaders),
            active: Mutex::new(FxHashSet::default()),
        }
    }
}

fn state() -> &'static RuntimeState {
    RUNTIME_STATE.get_or_init(RuntimeState::new)
}

fn logger() -> &'static RwLock<Box<dyn Logger>> {
    LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger::default())))
}

/// Exclusive claim on a backend, released on drop
#[derive(Debug)]
pub struct BackendLease {
    backend: Backend,
}

impl BackendLease {
    pub fn backend(&self) -> Backend {
        self.backend
    }
}

impl Drop for BackendLease {
    fn drop(&mut self) {
        if let Ok(mut active) = state().active.lock() {
            active.remove(&self.backend);
        }
        crate::lumen_debug!(SOURCE, "{} backend released", self.backend);
    }
}

const SOURCE: &str = "lumen::Runtime";

// ===== PUBLIC API =====

/// Process-wide runtime services
///
/// # Example
///
/// ```no_run
/// use lumen_rhi::lumen::{Runtime, render::{Backend, RenderSystemDescriptor}};
///
/// let mut render_system = Runtime::load_render_system(&RenderSystemDescriptor::new(Backend::Null))?;
/// println!("{}", render_system.renderer_info().renderer_name);
/// # Ok::<(), lumen_rhi::lumen::Error>(())
/// ```
pub struct Runtime;

impl Runtime {
    fn log_and_return_error(error: Error) -> Error {
        crate::lumen_error!(SOURCE, "{}", error);
        error
    }

    /// Install the loader for a backend, replacing any previous one
    pub fn register_backend(backend: Backend, loader: BackendLoader) {
        if let Ok(mut loaders) = state().loaders.write() {
            loaders.insert(backend, loader);
            crate::lumen_debug!(SOURCE, "{} backend registered", backend);
        }
    }

    pub fn is_backend_registered(backend: Backend) -> bool {
        state()
            .loaders
            .read()
            .map(|loaders| loaders.contains_key(&backend))
            .unwrap_or(false)
    }

    /// Registered backends in declaration order
    pub fn registered_backends() -> Vec<Backend> {
        let mut backends: Vec<Backend> = state()
            .loaders
            .read()
            .map(|loaders| loaders.keys().copied().collect())
            .unwrap_or_default();
        backends.sort();
        backends
    }

    /// Create the render system selected by `desc.backend`
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if the backend has no loader, is already in use
    /// or fails to create its device.
    pub fn load_render_system(desc: &RenderSystemDescriptor) -> Result<Box<dyn RenderSystem>> {
        let loader = {
            let loaders = state().loaders.read().map_err(|_| {
                Self::log_and_return_error(Error::InitializationFailed("backend registry lock poisoned".to_string()))
            })?;
            loaders.get(&desc.backend).copied()
        };
        let Some(loader) = loader else {
            return Err(Self::log_and_return_error(Error::InitializationFailed(format!(
                "no loader registered for the {} backend",
                desc.backend
            ))));
        };

        let render_system = loader(desc)?;
        crate::lumen_info!(
            SOURCE,
            "{} render system loaded ({})",
            desc.backend,
            render_system.renderer_info().device_name
        );
        Ok(render_system)
    }

    /// Claim a backend for a new render system
    ///
    /// # Errors
    ///
    /// `InitializationFailed` if a render system of this backend is alive
    pub fn acquire_backend(backend: Backend) -> Result<BackendLease> {
        let mut active = state().active.lock().map_err(|_| {
            Self::log_and_return_error(Error::InitializationFailed("backend registry lock poisoned".to_string()))
        })?;
        if !active.insert(backend) {
            return Err(Self::log_and_return_error(Error::InitializationFailed(format!(
                "a {} render system already exists",
                backend
            ))));
        }
        Ok(BackendLease { backend })
    }

    pub fn is_backend_active(backend: Backend) -> bool {
        state()
            .active
            .lock()
            .map(|active| active.contains(&backend))
            .unwrap_or(false)
    }

    /// Drop non-default loaders and active claims (tests only)
    #[cfg(any(test, feature = "test-utils"))]
    pub fn reset_for_testing() {
        let fresh = RuntimeState::new();
        if let (Ok(mut loaders), Ok(fresh_loaders)) = (state().loaders.write(), fresh.loaders.into_inner()) {
            *loaders = fresh_loaders;
        }
        if let Ok(mut active) = state().active.lock() {
            active.clear();
        }
    }

    // ===== LOGGING API =====

    /// Replace the process-wide logger
    ///
    /// # Example
    ///
    /// ```no_run
    /// use lumen_rhi::lumen::{Runtime, log::{Logger, LogEntry}};
    ///
    /// struct Quiet;
    /// impl Logger for Quiet {
    ///     fn log(&self, _entry: &LogEntry) {}
    /// }
    ///
    /// Runtime::set_logger(Quiet);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger_impl: L) {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(logger_impl);
        }
    }

    /// Restore the default console logger
    pub fn reset_logger() {
        if let Ok(mut lock) = logger().write() {
            *lock = Box::new(DefaultLogger::default());
        }
    }

    /// Log without source location (used by the `lumen_*!` macros)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: None,
                line: None,
            });
        }
    }

    /// Log with file:line (used by `lumen_error!`)
    pub fn log_detailed(severity: LogSeverity, source: &str, message: String, file: &'static str, line: u32) {
        if let Ok(lock) = logger().read() {
            lock.log(&LogEntry {
                severity,
                timestamp: SystemTime::now(),
                source: source.to_string(),
                message,
                file: Some(file),
                line: Some(line),
            });
        }
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
