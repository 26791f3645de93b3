//! Error types for the Lumen render hardware interface
//!
//! Errors cover the fatal and invalid-argument paths only. Soft failures
//! (display modes, vsync) return `bool`, and shader/pipeline diagnostics are
//! carried by a [`Report`](crate::render::Report) attached to the created
//! object.

use std::fmt;

/// Result type for Lumen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Lumen errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Backend-specific error (Vulkan, Null, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Stale, released or foreign handle
    InvalidResource(String),

    /// Malformed descriptor or argument (zero resolution, unsupported format, ...)
    InvalidArgument(String),

    /// Call made in the wrong state (recording outside Begin/End, buffer still mapped, ...)
    InvalidState(String),

    /// No suitable backend, device or extension set
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR (with file:line) and build an `Error::BackendError` from the same message
///
/// # Example
///
/// ```no_run
/// # use lumen_rhi::lumen_err;
/// let err = lumen_err!("lumen::vulkan", "vkCreateBuffer failed: {}", -2);
/// ```
#[macro_export]
macro_rules! lumen_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::lumen_error!($source, "{}", message);
        $crate::lumen::Error::BackendError(message)
    }};
}

/// Log an ERROR and return early with an `Error::BackendError`
#[macro_export]
macro_rules! lumen_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::lumen_err!($source, $($arg)*))
    };
}

/// Log a WARN and build an `Error::InvalidArgument`
///
/// Used when a descriptor is rejected at creation time.
#[macro_export]
macro_rules! lumen_invalid {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::lumen_warn!($source, "{}", message);
        $crate::lumen::Error::InvalidArgument(message)
    }};
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
