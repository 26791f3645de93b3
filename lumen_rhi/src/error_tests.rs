//! Unit tests for error.rs
//!
//! Tests all Error variants, their Display output and the error macros.

use crate::error::{Error, Result};

// ============================================================================
// ERROR DISPLAY TESTS
// ============================================================================

#[test]
fn test_backend_error_display() {
    let err = Error::BackendError("vkCreateDevice failed".to_string());
    let display = format!("{}", err);
    assert!(display.contains("Backend error"));
    assert!(display.contains("vkCreateDevice failed"));
}

#[test]
fn test_out_of_memory_display() {
    assert_eq!(format!("{}", Error::OutOfMemory), "Out of GPU memory");
}

#[test]
fn test_invalid_resource_display() {
    let err = Error::InvalidResource("buffer handle released".to_string());
    assert_eq!(format!("{}", err), "Invalid resource: buffer handle released");
}

#[test]
fn test_invalid_argument_display() {
    let err = Error::InvalidArgument("zero texture extent".to_string());
    assert_eq!(format!("{}", err), "Invalid argument: zero texture extent");
}

#[test]
fn test_invalid_state_display() {
    let err = Error::InvalidState("command buffer not recording".to_string());
    assert_eq!(format!("{}", err), "Invalid state: command buffer not recording");
}

#[test]
fn test_initialization_failed_display() {
    let err = Error::InitializationFailed("no Vulkan device".to_string());
    let display = format!("{}", err);
    assert!(display.starts_with("Initialization failed"));
}

// ============================================================================
// ERROR TRAIT IMPLEMENTATIONS
// ============================================================================

#[test]
fn test_error_is_std_error() {
    let err = Error::OutOfMemory;
    let _: &dyn std::error::Error = &err;
}

#[test]
fn test_error_clone_and_eq() {
    let err = Error::InvalidArgument("x".to_string());
    assert_eq!(err.clone(), err);
    assert_ne!(err, Error::InvalidState("x".to_string()));
}

#[test]
fn test_result_question_mark() {
    fn inner() -> Result<u32> {
        Err(Error::OutOfMemory)
    }
    fn outer() -> Result<u32> {
        let v = inner()?;
        Ok(v + 1)
    }
    assert_eq!(outer(), Err(Error::OutOfMemory));
}

// ============================================================================
// MACROS
// ============================================================================

#[test]
fn test_lumen_err_builds_backend_error() {
    let err = crate::lumen_err!("lumen::test", "code {}", 7);
    assert_eq!(err, Error::BackendError("code 7".to_string()));
}

#[test]
fn test_lumen_bail_returns_early() {
    fn fails(flag: bool) -> Result<u32> {
        if flag {
            crate::lumen_bail!("lumen::test", "bailed");
        }
        Ok(1)
    }
    assert_eq!(fails(false), Ok(1));
    assert_eq!(fails(true), Err(Error::BackendError("bailed".to_string())));
}

#[test]
fn test_lumen_invalid_builds_invalid_argument() {
    let err = crate::lumen_invalid!("lumen::test", "bad size {}", 0);
    assert_eq!(err, Error::InvalidArgument("bad size 0".to_string()));
}
