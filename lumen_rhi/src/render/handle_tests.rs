//! Unit tests for handle.rs

use crate::error::Error;
use crate::render::handle::{BufferHandle, HwObjectContainer};

#[test]
fn test_insert_and_get() {
    let mut container: HwObjectContainer<BufferHandle, u32> = HwObjectContainer::new("buffer");
    let a = container.insert(10);
    let b = container.insert(20);
    assert_eq!(*container.get(a).unwrap(), 10);
    assert_eq!(*container.get(b).unwrap(), 20);
    assert_eq!(container.len(), 2);
}

#[test]
fn test_release_is_idempotent() {
    let mut container: HwObjectContainer<BufferHandle, u32> = HwObjectContainer::new("buffer");
    let a = container.insert(1);
    assert_eq!(container.release(a), Some(1));
    assert_eq!(container.release(a), None);
    assert!(container.is_empty());
}

#[test]
fn test_stale_handle_is_detected_after_slot_reuse() {
    let mut container: HwObjectContainer<BufferHandle, u32> = HwObjectContainer::new("buffer");
    let old = container.insert(1);
    container.release(old);
    let new = container.insert(2);

    assert_ne!(old, new);
    assert!(!container.contains(old));
    match container.get(old) {
        Err(Error::InvalidResource(msg)) => assert!(msg.contains("buffer")),
        other => panic!("expected InvalidResource, got {:?}", other),
    }
    assert_eq!(*container.get(new).unwrap(), 2);
}

#[test]
fn test_get_mut_and_drain() {
    let mut container: HwObjectContainer<BufferHandle, u32> = HwObjectContainer::new("buffer");
    let a = container.insert(1);
    *container.get_mut(a).unwrap() = 5;
    let drained: Vec<u32> = container.drain().map(|(_, v)| v).collect();
    assert_eq!(drained, vec![5]);
    assert!(container.get_mut(a).is_err());
}
