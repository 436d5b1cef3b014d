use std::sync::Arc;

use nttfpga_backend::{ExecutionBackend, SimBackend};

use crate::error::Error;
use crate::pool::BufferPool;
use crate::slot::SlotState;
use crate::variant::Variant;

fn pool(size: usize) -> BufferPool {
    let backend: Arc<dyn ExecutionBackend> = Arc::new(SimBackend::new());
    BufferPool::new(&backend, &Variant::reverse(2).unwrap(), size).unwrap()
}

#[test]
fn test_acquire_up_to_pool_size_then_none() {
    let mut pool = pool(4);

    for n in 1..=4 {
        assert!(pool.acquire().is_some());
        assert_eq!(pool.in_use(), n);
    }
    assert!(pool.acquire().is_none());
    assert_eq!(pool.in_use(), 4);
}

#[test]
fn test_acquired_slot_state() {
    let mut pool = pool(2);
    let handle = pool.acquire().unwrap();
    assert_eq!(pool.slot(handle).state(), SlotState::Acquired);
}

#[test]
fn test_release_makes_slot_reusable() {
    let mut pool = pool(1);
    let handle = pool.acquire().unwrap();
    assert!(pool.acquire().is_none());

    pool.release(handle).unwrap();
    assert_eq!(pool.in_use(), 0);
    assert!(pool.acquire().is_some());
}

#[test]
fn test_double_release_is_an_error_and_changes_nothing() {
    let mut pool = pool(3);
    let held = pool.acquire().unwrap();
    let released = pool.acquire().unwrap();

    pool.release(released).unwrap();
    assert_eq!(pool.in_use(), 1);

    match pool.release(released) {
        Err(Error::DoubleFree { slot }) => assert_eq!(slot, released.index()),
        other => panic!("expected DoubleFree, got {other:?}"),
    }
    // Pool state is exactly as after the first release.
    assert_eq!(pool.in_use(), 1);
    assert_eq!(pool.slot(held).state(), SlotState::Acquired);
}

#[test]
fn test_release_clears_cycle_state() {
    let mut pool = pool(1);
    let handle = pool.acquire().unwrap();
    pool.slot_mut(handle).write_input(&[1, 2, 3]).unwrap();
    assert_eq!(pool.slot(handle).data_length(), 3);

    pool.release(handle).unwrap();
    assert_eq!(pool.slot(handle).state(), SlotState::Free);
    assert_eq!(pool.slot(handle).data_length(), 0);
}

#[test]
fn test_slot_indices_are_stable() {
    let mut pool = pool(3);
    let a = pool.acquire().unwrap();
    let b = pool.acquire().unwrap();
    assert_ne!(a.index(), b.index());

    pool.release(a).unwrap();
    let c = pool.acquire().unwrap();
    assert_eq!(c.index(), a.index());
}
