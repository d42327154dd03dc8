use std::alloc::System;

use tilemul::alloc::CountingAllocator;
use tilemul::{multiply_tile, Matrix};

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator::new(System);

const F64_BYTES: usize = std::mem::size_of::<f64>();

// Counters are global and the test harness runs tests on several threads,
// so only lower bounds are asserted.

#[test]
fn test_matrix_allocation_is_counted() {
    let before = ALLOC.snapshot();
    let m = Matrix::new(64, 32).unwrap();
    let after = ALLOC.snapshot();

    assert!(
        after.allocated - before.allocated >= 64 * 32 * F64_BYTES,
        "allocated only {} bytes",
        after.allocated - before.allocated
    );

    let before = ALLOC.snapshot();
    drop(m);
    let after = ALLOC.snapshot();
    assert!(after.deallocated - before.deallocated >= 64 * 32 * F64_BYTES);
}

#[test]
fn test_clone_allocates_a_new_buffer() {
    let m = Matrix::identity(40).unwrap();

    let before = ALLOC.allocated();
    let copy = m.clone();
    assert!(ALLOC.allocated() - before >= 40 * 40 * F64_BYTES);
    assert_eq!(copy, m);
}

#[test]
fn test_take_does_not_allocate_storage() {
    let mut m = Matrix::zeros(128, 128).unwrap();

    let before = ALLOC.allocated();
    let moved = m.take();
    let grown = ALLOC.allocated() - before;

    // Other tests may allocate concurrently, but never a full 128x128 buffer
    // in this window unless `take` copied.
    assert!(grown < 128 * 128 * F64_BYTES, "take allocated {} bytes", grown);
    assert_eq!(moved.shape(), (128, 128));
    assert!(m.is_empty());
}

#[test]
fn test_product_allocation_is_counted() {
    let a = Matrix::identity(50).unwrap();
    let b = Matrix::identity(50).unwrap();

    let before = ALLOC.allocated();
    let c = multiply_tile(&a, &b, 16).unwrap();
    assert!(ALLOC.allocated() - before >= 50 * 50 * F64_BYTES);
    assert_eq!(c, a);
}
