//! Byte-counting allocator decorator.
//!
//! [`CountingAllocator`] wraps any [`GlobalAlloc`] (the system allocator by
//! default) and keeps running totals of bytes handed out and returned. It is
//! opt-in: install it with `#[global_allocator]` in a binary or test crate.
//!
//! ```ignore
//! use std::alloc::System;
//! use tilemul::alloc::CountingAllocator;
//!
//! #[global_allocator]
//! static ALLOC: CountingAllocator = CountingAllocator::new(System);
//!
//! let before = ALLOC.snapshot();
//! let m = tilemul::Matrix::new(128, 128).unwrap();
//! assert!(ALLOC.snapshot().allocated - before.allocated >= 128 * 128 * 8);
//! # drop(m);
//! ```

use std::alloc::{GlobalAlloc, Layout, System};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A [`GlobalAlloc`] decorator counting allocated and deallocated bytes.
pub struct CountingAllocator<A = System> {
    inner: A,
    allocated: AtomicUsize,
    deallocated: AtomicUsize,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AllocStats {
    /// Total bytes ever allocated.
    pub allocated: usize,
    /// Total bytes ever deallocated.
    pub deallocated: usize,
}

impl AllocStats {
    /// Bytes currently live.
    pub fn current(&self) -> usize {
        self.allocated.saturating_sub(self.deallocated)
    }
}

impl fmt::Display for AllocStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "allocated {} bytes, deallocated {} bytes, live {} bytes",
            self.allocated,
            self.deallocated,
            self.current()
        )
    }
}

impl<A> CountingAllocator<A> {
    pub const fn new(inner: A) -> Self {
        CountingAllocator {
            inner,
            allocated: AtomicUsize::new(0),
            deallocated: AtomicUsize::new(0),
        }
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Relaxed)
    }

    pub fn deallocated(&self) -> usize {
        self.deallocated.load(Ordering::Relaxed)
    }

    /// Bytes currently live.
    pub fn current(&self) -> usize {
        self.snapshot().current()
    }

    pub fn snapshot(&self) -> AllocStats {
        AllocStats {
            allocated: self.allocated(),
            deallocated: self.deallocated(),
        }
    }
}

// SAFETY: every call is forwarded unchanged to `inner`; the counters are
// only updated after the inner allocator reported success.
unsafe impl<A: GlobalAlloc> GlobalAlloc for CountingAllocator<A> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc(layout);
        if !ptr.is_null() {
            self.allocated.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = self.inner.alloc_zeroed(layout);
        if !ptr.is_null() {
            self.allocated.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.inner.dealloc(ptr, layout);
        self.deallocated.fetch_add(layout.size(), Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = self.inner.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            // A successful realloc frees the old block and hands out a new one.
            self.deallocated.fetch_add(layout.size(), Ordering::Relaxed);
            self.allocated.fetch_add(new_size, Ordering::Relaxed);
        }
        new_ptr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_alloc_and_dealloc() {
        let counter = CountingAllocator::new(System);
        let layout = Layout::from_size_align(256, 8).unwrap();

        unsafe {
            let ptr = counter.alloc(layout);
            assert!(!ptr.is_null());
            assert_eq!(counter.allocated(), 256);
            assert_eq!(counter.current(), 256);

            counter.dealloc(ptr, layout);
        }

        assert_eq!(counter.deallocated(), 256);
        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn test_realloc_moves_counters() {
        let counter = CountingAllocator::new(System);
        let layout = Layout::from_size_align(64, 8).unwrap();

        unsafe {
            let ptr = counter.alloc_zeroed(layout);
            let ptr = counter.realloc(ptr, layout, 128);
            assert!(!ptr.is_null());
            assert_eq!(counter.snapshot(), AllocStats { allocated: 192, deallocated: 64 });

            counter.dealloc(ptr, Layout::from_size_align(128, 8).unwrap());
        }

        assert_eq!(counter.current(), 0);
    }

    #[test]
    fn test_stats_display() {
        let stats = AllocStats { allocated: 10, deallocated: 4 };
        assert_eq!(
            stats.to_string(),
            "allocated 10 bytes, deallocated 4 bytes, live 6 bytes"
        );
    }
}
